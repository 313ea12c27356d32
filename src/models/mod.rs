pub mod inventory_item;
pub mod supplier;
pub mod transaction;
pub mod user;

pub use inventory_item::{InventoryItem, LocalInventoryItem};
pub use supplier::Supplier;
pub use transaction::{LocalTransaction, StockMovement, StockTransaction, TransactionType};
pub use user::User;
