// Catalog services over the shared document store
pub mod dashboard;
pub mod product_detail;
pub mod products;
pub mod suppliers;

pub use dashboard::{DashboardService, DashboardSummary};
pub use product_detail::ProductDetail;
pub use products::ProductService;
pub use suppliers::SupplierService;
