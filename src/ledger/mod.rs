//! Stock arithmetic shared by the local and remote ledgers.
//!
//! Both variants compute the next stock value here, so they agree on the
//! negative-stock rule: whichever [`StockPolicy`] is configured applies to
//! every movement regardless of where it is persisted.

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::{StockMovement, TransactionType};

pub mod local;
pub mod remote;

pub use local::{LocalCatalog, LocalLedger};
pub use remote::RemoteLedger;

/// Whether an outgoing movement may take stock below zero.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StockPolicy {
    /// Outgoing quantities larger than the current stock are refused.
    #[default]
    RejectNegative,
    /// Every movement is accepted; stock may go negative.
    AllowNegative,
}

/// Result of an accepted movement.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry<T> {
    pub transaction: T,
    pub previous_stock: i64,
    pub new_stock: i64,
}

/// Stock after moving `quantity` units in direction `kind`.
pub fn next_stock(
    stock: i64,
    kind: TransactionType,
    quantity: i64,
    policy: StockPolicy,
) -> Result<i64, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(
            "Quantity must be greater than zero".to_string(),
        ));
    }
    if kind == TransactionType::Outgoing
        && policy == StockPolicy::RejectNegative
        && quantity > stock
    {
        return Err(ServiceError::InsufficientStock(format!(
            "requested {}, available {}",
            quantity, stock
        )));
    }
    stock
        .checked_add(kind.signed(quantity))
        .ok_or_else(out_of_range)
}

pub fn apply_movement<M: StockMovement>(
    stock: i64,
    movement: &M,
    policy: StockPolicy,
) -> Result<i64, ServiceError> {
    next_stock(stock, movement.kind(), movement.quantity(), policy)
}

fn out_of_range() -> ServiceError {
    ServiceError::InvalidOperation("stock value out of range".to_string())
}

/// `stock` moved by one movement, or `None` on overflow.
fn shift<M: StockMovement>(stock: i64, movement: &M) -> Option<i64> {
    match movement.kind() {
        TransactionType::Incoming => stock.checked_add(movement.quantity()),
        TransactionType::Outgoing => stock.checked_sub(movement.quantity()),
    }
}

/// Sum of signed quantities: incoming adds, outgoing subtracts.
pub fn net_movement<'a, M, I>(movements: I) -> Result<i64, ServiceError>
where
    M: StockMovement + 'a,
    I: IntoIterator<Item = &'a M>,
{
    movements
        .into_iter()
        .try_fold(0i64, |net, m| shift(net, m))
        .ok_or_else(out_of_range)
}

/// Replays movements in order from an opening stock.
pub fn replay<'a, M, I>(opening: i64, movements: I, policy: StockPolicy) -> Result<i64, ServiceError>
where
    M: StockMovement + 'a,
    I: IntoIterator<Item = &'a M>,
{
    movements
        .into_iter()
        .try_fold(opening, |stock, m| apply_movement(stock, m, policy))
}

/// Stock before the first movement, given the stock after the last one.
pub fn implied_opening_stock<'a, M, I>(current: i64, movements: I) -> Result<i64, ServiceError>
where
    M: StockMovement + 'a,
    I: IntoIterator<Item = &'a M>,
{
    current
        .checked_sub(net_movement(movements)?)
        .ok_or_else(out_of_range)
}

/// Balance after each movement, in the order given.
pub fn running_balances<'a, M, I>(opening: i64, movements: I) -> Result<Vec<i64>, ServiceError>
where
    M: StockMovement + 'a,
    I: IntoIterator<Item = &'a M>,
{
    let mut stock = opening;
    movements
        .into_iter()
        .map(|m| -> Result<i64, ServiceError> {
            stock = shift(stock, m).ok_or_else(out_of_range)?;
            Ok(stock)
        })
        .collect()
}
