use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::forms::TransactionForm;
use crate::ledger::{self, RemoteLedger};
use crate::models::{InventoryItem, StockTransaction, Supplier};
use crate::services::SupplierService;
use crate::sync::{spawn_stock_listener, spawn_transaction_listener, DetailEvent, ListenerHandle};

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// One open product with its live stock and transaction history.
///
/// Listeners only send [`DetailEvent`] messages; this type owns the state and
/// applies them. A stock change replaces `stock` and nothing else. Dropping
/// the detail stops its listeners.
pub struct ProductDetail {
    item: InventoryItem,
    transactions: Vec<StockTransaction>,
    supplier: Option<Supplier>,
    removed: bool,
    ledger: RemoteLedger,
    updates: mpsc::Receiver<DetailEvent>,
    _listeners: [ListenerHandle; 2],
}

impl ProductDetail {
    /// Starts listening, then loads the history and supplier. A supplier that
    /// cannot be loaded is left empty.
    pub async fn open(
        ledger: RemoteLedger,
        suppliers: &SupplierService,
        item: InventoryItem,
    ) -> Result<Self, ServiceError> {
        let (sender, updates) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let listeners = [
            spawn_stock_listener(ledger.store(), item.id.clone(), sender.clone()),
            spawn_transaction_listener(ledger.store(), item.id.clone(), sender),
        ];

        let transactions = ledger.transactions(&item.id).await?;
        let supplier = match suppliers.get_supplier(&item.supplier_id).await {
            Ok(supplier) => Some(supplier),
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "Supplier unavailable");
                None
            }
        };

        Ok(Self {
            item,
            transactions,
            supplier,
            removed: false,
            ledger,
            updates,
            _listeners: listeners,
        })
    }

    pub fn item(&self) -> &InventoryItem {
        &self.item
    }

    /// Newest first.
    pub fn transactions(&self) -> &[StockTransaction] {
        &self.transactions
    }

    pub fn supplier(&self) -> Option<&Supplier> {
        self.supplier.as_ref()
    }

    /// True once the item document has been deleted.
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Applies one update. Returns false when it was for another item.
    pub fn apply(&mut self, event: DetailEvent) -> bool {
        match event {
            DetailEvent::StockChanged { item_id, stock } if item_id == self.item.id => {
                self.item.stock = stock;
                true
            }
            DetailEvent::TransactionsChanged {
                item_id,
                transactions,
            } if item_id == self.item.id => {
                self.transactions = transactions;
                true
            }
            DetailEvent::ItemRemoved { item_id } if item_id == self.item.id => {
                self.removed = true;
                true
            }
            other => {
                debug!(?other, "Ignoring update for another item");
                false
            }
        }
    }

    /// Applies every update already queued without waiting.
    pub fn sync(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.updates.try_recv() {
            if self.apply(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next update and applies it.
    pub async fn next_update(&mut self) -> Option<DetailEvent> {
        let event = self.updates.recv().await?;
        self.apply(event.clone());
        Some(event)
    }

    /// Records a movement and mirrors the stored stock locally.
    pub async fn add_transaction(&mut self, form: &TransactionForm) -> Result<StockTransaction, ServiceError> {
        if self.removed {
            return Err(ServiceError::NotFound(format!("Item {} was deleted", self.item.id)));
        }
        let quantity = form.quantity()?;
        let entry = self
            .ledger
            .add_transaction(&self.item, form.kind, quantity, form.date)
            .await?;
        self.item.stock = entry.new_stock;
        Ok(entry.transaction)
    }

    /// Each loaded transaction paired with the stock right after it, newest
    /// first, working back from the current stock. Fails if the stored
    /// quantities do not fit the stock range.
    pub fn history_with_balances(&self) -> Result<Vec<(&StockTransaction, i64)>, ServiceError> {
        let oldest_first: Vec<&StockTransaction> = self.transactions.iter().rev().collect();
        let opening = ledger::implied_opening_stock(self.item.stock, oldest_first.iter().copied())?;
        let balances = ledger::running_balances(opening, oldest_first.iter().copied())?;
        Ok(oldest_first.into_iter().zip(balances).rev().collect())
    }
}
