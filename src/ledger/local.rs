//! On-device catalog and per-item transaction history.
//!
//! Everything lives in a [`KeyValueStore`] as JSON: the item list under
//! [`INVENTORY_KEY`] and each item's history under `transactions_<id>`.
//! Values that fail to decode read as empty; the next save replaces them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{LedgerEntry, StockPolicy};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::logging::StockAudit;
use crate::models::{LocalInventoryItem, LocalTransaction, TransactionType};
use crate::store::KeyValueStore;

pub const INVENTORY_KEY: &str = "inventoryData";

pub fn transactions_key(item_id: &Uuid) -> String {
    format!("transactions_{}", item_id)
}

fn load_list<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Vec<T>, ServiceError> {
    let Some(bytes) = store.get(key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_slice(&bytes) {
        Ok(list) => Ok(list),
        Err(e) => {
            warn!(key, error = %e, "Discarding undecodable local data");
            Ok(Vec::new())
        }
    }
}

fn save_list<T: Serialize>(store: &dyn KeyValueStore, key: &str, list: &[T]) -> Result<(), ServiceError> {
    let bytes = serde_json::to_vec(list)?;
    store.set(key, &bytes)?;
    Ok(())
}

/// Ordered list of items saved as a whole on every change.
#[derive(Clone)]
pub struct LocalCatalog {
    store: Arc<dyn KeyValueStore>,
}

impl LocalCatalog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn items(&self) -> Result<Vec<LocalInventoryItem>, ServiceError> {
        load_list(self.store.as_ref(), INVENTORY_KEY)
    }

    pub fn get(&self, id: &Uuid) -> Result<LocalInventoryItem, ServiceError> {
        self.items()?
            .into_iter()
            .find(|item| item.id == *id)
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", id)))
    }

    /// Appends the item to the end of the list.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub fn add(&self, item: LocalInventoryItem) -> Result<(), ServiceError> {
        let mut items = self.items()?;
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(ServiceError::InvalidOperation(format!(
                "Item {} already exists",
                item.id
            )));
        }
        items.push(item);
        save_list(self.store.as_ref(), INVENTORY_KEY, &items)
    }

    /// Replaces the item with the same id in place.
    pub fn update(&self, item: LocalInventoryItem) -> Result<(), ServiceError> {
        let mut items = self.items()?;
        let slot = items
            .iter_mut()
            .find(|existing| existing.id == item.id)
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item.id)))?;
        *slot = item;
        save_list(self.store.as_ref(), INVENTORY_KEY, &items)
    }

    /// Removes the item and its history. Returns false if it was not present.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &Uuid) -> Result<bool, ServiceError> {
        let mut items = self.items()?;
        let before = items.len();
        items.retain(|item| item.id != *id);
        if items.len() == before {
            return Ok(false);
        }
        save_list(self.store.as_ref(), INVENTORY_KEY, &items)?;
        // the item is gone either way; a leftover history is only unreachable
        if let Err(e) = self.store.remove(&transactions_key(id)) {
            warn!(error = %e, "Failed to remove history of deleted item");
        }
        info!("Deleted local item");
        Ok(true)
    }
}

/// Records stock movements against the local catalog.
#[derive(Clone)]
pub struct LocalLedger {
    catalog: LocalCatalog,
    store: Arc<dyn KeyValueStore>,
    policy: StockPolicy,
    audit: StockAudit,
    events: Option<EventSender>,
}

impl LocalLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, policy: StockPolicy, audit: StockAudit) -> Self {
        Self {
            catalog: LocalCatalog::new(store.clone()),
            store,
            policy,
            audit,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn catalog(&self) -> &LocalCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> StockPolicy {
        self.policy
    }

    /// History in the order movements were recorded.
    pub fn history(&self, item_id: &Uuid) -> Result<Vec<LocalTransaction>, ServiceError> {
        load_list(self.store.as_ref(), &transactions_key(item_id))
    }

    /// Applies one movement: the history gains the transaction and the
    /// catalog entry takes the new stock, or neither changes.
    #[instrument(skip(self))]
    pub fn record(
        &self,
        item_id: &Uuid,
        kind: TransactionType,
        amount: i64,
        date: DateTime<Utc>,
    ) -> Result<LedgerEntry<LocalTransaction>, ServiceError> {
        let item = self.catalog.get(item_id)?;
        let transaction = LocalTransaction::new(kind, amount, date);
        let id = item_id.to_string();

        let updated = match item.apply_with(&transaction, self.policy) {
            Ok(updated) => updated,
            Err(e) => {
                self.audit.rejected(&id, kind, amount, &e.to_string());
                self.notify(Event::StockMovementRejected {
                    item_id: id,
                    kind,
                    quantity: amount,
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let key = transactions_key(item_id);
        let previous = self.history(item_id)?;
        let mut history = previous.clone();
        history.push(transaction.clone());
        save_list(self.store.as_ref(), &key, &history)?;

        if let Err(e) = self.catalog.update(updated.clone()) {
            if let Err(restore) = save_list(self.store.as_ref(), &key, &previous) {
                warn!(error = %restore, "Failed to restore history after catalog write failed");
            }
            return Err(e);
        }

        self.audit.accepted(&id, kind, amount, item.stock, updated.stock);
        self.notify(Event::StockMovementRecorded {
            item_id: id,
            transaction_id: transaction.id.to_string(),
            kind,
            quantity: amount,
            previous_stock: item.stock,
            new_stock: updated.stock,
        });

        Ok(LedgerEntry {
            transaction,
            previous_stock: item.stock,
            new_stock: updated.stock,
        })
    }

    fn notify(&self, event: Event) {
        if let Some(events) = &self.events {
            events.notify(event);
        }
    }
}
