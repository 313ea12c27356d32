use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, instrument};

use super::{next_stock, LedgerEntry, StockPolicy};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::logging::StockAudit;
use crate::models::{InventoryItem, StockTransaction, TransactionType};
use crate::store::decode::decode_valid;
use crate::store::{
    self, Direction, DocumentStore, FromDocument, IntoDocument, Query, WriteBatch,
};

/// Reads every transaction for one item, newest first. Documents that do
/// not decode are skipped.
pub async fn fetch_transactions(
    store: &dyn DocumentStore,
    item_id: &str,
) -> Result<Vec<StockTransaction>, ServiceError> {
    let query = Query::new()
        .where_eq("itemId", item_id)
        .order_by("date", Direction::Descending);
    let snapshots = store.query(StockTransaction::COLLECTION, &query).await?;
    Ok(decode_valid(&snapshots))
}

/// Ledger over the shared document store.
///
/// The transaction document and the item's new stock are written in one
/// batch. The new stock is computed from the caller's copy of the item, so
/// concurrent writers race with last-write-wins on `stock`.
#[derive(Clone)]
pub struct RemoteLedger {
    store: Arc<dyn DocumentStore>,
    policy: StockPolicy,
    audit: StockAudit,
    events: EventSender,
}

impl RemoteLedger {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        policy: StockPolicy,
        audit: StockAudit,
        events: EventSender,
    ) -> Self {
        Self {
            store,
            policy,
            audit,
            events,
        }
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    pub fn policy(&self) -> StockPolicy {
        self.policy
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn add_transaction(
        &self,
        item: &InventoryItem,
        kind: TransactionType,
        quantity: i64,
        date: DateTime<Utc>,
    ) -> Result<LedgerEntry<StockTransaction>, ServiceError> {
        let new_stock = match next_stock(item.stock, kind, quantity, self.policy) {
            Ok(stock) => stock,
            Err(e) => {
                self.audit.rejected(&item.id, kind, quantity, &e.to_string());
                self.events
                    .publish(Event::StockMovementRejected {
                        item_id: item.id.clone(),
                        kind,
                        quantity,
                        reason: e.to_string(),
                    })
                    .await;
                return Err(e);
            }
        };

        let transaction = StockTransaction {
            id: self.store.new_id(),
            kind,
            quantity,
            date,
            item_id: item.id.clone(),
        };

        let mut batch = WriteBatch::new();
        batch
            .set(
                StockTransaction::COLLECTION,
                &transaction.id,
                transaction.to_document(),
            )
            .update(
                InventoryItem::COLLECTION,
                &item.id,
                store::object(json!({ "stock": new_stock })),
            );
        self.store.commit(batch).await?;
        debug!(transaction_id = %transaction.id, new_stock, "Committed stock movement");

        self.audit
            .accepted(&item.id, kind, quantity, item.stock, new_stock);
        self.events
            .publish(Event::StockMovementRecorded {
                item_id: item.id.clone(),
                transaction_id: transaction.id.clone(),
                kind,
                quantity,
                previous_stock: item.stock,
                new_stock,
            })
            .await;

        Ok(LedgerEntry {
            transaction,
            previous_stock: item.stock,
            new_stock,
        })
    }

    pub async fn transactions(&self, item_id: &str) -> Result<Vec<StockTransaction>, ServiceError> {
        fetch_transactions(self.store.as_ref(), item_id).await
    }

    /// Stock as currently stored for the item.
    pub async fn current_stock(&self, item_id: &str) -> Result<i64, ServiceError> {
        let snapshot = self
            .store
            .get(InventoryItem::COLLECTION, item_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;
        Ok(InventoryItem::from_document(&snapshot)?.stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use assert_matches::assert_matches;

    async fn seeded(stock: i64) -> (Arc<InMemoryDocumentStore>, InventoryItem) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let item = InventoryItem {
            id: "item-1".into(),
            name: "Pen".into(),
            category: "Stationery".into(),
            description: String::new(),
            price: 1.0,
            image_urls: vec![],
            stock,
            supplier_id: "s1".into(),
            supplier_name: "Acme".into(),
            user_id: "u1".into(),
        };
        store
            .set(InventoryItem::COLLECTION, &item.id, item.to_document())
            .await
            .unwrap();
        (store, item)
    }

    fn ledger(store: Arc<InMemoryDocumentStore>, policy: StockPolicy) -> RemoteLedger {
        let (events, _rx) = EventSender::channel(16);
        RemoteLedger::new(store, policy, StockAudit::discard(), events)
    }

    #[tokio::test]
    async fn writes_transaction_and_stock_together() {
        let (store, item) = seeded(10).await;
        let ledger = ledger(store.clone(), StockPolicy::RejectNegative);

        let entry = ledger
            .add_transaction(&item, TransactionType::Incoming, 5, Utc::now())
            .await
            .unwrap();
        assert_eq!(entry.new_stock, 15);
        assert_eq!(ledger.current_stock(&item.id).await.unwrap(), 15);
        assert_eq!(ledger.transactions(&item.id).await.unwrap(), vec![entry.transaction]);
    }

    #[tokio::test]
    async fn missing_item_aborts_the_batch() {
        let (store, mut item) = seeded(10).await;
        item.id = "ghost".into();
        let ledger = ledger(store.clone(), StockPolicy::RejectNegative);

        let result = ledger
            .add_transaction(&item, TransactionType::Incoming, 1, Utc::now())
            .await;
        assert_matches!(result, Err(ServiceError::StoreError(_)));
        assert!(ledger.transactions("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overdraw_is_rejected_by_default() {
        let (store, item) = seeded(3).await;
        let ledger = ledger(store, StockPolicy::default());
        let result = ledger
            .add_transaction(&item, TransactionType::Outgoing, 4, Utc::now())
            .await;
        assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
        assert_eq!(ledger.current_stock(&item.id).await.unwrap(), 3);
    }
}
