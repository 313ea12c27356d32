//! Change listeners for an open product detail.
//!
//! A listener filters the store's change feed down to one item and forwards
//! what it sees as [`DetailEvent`] messages. It never touches the owner's
//! state; the owner applies events itself (see
//! [`ProductDetail`](crate::services::ProductDetail)).

use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ledger::remote::fetch_transactions;
use crate::models::{InventoryItem, StockTransaction};
use crate::store::{DocumentChange, DocumentStore, FromDocument};

/// Update for the state of one open item.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailEvent {
    /// The item's stored stock changed.
    StockChanged { item_id: String, stock: i64 },
    /// The item's transaction list changed; carries the full list, newest first.
    TransactionsChanged {
        item_id: String,
        transactions: Vec<StockTransaction>,
    },
    /// The item document was deleted.
    ItemRemoved { item_id: String },
}

/// Running listener; aborted when dropped.
#[derive(Debug)]
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn stock_of(change: &DocumentChange) -> Option<i64> {
    change.data.as_ref()?.get("stock")?.as_i64()
}

async fn stored_stock(store: &dyn DocumentStore, item_id: &str) -> Option<i64> {
    match store.get(InventoryItem::COLLECTION, item_id).await {
        Ok(Some(snapshot)) => snapshot.get("stock").and_then(|v| v.as_i64()),
        Ok(None) => None,
        Err(e) => {
            warn!(item_id, error = %e, "Failed to re-read item after lag");
            None
        }
    }
}

/// Forwards stock changes of one item document.
///
/// The feed is subscribed before this returns, so changes committed after
/// the call are never missed.
pub fn spawn_stock_listener(
    store: Arc<dyn DocumentStore>,
    item_id: String,
    sender: mpsc::Sender<DetailEvent>,
) -> ListenerHandle {
    let mut feed = store.subscribe();
    let task = tokio::spawn(async move {
        loop {
            let event = match feed.recv().await {
                Ok(change) => {
                    if !change.concerns(InventoryItem::COLLECTION, &item_id) {
                        continue;
                    }
                    if change.data.is_none() {
                        DetailEvent::ItemRemoved {
                            item_id: item_id.clone(),
                        }
                    } else if let Some(stock) = stock_of(&change) {
                        DetailEvent::StockChanged {
                            item_id: item_id.clone(),
                            stock,
                        }
                    } else {
                        debug!(item_id = %item_id, "Ignoring item change without a stock value");
                        continue;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(item_id = %item_id, skipped, "Stock listener lagged; re-reading item");
                    match stored_stock(store.as_ref(), &item_id).await {
                        Some(stock) => DetailEvent::StockChanged {
                            item_id: item_id.clone(),
                            stock,
                        },
                        None => continue,
                    }
                }
                Err(RecvError::Closed) => break,
            };
            if sender.send(event).await.is_err() {
                break;
            }
        }
        debug!(item_id = %item_id, "Stock listener stopped");
    });
    ListenerHandle { task }
}

/// Forwards the refreshed transaction list whenever a transaction for the
/// item is written, or any transaction is removed.
pub fn spawn_transaction_listener(
    store: Arc<dyn DocumentStore>,
    item_id: String,
    sender: mpsc::Sender<DetailEvent>,
) -> ListenerHandle {
    let mut feed = store.subscribe();
    let task = tokio::spawn(async move {
        loop {
            match feed.recv().await {
                Ok(change) => {
                    if change.collection != StockTransaction::COLLECTION {
                        continue;
                    }
                    // removals carry no body, so the owning item is unknown
                    let relevant = match &change.data {
                        Some(data) => data.get("itemId").and_then(|v| v.as_str()) == Some(item_id.as_str()),
                        None => true,
                    };
                    if !relevant {
                        continue;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(item_id = %item_id, skipped, "Transaction listener lagged; re-querying");
                }
                Err(RecvError::Closed) => break,
            }

            let transactions = match fetch_transactions(store.as_ref(), &item_id).await {
                Ok(transactions) => transactions,
                Err(e) => {
                    warn!(item_id = %item_id, error = %e, "Failed to refresh transactions");
                    continue;
                }
            };
            let event = DetailEvent::TransactionsChanged {
                item_id: item_id.clone(),
                transactions,
            };
            if sender.send(event).await.is_err() {
                break;
            }
        }
        debug!(item_id = %item_id, "Transaction listener stopped");
    });
    ListenerHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{self, InMemoryDocumentStore};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn forwards_only_the_watched_item() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .set("inventory", "a", store::object(json!({"stock": 1})))
            .await
            .unwrap();
        store
            .set("inventory", "b", store::object(json!({"stock": 1})))
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let _handle = spawn_stock_listener(store.clone(), "a".into(), tx);

        store
            .update("inventory", "b", store::object(json!({"stock": 9})))
            .await
            .unwrap();
        store
            .update("inventory", "a", store::object(json!({"stock": 4})))
            .await
            .unwrap();

        let event = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(
            event,
            Some(DetailEvent::StockChanged {
                item_id: "a".into(),
                stock: 4
            })
        );
    }

    #[tokio::test]
    async fn stops_when_the_owner_goes_away() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .set("inventory", "a", store::object(json!({"stock": 1})))
            .await
            .unwrap();
        let (tx, rx) = mpsc::channel(1);
        let handle = spawn_stock_listener(store.clone(), "a".into(), tx);
        drop(rx);

        store
            .update("inventory", "a", store::object(json!({"stock": 2})))
            .await
            .unwrap();
        timeout(Duration::from_secs(1), async {
            while !handle.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }
}
