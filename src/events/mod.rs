use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::ServiceError;
use crate::models::TransactionType;

/// Domain events published by the ledgers and services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ItemCreated(String),
    ItemUpdated(String),
    ItemDeleted(String),

    // Ledger events
    StockMovementRecorded {
        item_id: String,
        transaction_id: String,
        kind: TransactionType,
        quantity: i64,
        previous_stock: i64,
        new_stock: i64,
    },
    StockMovementRejected {
        item_id: String,
        kind: TransactionType,
        quantity: i64,
        reason: String,
    },

    SupplierCreated(String),

    // Account events
    UserRegistered(String),
    UserSignedIn(String),
    UserSignedOut,
    PasswordChanged(String),
    AccountDeleted(String),

    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sender plus the receiving half to hand to [`process_events`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Sends an event, waiting for channel capacity.
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Non-blocking send for synchronous callers. A full or closed channel
    /// drops the event with a warning.
    pub fn notify(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Dropped event: {}", e);
        }
    }

    /// Sends after a write has already been committed; failures are logged
    /// rather than returned.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

/// Counters reported when the event loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventStats {
    pub processed: usize,
    pub low_stock_alerts: usize,
    pub rejected_movements: usize,
}

/// Drains the channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, low_stock_threshold: i64) -> EventStats {
    info!("Starting event processing loop");
    let mut stats = EventStats::default();

    while let Some(event) = rx.recv().await {
        debug!("Received event: {:?}", event);
        stats.processed += 1;

        match event {
            Event::StockMovementRecorded {
                item_id,
                kind,
                quantity,
                previous_stock,
                new_stock,
                ..
            } => {
                info!(
                    "Stock movement: item={}, type={}, quantity={}, {} -> {}",
                    item_id, kind, quantity, previous_stock, new_stock
                );
                if new_stock < low_stock_threshold {
                    stats.low_stock_alerts += 1;
                    warn!(
                        "Low inventory alert: item {} has only {} units remaining",
                        item_id, new_stock
                    );
                }
            }
            Event::StockMovementRejected {
                item_id,
                kind,
                quantity,
                reason,
            } => {
                stats.rejected_movements += 1;
                warn!(
                    "Stock movement rejected: item={}, type={}, quantity={}, reason={}",
                    item_id, kind, quantity, reason
                );
            }
            Event::ItemCreated(id) => info!("Item created: {}", id),
            Event::ItemUpdated(id) => info!("Item updated: {}", id),
            Event::ItemDeleted(id) => info!("Item deleted: {}", id),
            Event::SupplierCreated(id) => info!("Supplier created: {}", id),
            Event::UserRegistered(uid) => info!("User registered: {}", uid),
            Event::UserSignedIn(uid) => info!("User signed in: {}", uid),
            Event::UserSignedOut => info!("User signed out"),
            Event::PasswordChanged(uid) => info!("Password changed: {}", uid),
            Event::AccountDeleted(uid) => warn!("Account deleted: {}", uid),
            Event::Generic { message, .. } => info!("{}", message),
        }
    }

    warn!("Event processing loop has ended");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(new_stock: i64) -> Event {
        Event::StockMovementRecorded {
            item_id: "item-1".into(),
            transaction_id: "tx-1".into(),
            kind: TransactionType::Outgoing,
            quantity: 1,
            previous_stock: new_stock + 1,
            new_stock,
        }
    }

    #[tokio::test]
    async fn counts_low_stock_and_rejections() {
        let (sender, rx) = EventSender::channel(8);
        sender.send(movement(25)).await.unwrap();
        sender.send(movement(3)).await.unwrap();
        sender.notify(Event::StockMovementRejected {
            item_id: "item-1".into(),
            kind: TransactionType::Outgoing,
            quantity: 99,
            reason: "insufficient stock".into(),
        });
        sender.notify(Event::with_data("hello".into()));
        drop(sender);

        let stats = process_events(rx, 10).await;
        assert_eq!(
            stats,
            EventStats {
                processed: 4,
                low_stock_alerts: 1,
                rejected_movements: 1,
            }
        );
    }

    #[tokio::test]
    async fn send_fails_once_the_loop_is_gone() {
        let (sender, rx) = EventSender::channel(1);
        drop(rx);
        assert!(matches!(
            sender.send(Event::UserSignedOut).await,
            Err(ServiceError::EventError(_))
        ));
        // logged, not returned
        sender.publish(Event::UserSignedOut).await;
        sender.notify(Event::UserSignedOut);
    }
}
