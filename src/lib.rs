//! Inventory Ledger Library
//!
//! Stock-ledger core of a small inventory tracker: a product catalog with a
//! per-item log of incoming and outgoing movements, kept either on the
//! device or in a shared document store with live change listeners.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod errors;
pub mod events;
pub mod forms;
pub mod ledger;
pub mod location;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;
pub mod sync;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::auth::{AuthProvider, AuthService, InMemoryAuthProvider, SessionContext};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::ledger::{LocalLedger, RemoteLedger};
use crate::logging::StockAudit;
use crate::models::InventoryItem;
use crate::services::{DashboardService, ProductDetail, ProductService, SupplierService};
use crate::store::{
    BlobStore, DocumentStore, InMemoryBlobStore, InMemoryDocumentStore, KeyValueStore,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub event_sender: EventSender,
    pub session: SessionContext,
    pub store: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub auth: AuthService,
    pub products: ProductService,
    pub suppliers: SupplierService,
    pub dashboard: DashboardService,
    pub ledger: RemoteLedger,
    audit_logger: slog::Logger,
}

impl AppState {
    /// Wires every service over the given collaborators. The returned
    /// receiver feeds [`events::process_events`].
    pub fn new(
        config: config::AppConfig,
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        provider: Arc<dyn AuthProvider>,
        audit_logger: slog::Logger,
    ) -> (Self, mpsc::Receiver<Event>) {
        let (event_sender, event_rx) = EventSender::channel(config.event_channel_capacity);
        let session = SessionContext::new();

        let auth = AuthService::new(provider, store.clone(), session.clone(), event_sender.clone());
        let products = ProductService::new(
            store.clone(),
            blobs.clone(),
            session.clone(),
            event_sender.clone(),
            config.image_prefix.clone(),
        );
        let suppliers = SupplierService::new(store.clone(), event_sender.clone());
        let dashboard = DashboardService::new(store.clone(), session.clone());
        let ledger = RemoteLedger::new(
            store.clone(),
            config.stock_policy,
            StockAudit::new(audit_logger.clone(), "remote"),
            event_sender.clone(),
        );

        let state = Self {
            config,
            event_sender,
            session,
            store,
            blobs,
            auth,
            products,
            suppliers,
            dashboard,
            ledger,
            audit_logger,
        };
        (state, event_rx)
    }

    /// Everything held in process memory, with audit output discarded.
    pub fn in_memory(config: config::AppConfig) -> (Self, mpsc::Receiver<Event>) {
        Self::new(
            config,
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(InMemoryBlobStore::default()),
            Arc::new(InMemoryAuthProvider::new()),
            logging::discard_logger(),
        )
    }

    /// Detail view for one product, listening for remote changes.
    pub async fn open_product(&self, item: InventoryItem) -> Result<ProductDetail, ServiceError> {
        ProductDetail::open(self.ledger.clone(), &self.suppliers, item).await
    }

    /// On-device ledger over `store`, under the same stock policy.
    pub fn local_ledger(&self, store: Arc<dyn KeyValueStore>) -> LocalLedger {
        LocalLedger::new(
            store,
            self.config.stock_policy,
            StockAudit::new(self.audit_logger.clone(), "local"),
        )
        .with_events(self.event_sender.clone())
    }
}
