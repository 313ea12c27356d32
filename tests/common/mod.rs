#![allow(dead_code)]

use std::sync::Arc;

use inventory_ledger::{
    auth::{InMemoryAuthProvider, Session},
    config::AppConfig,
    events::{process_events, EventStats},
    forms::{ProductForm, RegistrationForm, SupplierForm},
    ledger::StockPolicy,
    location::Coordinates,
    logging,
    models::{InventoryItem, Supplier},
    store::{InMemoryBlobStore, InMemoryDocumentStore},
    AppState,
};
use tokio::task::JoinHandle;

/// Application state over in-memory collaborators, with handles kept so
/// tests can inspect or break them.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryDocumentStore>,
    pub blobs: Arc<InMemoryBlobStore>,
    events: Option<JoinHandle<EventStats>>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(StockPolicy::default())
    }

    pub fn with_policy(policy: StockPolicy) -> Self {
        let mut config = AppConfig::new("test".to_string());
        config.stock_policy = policy;
        let threshold = config.low_stock_threshold;

        let store = Arc::new(InMemoryDocumentStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new("https://blobs.test"));
        let (state, rx) = AppState::new(
            config,
            store.clone(),
            blobs.clone(),
            Arc::new(InMemoryAuthProvider::new()),
            logging::discard_logger(),
        );
        let events = tokio::spawn(process_events(rx, threshold));

        Self {
            state,
            store,
            blobs,
            events: Some(events),
        }
    }

    pub fn registration(email: &str) -> RegistrationForm {
        RegistrationForm {
            email: email.into(),
            full_name: "Ari Wibowo".into(),
            phone: "08123456789".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        }
    }

    pub async fn sign_up(&self, email: &str) -> Session {
        self.state
            .auth
            .register(&Self::registration(email))
            .await
            .expect("register")
    }

    pub async fn supplier(&self, name: &str) -> Supplier {
        let form = SupplierForm {
            name: name.into(),
            address: "Jl. Malioboro 5".into(),
            contact: "0274-555".into(),
            coordinates: Some(Coordinates::new(-7.79, 110.36)),
        };
        self.state
            .suppliers
            .create_supplier(&form)
            .await
            .expect("create supplier")
    }

    pub fn product_form(name: &str, stock: i64, supplier: &Supplier) -> ProductForm {
        ProductForm {
            name: name.into(),
            category: "Stationery".into(),
            description: "Test product".into(),
            price: "2.50".into(),
            stock: stock.to_string(),
            supplier: Some(supplier.clone()),
            new_images: vec![vec![0xff, 0xd8, 0xff, 0xe0]],
            ..ProductForm::default()
        }
    }

    /// Signs up a user and creates one product with `stock` units.
    pub async fn seeded_product(&self, stock: i64) -> InventoryItem {
        if !self.state.session.is_signed_in() {
            self.sign_up("owner@example.com").await;
        }
        let supplier = self.supplier("Acme").await;
        self.state
            .products
            .create_product(&Self::product_form("Pen", stock, &supplier))
            .await
            .expect("create product")
    }

    /// Drops every sender and waits for the event loop to finish.
    pub async fn shutdown(mut self) -> EventStats {
        let events = self.events.take().expect("event loop already stopped");
        drop(self);
        events.await.expect("event loop")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(events) = self.events.take() {
            events.abort();
        }
    }
}
