use std::sync::Arc;

use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::forms::SupplierForm;
use crate::models::Supplier;
use crate::store::decode::decode_valid;
use crate::store::{DocumentStore, FromDocument, IntoDocument, Query};

/// Service for managing suppliers
#[derive(Clone)]
pub struct SupplierService {
    store: Arc<dyn DocumentStore>,
    event_sender: EventSender,
}

impl SupplierService {
    pub fn new(store: Arc<dyn DocumentStore>, event_sender: EventSender) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    /// Creates a supplier from the form under a new id.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create_supplier(&self, form: &SupplierForm) -> Result<Supplier, ServiceError> {
        let supplier = form.to_supplier(self.store.new_id())?;
        self.store
            .set(Supplier::COLLECTION, &supplier.id, supplier.to_document())
            .await?;
        info!(supplier_id = %supplier.id, "Supplier created");
        self.event_sender
            .publish(Event::SupplierCreated(supplier.id.clone()))
            .await;
        Ok(supplier)
    }

    pub async fn get_supplier(&self, id: &str) -> Result<Supplier, ServiceError> {
        let snapshot = self
            .store
            .get(Supplier::COLLECTION, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", id)))?;
        Ok(Supplier::from_document(&snapshot)?)
    }

    /// Every supplier that decodes, sorted by name.
    pub async fn list_suppliers(&self) -> Result<Vec<Supplier>, ServiceError> {
        let snapshots = self.store.query(Supplier::COLLECTION, &Query::new()).await?;
        let mut suppliers: Vec<Supplier> = decode_valid(&snapshots);
        suppliers.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(suppliers)
    }
}
