use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::SessionContext;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::forms::ProductForm;
use crate::models::{InventoryItem, StockTransaction, Supplier};
use crate::store::decode::decode_valid;
use crate::store::{
    self, BlobStore, DocumentStore, FromDocument, IntoDocument, Query, StoreError, WriteBatch,
};

pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Service for the signed-in user's products
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    session: SessionContext,
    event_sender: EventSender,
    image_prefix: String,
}

impl ProductService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        session: SessionContext,
        event_sender: EventSender,
        image_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            blobs,
            session,
            event_sender,
            image_prefix: image_prefix.into(),
        }
    }

    fn required_supplier(form: &ProductForm) -> Result<&Supplier, ServiceError> {
        form.supplier
            .as_ref()
            .ok_or_else(|| ServiceError::ValidationError("Please select a supplier".into()))
    }

    /// Uploads every image concurrently and returns their URLs in input
    /// order. Any failed upload fails the whole call.
    #[instrument(skip(self, images), fields(count = images.len()))]
    pub async fn upload_images(&self, images: &[Vec<u8>]) -> Result<Vec<String>, ServiceError> {
        let uploads = images.iter().map(|bytes| {
            let path = format!("{}/{}.jpg", self.image_prefix, Uuid::new_v4());
            let blobs = self.blobs.clone();
            async move {
                let handle = blobs.put(&path, bytes.clone(), IMAGE_CONTENT_TYPE).await?;
                blobs.download_url(&handle).await
            }
        });

        join_all(uploads)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, StoreError>>()
            .map_err(|e| ServiceError::ExternalServiceError(format!("Image upload failed: {}", e)))
    }

    /// Uploads the form's images, then writes the product owned by the
    /// signed-in user. Nothing is written if an upload fails.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create_product(&self, form: &ProductForm) -> Result<InventoryItem, ServiceError> {
        let user_id = self.session.require_user_id()?;
        let draft = form.draft()?;
        let supplier = Self::required_supplier(form)?;
        if form.new_images.is_empty() {
            return Err(ServiceError::ValidationError("Images data is missing".into()));
        }

        let image_urls = self.upload_images(&form.new_images).await?;
        let item = InventoryItem {
            id: self.store.new_id(),
            name: draft.name,
            category: draft.category,
            description: draft.description,
            price: draft.price,
            image_urls,
            stock: draft.stock,
            supplier_id: supplier.id.clone(),
            supplier_name: supplier.name.clone(),
            user_id,
        };
        self.store
            .set(InventoryItem::COLLECTION, &item.id, item.to_document())
            .await?;

        info!(item_id = %item.id, "Product created");
        self.event_sender
            .publish(Event::ItemCreated(item.id.clone()))
            .await;
        Ok(item)
    }

    /// Rewrites the product's descriptive fields and image list. Stock is
    /// left alone; it only moves through the ledger.
    #[instrument(skip(self, form))]
    pub async fn update_product(
        &self,
        item_id: &str,
        form: &ProductForm,
    ) -> Result<InventoryItem, ServiceError> {
        self.session.require_user_id()?;
        let draft = form.draft()?;
        let supplier = Self::required_supplier(form)?;
        if !form.has_images() {
            return Err(ServiceError::ValidationError("Images data is missing".into()));
        }

        let current = self.get_product(item_id).await?;
        let mut image_urls = form.existing_image_urls.clone();
        image_urls.extend(self.upload_images(&form.new_images).await?);

        let fields = store::object(json!({
            "name": draft.name,
            "category": draft.category,
            "description": draft.description,
            "price": draft.price,
            "imageUrls": image_urls,
            "supplierId": supplier.id,
            "supplierName": supplier.name,
        }));
        self.store
            .update(InventoryItem::COLLECTION, item_id, fields)
            .await?;

        self.event_sender
            .publish(Event::ItemUpdated(item_id.to_string()))
            .await;
        Ok(InventoryItem {
            name: draft.name,
            category: draft.category,
            description: draft.description,
            price: draft.price,
            image_urls,
            supplier_id: supplier.id.clone(),
            supplier_name: supplier.name.clone(),
            ..current
        })
    }

    /// Deletes the product together with its transactions.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, item_id: &str) -> Result<(), ServiceError> {
        self.session.require_user_id()?;
        let transactions = self
            .store
            .query(
                StockTransaction::COLLECTION,
                &Query::new().where_eq("itemId", item_id),
            )
            .await?;

        let mut batch = WriteBatch::new();
        batch.delete(InventoryItem::COLLECTION, item_id);
        for snapshot in &transactions {
            batch.delete(StockTransaction::COLLECTION, &snapshot.id);
        }
        self.store.commit(batch).await?;

        info!(removed_transactions = transactions.len(), "Product deleted");
        self.event_sender
            .publish(Event::ItemDeleted(item_id.to_string()))
            .await;
        Ok(())
    }

    pub async fn get_product(&self, item_id: &str) -> Result<InventoryItem, ServiceError> {
        let snapshot = self
            .store
            .get(InventoryItem::COLLECTION, item_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;
        Ok(InventoryItem::from_document(&snapshot)?)
    }

    /// Products owned by the signed-in user; malformed documents are skipped.
    pub async fn list_products(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        let user_id = self.session.require_user_id()?;
        let snapshots = self
            .store
            .query(
                InventoryItem::COLLECTION,
                &Query::new().where_eq("userId", user_id),
            )
            .await?;
        Ok(decode_valid(&snapshots))
    }
}
