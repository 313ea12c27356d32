use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::ledger::{self, StockPolicy};
use crate::store::{
    self, DecodeError, Document, DocumentSnapshot, Fields, FromDocument, IntoDocument,
};

use super::transaction::LocalTransaction;

/// Item kept in the on-device catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalInventoryItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "image_base64")]
    pub image_data: Option<Vec<u8>>,
}

impl LocalInventoryItem {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: f64,
        category: impl Into<String>,
        stock: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            price,
            category: category.into(),
            stock,
            image_data: None,
        }
    }

    /// Returns the item after the movement, or rejects an outgoing movement
    /// larger than the current stock.
    pub fn apply(&self, transaction: &LocalTransaction) -> Result<Self, ServiceError> {
        self.apply_with(transaction, StockPolicy::RejectNegative)
    }

    pub fn apply_with(
        &self,
        transaction: &LocalTransaction,
        policy: StockPolicy,
    ) -> Result<Self, ServiceError> {
        let stock = ledger::apply_movement(self.stock, transaction, policy)?;
        Ok(Self {
            stock,
            ..self.clone()
        })
    }
}

/// Item stored in the `inventory` collection.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub price: f64,
    pub image_urls: Vec<String>,
    pub stock: i64,
    pub supplier_id: String,
    pub supplier_name: String,
    pub user_id: String,
}

impl FromDocument for InventoryItem {
    const COLLECTION: &'static str = "inventory";

    fn from_document(snapshot: &DocumentSnapshot) -> Result<Self, DecodeError> {
        let fields = Fields::new(Self::COLLECTION, snapshot);
        Ok(Self {
            id: fields.id().to_string(),
            name: fields.string("name")?,
            category: fields.string("category")?,
            description: fields.string("description")?,
            price: fields.f64("price")?,
            image_urls: fields.string_list("imageUrls")?,
            stock: fields.i64("stock")?,
            supplier_id: fields.string("supplierId")?,
            supplier_name: fields.string("supplierName")?,
            user_id: fields.string("userId")?,
        })
    }
}

impl IntoDocument for InventoryItem {
    fn to_document(&self) -> Document {
        store::object(json!({
            "name": self.name,
            "category": self.category,
            "description": self.description,
            "price": self.price,
            "imageUrls": self.image_urls,
            "stock": self.stock,
            "supplierId": self.supplier_id,
            "supplierName": self.supplier_name,
            "userId": self.user_id,
        }))
    }
}

/// Base64 text for optional image bytes in the local JSON format.
mod image_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use assert_matches::assert_matches;
    use chrono::Utc;

    #[test]
    fn local_json_field_names() {
        let mut item = LocalInventoryItem::new("Pen", "Blue ink", 2.5, "Stationery", 10);
        item.image_data = Some(vec![0xff, 0xd8, 0xff]);

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["imageData"], "/9j/");
        assert_eq!(value["stock"], 10);

        let back: LocalInventoryItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn missing_image_reads_as_none() {
        let raw = r#"{"id":"6f1c1a52-3f0e-4b8e-9d43-0e2b8f6b1a11","name":"Cup","description":"",
                      "price":1.0,"category":"Kitchen","stock":0}"#;
        let item: LocalInventoryItem = serde_json::from_str(raw).unwrap();
        assert!(item.image_data.is_none());
    }

    #[test]
    fn apply_rejects_overdraw_and_keeps_other_fields() {
        let item = LocalInventoryItem::new("Pen", "Blue ink", 2.5, "Stationery", 10);

        let up = item
            .apply(&LocalTransaction::new(TransactionType::Incoming, 5, Utc::now()))
            .unwrap();
        assert_eq!(up.stock, 15);
        assert_eq!(up.name, item.name);

        let overdraw = LocalTransaction::new(TransactionType::Outgoing, 20, Utc::now());
        assert_matches!(up.apply(&overdraw), Err(ServiceError::InsufficientStock(_)));
    }

    #[test]
    fn remote_item_requires_supplier_fields() {
        let item = InventoryItem {
            id: "abc".into(),
            name: "Pen".into(),
            category: "Stationery".into(),
            description: "Blue ink".into(),
            price: 2.5,
            image_urls: vec!["https://cdn/images/1.jpg".into()],
            stock: 4,
            supplier_id: "s1".into(),
            supplier_name: "Acme".into(),
            user_id: "u1".into(),
        };
        let mut doc = item.to_document();
        let decoded = InventoryItem::from_document(&DocumentSnapshot::new("abc", doc.clone()));
        assert_eq!(decoded.unwrap(), item);

        doc.remove("supplierName");
        assert_matches!(
            InventoryItem::from_document(&DocumentSnapshot::new("abc", doc)),
            Err(DecodeError::MissingField { field, .. }) if field == "supplierName"
        );
    }
}
