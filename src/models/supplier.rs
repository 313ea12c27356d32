use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::hash::{Hash, Hasher};

use crate::store::decode::encode_datetime;
use crate::store::{
    self, DecodeError, Document, DocumentSnapshot, Fields, FromDocument, IntoDocument,
};

/// Contact and location record an item is sourced from.
///
/// Two suppliers are the same supplier when their ids match.
#[derive(Debug, Clone)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub address: String,
    pub contact: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl PartialEq for Supplier {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Supplier {}

impl Hash for Supplier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl FromDocument for Supplier {
    const COLLECTION: &'static str = "suppliers";

    fn from_document(snapshot: &DocumentSnapshot) -> Result<Self, DecodeError> {
        let fields = Fields::new(Self::COLLECTION, snapshot);
        Ok(Self {
            id: fields.id().to_string(),
            name: fields.string("name")?,
            address: fields.string("address")?,
            contact: fields.string("contact")?,
            latitude: fields.f64("latitude")?,
            longitude: fields.f64("longitude")?,
            created_at: fields.optional_datetime("createdAt")?,
        })
    }
}

impl IntoDocument for Supplier {
    fn to_document(&self) -> Document {
        store::object(json!({
            "name": self.name,
            "address": self.address,
            "contact": self.contact,
            "latitude": self.latitude,
            "longitude": self.longitude,
            "createdAt": self
                .created_at
                .as_ref()
                .map(encode_datetime)
                .map(Value::String)
                .unwrap_or(Value::Null),
        }))
    }
}
