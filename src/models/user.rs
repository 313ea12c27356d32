use serde_json::json;

use crate::store::{
    self, DecodeError, Document, DocumentSnapshot, Fields, FromDocument, IntoDocument,
};

/// Profile stored under `users/<auth uid>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub email: String,
}

impl User {
    /// Up to two leading letters of the name, e.g. "Ari Wibowo" -> "AW".
    pub fn initials(&self) -> String {
        self.full_name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

impl FromDocument for User {
    const COLLECTION: &'static str = "users";

    fn from_document(snapshot: &DocumentSnapshot) -> Result<Self, DecodeError> {
        let fields = Fields::new(Self::COLLECTION, snapshot);
        Ok(Self {
            id: fields.id().to_string(),
            full_name: fields.string("fullName")?,
            phone: fields.string("phone")?,
            email: fields.string("email")?,
        })
    }
}

impl IntoDocument for User {
    fn to_document(&self) -> Document {
        store::object(json!({
            "fullName": self.full_name,
            "phone": self.phone,
            "email": self.email,
        }))
    }
}
