//! Persistence collaborators.
//!
//! The ledger talks to three stores: a remote document store with change
//! notifications, an on-device key-value store, and a blob store for product
//! images. Each is a trait with an in-memory implementation; the key-value
//! store also has a directory-backed one used by the CLI.

use serde_json::Value;
use thiserror::Error;

pub mod blob;
pub mod decode;
pub mod document;
pub mod kv;
pub mod memory;

pub use blob::{BlobHandle, BlobStore, InMemoryBlobStore};
pub use decode::{DecodeError, Fields, FromDocument, IntoDocument};
pub use document::{
    ChangeKind, Direction, DocumentChange, DocumentStore, Query, WriteBatch, WriteOp,
};
pub use kv::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore};
pub use memory::InMemoryDocumentStore;

/// Schema-less document body as held by the document store.
pub type Document = serde_json::Map<String, Value>;

/// Unwraps a JSON object into a document body; other values yield an empty one.
pub fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// A document together with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub data: Document,
}

impl DocumentSnapshot {
    pub fn new(id: impl Into<String>, data: Document) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} does not exist")]
    NotFound { collection: String, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}
