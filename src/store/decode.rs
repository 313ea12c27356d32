use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::{Document, DocumentSnapshot};

/// Failure to turn a stored record into a typed one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{collection}/{id}: missing field `{field}`")]
    MissingField {
        collection: String,
        id: String,
        field: String,
    },

    #[error("{collection}/{id}: field `{field}` {reason}")]
    InvalidField {
        collection: String,
        id: String,
        field: String,
        reason: String,
    },

    #[error("data under `{key}` is malformed: {reason}")]
    Malformed { key: String, reason: String },
}

/// Typed view over a stored document.
pub trait FromDocument: Sized {
    /// Collection the record lives in.
    const COLLECTION: &'static str;

    fn from_document(snapshot: &DocumentSnapshot) -> Result<Self, DecodeError>;
}

/// Writes a record's fields (not its id) into a document body.
pub trait IntoDocument {
    fn to_document(&self) -> Document;
}

/// Field accessor that reports schema violations against one document.
pub struct Fields<'a> {
    collection: &'a str,
    snapshot: &'a DocumentSnapshot,
}

impl<'a> Fields<'a> {
    pub fn new(collection: &'a str, snapshot: &'a DocumentSnapshot) -> Self {
        Self {
            collection,
            snapshot,
        }
    }

    pub fn id(&self) -> &str {
        &self.snapshot.id
    }

    fn required(&self, field: &str) -> Result<&'a Value, DecodeError> {
        match self.snapshot.data.get(field) {
            Some(Value::Null) | None => Err(DecodeError::MissingField {
                collection: self.collection.to_string(),
                id: self.snapshot.id.clone(),
                field: field.to_string(),
            }),
            Some(value) => Ok(value),
        }
    }

    fn invalid(&self, field: &str, reason: impl Into<String>) -> DecodeError {
        DecodeError::InvalidField {
            collection: self.collection.to_string(),
            id: self.snapshot.id.clone(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn string(&self, field: &str) -> Result<String, DecodeError> {
        self.required(field)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(field, "is not a string"))
    }

    pub fn f64(&self, field: &str) -> Result<f64, DecodeError> {
        self.required(field)?
            .as_f64()
            .ok_or_else(|| self.invalid(field, "is not a number"))
    }

    pub fn i64(&self, field: &str) -> Result<i64, DecodeError> {
        self.required(field)?
            .as_i64()
            .ok_or_else(|| self.invalid(field, "is not an integer"))
    }

    pub fn datetime(&self, field: &str) -> Result<DateTime<Utc>, DecodeError> {
        let raw = self.string(field)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| self.invalid(field, format!("is not an RFC 3339 timestamp: {}", e)))
    }

    /// Optional timestamp; absent or null reads as `None`.
    pub fn optional_datetime(&self, field: &str) -> Result<Option<DateTime<Utc>>, DecodeError> {
        match self.snapshot.data.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.datetime(field).map(Some),
        }
    }

    /// Optional list of strings; absent or null reads as empty.
    pub fn string_list(&self, field: &str) -> Result<Vec<String>, DecodeError> {
        match self.snapshot.data.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.invalid(field, "contains a non-string entry"))
                })
                .collect(),
            Some(_) => Err(self.invalid(field, "is not a list")),
        }
    }

    pub fn parsed<T>(&self, field: &str) -> Result<T, DecodeError>
    where
        T: std::str::FromStr,
    {
        let raw = self.string(field)?;
        raw.parse()
            .map_err(|_| self.invalid(field, format!("has unknown value `{}`", raw)))
    }
}

/// Decodes every snapshot that matches the schema; the rest are logged and
/// skipped.
pub fn decode_valid<T: FromDocument>(snapshots: &[DocumentSnapshot]) -> Vec<T> {
    snapshots
        .iter()
        .filter_map(|snapshot| match T::from_document(snapshot) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping document that does not decode");
                None
            }
        })
        .collect()
}

/// Timestamp encoding used for stored documents; fixed width so string
/// ordering matches time ordering.
pub fn encode_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
