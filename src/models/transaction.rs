use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::store::decode::encode_datetime;
use crate::store::{
    self, DecodeError, Document, DocumentSnapshot, Fields, FromDocument, IntoDocument,
};

/// Direction of a stock movement.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransactionType {
    Incoming,
    Outgoing,
}

impl TransactionType {
    /// Quantity with the sign this movement applies to stock.
    pub fn signed(self, quantity: i64) -> i64 {
        match self {
            TransactionType::Incoming => quantity,
            TransactionType::Outgoing => -quantity,
        }
    }
}

/// Anything the ledger can replay.
pub trait StockMovement {
    fn kind(&self) -> TransactionType;
    fn quantity(&self) -> i64;

    fn signed_quantity(&self) -> i64 {
        self.kind().signed(self.quantity())
    }
}

/// Movement recorded in the on-device history of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalTransaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: i64,
    pub date: DateTime<Utc>,
}

impl LocalTransaction {
    pub fn new(kind: TransactionType, amount: i64, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            amount,
            date,
        }
    }
}

impl StockMovement for LocalTransaction {
    fn kind(&self) -> TransactionType {
        self.kind
    }

    fn quantity(&self) -> i64 {
        self.amount
    }
}

/// Movement stored in the `transactions` collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StockTransaction {
    pub id: String,
    pub kind: TransactionType,
    pub quantity: i64,
    pub date: DateTime<Utc>,
    pub item_id: String,
}

impl StockMovement for StockTransaction {
    fn kind(&self) -> TransactionType {
        self.kind
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }
}

impl FromDocument for StockTransaction {
    const COLLECTION: &'static str = "transactions";

    fn from_document(snapshot: &DocumentSnapshot) -> Result<Self, DecodeError> {
        let fields = Fields::new(Self::COLLECTION, snapshot);
        Ok(Self {
            id: fields.id().to_string(),
            kind: fields.parsed("type")?,
            quantity: fields.i64("quantity")?,
            date: fields.datetime("date")?,
            item_id: fields.string("itemId")?,
        })
    }
}

impl IntoDocument for StockTransaction {
    fn to_document(&self) -> Document {
        store::object(json!({
            "type": self.kind.as_ref(),
            "quantity": self.quantity,
            "date": encode_datetime(&self.date),
            "itemId": self.item_id,
        }))
    }
}
