use chrono::{DateTime, Utc};
use validator::{Validate, ValidationError};

use super::{invalid, FormState};
use crate::errors::ServiceError;
use crate::models::TransactionType;

/// Stock movement being entered against one item.
#[derive(Debug, Clone, Validate)]
pub struct TransactionForm {
    pub kind: TransactionType,
    #[validate(custom = "validate_quantity")]
    pub quantity: String,
    pub date: DateTime<Utc>,
}

impl FormState for TransactionForm {
    const FIELDS: &'static [&'static str] = &["quantity"];
}

impl Default for TransactionForm {
    fn default() -> Self {
        Self::new(TransactionType::Incoming, "")
    }
}

fn parse_quantity(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|q| *q > 0)
}

fn validate_quantity(raw: &str) -> Result<(), ValidationError> {
    parse_quantity(raw)
        .map(|_| ())
        .ok_or_else(|| invalid("quantity", "Quantity must be a whole number greater than zero"))
}

impl TransactionForm {
    /// Form dated now.
    pub fn new(kind: TransactionType, quantity: impl Into<String>) -> Self {
        Self {
            kind,
            quantity: quantity.into(),
            date: Utc::now(),
        }
    }

    pub fn quantity(&self) -> Result<i64, ServiceError> {
        self.check()?;
        parse_quantity(&self.quantity)
            .ok_or_else(|| ServiceError::ValidationError("Invalid quantity".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("5", Some(5))]
    #[case(" 12 ", Some(12))]
    #[case("0", None)]
    #[case("-3", None)]
    #[case("2.5", None)]
    #[case("", None)]
    fn quantity_parsing(#[case] raw: &str, #[case] expected: Option<i64>) {
        let form = TransactionForm::new(TransactionType::Outgoing, raw);
        assert_eq!(form.quantity().ok(), expected);
        assert_eq!(form.is_valid(), expected.is_some());
    }
}
