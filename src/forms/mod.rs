//! Input forms and their validation rules.
//!
//! Every form keeps raw text the way it was typed and is revalidated as a
//! whole on each check. The first failing rule, in the form's field order,
//! is the message shown to the user.

use std::borrow::Cow;

use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::ServiceError;

pub mod auth;
pub mod product;
pub mod supplier;
pub mod transaction;

pub use auth::{ChangePasswordForm, LoginForm, RegistrationForm};
pub use product::{ProductDraft, ProductForm};
pub use supplier::SupplierForm;
pub use transaction::TransactionForm;

/// Key validator uses for struct-level checks.
const SCHEMA_KEY: &str = "__all__";

/// Validation with a stable message order.
pub trait FormState: Validate {
    /// Field names in the order the form presents them.
    const FIELDS: &'static [&'static str];

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn check(&self) -> Result<(), ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(first_message_in(&e, Self::FIELDS)))
    }
}

fn describe(field: &str, error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("{} is invalid ({})", field, error.code),
    }
}

/// First message following `order`, then any remaining fields by name, with
/// struct-level errors last.
pub fn first_message_in(errors: &ValidationErrors, order: &[&str]) -> String {
    let field_errors = errors.field_errors();
    let mut remaining: Vec<&str> = field_errors
        .keys()
        .copied()
        .filter(|field| !order.contains(field) && *field != SCHEMA_KEY)
        .collect();
    remaining.sort_unstable();

    order
        .iter()
        .copied()
        .chain(remaining)
        .chain(std::iter::once(SCHEMA_KEY))
        .find_map(|field| {
            field_errors
                .get(field)
                .and_then(|list| list.first())
                .map(|error| describe(field, error))
        })
        .unwrap_or_else(|| "Invalid input".to_string())
}

pub fn first_message(errors: &ValidationErrors) -> String {
    first_message_in(errors, &[])
}

/// Builds a validation error carrying a display message.
pub(crate) fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_decides_which_message_wins() {
        let mut errors = ValidationErrors::new();
        errors.add("stock", invalid("stock", "Stock is wrong"));
        errors.add("name", invalid("name", "Name is wrong"));
        errors.add(SCHEMA_KEY, invalid("schema", "Whole form is wrong"));

        assert_eq!(first_message_in(&errors, &["stock", "name"]), "Stock is wrong");
        assert_eq!(first_message(&errors), "Name is wrong");
    }

    #[test]
    fn missing_message_names_the_field() {
        let mut errors = ValidationErrors::new();
        errors.add("price", ValidationError::new("range"));
        assert_eq!(first_message(&errors), "price is invalid (range)");
    }
}
