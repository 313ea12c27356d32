use chrono::Utc;
use validator::Validate;

use super::FormState;
use crate::errors::ServiceError;
use crate::location::{self, Coordinates, LocationProvider};
use crate::models::Supplier;

#[derive(Debug, Clone, Default, Validate)]
pub struct SupplierForm {
    #[validate(length(min = 1, message = "Supplier name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "Contact is required"))]
    pub contact: String,
    pub coordinates: Option<Coordinates>,
}

impl FormState for SupplierForm {
    const FIELDS: &'static [&'static str] = &["name", "address", "contact"];
}

impl SupplierForm {
    /// Fills the coordinates from the device location.
    pub async fn capture_location(&mut self, provider: &dyn LocationProvider) -> Result<Coordinates, ServiceError> {
        let coordinates = location::locate(provider).await?;
        self.coordinates = Some(coordinates);
        Ok(coordinates)
    }

    /// Supplier record under `id`; missing coordinates are stored as 0, 0.
    pub fn to_supplier(&self, id: impl Into<String>) -> Result<Supplier, ServiceError> {
        self.check()?;
        let coordinates = self.coordinates.unwrap_or(Coordinates::new(0.0, 0.0));
        Ok(Supplier {
            id: id.into(),
            name: self.name.clone(),
            address: self.address.clone(),
            contact: self.contact.clone(),
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            created_at: Some(Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::FixedLocationProvider;

    fn form() -> SupplierForm {
        SupplierForm {
            name: "Acme".into(),
            address: "Jl. Merdeka 1".into(),
            contact: "0812".into(),
            coordinates: None,
        }
    }

    #[test]
    fn all_text_fields_are_required() {
        assert!(form().is_valid());
        let mut f = form();
        f.contact.clear();
        assert_eq!(
            f.check().unwrap_err().to_string(),
            "Validation error: Contact is required"
        );
    }

    #[tokio::test]
    async fn captured_location_is_stored() {
        let provider = FixedLocationProvider::granted(Coordinates::new(1.5, 2.5));
        let mut f = form();
        f.capture_location(&provider).await.unwrap();
        let supplier = f.to_supplier("s1").unwrap();
        assert_eq!((supplier.latitude, supplier.longitude), (1.5, 2.5));
        assert!(supplier.created_at.is_some());
    }

    #[test]
    fn missing_location_defaults_to_origin() {
        let supplier = form().to_supplier("s1").unwrap();
        assert_eq!((supplier.latitude, supplier.longitude), (0.0, 0.0));
    }
}
