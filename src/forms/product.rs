use validator::{Validate, ValidationError};

use super::{invalid, FormState};
use crate::errors::ServiceError;
use crate::models::{InventoryItem, LocalInventoryItem, Supplier};

/// Product being added or edited.
///
/// Price and stock stay as typed text until the form is checked.
#[derive(Debug, Clone, Default, Validate)]
pub struct ProductForm {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    pub category: String,
    pub description: String,
    #[validate(custom = "validate_price")]
    pub price: String,
    #[validate(custom = "validate_stock")]
    pub stock: String,
    pub supplier: Option<Supplier>,
    /// Newly picked images, uploaded on save.
    pub new_images: Vec<Vec<u8>>,
    /// Images already stored for the product being edited.
    pub existing_image_urls: Vec<String>,
}

impl FormState for ProductForm {
    const FIELDS: &'static [&'static str] = &["name", "price", "stock"];
}

/// Parsed product fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub category: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price > 0.0)
}

fn parse_stock(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|stock| *stock >= 0)
}

fn validate_price(raw: &str) -> Result<(), ValidationError> {
    parse_price(raw)
        .map(|_| ())
        .ok_or_else(|| invalid("price", "Price must be a number greater than zero"))
}

fn validate_stock(raw: &str) -> Result<(), ValidationError> {
    parse_stock(raw)
        .map(|_| ())
        .ok_or_else(|| invalid("stock", "Stock must be a whole number of zero or more"))
}

impl ProductForm {
    /// Form prefilled from a stored product.
    pub fn from_item(item: &InventoryItem, supplier: Option<Supplier>) -> Self {
        Self {
            name: item.name.clone(),
            category: item.category.clone(),
            description: item.description.clone(),
            price: item.price.to_string(),
            stock: item.stock.to_string(),
            supplier,
            new_images: Vec::new(),
            existing_image_urls: item.image_urls.clone(),
        }
    }

    /// Form prefilled from an on-device item.
    pub fn from_local(item: &LocalInventoryItem) -> Self {
        Self {
            name: item.name.clone(),
            category: item.category.clone(),
            description: item.description.clone(),
            price: item.price.to_string(),
            stock: item.stock.to_string(),
            new_images: item.image_data.iter().cloned().collect(),
            ..Self::default()
        }
    }

    pub fn draft(&self) -> Result<ProductDraft, ServiceError> {
        self.check()?;
        // both parse after a successful check
        let price = parse_price(&self.price)
            .ok_or_else(|| ServiceError::ValidationError("Invalid price".into()))?;
        let stock = parse_stock(&self.stock)
            .ok_or_else(|| ServiceError::ValidationError("Invalid stock".into()))?;
        Ok(ProductDraft {
            name: self.name.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            price,
            stock,
        })
    }

    /// New on-device item; the first picked image becomes its picture.
    pub fn to_local_item(&self) -> Result<LocalInventoryItem, ServiceError> {
        let draft = self.draft()?;
        let mut item = LocalInventoryItem::new(
            draft.name,
            draft.description,
            draft.price,
            draft.category,
            draft.stock,
        );
        item.image_data = self.new_images.first().cloned();
        Ok(item)
    }

    /// Applies the form to an existing on-device item, keeping its id.
    pub fn apply_to_local(&self, item: &LocalInventoryItem) -> Result<LocalInventoryItem, ServiceError> {
        let draft = self.draft()?;
        Ok(LocalInventoryItem {
            id: item.id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            category: draft.category,
            stock: draft.stock,
            image_data: self.new_images.first().cloned().or_else(|| item.image_data.clone()),
        })
    }

    pub fn remove_existing_image(&mut self, url: &str) -> bool {
        let before = self.existing_image_urls.len();
        self.existing_image_urls.retain(|existing| existing != url);
        before != self.existing_image_urls.len()
    }

    pub fn remove_new_image(&mut self, index: usize) -> Option<Vec<u8>> {
        (index < self.new_images.len()).then(|| self.new_images.remove(index))
    }

    pub fn has_images(&self) -> bool {
        !self.new_images.is_empty() || !self.existing_image_urls.is_empty()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn form(name: &str, price: &str, stock: &str) -> ProductForm {
        ProductForm {
            name: name.into(),
            price: price.into(),
            stock: stock.into(),
            ..ProductForm::default()
        }
    }

    #[rstest]
    #[case("Pen", "2.5", "10", true)]
    #[case("Pen", "2.5", "0", true)]
    #[case("Pen", " 3 ", "4", true)]
    #[case("", "2.5", "10", false)]
    #[case("Pen", "0", "10", false)]
    #[case("Pen", "-1", "10", false)]
    #[case("Pen", "abc", "10", false)]
    #[case("Pen", "NaN", "10", false)]
    #[case("Pen", "2.5", "-1", false)]
    #[case("Pen", "2.5", "1.5", false)]
    #[case("Pen", "2.5", "", false)]
    fn validity(#[case] name: &str, #[case] price: &str, #[case] stock: &str, #[case] valid: bool) {
        assert_eq!(form(name, price, stock).is_valid(), valid);
    }

    #[test]
    fn first_failing_field_gives_the_message() {
        let err = form("", "x", "y").check().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Product name is required");

        let err = form("Pen", "2", "y").check().unwrap_err();
        assert!(err.to_string().contains("Stock must be"));
    }

    #[test]
    fn local_item_takes_first_image() {
        let mut f = form("Pen", "2.5", "3");
        f.new_images = vec![vec![1], vec![2]];
        let item = f.to_local_item().unwrap();
        assert_eq!(item.image_data, Some(vec![1]));
        assert_eq!(item.stock, 3);

        let mut edit = ProductForm::from_local(&item);
        edit.name = "Marker".into();
        edit.new_images.clear();
        let updated = edit.apply_to_local(&item).unwrap();
        assert_eq!(updated.id, item.id);
        assert_eq!(updated.name, "Marker");
        assert_eq!(updated.image_data, Some(vec![1]));
    }

    #[test]
    fn image_lists_can_be_edited() {
        let mut f = form("Pen", "1", "1");
        f.existing_image_urls = vec!["a".into(), "b".into()];
        f.new_images = vec![vec![9]];
        assert!(f.remove_existing_image("a"));
        assert!(!f.remove_existing_image("zzz"));
        assert_eq!(f.remove_new_image(3), None);
        assert_eq!(f.remove_new_image(0), Some(vec![9]));
        assert!(f.has_images());
        f.reset();
        assert!(!f.has_images());
    }
}
