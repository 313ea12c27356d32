use std::sync::Arc;

use serde::Serialize;

use crate::auth::SessionContext;
use crate::errors::ServiceError;
use crate::models::{InventoryItem, Supplier};
use crate::store::{DocumentStore, FromDocument};

/// Counts shown on the home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub products: usize,
    pub suppliers: usize,
}

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn DocumentStore>,
    session: SessionContext,
}

impl DashboardService {
    pub fn new(store: Arc<dyn DocumentStore>, session: SessionContext) -> Self {
        Self { store, session }
    }

    pub async fn summary(&self) -> Result<DashboardSummary, ServiceError> {
        self.session.require_user_id()?;
        let (products, suppliers) = futures::try_join!(
            self.store.count(InventoryItem::COLLECTION),
            self.store.count(Supplier::COLLECTION),
        )?;
        Ok(DashboardSummary {
            products,
            suppliers,
        })
    }
}
