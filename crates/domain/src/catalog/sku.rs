//! SKU reservations.
//!
//! Every SKU in use is held by one claim document whose unique key is the
//! SKU itself, so the store refuses a second product claiming it even when
//! two writers race. A product's claims are written in the same batch as
//! the product.

use common::{DocumentId, ProductId};
use serde::{Deserialize, Serialize};

use crate::repository::Entity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuClaim {
    pub id: DocumentId,
    pub sku: String,
    /// Holder of the SKU; `None` once released.
    pub product: Option<ProductId>,
}

impl Entity for SkuClaim {
    const COLLECTION: &'static str = "skus";

    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        self.product.map(|_| self.sku.clone())
    }
}

impl SkuClaim {
    pub fn new(sku: &str, product: ProductId) -> Self {
        Self {
            id: DocumentId::new(),
            sku: sku.to_string(),
            product: Some(product),
        }
    }

    /// Frees the SKU for other products.
    pub fn release(&mut self) {
        self.product = None;
    }
}
