//! Product catalog.

mod product;
mod service;
mod sku;

pub use product::{
    Category, NewProduct, Product, ProductFilter, ProductPatch, Review, Variant, average_rating,
};
pub use service::CatalogService;
pub use sku::SkuClaim;

#[cfg(test)]
pub(crate) use product::fixtures;
