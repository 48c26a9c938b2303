//! Identifier types shared by the storage, domain and HTTP layers.

mod types;

pub use types::{DocumentId, OrderId, ProductId, UserId};
