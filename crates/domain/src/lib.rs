//! Domain layer for the storefront.
//!
//! This crate provides:
//! - Field validators for checkout, payment and registration forms
//! - The product catalog with variants, stock and review ratings
//! - User accounts with an approval gate
//! - Orders: creation with atomic stock reservation, status history, delivery
//! - Rider roster and workload ranking
//!
//! Services run against any [`document_store::DocumentStore`].

pub mod catalog;
pub mod error;
pub mod money;
pub mod order;
pub mod repository;
pub mod rider;
pub mod user;
pub mod validation;

pub use catalog::{CatalogService, Category, Product, ProductFilter, Variant};
pub use error::{DomainError, Result};
pub use money::Money;
pub use order::{Order, OrderService, OrderStatus, PaymentMethod, PlaceOrder};
pub use repository::{Entity, Repository, Stored};
pub use rider::{RiderLoad, RiderService, RiderStats};
pub use user::{AccountService, Actor, PasswordHasher, Role, User};
