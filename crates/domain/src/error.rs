//! Domain error types.

use common::{OrderId, ProductId, UserId};
use document_store::StoreError;
use thiserror::Error;

use crate::validation::FieldError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input failed shape validation before any business rule ran.
    #[error("Validation failed: {}", format_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// The product does not exist or is no longer sold.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The user does not exist.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The user does not exist or is not a rider.
    #[error("Rider not found: {0}")]
    RiderNotFound(UserId),

    /// No variant of the product matches the requested color and size.
    #[error("Invalid variant selected: {color}/{size} for product {product_id}")]
    InvalidVariant {
        product_id: ProductId,
        color: String,
        size: String,
    },

    /// The variant has fewer units than requested.
    #[error(
        "Insufficient stock for {color}/{size} of product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        color: String,
        size: String,
        requested: u32,
        available: u32,
    },

    /// A rider acted on an order that is not assigned to them.
    #[error("Order {order_id} is not assigned to rider {rider_id}")]
    NotAssigned { order_id: OrderId, rider_id: UserId },

    /// The actor's role or ownership does not allow the operation.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// The write clashes with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown email or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The account exists but has not been approved by an admin.
    #[error("Your account is pending approval")]
    NotApproved,

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// An error occurred in the document store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Shorthand for a validation failure on a single field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(vec![FieldError::new(field, message)])
    }

    /// Returns a short machine-friendly label, used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation",
            DomainError::ProductNotFound(_) => "product_not_found",
            DomainError::OrderNotFound(_) => "order_not_found",
            DomainError::UserNotFound(_) => "user_not_found",
            DomainError::RiderNotFound(_) => "rider_not_found",
            DomainError::InvalidVariant { .. } => "invalid_variant",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::NotAssigned { .. } => "not_assigned",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::Conflict(_) => "conflict",
            DomainError::InvalidCredentials => "invalid_credentials",
            DomainError::NotApproved => "not_approved",
            DomainError::PasswordHash(_) => "password_hash",
            DomainError::Store(StoreError::VersionConflict { .. }) => "version_conflict",
            DomainError::Store(_) => "store",
            DomainError::Serialization(_) => "serialization",
        }
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;
