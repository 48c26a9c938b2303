use thiserror::Error;

use crate::{DocumentId, Version};

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional replacement found the document at a different version.
    #[error(
        "Version conflict for document {document_id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        document_id: DocumentId,
        expected: Version,
        actual: Version,
    },

    /// The document was not found in the given collection.
    #[error("Document not found: {collection}/{document_id}")]
    NotFound {
        collection: String,
        document_id: DocumentId,
    },

    /// A document with this ID already exists.
    #[error("Document already exists: {0}")]
    AlreadyExists(DocumentId),

    /// Another document in the collection already holds this unique key.
    #[error("Duplicate key in {collection}: {key}")]
    DuplicateKey { collection: String, key: String },

    /// The write batch is malformed.
    #[error("Invalid write batch: {0}")]
    InvalidBatch(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
