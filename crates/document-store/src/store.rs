use std::collections::HashSet;

use async_trait::async_trait;

use crate::{Document, DocumentId, DocumentQuery, Result, StoreError, Version};

/// A single write inside a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Inserts a new document. Fails if the ID or unique key is taken.
    Insert(Document),

    /// Replaces body and unique key of an existing document, provided it is
    /// still at `expected_version`.
    Replace {
        document: Document,
        expected_version: Version,
    },
}

impl WriteOp {
    /// Returns the document this operation writes.
    pub fn document(&self) -> &Document {
        match self {
            WriteOp::Insert(document) => document,
            WriteOp::Replace { document, .. } => document,
        }
    }
}

/// A list of writes applied atomically: either all succeed or none do.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an insert.
    pub fn insert(mut self, document: Document) -> Self {
        self.ops.push(WriteOp::Insert(document));
        self
    }

    /// Adds a replacement conditional on the document's current version.
    ///
    /// The expected version is taken from `document.version`, i.e. the
    /// version that was read.
    pub fn replace(mut self, document: Document) -> Self {
        let expected_version = document.version;
        self.ops.push(WriteOp::Replace {
            document,
            expected_version,
        });
        self
    }

    /// Returns the operations in order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Consumes the batch, returning its operations.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Returns the number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if the batch has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Core trait for document store implementations.
///
/// All implementations must be thread-safe (Send + Sync). Individual
/// reads see committed state only.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Applies a batch atomically.
    ///
    /// Returns the documents as stored, in batch order, with their new
    /// versions and timestamps.
    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Document>>;

    /// Retrieves a document by ID within a collection.
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>>;

    /// Retrieves the document holding `key` as its unique key.
    async fn get_by_unique_key(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Retrieves documents matching a query.
    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>>;

    /// Counts documents matching a query, ignoring limit and offset.
    async fn count(&self, query: DocumentQuery) -> Result<u64>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Inserts a single document.
    async fn insert(&self, document: Document) -> Result<Document> {
        let mut written = self.commit(WriteBatch::new().insert(document)).await?;
        written
            .pop()
            .ok_or_else(|| StoreError::InvalidBatch("commit returned no documents".to_string()))
    }

    /// Replaces a single document, conditional on the version it was read at.
    async fn replace(&self, document: Document) -> Result<Document> {
        let mut written = self.commit(WriteBatch::new().replace(document)).await?;
        written
            .pop()
            .ok_or_else(|| StoreError::InvalidBatch("commit returned no documents".to_string()))
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

/// Validates a batch before applying it.
///
/// A batch must be non-empty and must not touch the same document twice.
pub fn validate_batch(batch: &WriteBatch) -> Result<()> {
    if batch.is_empty() {
        return Err(StoreError::InvalidBatch(
            "Cannot commit an empty batch".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for op in batch.ops() {
        let document = op.document();
        if document.collection.is_empty() {
            return Err(StoreError::InvalidBatch(format!(
                "Document {} has no collection",
                document.id
            )));
        }
        if !seen.insert(document.id) {
            return Err(StoreError::InvalidBatch(format!(
                "Document {} appears more than once in the batch",
                document.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(collection: &str) -> Document {
        Document::builder(collection, DocumentId::new()).build()
    }

    #[test]
    fn empty_batch_is_rejected() {
        let result = validate_batch(&WriteBatch::new());
        assert!(matches!(result, Err(StoreError::InvalidBatch(_))));
    }

    #[test]
    fn duplicate_document_in_batch_is_rejected() {
        let document = doc("orders");
        let batch = WriteBatch::new()
            .insert(document.clone())
            .replace(document);
        assert!(matches!(
            validate_batch(&batch),
            Err(StoreError::InvalidBatch(_))
        ));
    }

    #[test]
    fn replace_expects_read_version() {
        let mut document = doc("products");
        document.version = Version::new(7);
        let batch = WriteBatch::new().replace(document);

        match &batch.ops()[0] {
            WriteOp::Replace {
                expected_version, ..
            } => assert_eq!(*expected_version, Version::new(7)),
            WriteOp::Insert(_) => panic!("expected replace"),
        }
    }

    #[test]
    fn mixed_batch_is_valid() {
        let batch = WriteBatch::new().insert(doc("orders")).replace(doc("products"));
        assert_eq!(batch.len(), 2);
        assert!(validate_batch(&batch).is_ok());
    }
}
