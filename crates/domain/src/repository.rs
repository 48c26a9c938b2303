//! Typed access to the document store.
//!
//! Entities serialize to JSON document bodies in their own collection. A
//! loaded entity keeps the version it was read at, so saving it back is a
//! conditional replacement that fails if someone else wrote in between.

use std::ops::{Deref, DerefMut};

use common::DocumentId;
use document_store::{Document, DocumentQuery, DocumentStore, DocumentStoreExt, WriteBatch};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;

/// A domain type persisted as a document.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Collection holding documents of this type.
    const COLLECTION: &'static str;

    /// Identity of the backing document.
    fn document_id(&self) -> DocumentId;

    /// Key that must be unique within the collection, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }

    /// Builds the document for a first insert.
    fn to_new_document(&self) -> Result<Document> {
        let mut builder = Document::builder(Self::COLLECTION, self.document_id()).body(self)?;
        if let Some(key) = self.unique_key() {
            builder = builder.unique_key(key);
        }
        Ok(builder.build())
    }
}

/// An entity together with the document it was loaded from.
#[derive(Debug, Clone)]
pub struct Stored<T> {
    value: T,
    document: Document,
}

impl<T: Entity> Stored<T> {
    /// Decodes an entity from its document.
    pub fn from_document(document: Document) -> Result<Self> {
        Ok(Self {
            value: document.decode()?,
            document,
        })
    }

    /// Returns the entity, dropping storage metadata.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Builds the conditional replacement carrying the current value.
    pub fn to_replacement(&self) -> Result<Document> {
        let mut document = self.document.with_body(&self.value)?;
        document.unique_key = self.value.unique_key();
        Ok(document)
    }
}

impl<T> Deref for Stored<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> DerefMut for Stored<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

/// Typed repository over a document store.
#[derive(Debug, Clone)]
pub struct Repository<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> Repository<S> {
    /// Creates a repository over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads an entity by ID.
    pub async fn get<T: Entity>(&self, id: impl Into<DocumentId>) -> Result<Option<Stored<T>>> {
        self.store
            .get(T::COLLECTION, id.into())
            .await?
            .map(Stored::from_document)
            .transpose()
    }

    /// Loads the entity holding `key` as its unique key.
    pub async fn get_by_unique_key<T: Entity>(&self, key: &str) -> Result<Option<Stored<T>>> {
        self.store
            .get_by_unique_key(T::COLLECTION, key)
            .await?
            .map(Stored::from_document)
            .transpose()
    }

    /// Loads all entities whose body contains `filter`.
    pub async fn find<T: Entity>(&self, query: DocumentQuery) -> Result<Vec<Stored<T>>> {
        debug_assert_eq!(query.collection, T::COLLECTION);
        self.store
            .find(query)
            .await?
            .into_iter()
            .map(Stored::from_document)
            .collect()
    }

    /// Inserts a new entity.
    pub async fn insert<T: Entity>(&self, value: T) -> Result<Stored<T>> {
        let document = self.store.insert(value.to_new_document()?).await?;
        Ok(Stored { value, document })
    }

    /// Writes a modified entity back, conditional on the version it was read at.
    pub async fn save<T: Entity>(&self, stored: Stored<T>) -> Result<Stored<T>> {
        let document = self.store.replace(stored.to_replacement()?).await?;
        Ok(Stored {
            value: stored.value,
            document,
        })
    }

    /// Applies a batch atomically.
    pub async fn commit(&self, batch: WriteBatch) -> Result<Vec<Document>> {
        Ok(self.store.commit(batch).await?)
    }
}

/// Starts a query over the collection of `T`.
pub fn query_for<T: Entity>() -> DocumentQuery {
    DocumentQuery::collection(T::COLLECTION)
}
