use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Document, DocumentId, DocumentQuery, Result, SortOrder, StoreError, Version,
    store::{DocumentStore, WriteBatch, WriteOp, validate_batch},
};

type KeySlot = (String, String);

#[derive(Debug, Clone)]
struct StoredDocument {
    document: Document,
    /// Insertion sequence, breaks ties between equal timestamps.
    seq: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<DocumentId, StoredDocument>,
    unique_keys: HashMap<KeySlot, DocumentId>,
    next_seq: u64,
}

impl MemoryState {
    /// Checks every operation against the current state without mutating it.
    fn check(&self, batch: &WriteBatch) -> Result<()> {
        let mut claimed: HashSet<KeySlot> = HashSet::new();
        let mut released: HashSet<KeySlot> = HashSet::new();

        for op in batch.ops() {
            let (document, previous_key) = match op {
                WriteOp::Insert(document) => {
                    if self.documents.contains_key(&document.id) {
                        return Err(StoreError::AlreadyExists(document.id));
                    }
                    (document, None)
                }
                WriteOp::Replace {
                    document,
                    expected_version,
                } => {
                    let current = self
                        .documents
                        .get(&document.id)
                        .filter(|stored| stored.document.collection == document.collection)
                        .ok_or_else(|| StoreError::NotFound {
                            collection: document.collection.clone(),
                            document_id: document.id,
                        })?;

                    if current.document.version != *expected_version {
                        return Err(StoreError::VersionConflict {
                            document_id: document.id,
                            expected: *expected_version,
                            actual: current.document.version,
                        });
                    }
                    (document, current.document.unique_key.clone())
                }
            };

            if previous_key == document.unique_key {
                continue;
            }
            if let Some(old) = previous_key {
                released.insert((document.collection.clone(), old));
            }
            if let Some(ref key) = document.unique_key {
                let slot = (document.collection.clone(), key.clone());
                let taken = self.unique_keys.contains_key(&slot) && !released.contains(&slot);
                if taken || !claimed.insert(slot) {
                    return Err(StoreError::DuplicateKey {
                        collection: document.collection.clone(),
                        key: key.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn apply(&mut self, batch: WriteBatch) -> Vec<Document> {
        let now = Utc::now();
        let mut written = Vec::with_capacity(batch.len());

        for op in batch.into_ops() {
            match op {
                WriteOp::Insert(mut document) => {
                    document.version = Version::first();
                    document.updated_at = document.created_at;
                    if let Some(ref key) = document.unique_key {
                        self.unique_keys
                            .insert((document.collection.clone(), key.clone()), document.id);
                    }
                    self.next_seq += 1;
                    self.documents.insert(
                        document.id,
                        StoredDocument {
                            document: document.clone(),
                            seq: self.next_seq,
                        },
                    );
                    written.push(document);
                }
                WriteOp::Replace { document, .. } => {
                    let Some(stored) = self.documents.get_mut(&document.id) else {
                        continue;
                    };
                    if let Some(ref old) = stored.document.unique_key {
                        self.unique_keys
                            .remove(&(stored.document.collection.clone(), old.clone()));
                    }
                    if let Some(ref key) = document.unique_key {
                        self.unique_keys
                            .insert((document.collection.clone(), key.clone()), document.id);
                    }
                    stored.document.body = document.body;
                    stored.document.unique_key = document.unique_key;
                    stored.document.version = stored.document.version.next();
                    stored.document.updated_at = now;
                    written.push(stored.document.clone());
                }
            }
        }

        written
    }
}

/// In-memory document store implementation.
///
/// Used for tests and for running the server without a database. A batch
/// holds the write lock from validation to the last write, so it is atomic
/// with respect to every other reader and writer.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of documents stored.
    pub async fn document_count(&self) -> usize {
        self.state.read().await.documents.len()
    }

    /// Removes every document.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.documents.clear();
        state.unique_keys.clear();
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Document>> {
        validate_batch(&batch)?;

        let mut state = self.state.write().await;
        if let Err(e) = state.check(&batch) {
            metrics::counter!("store_batches_total", "backend" => "memory", "outcome" => "rejected")
                .increment(1);
            tracing::debug!(error = %e, "write batch rejected");
            return Err(e);
        }

        let written = state.apply(batch);
        metrics::counter!("store_batches_total", "backend" => "memory", "outcome" => "committed")
            .increment(1);
        Ok(written)
    }

    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .get(&id)
            .filter(|stored| stored.document.collection == collection)
            .map(|stored| stored.document.clone()))
    }

    async fn get_by_unique_key(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let state = self.state.read().await;
        let slot = (collection.to_string(), key.to_string());
        Ok(state
            .unique_keys
            .get(&slot)
            .and_then(|id| state.documents.get(id))
            .map(|stored| stored.document.clone()))
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        let mut matches: Vec<&StoredDocument> = state
            .documents
            .values()
            .filter(|stored| stored.document.collection == query.collection)
            .filter(|stored| query.matches(&stored.document.body))
            .collect();

        matches.sort_by(|a, b| {
            a.document
                .created_at
                .cmp(&b.document.created_at)
                .then(a.seq.cmp(&b.seq))
        });
        if query.sort == SortOrder::Newest {
            matches.reverse();
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|stored| stored.document.clone())
            .collect())
    }

    async fn count(&self, query: DocumentQuery) -> Result<u64> {
        let state = self.state.read().await;
        let count = state
            .documents
            .values()
            .filter(|stored| stored.document.collection == query.collection)
            .filter(|stored| query.matches(&stored.document.body))
            .count();
        Ok(count as u64)
    }
}
