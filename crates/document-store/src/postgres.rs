use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Document, DocumentId, DocumentQuery, Result, SortOrder, StoreError, Version,
    store::{DocumentStore, WriteBatch, WriteOp, validate_batch},
};

const COLUMNS: &str = "id, collection, version, unique_key, body, created_at, updated_at";

/// PostgreSQL-backed document store.
///
/// Documents live in a single `documents` table with a JSONB body. A batch
/// runs in one transaction; replacements are `UPDATE … WHERE version = $n`
/// so a stale read rolls the whole batch back.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            id: DocumentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            collection: row.try_get("collection")?,
            version: Version::new(row.try_get("version")?),
            unique_key: row.try_get("unique_key")?,
            body: row.try_get("body")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn map_write_error(error: sqlx::Error, document: &Document) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = error {
            match db_err.constraint() {
                Some("documents_pkey") => return StoreError::AlreadyExists(document.id),
                Some("documents_collection_unique_key") => {
                    return StoreError::DuplicateKey {
                        collection: document.collection.clone(),
                        key: document.unique_key.clone().unwrap_or_default(),
                    };
                }
                _ => {}
            }
        }
        StoreError::Database(error)
    }

    async fn insert_in(tx: &mut Transaction<'_, Postgres>, document: &Document) -> Result<Document> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO documents (id, collection, version, unique_key, body, created_at, updated_at)
            VALUES ($1, $2, 1, $3, $4, $5, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(document.id.as_uuid())
        .bind(&document.collection)
        .bind(&document.unique_key)
        .bind(&document.body)
        .bind(document.created_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| Self::map_write_error(e, document))?;

        Self::row_to_document(row)
    }

    async fn replace_in(
        tx: &mut Transaction<'_, Postgres>,
        document: &Document,
        expected_version: Version,
    ) -> Result<Document> {
        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            UPDATE documents
            SET body = $1, unique_key = $2, version = version + 1, updated_at = $3
            WHERE id = $4 AND collection = $5 AND version = $6
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&document.body)
        .bind(&document.unique_key)
        .bind(Utc::now())
        .bind(document.id.as_uuid())
        .bind(&document.collection)
        .bind(expected_version.as_i64())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| Self::map_write_error(e, document))?;

        if let Some(row) = row {
            return Self::row_to_document(row);
        }

        // Nothing updated: tell a missing document apart from a stale one.
        let actual: Option<i64> =
            sqlx::query_scalar("SELECT version FROM documents WHERE id = $1 AND collection = $2")
                .bind(document.id.as_uuid())
                .bind(&document.collection)
                .fetch_optional(&mut **tx)
                .await?;

        Err(match actual {
            Some(actual) => StoreError::VersionConflict {
                document_id: document.id,
                expected: expected_version,
                actual: Version::new(actual),
            },
            None => StoreError::NotFound {
                collection: document.collection.clone(),
                document_id: document.id,
            },
        })
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Document>> {
        validate_batch(&batch)?;

        let mut tx = self.pool.begin().await?;
        let mut written = Vec::with_capacity(batch.len());

        for op in batch.ops() {
            let result = match op {
                WriteOp::Insert(document) => Self::insert_in(&mut tx, document).await,
                WriteOp::Replace {
                    document,
                    expected_version,
                } => Self::replace_in(&mut tx, document, *expected_version).await,
            };

            match result {
                Ok(document) => written.push(document),
                Err(e) => {
                    // Dropping the transaction rolls it back.
                    metrics::counter!("store_batches_total", "backend" => "postgres", "outcome" => "rejected")
                        .increment(1);
                    tracing::debug!(error = %e, "write batch rejected");
                    return Err(e);
                }
            }
        }

        tx.commit().await?;
        metrics::counter!("store_batches_total", "backend" => "postgres", "outcome" => "committed")
            .increment(1);
        Ok(written)
    }

    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM documents WHERE id = $1 AND collection = $2"
        ))
        .bind(id.as_uuid())
        .bind(collection)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn get_by_unique_key(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM documents WHERE collection = $1 AND unique_key = $2"
        ))
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let direction = match query.sort {
            SortOrder::Oldest => "ASC",
            SortOrder::Newest => "DESC",
        };
        let mut sql = format!(
            "SELECT {COLUMNS} FROM documents WHERE collection = $1 AND body @> $2 \
             ORDER BY created_at {direction}, seq {direction}"
        );
        let mut param_count = 2;

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql).bind(&query.collection).bind(&query.filter);
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn count(&self, query: DocumentQuery) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM documents WHERE collection = $1 AND body @> $2",
        )
        .bind(&query.collection)
        .bind(&query.filter)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}
