//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p document-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use document_store::{
    Document, DocumentId, DocumentQuery, DocumentStore, DocumentStoreExt, PostgresDocumentStore,
    StoreError, Version, WriteBatch,
};
use serde_json::json;
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            PostgresDocumentStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a cleared table
async fn get_test_store() -> PostgresDocumentStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE documents")
        .execute(&pool)
        .await
        .unwrap();

    PostgresDocumentStore::new(pool)
}

fn product(stock: u32) -> Document {
    Document::builder("products", DocumentId::new())
        .body_raw(json!({
            "name": "Console",
            "variants": [{"color": "black", "size": "standard", "stock": stock}]
        }))
        .build()
}

#[tokio::test]
#[serial]
async fn insert_and_get_roundtrip() {
    let store = get_test_store().await;
    let doc = product(5);

    let written = store.insert(doc.clone()).await.unwrap();
    assert_eq!(written.version, Version::first());

    let loaded = store.get("products", doc.id).await.unwrap().unwrap();
    assert_eq!(loaded.body, doc.body);
    assert!(store.get("orders", doc.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn replace_checks_version() {
    let store = get_test_store().await;
    let doc = store.insert(product(5)).await.unwrap();

    let updated = store
        .replace(doc.with_body(&json!({"name": "Console", "stock": 4})).unwrap())
        .await
        .unwrap();
    assert_eq!(updated.version, Version::new(2));

    let stale = store
        .replace(doc.with_body(&json!({"name": "Console", "stock": 3})).unwrap())
        .await;
    assert!(matches!(stale, Err(StoreError::VersionConflict { .. })));
}

#[tokio::test]
#[serial]
async fn replace_missing_document_is_not_found() {
    let store = get_test_store().await;
    let result = store.replace(product(1)).await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
#[serial]
async fn batch_rolls_back_on_conflict() {
    let store = get_test_store().await;
    let doc = store.insert(product(2)).await.unwrap();
    store
        .replace(doc.with_body(&json!({"stock": 1})).unwrap())
        .await
        .unwrap();

    let order = Document::builder("orders", DocumentId::new())
        .body_raw(json!({"status": "pending"}))
        .build();
    let batch = WriteBatch::new()
        .insert(order.clone())
        .replace(doc.with_body(&json!({"stock": 0})).unwrap());

    assert!(store.commit(batch).await.is_err());
    assert!(store.get("orders", order.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn unique_key_violation_is_duplicate_key() {
    let store = get_test_store().await;
    store
        .insert(
            Document::builder("users", DocumentId::new())
                .unique_key("a@example.com")
                .build(),
        )
        .await
        .unwrap();

    let result = store
        .insert(
            Document::builder("users", DocumentId::new())
                .unique_key("a@example.com")
                .build(),
        )
        .await;
    assert!(matches!(result, Err(StoreError::DuplicateKey { .. })));

    let found = store
        .get_by_unique_key("users", "a@example.com")
        .await
        .unwrap();
    assert!(found.is_some());
}

#[tokio::test]
#[serial]
async fn find_uses_containment_and_ordering() {
    let store = get_test_store().await;
    for (n, color) in ["black", "white", "black"].iter().enumerate() {
        store
            .insert(
                Document::builder("products", DocumentId::new())
                    .body_raw(json!({"n": n, "variants": [{"color": color}]}))
                    .build(),
            )
            .await
            .unwrap();
    }

    let query = DocumentQuery::collection("products")
        .filter(json!({"variants": [{"color": "black"}]}));
    let oldest = store.find(query.clone()).await.unwrap();
    assert_eq!(oldest.len(), 2);
    assert_eq!(oldest[0].body["n"], 0);

    let newest = store.find(query.clone().newest_first().limit(1)).await.unwrap();
    assert_eq!(newest.len(), 1);
    assert_eq!(newest[0].body["n"], 2);

    assert_eq!(store.count(query).await.unwrap(), 2);
}

#[tokio::test]
#[serial]
async fn migrations_are_idempotent() {
    let store = get_test_store().await;
    store.insert(product(1)).await.unwrap();

    store.run_migrations().await.unwrap();

    let count = store.count(DocumentQuery::collection("products")).await.unwrap();
    assert_eq!(count, 1);
}
