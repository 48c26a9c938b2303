//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::ProductId;
use document_store::DocumentStore;
use domain::catalog::{NewProduct, ProductPatch};
use domain::{Category, Money, Product, ProductFilter};
use serde::Deserialize;

use crate::auth::{AuthUser, RequireAdmin};
use crate::error::{ApiError, parse_id};
use crate::state::AppState;

/// Listing query; prices are in cents.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<Category>,
    pub brand: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl From<ListQuery> for ProductFilter {
    fn from(q: ListQuery) -> Self {
        ProductFilter {
            category: q.category,
            brand: q.brand,
            min_price: q.min_price.map(Money::from_cents),
            max_price: q.max_price.map(Money::from_cents),
            color: q.color,
            size: q.size,
        }
    }
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

/// GET /api/products
#[tracing::instrument(skip(state))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state.catalog.list_products(&query.into()).await?;
    Ok(Json(products))
}

/// GET /api/products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    Ok(Json(state.catalog.get_product(product_id).await?))
}

/// POST /api/products
#[tracing::instrument(skip(state, _admin, input))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id}: partial update.
#[tracing::instrument(skip(state, _admin, patch))]
pub async fn update<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    Ok(Json(state.catalog.update_product(product_id, patch).await?))
}

/// DELETE /api/products/{id}: soft delete.
#[tracing::instrument(skip(state, _admin))]
pub async fn delete<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    state.catalog.delete_product(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/products/{id}/reviews
#[tracing::instrument(skip(state, user, req), fields(user = %user.id))]
pub async fn add_review<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = state
        .catalog
        .add_review(product_id, user.id, req.rating, req.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}
