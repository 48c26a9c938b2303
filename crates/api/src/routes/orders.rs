//! Order placement, history and fulfilment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use document_store::DocumentStore;
use domain::order::{ChangeStatus, DeliveryReport, LineRequest, ShippingAddress};
use domain::validation::CardDetails;
use domain::{Order, PaymentMethod, PlaceOrder};
use serde::Deserialize;

use crate::auth::{AuthUser, RequireAdmin, RequireCustomer, RequireRider};
use crate::error::{ApiError, parse_id};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<LineRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    /// Validated, never stored.
    #[serde(default)]
    pub card_details: Option<CardDetails>,
}

// -- Handlers --

/// POST /api/orders: places an order for the calling customer.
#[tracing::instrument(skip(state, customer, req), fields(customer = %customer.id))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireCustomer(customer): RequireCustomer,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let mut cmd = PlaceOrder::new(
        customer.id,
        req.items,
        req.shipping_address,
        req.payment_method,
    );
    if let Some(card) = req.card_details {
        cmd = cmd.with_card(card);
    }

    let order = state.orders.place_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders: every order, newest first.
#[tracing::instrument(skip(state, _admin))]
pub async fn list_all<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_all().await?))
}

/// GET /api/orders/my-orders
#[tracing::instrument(skip(state, customer), fields(customer = %customer.id))]
pub async fn my_orders<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireCustomer(customer): RequireCustomer,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_for_customer(customer.id).await?))
}

/// GET /api/orders/rider: orders assigned to the calling rider.
#[tracing::instrument(skip(state, rider), fields(rider = %rider.id))]
pub async fn rider_orders<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireRider(rider): RequireRider,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_for_rider(rider.id).await?))
}

/// GET /api/orders/{id}
#[tracing::instrument(skip(state, user), fields(user = %user.id))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.orders.get_order(&user.actor(), order_id).await?))
}

/// PATCH /api/orders/{id}/status: admin status change or rider assignment.
#[tracing::instrument(skip(state, admin), fields(admin = %admin.id))]
pub async fn change_status<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(change): Json<ChangeStatus>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state
        .orders
        .change_status(&admin.actor(), order_id, change)
        .await?;
    Ok(Json(order))
}

/// PATCH /api/orders/{id}/delivery: outcome reported by the assigned rider.
#[tracing::instrument(skip(state, rider), fields(rider = %rider.id))]
pub async fn report_delivery<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireRider(rider): RequireRider,
    Path(id): Path<String>,
    Json(report): Json<DeliveryReport>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state
        .orders
        .report_delivery(&rider.actor(), order_id, report)
        .await?;
    Ok(Json(order))
}
