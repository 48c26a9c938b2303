//! Rider roster endpoints. All admin-only.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::UserId;
use document_store::DocumentStore;
use domain::rider::{NewRider, RiderPatch};
use domain::user::UserProfile;
use domain::{RiderLoad, RiderStats};

use crate::auth::RequireAdmin;
use crate::error::{ApiError, parse_id};
use crate::state::AppState;

/// GET /api/riders
#[tracing::instrument(skip(state, _admin))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let riders = state.riders.list_riders().await?;
    Ok(Json(riders.iter().map(|r| r.profile()).collect()))
}

/// POST /api/riders: riders are created approved.
#[tracing::instrument(skip(state, _admin, input), fields(email = %input.email))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<NewRider>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let rider = state.riders.create_rider(input).await?;
    Ok((StatusCode::CREATED, Json(rider.profile())))
}

/// PUT /api/riders/{id}
#[tracing::instrument(skip(state, _admin, patch))]
pub async fn update<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    Json(patch): Json<RiderPatch>,
) -> Result<Json<UserProfile>, ApiError> {
    let rider_id: UserId = parse_id(&id, "rider")?;
    let rider = state.riders.update_rider(rider_id, patch).await?;
    Ok(Json(rider.profile()))
}

/// GET /api/riders/available: approved riders, lightest workload first.
#[tracing::instrument(skip(state, _admin))]
pub async fn available<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<RiderLoad>>, ApiError> {
    Ok(Json(state.riders.available_riders().await?))
}

/// GET /api/riders/{id}/stats
#[tracing::instrument(skip(state, _admin))]
pub async fn stats<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<RiderStats>, ApiError> {
    let rider_id: UserId = parse_id(&id, "rider")?;
    Ok(Json(state.riders.rider_stats(rider_id).await?))
}
