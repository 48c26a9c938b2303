//! Registration, login and account approval.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::UserId;
use document_store::DocumentStore;
use domain::user::UserProfile;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthUser, RequireAdmin};
use crate::error::{ApiError, parse_id};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ApprovalRequest {
    pub is_approved: bool,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// POST /api/auth/register: creates an account awaiting admin approval.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn register<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user = state
        .accounts
        .register(&req.email, &req.password, &req.name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful. Please wait for admin approval.",
            user: user.profile(),
        }),
    ))
}

/// POST /api/auth/login: exchanges credentials for a bearer token.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn login<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.accounts.login(&req.email, &req.password).await?;
    let token = state.tokens.issue(&user)?;
    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: user.profile(),
    }))
}

/// GET /api/auth/me
pub async fn me(AuthUser(user): AuthUser) -> Json<UserProfile> {
    Json(user.profile())
}

/// PATCH /api/auth/users/{id}/approval
#[tracing::instrument(skip(state, admin, req), fields(admin = %admin.id))]
pub async fn set_approval<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(req): Json<ApprovalRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let user_id: UserId = parse_id(&id, "user")?;
    let user = state
        .accounts
        .set_approval(user_id, req.is_approved)
        .await?;
    Ok(Json(user.profile()))
}
