//! Bearer tokens, password hashing and role extractors.
//!
//! Handlers declare what they need by taking one of the extractors:
//!
//! ```rust,ignore
//! async fn approve(RequireAdmin(admin): RequireAdmin, ...) -> Result<..., ApiError>
//! ```
//!
//! Every extractor re-loads the user behind the token, so revoking approval
//! takes effect on the next request rather than when the token expires.

use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use common::UserId;
use document_store::DocumentStore;
use domain::{DomainError, PasswordHasher, Role, User};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::MAX_TOKEN_TTL_HOURS;
use crate::error::ApiError;
use crate::state::AppState;

/// Argon2id with the crate's default parameters, stored as a PHC string.
#[derive(Debug, Default, Clone)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> domain::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::PasswordHash(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    /// `ttl_hours` is clamped to `1..=MAX_TOKEN_TTL_HOURS`.
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS)),
        }
    }

    /// Issues a token for `user` valid from now.
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        self.issue_claims(&Claims {
            sub: user.id.to_string(),
            role: user.role,
            iat: now,
            exp: now + self.ttl.num_seconds(),
        })
    }

    pub fn issue_claims(&self, claims: &Claims) -> Result<String, ApiError> {
        encode(&Header::default(), claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected bearer token");
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

/// Raw token from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ApiError::Unauthorized("Expected 'Bearer <token>' authorization".to_string())
            })?;

        Ok(Self(token.to_string()))
    }
}

/// Any approved, authenticated user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl<S> FromRequestParts<Arc<AppState<S>>> for AuthUser
where
    S: DocumentStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let claims = state.tokens.verify(&token)?;
        let user_id: UserId = claims
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))?;

        match state.accounts.authenticate(user_id).await {
            Ok(user) => Ok(Self(user)),
            Err(DomainError::UserNotFound(_)) => {
                metrics::counter!("auth_rejections_total", "reason" => "unknown_user")
                    .increment(1);
                Err(ApiError::Unauthorized("User no longer exists".to_string()))
            }
            Err(DomainError::NotApproved) => {
                metrics::counter!("auth_rejections_total", "reason" => "not_approved")
                    .increment(1);
                Err(ApiError::Forbidden(
                    "Your account is pending approval".to_string(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn require_role<S>(
    parts: &mut Parts,
    state: &Arc<AppState<S>>,
    role: Role,
) -> Result<User, ApiError>
where
    S: DocumentStore + Clone + 'static,
{
    let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
    if user.role != role {
        return Err(ApiError::Forbidden(format!("{role} access required")));
    }
    Ok(user)
}

/// An approved admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub User);

impl<S> FromRequestParts<Arc<AppState<S>>> for RequireAdmin
where
    S: DocumentStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Admin).await.map(Self)
    }
}

/// An approved rider.
#[derive(Debug, Clone)]
pub struct RequireRider(pub User);

impl<S> FromRequestParts<Arc<AppState<S>>> for RequireRider
where
    S: DocumentStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Rider).await.map(Self)
    }
}

/// An approved customer.
#[derive(Debug, Clone)]
pub struct RequireCustomer(pub User);

impl<S> FromRequestParts<Arc<AppState<S>>> for RequireCustomer
where
    S: DocumentStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Customer).await.map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_round_trip() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("secret1").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("secret1", &hash));
        assert!(!hasher.verify("secret2", &hash));
        assert!(!hasher.verify("secret1", "not-a-phc-string"));
    }

    #[test]
    fn test_token_round_trip() {
        let tokens = TokenService::new("test-secret", 24);
        let user = User::new("rider@shop.test", "Rider", Role::Rider);

        let token = tokens.issue(&user).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, Role::Rider);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_token_lifetime_is_clamped() {
        let user = User::new("rider@shop.test", "Rider", Role::Rider);

        let long = TokenService::new("test-secret", i64::MAX);
        let claims = long.verify(&long.issue(&user).unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_TOKEN_TTL_HOURS * 3600);

        let short = TokenService::new("test-secret", -5);
        let claims = short.verify(&short.issue(&user).unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = TokenService::new("test-secret", 24);
        let past = Utc::now().timestamp() - 3 * 3600;
        let token = tokens
            .issue_claims(&Claims {
                sub: UserId::new().to_string(),
                role: Role::Customer,
                iat: past - 3600,
                exp: past,
            })
            .unwrap();

        assert!(matches!(
            tokens.verify(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_token_signed_with_other_key_is_rejected() {
        let ours = TokenService::new("ours", 24);
        let theirs = TokenService::new("theirs", 24);
        let user = User::new("a@b.co", "A", Role::Admin);

        let token = theirs.issue(&user).unwrap();
        assert!(ours.verify(&token).is_err());
    }
}
