//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use document_store::StoreError;
use domain::DomainError;
use serde_json::json;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed or expired credentials.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, error_body(msg)),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, error_body(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body(msg)),
            ApiError::Domain(DomainError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation failed", "errors": errors }),
            ),
            ApiError::Domain(err) => {
                let status = domain_status(&err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "internal server error");
                    (status, error_body("Internal server error"))
                } else {
                    (status, error_body(err.to_string()))
                }
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, error_body("Internal server error"))
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn error_body(message: impl Into<String>) -> serde_json::Value {
    json!({ "error": message.into() })
}

/// HTTP status for a domain failure.
pub fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::ProductNotFound(_)
        | DomainError::OrderNotFound(_)
        | DomainError::UserNotFound(_)
        | DomainError::RiderNotFound(_)
        | DomainError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        DomainError::Validation(_)
        | DomainError::InvalidVariant { .. }
        | DomainError::InsufficientStock { .. }
        | DomainError::InvalidCredentials => StatusCode::BAD_REQUEST,
        DomainError::Forbidden(_) | DomainError::NotAssigned { .. } | DomainError::NotApproved => {
            StatusCode::FORBIDDEN
        }
        DomainError::Conflict(_)
        | DomainError::Store(
            StoreError::VersionConflict { .. }
            | StoreError::DuplicateKey { .. }
            | StoreError::AlreadyExists(_),
        ) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Parses a path identifier, rejecting malformed values as a bad request.
pub fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what} id: {raw}")))
}

#[cfg(test)]
mod tests {
    use common::{OrderId, ProductId, UserId};
    use domain::validation::FieldError;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_domain_status_mapping() {
        let cases = [
            (DomainError::ProductNotFound(ProductId::new()), 404),
            (DomainError::OrderNotFound(OrderId::new()), 404),
            (DomainError::RiderNotFound(UserId::new()), 404),
            (DomainError::InvalidCredentials, 400),
            (
                DomainError::InsufficientStock {
                    product_id: ProductId::new(),
                    color: "red".to_string(),
                    size: "m".to_string(),
                    requested: 3,
                    available: 2,
                },
                400,
            ),
            (
                DomainError::NotAssigned {
                    order_id: OrderId::new(),
                    rider_id: UserId::new(),
                },
                403,
            ),
            (DomainError::NotApproved, 403),
            (DomainError::Conflict("taken".to_string()), 409),
            (DomainError::PasswordHash("boom".to_string()), 500),
        ];

        for (err, expected) in cases {
            assert_eq!(domain_status(&err).as_u16(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let err = ApiError::Domain(DomainError::Validation(vec![FieldError::new(
            "email",
            "A valid email is required",
        )]));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"], "validation failed");
        assert_eq!(json["errors"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let response = ApiError::Internal("db password leaked".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Internal server error");
    }

    #[test]
    fn test_parse_id() {
        let id = ProductId::new();
        let parsed: ProductId = parse_id(&id.to_string(), "product").unwrap();
        assert_eq!(parsed, id);
        assert!(parse_id::<ProductId>("not-a-uuid", "product").is_err());
    }
}
