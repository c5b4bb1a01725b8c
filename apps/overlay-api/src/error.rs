use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::stream::router::RouterStopped;

/// Error body returned to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application-level error type that converts into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// A referenced user or item does not exist. Producers treat this as a
    /// bad request, so it maps to 400 rather than 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "NOT_FOUND", message)
    }

    /// The overlay id presented on `/overlay/listen` is not the channel's.
    pub fn id_mismatch() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "ID_MISMATCH",
            "Overlay id does not match channel",
        )
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "INVALID_TOKEN", message)
    }

    pub fn invalid_receipt(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "INVALID_RECEIPT", message)
    }

    /// A third-party dependency failed. The detail is logged, not returned.
    pub fn upstream(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(%message, "upstream error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "UPSTREAM_ERROR",
            "An upstream service failed",
        )
    }

    pub fn router_stopped() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SHUTTING_DOWN",
            "Server is shutting down",
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        Self {
            details: Some(details),
            ..Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "Validation failed")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            code: self.code,
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RouterStopped> for ApiError {
    fn from(_: RouterStopped) -> Self {
        Self::router_stopped()
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        tracing::error!(?err, "database error");
        Self::internal("An internal error occurred")
    }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for ApiError {
    fn from(err: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        tracing::error!(?err, "pool error");
        Self::internal("An internal error occurred")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_a_bad_request() {
        let err = ApiError::not_found("Item not found");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "NOT_FOUND");
    }

    #[test]
    fn router_stopped_maps_to_unavailable() {
        let err: ApiError = RouterStopped.into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn upstream_hides_detail() {
        let err = ApiError::upstream("helix returned 503");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("helix"));
    }

    #[test]
    fn body_omits_empty_details() {
        let body = ApiErrorBody {
            code: "BAD_REQUEST".to_string(),
            message: "nope".to_string(),
            details: None,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({ "code": "BAD_REQUEST", "message": "nope" })
        );
    }
}
