use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, integrations::error::UpstreamError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Missing or invalid session.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),
    /// Invalid input provided by the client.
    #[error("{0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("{0}")]
    Conflict(String),
    /// Requested resource was not found.
    #[error("{0}")]
    NotFound(String),
    /// Third-party API answered with a status that is passed back to the caller.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },
    /// Third-party API could not be reached or answered garbage.
    #[error("{0}")]
    UpstreamFailure(#[source] UpstreamError),
    /// A required secret or endpoint is not configured.
    #[error("{0}")]
    Configuration(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<UpstreamError> for ServiceError {
    fn from(err: UpstreamError) -> Self {
        ServiceError::UpstreamFailure(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("{0}")]
    Unauthorized(String),
    /// Caller lacks the required role.
    #[error("{0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("{0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Status forwarded from a third-party API.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => {
                warn!(error = %source, "storage operation failed");
                AppError::ServiceUnavailable(format!("storage unavailable: {source}"))
            }
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Upstream { status, message } => {
                warn!(%status, %message, "upstream request rejected");
                AppError::Upstream { status, message }
            }
            ServiceError::UpstreamFailure(source) => {
                error!(error = %source, "upstream request failed");
                AppError::Internal(source.to_string())
            }
            ServiceError::Configuration(message) => {
                error!(%message, "missing configuration");
                AppError::Internal(message)
            }
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            error: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn errors_render_as_error_field() {
        let (status, body) = render(ServiceError::InvalidInput("Plan invalide".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "Plan invalide"}));
    }

    #[tokio::test]
    async fn upstream_status_is_passed_through() {
        let (status, body) = render(
            ServiceError::Upstream {
                status: StatusCode::TOO_MANY_REQUESTS,
                message: "Failed to fetch H2H data".into(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Failed to fetch H2H data");
    }

    #[tokio::test]
    async fn degraded_maps_to_503() {
        let (status, _) = render(ServiceError::Degraded.into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
