use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Custom error type for pr_pipelines operations.
///
/// Every failure path is surfaced to the webhook sender as a structured
/// response; nothing here aborts the process.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Request body is empty")]
    InvalidRequest,

    #[error("Unsupported event type: {0}")]
    UnsupportedEvent(String),

    #[error("Malformed pull request payload: {0}")]
    MalformedPayload(String),

    #[error("Source pipeline '{0}' not found")]
    SourcePipelineNotFound(String),

    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    #[error("Pipeline lookup failed: {0}")]
    LookupFailed(String),

    #[error("Pipeline create failed: {0}")]
    CreateFailed(String),

    #[error("Pipeline delete failed: {0}")]
    DeleteFailed(String),

    #[error("Secret unavailable: {0}")]
    SecretUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl HandlerError {
    /// Stable machine-readable code included in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnsupportedEvent(_) => "unsupported_event",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::SourcePipelineNotFound(_) => "source_pipeline_not_found",
            Self::MalformedTemplate(_) => "malformed_template",
            Self::LookupFailed(_) => "lookup_failed",
            Self::CreateFailed(_) => "create_failed",
            Self::DeleteFailed(_) => "delete_failed",
            Self::SecretUnavailable(_) => "secret_unavailable",
            Self::ConfigError(_) => "config_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::UnsupportedEvent(_) | Self::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::SourcePipelineNotFound(_) | Self::MalformedTemplate(_) | Self::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::LookupFailed(_)
            | Self::CreateFailed(_)
            | Self::DeleteFailed(_)
            | Self::SecretUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({
                "error": self.code(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

/// Helper type for Results that use HandlerError
pub type Result<T> = std::result::Result<T, HandlerError>;
