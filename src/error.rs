use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;

use crate::models::{TitleId, UserId};

/// Failure to bring the model artifact bundle into memory.
///
/// Always names the artifact that could not be used.
#[derive(thiserror::Error, Debug)]
pub enum ArtifactLoadError {
    #[error("Artifact '{artifact}' not found at {path}")]
    Missing { artifact: String, path: String },

    #[error("Failed to read artifact '{artifact}': {source}")]
    Io {
        artifact: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact '{artifact}' is corrupt: {source}")]
    Corrupt {
        artifact: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Artifact '{artifact}' is incompatible: {reason}")]
    Incompatible { artifact: String, reason: String },

    #[error("Artifact load interrupted: {0}")]
    Interrupted(String),

    #[error("Artifact load failed recently ({}); next attempt in {}s", .reason, .retry_in.as_secs())]
    CoolingDown { reason: String, retry_in: Duration },
}

impl ArtifactLoadError {
    pub fn incompatible(artifact: &str, reason: impl Into<String>) -> Self {
        ArtifactLoadError::Incompatible {
            artifact: artifact.to_string(),
            reason: reason.into(),
        }
    }
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Model artifacts unavailable: {0}")]
    ArtifactLoad(#[from] ArtifactLoadError),

    #[error("Unknown title: {0}")]
    UnknownTitle(TitleId),

    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable code for the response body
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ArtifactLoad(_) => "artifact_load",
            AppError::UnknownTitle(_) => "unknown_title",
            AppError::UnknownUser(_) => "unknown_user",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::UnknownTitle(_) | AppError::UnknownUser(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ArtifactLoad(e) => {
                tracing::error!(error = %e, "Serving without model artifacts");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Recommendation models are not available".to_string(),
                )
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
