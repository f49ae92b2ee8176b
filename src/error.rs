//! Error types for the HTTP boundary and the job launcher.
//!
//! Library code propagates `anyhow::Error`; these types exist where a caller
//! needs to tell failures apart (HTTP status codes, failed launch steps).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

/// Errors surfaced by the gym server handlers.
#[derive(thiserror::Error, Debug)]
pub enum GymError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl GymError {
    fn status(&self) -> StatusCode {
        match self {
            GymError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GymError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GymError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            GymError::InvalidRequest(detail) => warn!(%detail, "rejected request"),
            other => error!(error = %other, "request failed"),
        }
        let body = serde_json::json!({ "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Errors from fail-fast launch steps.
#[derive(thiserror::Error, Debug)]
pub enum LaunchError {
    #[error("command `{command}` exited with status {status}")]
    CommandFailed { command: String, status: String },

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_maps_to_400() {
        let response = GymError::InvalidRequest("missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_maps_to_500() {
        let response = GymError::from(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_launch_error_names_command() {
        let err = LaunchError::CommandFailed {
            command: "ray start --head".into(),
            status: "1".into(),
        };
        assert!(err.to_string().contains("ray start --head"));
    }
}
