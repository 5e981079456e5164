use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("Search failed: {0:#}")]
    Store(anyhow::Error),

    #[error("Search did not finish within {0:?}")]
    BackendTimeout(Duration),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Embedding(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ApiError::Embedding(_) => "EMBEDDING_ERROR",
            ApiError::Store(_) => "STORE_ERROR",
            ApiError::BackendTimeout(_) => "BACKEND_TIMEOUT",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{self}");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_is_client_error() {
        let err = ApiError::InvalidArgument("top_k must be between 1 and 20".to_string());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "top_k must be between 1 and 20");
    }

    #[test]
    fn test_backend_failures_are_server_errors() {
        let embed = ApiError::Embedding(anyhow::anyhow!("connection refused"));
        let store = ApiError::Store(anyhow::anyhow!("pool timed out"));
        assert_eq!(embed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.to_string().contains("pool timed out"));
    }

    #[test]
    fn test_backend_timeout_is_server_error() {
        let err = ApiError::BackendTimeout(Duration::from_secs(60));
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.status_code().is_server_error());
    }

    #[test]
    fn test_into_response_sets_status() {
        let resp = ApiError::InvalidArgument("bad".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
