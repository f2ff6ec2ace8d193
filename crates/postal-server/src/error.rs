//! Error types for the gateway.

use std::path::PathBuf;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use postal::PostalError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file named by `POSTALIA_CONFIG` does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// A configuration source could not be read or a value has the wrong type.
    #[error("Invalid configuration: {0}")]
    Invalid(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        Self::Invalid(Box::new(error))
    }
}

/// Failures of a request handler, answered with HTTP 500.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The lookup failed outside the provider chain, e.g. in the cache.
    #[error(transparent)]
    Lookup(#[from] PostalError),

    /// A handler panicked.
    #[error("Handler panicked: {0}")]
    Panic(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "internal error", "details": self.to_string()})),
        )
            .into_response()
    }
}

/// A JSON `{"error": message}` response.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_is_internal_error() {
        let response = ServerError::Lookup(PostalError::Cache("poisoned".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = ConfigError::MissingFile(PathBuf::from("/etc/postalia.toml"));
        assert_eq!(err.to_string(), "Configuration file not found: /etc/postalia.toml");
    }
}
