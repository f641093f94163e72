use std::path::PathBuf;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to load or compile a contract document.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("failed to read contract {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse contract: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("unsupported OpenAPI version {0}, expected 3.x")]
    UnsupportedVersion(String),
    #[error("invalid schema at {location}: {message}")]
    Schema { location: String, message: String },
}

/// A single violation, addressed by a pointer into the request or response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            error_code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }
}

/// A request or response that does not conform to the contract.
///
/// Serializes to the `{message, errors}` body the server renders; the status
/// travels separately as the HTTP status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ValidationFailure {
    #[serde(skip, default = "default_status")]
    pub status: StatusCode,
    pub message: String,
    pub errors: Vec<FieldError>,
}

fn default_status() -> StatusCode {
    StatusCode::BAD_REQUEST
}

impl ValidationFailure {
    pub fn new(status: StatusCode, errors: Vec<FieldError>) -> Self {
        let message = errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            status,
            message,
            errors,
        }
    }

    pub fn bad_request(errors: Vec<FieldError>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, errors)
    }

    /// A response that broke the contract. The caller is not at fault.
    pub fn internal(errors: Vec<FieldError>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, errors)
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, vec![FieldError::new(path, "not found")])
    }

    pub fn method_not_allowed(method: &http::Method, path: &str) -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            vec![FieldError::new(path, format!("{} method not allowed", method))],
        )
    }

    pub fn unsupported_media_type(content_type: Option<&str>) -> Self {
        Self::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            vec![FieldError::new(
                "/body",
                format!("unsupported media type {}", content_type.unwrap_or("(none)")),
            )],
        )
    }
}
