//! Error types
//!
//! `StartupError` is fatal and only produced while the process boots.
//! `DispatchError` covers every request-time failure; each variant maps to the
//! status code the dispatcher answers with.

use hyper::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

use crate::template::TemplateError;

/// Failures that prevent the server from starting
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Root directory is invalid: {}", .0.display())]
    RootDirectory(PathBuf),

    #[error("Duplicate route: {verb} /{path}")]
    DuplicateRoute { path: String, verb: &'static str },

    #[error("Failed to bind listener on {addr}: {source}")]
    Listener {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to initialize logger: {0}")]
    Logger(#[source] std::io::Error),

    #[error("Failed to read error template '{}': {source}", path.display())]
    ErrorTemplate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<config::ConfigError> for StartupError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

/// Error returned by a route handler
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Request-time failures, rendered through the error template
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Missing required parameter `{0}`.")]
    MissingParameter(String),

    #[error("Parameter `{name}` expects {expected}.")]
    InvalidParameterValue {
        name: String,
        value: String,
        expected: &'static str,
    },

    #[error("Unauthorized access.")]
    AccessDenied,

    #[error("Unauthorized file access.")]
    FileAccessDenied,

    #[error("{verb} route not found.")]
    RouteNotFound { verb: &'static str },

    #[error("File not found.")]
    FileNotFound,

    #[error("POST requests cannot target files.")]
    MethodNotAllowedForFile,

    #[error("Method {0} is not supported.")]
    UnsupportedMethod(String),

    #[error("Request body exceeds {limit} bytes.")]
    PayloadTooLarge { limit: u64 },

    #[error("Handler failed: {0}")]
    Handler(#[from] HandlerError),

    #[error("Template failed: {0}")]
    Template(#[from] TemplateError),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Status code this failure is answered with
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::InvalidParameterValue { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::AccessDenied | Self::FileAccessDenied => StatusCode::UNAUTHORIZED,
            Self::RouteNotFound { .. } | Self::FileNotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowedForFile | Self::UnsupportedMethod(_) => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Handler(_) | Self::Template(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DispatchError::MissingParameter("b".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(DispatchError::AccessDenied.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(DispatchError::FileNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            DispatchError::MethodNotAllowedForFile.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            DispatchError::Handler(HandlerError::new("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            DispatchError::MissingParameter("b".into()).to_string(),
            "Missing required parameter `b`."
        );
        let dup = StartupError::DuplicateRoute {
            path: "print".into(),
            verb: "GET",
        };
        assert_eq!(dup.to_string(), "Duplicate route: GET /print");
    }
}
