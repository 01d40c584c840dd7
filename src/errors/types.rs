//! Error type definitions for the live channel pipeline

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Source handling errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// External service errors
    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Filesystem errors from the source store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Source handling specific errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Upstream did not answer within the allowed time
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// Invalid source configuration
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfig { field: String, message: String },

    /// Parsing errors for source data
    #[error("Parse error: {source_type} - {message}")]
    ParseError { source_type: String, message: String },

    /// Non-success HTTP status from an upstream feed
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },
}

impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an external service error
    pub fn external_service<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error came from a bounded wait running out
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Source(SourceError::Timeout { .. }) => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl SourceError {
    /// Create a parse error for the given feed type
    pub fn parse<S: Into<String>, M: Into<String>>(source_type: S, message: M) -> Self {
        Self::ParseError {
            source_type: source_type.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error for one field of a source
    pub fn invalid_config<S: Into<String>, M: Into<String>>(field: S, message: M) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error for a URL
    pub fn timeout<S: Into<String>>(url: S) -> Self {
        Self::Timeout { url: url.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display() {
        let err = AppError::from(SourceError::Http {
            status: 404,
            message: "Not Found".to_string(),
        });
        assert_eq!(err.to_string(), "Source error: HTTP error: 404 - Not Found");
    }

    #[test]
    fn test_timeout_detection() {
        assert!(AppError::from(SourceError::timeout("http://epg.example/e.xml")).is_timeout());
        assert!(!AppError::configuration("bad").is_timeout());
    }
}
