//! Error types for docsage-core

use thiserror::Error;

/// Main error type for the docsage-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Input rejected before any request was sent
    #[error("validation error: {0}")]
    Validation(String),

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server-reported failure: non-2xx status plus the response `detail`
    /// field when the body carried one
    #[error("API error ({status}): {}", detail.as_deref().unwrap_or("no detail"))]
    Api {
        status: u16,
        detail: Option<String>,
    },

    /// Report payload could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

impl Error {
    /// Server detail for display, when the failure carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::Api { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// True for HTTP 401 responses. Backs the forced-logout policy for
    /// stale restored tokens.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status: 401, .. })
    }
}

/// Result type alias for docsage-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = Error::Api {
            status: 400,
            detail: Some("File type not supported".to_string()),
        };
        assert_eq!(err.to_string(), "API error (400): File type not supported");

        let bare = Error::Api {
            status: 500,
            detail: None,
        };
        assert_eq!(bare.to_string(), "API error (500): no detail");
    }

    #[test]
    fn test_unauthorized_detection() {
        let unauthorized = Error::Api {
            status: 401,
            detail: Some("Invalid authentication credentials".to_string()),
        };
        assert!(unauthorized.is_unauthorized());

        let forbidden = Error::Api {
            status: 403,
            detail: None,
        };
        assert!(!forbidden.is_unauthorized());
        assert!(!Error::Http("connection refused".to_string()).is_unauthorized());
    }
}
