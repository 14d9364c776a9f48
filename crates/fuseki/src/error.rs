//! Error types for the Fuseki client.

use std::fmt;

/// Result type for Fuseki operations.
pub type FusekiResult<T> = Result<T, FusekiError>;

/// The kind of SPARQL operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Query,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Query => f.write_str("query"),
            Operation::Update => f.write_str("update"),
        }
    }
}

/// Error types that can occur when talking to Fuseki.
#[derive(Debug, thiserror::Error)]
pub enum FusekiError {
    /// The request did not complete within the configured timeout.
    #[error("SPARQL {operation} timed-out: {source}")]
    Timeout {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    /// Fuseki answered with a non-success status.
    #[error("SPARQL {operation} failed ({status}): {body}")]
    Upstream {
        operation: Operation,
        status: u16,
        body: String,
    },

    /// Connection refused, DNS failure, broken body, ...
    #[error("SPARQL {operation} failed: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    /// The response did not have the SPARQL JSON results shape we need.
    #[error("SPARQL {operation} returned an unexpected result: {message}")]
    UnexpectedResult { operation: Operation, message: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
}

impl FusekiError {
    /// Classify a reqwest error raised while sending or reading a request.
    pub(crate) fn from_reqwest(operation: Operation, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { operation, source }
        } else {
            Self::Transport { operation, source }
        }
    }

    /// Create an upstream error from a status code and response body.
    pub(crate) fn from_response(operation: Operation, status: u16, body: &str) -> Self {
        Self::Upstream {
            operation,
            status,
            body: body.trim().to_string(),
        }
    }

    /// HTTP status returned by Fuseki, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_trims_body() {
        let err = FusekiError::from_response(Operation::Query, 400, "  Parse error: line 1\n");
        assert_eq!(err.to_string(), "SPARQL query failed (400): Parse error: line 1");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Query.to_string(), "query");
        assert_eq!(Operation::Update.to_string(), "update");
    }

    #[test]
    fn test_config_error_has_no_status() {
        let err = FusekiError::Config("bad".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Configuration error: bad");
    }
}
