//! Errors raised at the remote boundary.

use std::time::Duration;

/// Failure talking to the identity provider or the remote store.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Http { status: u16, message: String },

    /// Missing, expired or rejected credentials.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// A row did not match the record type of its collection.
    #[error("malformed {collection} row: {source}")]
    Decode {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("backend is not configured")]
    NotConfigured,

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl ApiError {
    /// Auth-expired failures, which callers treat as "no session".
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ApiError::Unauthorized(_) => true,
            ApiError::Http { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// Transient failures that a later retry could fix.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => true,
            ApiError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// The backend's "relation does not exist" error, i.e. the client is
    /// pointed at a project without the expected schema.
    pub fn is_missing_relation(&self) -> bool {
        matches!(self, ApiError::Http { message, .. } if message.contains("does not exist"))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ApiError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => ApiError::Network(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ApiError::Unauthorized("expired".into()).is_unauthorized());
        assert!(ApiError::Http { status: 401, message: String::new() }.is_unauthorized());
        assert!(!ApiError::Network("reset".into()).is_unauthorized());

        assert!(ApiError::Network("reset".into()).is_transient());
        assert!(ApiError::Http { status: 503, message: String::new() }.is_transient());
        assert!(!ApiError::Http { status: 400, message: String::new() }.is_transient());

        let missing = ApiError::Http {
            status: 404,
            message: "relation \"public.members\" does not exist".into(),
        };
        assert!(missing.is_missing_relation());
    }

    #[test]
    fn test_timeout_message() {
        let err = ApiError::Timeout(Duration::from_millis(5000));
        assert_eq!(err.to_string(), "timed out after 5000ms");
    }
}
