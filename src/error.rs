//! Error types and handling for Pricelight
//!
//! Every failure in the fetch path is surfaced through logging and retried;
//! nothing here is meant to terminate the process. The helpers on
//! [`PricelightError`] let callers decide how a failure should be treated.

use thiserror::Error;

/// Result type alias for Pricelight operations
pub type Result<T> = std::result::Result<T, PricelightError>;

/// Main error type for Pricelight
#[derive(Debug, Error)]
pub enum PricelightError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// HTTP, TLS and socket failures
    #[error("Network error: {message}")]
    Network { message: String },

    /// Non-200 answer from the price API
    #[error("Bad response: HTTP {status}")]
    BadResponse { status: u16 },

    /// Network time could not be obtained
    #[error("Clock unavailable: {message}")]
    ClockUnavailable { message: String },

    /// Response body did not have the expected shape
    #[error("Malformed data: {message}")]
    MalformedData { message: String },

    /// Relay or LED output failures
    #[error("Actuator error: {message}")]
    Actuator { message: String },

    /// HTTP server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl PricelightError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        PricelightError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        PricelightError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        PricelightError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        PricelightError::Network {
            message: message.into(),
        }
    }

    /// Create a new bad-response error from an HTTP status code
    pub fn bad_response(status: u16) -> Self {
        PricelightError::BadResponse { status }
    }

    /// Create a new clock-unavailable error
    pub fn clock_unavailable<S: Into<String>>(message: S) -> Self {
        PricelightError::ClockUnavailable {
            message: message.into(),
        }
    }

    /// Create a new malformed-data error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        PricelightError::MalformedData {
            message: message.into(),
        }
    }

    /// Create a new actuator error
    pub fn actuator<S: Into<String>>(message: S) -> Self {
        PricelightError::Actuator {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        PricelightError::Web {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        PricelightError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        PricelightError::Generic {
            message: message.into(),
        }
    }

    /// Whether the failure should simply be retried on the next cycle
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PricelightError::Network { .. }
                | PricelightError::Timeout { .. }
                | PricelightError::BadResponse { .. }
                | PricelightError::MalformedData { .. }
                | PricelightError::ClockUnavailable { .. }
        )
    }

    /// Whether the failure may have been caused by a wrong wall clock.
    ///
    /// A skewed clock requests the wrong day and the API answers with an
    /// error, so transport and status failures count; a body that parsed
    /// badly does not. This is a recovery heuristic only.
    pub fn suggests_clock_skew(&self) -> bool {
        matches!(
            self,
            PricelightError::Network { .. }
                | PricelightError::Timeout { .. }
                | PricelightError::BadResponse { .. }
        )
    }
}

impl From<std::io::Error> for PricelightError {
    fn from(err: std::io::Error) -> Self {
        PricelightError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for PricelightError {
    fn from(err: serde_yaml::Error) -> Self {
        PricelightError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PricelightError {
    fn from(err: serde_json::Error) -> Self {
        PricelightError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PricelightError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PricelightError::timeout(err.to_string())
        } else if err.is_decode() {
            PricelightError::malformed(err.to_string())
        } else {
            PricelightError::network(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for PricelightError {
    fn from(err: chrono::ParseError) -> Self {
        PricelightError::validation("datetime", err.to_string().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PricelightError::config("test config error");
        assert!(matches!(err, PricelightError::Config { .. }));

        let err = PricelightError::bad_response(404);
        assert!(matches!(err, PricelightError::BadResponse { status: 404 }));

        let err = PricelightError::validation("field", "test validation error");
        assert!(matches!(err, PricelightError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = PricelightError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = PricelightError::bad_response(503);
        assert_eq!(format!("{}", err), "Bad response: HTTP 503");
    }

    #[test]
    fn clock_skew_heuristic_excludes_malformed_bodies() {
        assert!(PricelightError::bad_response(404).suggests_clock_skew());
        assert!(PricelightError::network("reset").suggests_clock_skew());
        assert!(!PricelightError::malformed("no price").suggests_clock_skew());
        assert!(PricelightError::malformed("no price").is_transient());
        assert!(!PricelightError::config("x").is_transient());
    }
}
