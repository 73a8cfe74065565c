//! Error types and handling for cellgauge
//!
//! The estimator itself never fails; these errors cover the host-side
//! surfaces around it: configuration, persistence, telemetry and the web API.

use thiserror::Error;

/// Result type alias for cellgauge operations
pub type Result<T> = std::result::Result<T, GaugeError>;

/// Main error type for cellgauge
#[derive(Debug, Error)]
pub enum GaugeError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Persistence backend errors
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Telemetry source errors
    #[error("Telemetry error: {message}")]
    Telemetry { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// HTTP/Web server errors
    #[error("Web server error: {message}")]
    Web { message: String },
}

impl GaugeError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        GaugeError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        GaugeError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new persistence error
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        GaugeError::Persistence {
            message: message.into(),
        }
    }

    /// Create a new telemetry error
    pub fn telemetry<S: Into<String>>(message: S) -> Self {
        GaugeError::Telemetry {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        GaugeError::Io {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        GaugeError::Web {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for GaugeError {
    fn from(err: std::io::Error) -> Self {
        GaugeError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for GaugeError {
    fn from(err: serde_yaml::Error) -> Self {
        GaugeError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for GaugeError {
    fn from(err: serde_json::Error) -> Self {
        GaugeError::Serialization {
            message: err.to_string(),
        }
    }
}
