//! Unified error types for the traffic stream.
//!
//! Error codes:
//! - STREAM_001-002: Stream channel errors
//! - STORE_001-002: Record log errors
//! - CONFIG_001: Configuration errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Stream channel error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorCode {
    /// STREAM_001: Failed to publish records
    PublishFailed,
    /// STREAM_002: Failed to subscribe or fetch records
    SubscribeFailed,
}

impl StreamErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PublishFailed => "STREAM_001",
            Self::SubscribeFailed => "STREAM_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::PublishFailed => 502,
            Self::SubscribeFailed => 503,
        }
    }
}

/// Record log error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// STORE_001: Failed to open or create the log
    OpenFailed,
    /// STORE_002: Failed to append to the log
    WriteFailed,
}

impl StoreErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OpenFailed => "STORE_001",
            Self::WriteFailed => "STORE_002",
        }
    }
}

/// Unified error type for the traffic stream.
#[derive(Debug, Error)]
pub enum Error {
    /// Stream channel error with code.
    #[error("[{code}] {message}")]
    Stream {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Record log error with code.
    #[error("[{code}] {message}")]
    Store { code: &'static str, message: String },

    #[error("[CONFIG_001] invalid configuration: {0}")]
    Config(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a stream channel error.
    pub fn stream(code: StreamErrorCode, msg: impl Into<String>) -> Self {
        Self::Stream {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a record log error.
    pub fn store(code: StoreErrorCode, msg: impl Into<String>) -> Self {
        Self::Store {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Stream { http_status, .. } => *http_status,
            Self::Config(_) => 500,
            Self::MalformedRecord(_) => 400,
            Self::Serialization(_) => 400,
            Self::Store { .. } | Self::Io(_) | Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Stream { code, .. } => Some(code),
            Self::Store { code, .. } => Some(code),
            Self::Config(_) => Some("CONFIG_001"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coded_errors_render_code() {
        let err = Error::stream(StreamErrorCode::PublishFailed, "broker down");
        assert_eq!(err.to_string(), "[STREAM_001] broker down");
        assert_eq!(err.http_status(), 502);
        assert_eq!(err.error_code(), Some("STREAM_001"));

        let err = Error::store(StoreErrorCode::OpenFailed, "permission denied");
        assert_eq!(err.error_code(), Some("STORE_001"));
        assert_eq!(err.http_status(), 500);
    }
}
