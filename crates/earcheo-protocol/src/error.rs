//! Error types for network fetches.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable codes for fetch failures, used in CLI JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request URL could not be parsed or is not fetchable.
    InvalidUrl,
    /// Connection could not be established.
    ConnectFailed,
    /// The fetch did not complete in time.
    Timeout,
    /// The response body could not be read.
    BodyFailed,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl => write!(f, "INVALID_URL"),
            Self::ConnectFailed => write!(f, "CONNECT_FAILED"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::BodyFailed => write!(f, "BODY_FAILED"),
        }
    }
}

/// A network fetch that rejected.
///
/// A response with an error status is not a `FetchError`; only failures to
/// obtain any response at all are.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

impl FetchError {
    /// Machine-readable code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidUrl(_) => ErrorCode::InvalidUrl,
            Self::Connect(_) => ErrorCode::ConnectFailed,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Body(_) => ErrorCode::BodyFailed,
        }
    }
}
