//! Failure taxonomy for file store operations.
//!
//! Every store operation returns an [`Outcome`]: `Ok` carries the payload and
//! `Err` carries a [`StoreError`] whose [`FailureKind`] is one of a closed set
//! of tags the caller can match on exhaustively.

use serde::{Serialize, ser::SerializeMap};
use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Closed set of failure tags reported to callers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConfigMissing,
    RepoAccessDenied,
    RateLimitExceeded,
    Timeout,
    ConnectionError,
    NotFound,
    Conflict,
    ChecksumRequired,
    ApiError,
    UnexpectedError,
}

/// Main error type for file store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Repository access denied: {0}")]
    RepoAccessDenied(String),

    #[error("API rate limit exceeded: {message} (retry after {retry_after_secs}s)")]
    RateLimitExceeded {
        message: String,
        retry_after_secs: u64,
    },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Checksum required: {0}")]
    ChecksumRequired(String),

    #[error("GitHub API error ({status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        body: serde_json::Value,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Result of a single store operation.
pub type Outcome<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn config_missing(msg: impl Into<String>) -> Self {
        Self::ConfigMissing(msg.into())
    }

    pub fn repo_access_denied(msg: impl Into<String>) -> Self {
        Self::RepoAccessDenied(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>, retry_after_secs: u64) -> Self {
        Self::RateLimitExceeded {
            message: msg.into(),
            retry_after_secs,
        }
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Tag identifying which failure this is.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ConfigMissing(_) => FailureKind::ConfigMissing,
            Self::RepoAccessDenied(_) => FailureKind::RepoAccessDenied,
            Self::RateLimitExceeded { .. } => FailureKind::RateLimitExceeded,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::ConnectionError(_) => FailureKind::ConnectionError,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::Conflict(_) => FailureKind::Conflict,
            Self::ChecksumRequired(_) => FailureKind::ChecksumRequired,
            Self::ApiError { .. } => FailureKind::ApiError,
            Self::Unexpected(_) => FailureKind::UnexpectedError,
        }
    }

    /// Seconds the caller should wait before trying again, if known.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimitExceeded {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Remote HTTP status behind this failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            Self::Conflict(_) => Some(409),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// Human readable detail without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::ConfigMissing(msg)
            | Self::RepoAccessDenied(msg)
            | Self::Timeout(msg)
            | Self::ConnectionError(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::ChecksumRequired(msg)
            | Self::Unexpected(msg) => msg,
            Self::RateLimitExceeded { message, .. } => message,
            Self::ApiError { message, .. } => message,
        }
    }

    /// Whether the client may retry this failure on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_)
            | Self::ConnectionError(_)
            | Self::RateLimitExceeded { .. } => true,
            Self::ApiError { status, .. } => {
                matches!(status, 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }
}

impl Serialize for StoreError {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut m = serializer.serialize_map(None)?;
        m.serialize_entry("error", &self.kind())?;
        m.serialize_entry("message", self.message())?;
        if let Some(retry_after) = self.retry_after() {
            m.serialize_entry("retry_after", &retry_after)?;
        }
        if let Some(status) = self.status_code() {
            m.serialize_entry("status_code", &status)?;
        }
        if let Self::ApiError { body, .. } = self
            && !body.is_null()
        {
            m.serialize_entry("details", body)?;
        }
        m.end()
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unexpected(format!("JSON parse error: {err}"))
    }
}

impl From<base64::DecodeError> for StoreError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Unexpected(format!("Base64 decode error: {err}"))
    }
}

impl From<std::string::FromUtf8Error> for StoreError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Unexpected(format!("UTF-8 conversion error: {err}"))
    }
}

impl From<url::ParseError> for StoreError {
    fn from(err: url::ParseError) -> Self {
        Self::Unexpected(format!("URL parse error: {err}"))
    }
}

impl From<reqwest::header::InvalidHeaderValue> for StoreError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::Unexpected(format!("malformed token: {err}"))
    }
}
