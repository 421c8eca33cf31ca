//! Error types
//!
//! Single requests fail with [`Error`]. Multi-request operations wrap it:
//! listings fail with [`ListError`], batches with [`BatchError`], both of
//! which keep the data and billable metrics accrued before the failure.

use crate::api::envelope::ResponseInfo;
use crate::engine::metrics::Metrics;
use std::fmt;
use thiserror::Error;

/// Provider error list from an envelope with `success: false`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub errors: Vec<ResponseInfo>,
}

impl ApiFailure {
    pub fn new(errors: Vec<ResponseInfo>) -> Self {
        Self { errors }
    }

    /// Code of the first reported error
    pub fn code(&self) -> Option<i64> {
        self.errors.first().map(|e| e.code)
    }

    /// Message of the first reported error
    pub fn message(&self) -> &str {
        self.errors
            .first()
            .map(|e| e.message.as_str())
            .unwrap_or("request failed without error details")
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{} (code {})", self.message(), code),
            None => f.write_str(self.message()),
        }
    }
}

/// Errors of a single API call
#[derive(Debug, Error)]
pub enum Error {
    /// Missing credential/identifier or invalid input; no request was made
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection failure, non-2xx status, or an unreadable body
    #[error("Transport error: {message}")]
    Transport {
        status: Option<u16>,
        /// Envelope errors found in a non-2xx body, if it had one
        errors: Vec<ResponseInfo>,
        message: String,
    },

    /// 2xx response with `success: false`
    #[error("API error: {0}")]
    Api(ApiFailure),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            errors: Vec::new(),
            message: message.into(),
        }
    }

    /// HTTP status of a transport failure
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// First provider error code, from either an API failure or a non-2xx body
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Api(failure) => failure.code(),
            Self::Transport { errors, .. } => errors.first().map(|e| e.code),
            _ => None,
        }
    }

    /// Metrics accrued before this error; always zero for a single call
    pub fn metrics(&self) -> Metrics {
        Metrics::ZERO
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            errors: Vec::new(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::transport(format!("Failed to parse response JSON: {}", err))
    }
}

/// A paginated listing that failed after some pages were consumed
#[derive(Debug)]
pub struct ListFailure<T> {
    pub message: String,
    /// Items already yielded to the caller before the failing page
    pub data: Vec<T>,
    /// Metrics through the last successful page
    pub metrics: Metrics,
    pub cause: Error,
}

/// Errors of a paginated listing
#[derive(Debug)]
pub enum ListError<T> {
    /// Cancelled between round trips; no metrics are reported
    Cancelled,
    Partial(ListFailure<T>),
}

impl<T> ListError<T> {
    pub fn metrics(&self) -> Metrics {
        match self {
            Self::Cancelled => Metrics::ZERO,
            Self::Partial(failure) => failure.metrics,
        }
    }

    /// Items yielded before the failure
    pub fn data(&self) -> &[T] {
        match self {
            Self::Cancelled => &[],
            Self::Partial(failure) => &failure.data,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl<T> fmt::Display for ListError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("Operation cancelled"),
            Self::Partial(failure) => f.write_str(&failure.message),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for ListError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cancelled => None,
            Self::Partial(failure) => Some(&failure.cause),
        }
    }
}

/// A batch in which at least one item failed
#[derive(Debug)]
pub struct BatchFailure<T> {
    pub message: String,
    /// Items that did not complete, in input order
    pub failed: Vec<T>,
    /// Error of each failed item, aligned with `failed`
    pub errors: Vec<Error>,
    /// Metrics of the items that did complete
    pub metrics: Metrics,
}

impl<T> BatchFailure<T> {
    /// Error of the first failed item
    pub fn cause(&self) -> Option<&Error> {
        self.errors.first()
    }
}

/// Errors of a batch operation
#[derive(Debug)]
pub enum BatchError<T> {
    /// Rejected before any item was attempted
    Invalid(Error),
    /// Cancelled between items; no metrics are reported
    Cancelled,
    Partial(BatchFailure<T>),
}

impl<T> BatchError<T> {
    pub fn metrics(&self) -> Metrics {
        match self {
            Self::Invalid(_) | Self::Cancelled => Metrics::ZERO,
            Self::Partial(failure) => failure.metrics,
        }
    }

    /// Items to retry
    pub fn failed(&self) -> &[T] {
        match self {
            Self::Invalid(_) | Self::Cancelled => &[],
            Self::Partial(failure) => &failure.failed,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl<T> fmt::Display for BatchError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{}", err),
            Self::Cancelled => f.write_str("Operation cancelled"),
            Self::Partial(failure) => f.write_str(&failure.message),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for BatchError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Cancelled => None,
            Self::Partial(failure) => failure
                .cause()
                .map(|e| e as &(dyn std::error::Error + 'static)),
        }
    }
}
