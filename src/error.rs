//! Error taxonomy shared by the upstream source clients and the aggregator.

use crate::retry::RetryError;
use std::time::Duration;
use thiserror::Error;

/// Whether a failed upstream call is worth another attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    Transient,
    Permanent,
}

/// Failure of a single call against the MFA API or the directory.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The upstream answered, but had no entry for the user (yet).
    #[error("no entry found for {0}")]
    NotFound(String),
    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),
    /// Network-level failure or an upstream 5xx/429.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    /// The upstream refused the request (credentials, signature, bad parameters).
    #[error("upstream rejected request: {0}")]
    Rejected(String),
    #[error("directory bind failed: {0}")]
    Bind(String),
    /// The connection died mid-resolve; retrying on it cannot succeed.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl SourceError {
    #[must_use]
    pub const fn kind(&self) -> FaultKind {
        match self {
            Self::NotFound(_) | Self::Timeout(_) | Self::Unavailable(_) => FaultKind::Transient,
            Self::Rejected(_)
            | Self::Bind(_)
            | Self::ConnectionLost(_)
            | Self::InvalidResponse(_) => FaultKind::Permanent,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Terminal outcome of `Aggregator::resolve` when no status can be produced.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The directory could not be reached or bound to.
    #[error("directory unavailable")]
    SourceUnavailable(#[source] SourceError),
    /// The directory lookup did not produce an entry for the user.
    #[error("no directory data for {username}")]
    AggregationFailed {
        username: String,
        #[source]
        source: RetryError<SourceError>,
    },
}
