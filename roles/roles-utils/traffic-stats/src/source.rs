use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::types::RawCounter;

/// Coarse classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Endpoint unreachable or connection dropped
    Unavailable,
    /// The remote side does not know the requested method or service name
    UnknownMethod,
    /// The call did not complete within its deadline
    Timeout,
    /// Malformed or unexpected response
    Protocol,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Unavailable => write!(f, "unavailable"),
            TransportErrorKind::UnknownMethod => write!(f, "unknown method"),
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Protocol => write!(f, "protocol error"),
            TransportErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Connectivity or protocol failure reported by a snapshot source. `detail`
/// carries the remote message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Other(String),
}

/// Supplies complete counter snapshots on demand.
///
/// `pattern` and `reset` are handed to the backing service unmodified. The
/// caller never issues overlapping fetches on the same source.
#[async_trait]
pub trait SnapshotSource: Send {
    async fn fetch(&mut self, pattern: &str, reset: bool) -> Result<Vec<RawCounter>, SourceError>;
}

#[async_trait]
impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    async fn fetch(&mut self, pattern: &str, reset: bool) -> Result<Vec<RawCounter>, SourceError> {
        (**self).fetch(pattern, reset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display_keeps_detail() {
        let err = TransportError::new(
            TransportErrorKind::UnknownMethod,
            "unknown service v2ray.core.app.stats.command.StatsService",
        );
        assert_eq!(
            err.to_string(),
            "unknown method: unknown service v2ray.core.app.stats.command.StatsService"
        );

        let err: SourceError = err.into();
        assert!(matches!(err, SourceError::Transport(_)));
        assert!(err.to_string().starts_with("Transport error: unknown method"));
    }
}
