use std::time::Duration;
use thiserror::Error;

use crate::source::{SourceError, TransportError, TransportErrorKind};
use crate::types::AggregationResult;

/// Why a poll cycle produced no result. Either way the loop backs off and
/// retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("{0}")]
    Transport(TransportError),
    #[error("unclassified error: {0}")]
    Unclassified(String),
}

impl PollError {
    /// The underlying message, untouched.
    pub fn detail(&self) -> &str {
        match self {
            PollError::Transport(err) => &err.detail,
            PollError::Unclassified(detail) => detail,
        }
    }

    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            PollError::Transport(err) => Some(err.kind),
            PollError::Unclassified(_) => None,
        }
    }
}

impl From<SourceError> for PollError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Transport(err) => PollError::Transport(err),
            SourceError::Other(detail) => PollError::Unclassified(detail),
        }
    }
}

/// Consumer of poll loop output. Results arrive in poll order, one per
/// successful cycle.
pub trait Reporter: Send {
    fn report(&mut self, result: AggregationResult);

    /// A fetch failed; the next attempt happens after `retry_in`.
    fn advisory(&mut self, error: &PollError, retry_in: Duration);
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn report(&mut self, result: AggregationResult) {
        (**self).report(result)
    }

    fn advisory(&mut self, error: &PollError, retry_in: Duration) {
        (**self).advisory(error, retry_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_classification() {
        let err: PollError =
            SourceError::Transport(TransportError::new(TransportErrorKind::Timeout, "deadline"))
                .into();
        assert_eq!(err.transport_kind(), Some(TransportErrorKind::Timeout));
        assert_eq!(err.detail(), "deadline");

        let err: PollError = SourceError::Other("bad counter payload".to_string()).into();
        assert_eq!(err.transport_kind(), None);
        assert_eq!(err.detail(), "bad counter payload");
        assert_eq!(err.to_string(), "unclassified error: bad counter payload");
    }
}
