use thiserror::Error;
use tonic::{Code, Status};
use traffic_stats::{SourceError, TransportError, TransportErrorKind};

#[derive(Error, Debug)]
pub enum StatsClientError {
    #[error("Invalid API address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Invalid method path: {0}")]
    InvalidMethodPath(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl StatsClientError {
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            StatsClientError::Transport(err) => Some(err.kind),
            _ => None,
        }
    }
}

impl From<Status> for StatsClientError {
    fn from(status: Status) -> Self {
        StatsClientError::Transport(classify_status(&status))
    }
}

impl From<StatsClientError> for SourceError {
    fn from(err: StatsClientError) -> Self {
        match err {
            StatsClientError::Transport(err) => SourceError::Transport(err),
            other => SourceError::Other(other.to_string()),
        }
    }
}

/// Map a gRPC status onto a transport error kind. The status message is kept
/// verbatim; an empty message falls back to the code description.
pub fn classify_status(status: &Status) -> TransportError {
    let kind = match status.code() {
        Code::Unimplemented => TransportErrorKind::UnknownMethod,
        Code::Unavailable => TransportErrorKind::Unavailable,
        Code::DeadlineExceeded => TransportErrorKind::Timeout,
        Code::Internal | Code::DataLoss | Code::Unknown => TransportErrorKind::Protocol,
        _ => TransportErrorKind::Other,
    };
    let detail = if status.message().is_empty() {
        status.code().description().to_string()
    } else {
        status.message().to_string()
    };
    TransportError::new(kind, detail)
}
