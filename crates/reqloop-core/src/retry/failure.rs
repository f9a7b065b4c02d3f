use crate::transport::{TransportError, TransportErrorKind};
use std::fmt;

/// Why one attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    /// The transport raised an error before a response was available.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The server rejected the request for exceeding its rate limit.
    #[error("HTTP {status}: too many requests")]
    Throttled { status: u16 },
    /// The server answered with a 5xx status.
    #[error("HTTP {status}: server error")]
    Server { status: u16 },
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Transport(e) => FailureKind::Transport(e.kind()),
            Failure::Throttled { .. } => FailureKind::Throttling,
            Failure::Server { status } => FailureKind::Server(*status),
        }
    }
}

/// Structured reason code of a [`Failure`], cheap to copy into retry state
/// and hand to a backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport(TransportErrorKind),
    Throttling,
    Server(u16),
}

impl FailureKind {
    pub fn is_throttling(self) -> bool {
        matches!(self, FailureKind::Throttling)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport(kind) => write!(f, "transport ({})", kind),
            FailureKind::Throttling => f.write_str("throttling"),
            FailureKind::Server(status) => write!(f, "server error ({})", status),
        }
    }
}
