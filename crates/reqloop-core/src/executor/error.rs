use crate::signer::SignError;
use crate::transport::TransportError;

/// Terminal failure of a logical call.
///
/// Only exhausted or non-retryable transport failures, exhausted throttling,
/// and bodies that cannot be replayed end up here. Server errors and client
/// errors are returned to the caller as ordinary responses.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("invalid request: {0}")]
    InvalidArgument(String),

    #[error("request failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("request still throttled (HTTP {status}) after {attempts} attempt(s)")]
    Throttled { attempts: u32, status: u16 },

    #[error("request body cannot be replayed; giving up after {attempts} attempt(s)")]
    NonReplayableBody { attempts: u32 },

    #[error("stopped after {redirects} redirect(s)")]
    TooManyRedirects { redirects: u32 },

    #[error("invalid redirect location: {location}")]
    InvalidRedirect { location: String },

    #[error("signing failed: {0}")]
    Signing(#[from] SignError),

    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl ExecutionError {
    /// Physical dispatches made before the call gave up, where known.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ExecutionError::Transport { attempts, .. }
            | ExecutionError::Throttled { attempts, .. }
            | ExecutionError::NonReplayableBody { attempts }
            | ExecutionError::Cancelled { attempts } => Some(*attempts),
            _ => None,
        }
    }
}
