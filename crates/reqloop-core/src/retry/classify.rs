//! Decide whether a failed attempt may be retried.

use super::Failure;
use crate::http::LogicalRequest;
use crate::transport::TransportError;
use std::io;

pub const DEFAULT_MAX_RETRIES: u32 = 4;

/// Outcome of [`RetryClassifier::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    /// `attempt` is past the configured maximum.
    BudgetExhausted,
    /// The request entity cannot be rewound for a resend.
    NonReplayableBody,
    /// The failure kind is never retried.
    NotRetryable,
}

/// Retry gate. Budget and replayability are checked first because they are
/// absolute; failure kind only matters once both pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryClassifier {
    max_retries: u32,
}

impl Default for RetryClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryClassifier {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// True while `attempt` is within the retry budget.
    pub fn has_budget(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    /// True unless the request would send a body that cannot be rewound.
    pub fn can_replay(&self, request: &LogicalRequest) -> bool {
        request.entity().map_or(true, |body| body.is_replayable())
    }

    pub fn decide(&self, request: &LogicalRequest, failure: &Failure, attempt: u32) -> RetryDecision {
        if !self.has_budget(attempt) {
            return RetryDecision::BudgetExhausted;
        }
        if !self.can_replay(request) {
            return RetryDecision::NonReplayableBody;
        }
        match failure {
            Failure::Transport(e) if e.kind().is_connectivity() => RetryDecision::Retry,
            Failure::Throttled { .. } => RetryDecision::Retry,
            _ => RetryDecision::NotRetryable,
        }
    }

    /// `attempt` is the number of attempts made so far, including the failed one.
    pub fn should_retry(&self, request: &LogicalRequest, failure: &Failure, attempt: u32) -> bool {
        self.decide(request, failure, attempt) == RetryDecision::Retry
    }
}

/// Classify an HTTP status into a failure, or `None` when the response
/// should be handed to the caller as-is.
pub fn classify_status(status: u16) -> Option<Failure> {
    match status {
        429 => Some(Failure::Throttled { status }),
        500..=599 => Some(Failure::Server { status }),
        _ => None,
    }
}

/// Classify an I/O error raised while draining a response entity. A stream
/// that times out or is reset mid-body is a connectivity failure like any
/// other.
pub fn classify_io_error(err: io::Error) -> Failure {
    Failure::Transport(TransportError::from(err))
}
