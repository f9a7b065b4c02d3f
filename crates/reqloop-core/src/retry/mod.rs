//! Retry and backoff policy.
//!
//! This module encapsulates failure classification (transport connectivity,
//! throttling, server errors), the retry budget, and exponential backoff so
//! the executor loop only has to act on decisions.

mod backoff;
mod classify;
mod failure;
mod state;

pub use backoff::{clamp_to_ceiling, BackoffPolicy, ExponentialBackoff, MAX_BACKOFF};
pub use classify::{classify_io_error, classify_status, RetryClassifier, RetryDecision, DEFAULT_MAX_RETRIES};
pub use failure::{Failure, FailureKind};
pub use state::{OriginalState, RetryState};
