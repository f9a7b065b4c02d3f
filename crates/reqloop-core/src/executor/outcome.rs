use super::ExecutionError;
use crate::http::Response;
use crate::retry::Failure;
use url::Url;

/// Result of one physical dispatch.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Hand this response to the caller.
    Success(Response),
    /// Follow to this target without spending retry budget.
    Redirect(Url),
    /// Back off and try again.
    RetryableFailure(Failure),
    TerminalFailure(ExecutionError),
}
