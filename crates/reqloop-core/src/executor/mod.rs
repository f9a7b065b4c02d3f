//! The retry loop.
//!
//! [`RequestExecutor::execute`] drives one logical call across physical
//! attempts. Before every attempt after the first it puts the caller's
//! original query and headers back, backs off if the previous attempt
//! failed, rewinds the body, and signs again. Redirects loop straight back
//! without backoff and without spending retry budget. Every transport entity
//! is dropped before the loop moves on or returns.

mod error;
mod outcome;

pub use error::ExecutionError;
pub use outcome::AttemptOutcome;

use crate::control::CancelToken;
use crate::http::{LogicalRequest, Response};
use crate::redirect::{self, RedirectDecision, DEFAULT_MAX_REDIRECTS};
use crate::retry::{
    clamp_to_ceiling, classify_io_error, classify_status, BackoffPolicy, ExponentialBackoff,
    Failure, FailureKind, OriginalState, RetryClassifier, RetryDecision, RetryState,
};
use crate::signer::{Credential, DigestSigner, RequestSigner};
use crate::transport::{Transport, TransportRequest};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Executes logical requests against a transport with signing, retry and
/// redirect following.
///
/// Holds configuration only; every call keeps its own [`RetryState`] and
/// [`OriginalState`], so one executor can serve many threads at once.
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    signer: Arc<dyn RequestSigner>,
    credential: Option<Credential>,
    classifier: RetryClassifier,
    backoff: Option<Arc<dyn BackoffPolicy>>,
    default_backoff: ExponentialBackoff,
    max_redirects: u32,
}

pub struct RequestExecutorBuilder {
    inner: RequestExecutor,
}

impl RequestExecutorBuilder {
    pub fn signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.inner.signer = signer;
        self
    }

    /// Without a credential requests go out unsigned.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.inner.credential = Some(credential);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.inner.classifier = RetryClassifier::new(max_retries);
        self
    }

    pub fn max_redirects(mut self, max_redirects: u32) -> Self {
        self.inner.max_redirects = max_redirects;
        self
    }

    /// Tuned parameters for the built-in exponential policy.
    pub fn default_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.inner.default_backoff = backoff;
        self
    }

    /// Replace the built-in policy entirely.
    pub fn backoff_policy(mut self, policy: Arc<dyn BackoffPolicy>) -> Self {
        self.inner.backoff = Some(policy);
        self
    }

    pub fn build(self) -> RequestExecutor {
        self.inner
    }
}

impl RequestExecutor {
    pub fn builder(transport: Arc<dyn Transport>) -> RequestExecutorBuilder {
        RequestExecutorBuilder {
            inner: RequestExecutor {
                transport,
                signer: Arc::new(DigestSigner::new()),
                credential: None,
                classifier: RetryClassifier::default(),
                backoff: None,
                default_backoff: ExponentialBackoff::default(),
                max_redirects: DEFAULT_MAX_REDIRECTS,
            },
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.classifier.max_retries()
    }

    pub fn set_max_retries(&mut self, max_retries: u32) {
        self.classifier = RetryClassifier::new(max_retries);
    }

    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    /// The policy in effect: the custom one if set, else the built-in.
    pub fn backoff_policy(&self) -> &dyn BackoffPolicy {
        match &self.backoff {
            Some(policy) => &**policy,
            None => &self.default_backoff,
        }
    }

    /// `None` restores the built-in exponential policy.
    pub fn set_backoff_policy(&mut self, policy: Option<Arc<dyn BackoffPolicy>>) {
        self.backoff = policy;
    }

    pub fn execute(&self, request: LogicalRequest) -> Result<Response, ExecutionError> {
        self.execute_with_cancel(request, &CancelToken::new())
    }

    /// Like [`execute`](Self::execute), but a cancel on `cancel` during a
    /// backoff sleep ends the call with [`ExecutionError::Cancelled`].
    pub fn execute_with_cancel(
        &self,
        mut request: LogicalRequest,
        cancel: &CancelToken,
    ) -> Result<Response, ExecutionError> {
        validate(&request)?;
        let original = OriginalState::capture(&request);
        let mut state = RetryState::new();

        loop {
            if let Some(target) = state.take_redirect() {
                tracing::debug!(
                    location = %target,
                    redirects = state.redirects(),
                    "following redirect"
                );
                request.set_target(target);
                original.restore_onto(&mut request);
            } else if let Some(kind) = state.take_failure() {
                original.restore_onto(&mut request);
                let attempt = state.attempt();
                let delay = self.delay(attempt, kind);
                let delay_ms = delay.as_millis() as u64;
                tracing::debug!(attempt, kind = %kind, delay_ms, "backing off before retry");
                if !cancel.sleep(delay) {
                    tracing::info!(attempts = state.dispatches(), "cancelled during backoff");
                    return Err(ExecutionError::Cancelled {
                        attempts: state.dispatches(),
                    });
                }
            }

            if state.dispatches() > 0 {
                rewind_entity(&mut request, &state)?;
            }
            if let Some(credential) = &self.credential {
                self.signer.sign(&mut request, credential)?;
            }

            state.begin_dispatch();
            match self.attempt(&mut request, &state) {
                AttemptOutcome::Success(response) => return Ok(response),
                AttemptOutcome::Redirect(target) => {
                    if state.redirects() >= self.max_redirects {
                        tracing::warn!(redirects = state.redirects(), "redirect limit reached");
                        return Err(ExecutionError::TooManyRedirects {
                            redirects: state.redirects(),
                        });
                    }
                    state.record_redirect(target);
                }
                AttemptOutcome::RetryableFailure(failure) => state.record_failure(failure.kind()),
                AttemptOutcome::TerminalFailure(err) => return Err(err),
            }
        }
    }

    fn delay(&self, attempt: u32, last_failure: FailureKind) -> Duration {
        clamp_to_ceiling(self.backoff_policy().delay(attempt, last_failure))
    }

    /// One dispatch. The transport entity is either dropped here (redirects)
    /// or consumed by [`Response::read_from`], so nothing stays open once
    /// this returns.
    fn attempt(&self, request: &mut LogicalRequest, state: &RetryState) -> AttemptOutcome {
        let url = request.url();
        let (method, headers, body) = request.dispatch_parts();
        let sent = self.transport.send(TransportRequest {
            method,
            url: url.clone(),
            headers,
            body,
        });
        let response = match sent {
            Ok(response) => response,
            Err(e) => return self.after_failure(request, Failure::Transport(e), None, state),
        };

        match redirect::decide(response.status, &response.headers, &url) {
            Ok(RedirectDecision::Follow(target)) => return AttemptOutcome::Redirect(target),
            Ok(RedirectDecision::DoNotFollow) => {}
            Err(e) => {
                let location = response.headers.get("Location").unwrap_or_default();
                tracing::warn!(location, error = %e, "unparseable redirect location");
                return AttemptOutcome::TerminalFailure(ExecutionError::InvalidRedirect {
                    location: location.to_string(),
                });
            }
        }

        let response = match Response::read_from(response) {
            Ok(response) => response,
            Err(e) => return self.after_failure(request, classify_io_error(e), None, state),
        };
        match classify_status(response.status()) {
            None => AttemptOutcome::Success(response),
            Some(failure) => self.after_failure(request, failure, Some(response), state),
        }
    }

    fn after_failure(
        &self,
        request: &LogicalRequest,
        failure: Failure,
        response: Option<Response>,
        state: &RetryState,
    ) -> AttemptOutcome {
        let attempt = state.attempt();
        let attempts = state.dispatches();
        let kind = failure.kind();
        let decision = match failure {
            // 5xx is gated on budget and replayability only; past that it
            // goes back to the caller as a normal response.
            Failure::Server { .. } => {
                if !self.classifier.has_budget(attempt) {
                    RetryDecision::BudgetExhausted
                } else if !self.classifier.can_replay(request) {
                    RetryDecision::NonReplayableBody
                } else {
                    RetryDecision::Retry
                }
            }
            _ => self.classifier.decide(request, &failure, attempt),
        };

        if decision == RetryDecision::Retry {
            tracing::warn!(attempt, kind = %kind, error = %failure, "attempt failed, will retry");
            return AttemptOutcome::RetryableFailure(failure);
        }
        tracing::warn!(
            attempt,
            kind = %kind,
            error = %failure,
            ?decision,
            "attempt failed, not retrying"
        );
        if decision == RetryDecision::BudgetExhausted {
            tracing::info!(attempts, kind = %kind, "retry budget exhausted");
        }

        let error = match (failure, response) {
            (Failure::Server { .. }, Some(response)) => return AttemptOutcome::Success(response),
            (Failure::Transport(source), _)
                if decision != RetryDecision::NonReplayableBody
                    || !source.kind().is_connectivity() =>
            {
                ExecutionError::Transport { attempts, source }
            }
            (Failure::Throttled { status }, _) if decision != RetryDecision::NonReplayableBody => {
                ExecutionError::Throttled { attempts, status }
            }
            _ => ExecutionError::NonReplayableBody { attempts },
        };
        AttemptOutcome::TerminalFailure(error)
    }
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("credential", &self.credential)
            .field("max_retries", &self.classifier.max_retries())
            .field("max_redirects", &self.max_redirects)
            .field("custom_backoff", &self.backoff.is_some())
            .field("default_backoff", &self.default_backoff)
            .finish()
    }
}

fn validate(request: &LogicalRequest) -> Result<(), ExecutionError> {
    let target = request.target();
    if !matches!(target.scheme(), "http" | "https") {
        return Err(ExecutionError::InvalidArgument(format!(
            "unsupported scheme '{}' in {}",
            target.scheme(),
            target
        )));
    }
    if target.host_str().map_or(true, str::is_empty) {
        return Err(ExecutionError::InvalidArgument(format!(
            "target has no host: {}",
            target
        )));
    }
    if let Some(name) = request
        .headers()
        .names()
        .find(|name| name.is_empty() || !name.bytes().all(is_token_byte))
    {
        return Err(ExecutionError::InvalidArgument(format!(
            "invalid header name {:?}",
            name
        )));
    }
    Ok(())
}

/// RFC 9110 `tchar`.
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn rewind_entity(request: &mut LogicalRequest, state: &RetryState) -> Result<(), ExecutionError> {
    if let Some(body) = request.entity_mut() {
        if let Err(e) = body.rewind() {
            tracing::warn!(attempt = state.attempt(), error = %e, "cannot resend request body");
            return Err(ExecutionError::NonReplayableBody {
                attempts: state.dispatches(),
            });
        }
    }
    Ok(())
}
