use super::FailureKind;
use crate::http::{HttpHeaders, LogicalRequest, QueryString};
use url::Url;

/// Query parameters and headers as the caller built them, captured once
/// before the first attempt.
#[derive(Debug, Clone)]
pub struct OriginalState {
    query: QueryString,
    headers: HttpHeaders,
}

impl OriginalState {
    pub fn capture(request: &LogicalRequest) -> Self {
        Self {
            query: request.query().clone(),
            headers: request.headers().clone(),
        }
    }

    /// Drop whatever signing or a previous attempt attached.
    pub fn restore_onto(&self, request: &mut LogicalRequest) {
        request.set_query(self.query.clone());
        request.set_headers(self.headers.clone());
    }
}

/// Per-call loop bookkeeping; never shared between logical calls.
///
/// Redirect hops are dispatched like any other attempt but are refunded from
/// the retry budget, so [`RetryState::attempt`] only counts real tries.
#[derive(Debug, Default)]
pub struct RetryState {
    dispatches: u32,
    redirects: u32,
    last_failure: Option<FailureKind>,
    redirect_target: Option<Url>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts counted against the retry budget.
    pub fn attempt(&self) -> u32 {
        self.dispatches - self.redirects
    }

    /// Every request put on the wire, redirect hops included.
    pub fn dispatches(&self) -> u32 {
        self.dispatches
    }

    pub fn redirects(&self) -> u32 {
        self.redirects
    }

    pub fn last_failure(&self) -> Option<FailureKind> {
        self.last_failure
    }

    pub(crate) fn begin_dispatch(&mut self) {
        self.dispatches += 1;
    }

    pub(crate) fn record_failure(&mut self, kind: FailureKind) {
        self.last_failure = Some(kind);
    }

    /// Pending retry, if the previous attempt failed. Clears it.
    pub(crate) fn take_failure(&mut self) -> Option<FailureKind> {
        self.last_failure.take()
    }

    pub(crate) fn record_redirect(&mut self, target: Url) {
        self.redirects += 1;
        self.redirect_target = Some(target);
    }

    /// Pending redirect target. Cleared once taken.
    pub(crate) fn take_redirect(&mut self) -> Option<Url> {
        self.redirect_target.take()
    }
}
