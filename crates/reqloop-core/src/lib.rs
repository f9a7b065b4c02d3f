//! Resilient HTTP request execution: per-attempt signing, retry with
//! exponential backoff, and redirect following over a pluggable transport.

pub mod config;
pub mod control;
pub mod executor;
pub mod http;
pub mod logging;
pub mod redirect;
pub mod retry;
pub mod signer;
pub mod transport;

pub use control::CancelToken;
pub use executor::{AttemptOutcome, ExecutionError, RequestExecutor, RequestExecutorBuilder};
pub use http::{HttpHeaders, LogicalRequest, Method, QueryString, RequestBody, Response};
pub use signer::{AuthScheme, Credential, RequestSigner};
