//! Request signing.
//!
//! The executor calls a [`RequestSigner`] before every attempt because
//! signatures embed attempt-specific values (timestamps, nonces). Signers
//! mutate the request's headers and query in place; the executor restores
//! the caller's originals before each retry or redirect, so a signer never
//! sees its own output from a previous attempt.

mod basic;
mod digest;

pub use basic::BasicSigner;
pub use digest::{DigestSigner, CONTENT_DIGEST_HEADER, DATE_HEADER, NONCE_HEADER};

use crate::http::LogicalRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// API key id and secret used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    id: String,
    secret: String,
}

impl Credential {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("secret", &"***")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("cannot sign request: {0}")]
    InvalidRequest(String),
}

/// Attaches authentication to a request.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, request: &mut LogicalRequest, credential: &Credential) -> Result<(), SignError>;
}

impl<T: RequestSigner + ?Sized> RequestSigner for Arc<T> {
    fn sign(&self, request: &mut LogicalRequest, credential: &Credential) -> Result<(), SignError> {
        (**self).sign(request, credential)
    }
}

/// Authentication scheme selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    Basic,
    #[default]
    Digest,
}

impl AuthScheme {
    pub fn signer(self) -> Arc<dyn RequestSigner> {
        match self {
            AuthScheme::Basic => Arc::new(BasicSigner),
            AuthScheme::Digest => Arc::new(DigestSigner::new()),
        }
    }
}
