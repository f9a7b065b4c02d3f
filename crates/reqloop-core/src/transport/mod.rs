//! Transport boundary: how a single attempt reaches the network.
//!
//! The executor never configures connections itself. It hands a
//! [`TransportRequest`] to whatever [`Transport`] it was built with and gets
//! back either a [`TransportResponse`] carrying a live entity stream or a
//! [`TransportError`] tagged with a [`TransportErrorKind`] for retry
//! classification.

mod curl;
#[cfg(test)]
pub(crate) mod fake;

pub use self::curl::{CurlOptions, CurlTransport, ProxySettings};

use crate::http::{HttpHeaders, Method, RequestBody};
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use url::Url;

/// One physical dispatch, borrowing headers and body from the logical request.
pub struct TransportRequest<'a> {
    pub method: Method,
    pub url: Url,
    pub headers: &'a HttpHeaders,
    pub body: Option<&'a mut RequestBody>,
}

impl fmt::Debug for TransportRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}

/// Raw response from the transport. Dropping it closes the entity stream.
pub struct TransportResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub entity: Option<Box<dyn Read + Send>>,
}

impl TransportResponse {
    pub fn new(status: u16, headers: HttpHeaders) -> Self {
        Self {
            status,
            headers,
            entity: None,
        }
    }

    pub fn with_entity<R: Read + Send + 'static>(mut self, entity: R) -> Self {
        self.entity = Some(Box::new(entity));
        self
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("entity", &self.entity.is_some())
            .finish()
    }
}

/// Coarse cause of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connect or read timed out.
    Timeout,
    /// Could not establish a connection (refused, DNS, proxy).
    Connect,
    /// Connection dropped mid-exchange.
    ConnectionReset,
    /// Server closed the connection without sending a response.
    NoResponse,
    /// Anything else (TLS setup, malformed URL, local body read failure).
    Other,
}

impl TransportErrorKind {
    /// Connectivity failures are the retryable ones.
    pub fn is_connectivity(self) -> bool {
        !matches!(self, TransportErrorKind::Other)
    }

    /// Map an I/O error (e.g. while draining an entity) to a kind.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportErrorKind::Timeout,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => TransportErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable => TransportErrorKind::Connect,
            io::ErrorKind::UnexpectedEof => TransportErrorKind::NoResponse,
            _ => TransportErrorKind::Other,
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::ConnectionReset => "connection reset",
            TransportErrorKind::NoResponse => "no response",
            TransportErrorKind::Other => "transport",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::new(TransportErrorKind::from_io(&err), err.to_string()).with_source(err)
    }
}

/// Sends one request and returns the raw response.
///
/// Implementations must be safe to share across threads: concurrent logical
/// calls on one executor all go through the same transport.
pub trait Transport: Send + Sync {
    fn send(&self, request: TransportRequest<'_>) -> Result<TransportResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: TransportRequest<'_>) -> Result<TransportResponse, TransportError> {
        (**self).send(request)
    }
}
