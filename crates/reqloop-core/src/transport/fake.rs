//! Scripted in-memory transport for executor tests.
//!
//! Replies are served in order; every dispatched request is recorded, and
//! each entity stream reports when it is dropped so tests can assert that no
//! stream outlives its attempt.

use super::{Transport, TransportError, TransportErrorKind, TransportRequest, TransportResponse};
use crate::http::{HttpHeaders, Method};
use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

pub(crate) enum Scripted {
    Fail(TransportErrorKind),
    Reply {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: Vec<u8>,
    },
    /// Headers arrive, then the entity read fails.
    BrokenEntity { status: u16, kind: io::ErrorKind },
}

impl Scripted {
    pub(crate) fn status(status: u16) -> Self {
        Scripted::Reply {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub(crate) fn ok(body: &str) -> Self {
        Scripted::Reply {
            status: 200,
            headers: vec![("Content-Type", "text/plain".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    pub(crate) fn redirect(status: u16, location: &str) -> Self {
        Scripted::Reply {
            status,
            headers: vec![("Location", location.to_string())],
            body: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SentRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

struct TrackedEntity {
    inner: Cursor<Vec<u8>>,
    fail_with: Option<io::ErrorKind>,
    closed: Arc<AtomicUsize>,
}

impl Read for TrackedEntity {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.fail_with {
            Some(kind) => Err(io::Error::new(kind, "entity stream broke")),
            None => self.inner.read(buf),
        }
    }
}

impl Drop for TrackedEntity {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<SentRequest>>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    pub(crate) fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn dispatches(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub(crate) fn opened_entities(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed_entities(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn entity(&self, body: Vec<u8>, fail_with: Option<io::ErrorKind>) -> TrackedEntity {
        self.opened.fetch_add(1, Ordering::SeqCst);
        TrackedEntity {
            inner: Cursor::new(body),
            fail_with,
            closed: Arc::clone(&self.closed),
        }
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: TransportRequest<'_>) -> Result<TransportResponse, TransportError> {
        let mut body = Vec::new();
        if let Some(b) = request.body {
            b.read_to_end(&mut body)?;
        }
        self.sent.lock().unwrap().push(SentRequest {
            method: request.method,
            url: request.url.clone(),
            headers: request.headers.clone(),
            body,
        });

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted transport ran out of replies");
        match next {
            Scripted::Fail(kind) => Err(TransportError::new(kind, "scripted failure")),
            Scripted::Reply {
                status,
                headers,
                body,
            } => {
                let mut h = HttpHeaders::new();
                for (name, value) in headers {
                    h.add(name, value);
                }
                Ok(TransportResponse::new(status, h).with_entity(self.entity(body, None)))
            }
            Scripted::BrokenEntity { status, kind } => Ok(TransportResponse::new(
                status,
                HttpHeaders::new(),
            )
            .with_entity(self.entity(Vec::new(), Some(kind)))),
        }
    }
}
