use super::{HttpHeaders, MediaType};
use crate::transport::TransportResponse;
use std::borrow::Cow;
use std::io::{self, Read};

/// Final response handed to the caller. The body is fully buffered so it can
/// be read any number of times after the connection has been released.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HttpHeaders,
    media_type: Option<MediaType>,
    body: Vec<u8>,
    content_length: u64,
}

impl Response {
    pub fn new(status: u16, headers: HttpHeaders, body: Vec<u8>) -> Self {
        let media_type = headers.content_type();
        let content_length = headers.content_length().unwrap_or(body.len() as u64);
        Self {
            status,
            headers,
            media_type,
            body,
            content_length,
        }
    }

    /// Drain the transport entity into memory. The entity stream is dropped
    /// (closed) before this returns, on success and on read failure alike.
    pub(crate) fn read_from(response: TransportResponse) -> io::Result<Self> {
        let TransportResponse {
            status,
            headers,
            entity,
        } = response;
        let mut body = Vec::new();
        if let Some(mut entity) = entity {
            entity.read_to_end(&mut body)?;
        }
        Ok(Self::new(status, headers, body))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// `Content-Length` when the server sent one, otherwise the buffered size.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}
