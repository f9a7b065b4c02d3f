//! Default transport backed by libcurl (via the `curl` crate).
//!
//! Redirects are disabled at this level so the executor sees every 3xx and
//! can re-sign the follow-up request itself. Easy handles are pooled so
//! their connection caches survive between attempts.

use super::{Transport, TransportError, TransportErrorKind, TransportRequest, TransportResponse};
use crate::http::{HttpHeaders, Method};
use curl::easy::{Easy, List, ReadError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Cursor, Read};
use std::str;
use std::sync::Mutex;
use std::time::Duration;

/// HTTP proxy to route requests through.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxySettings {
    pub fn requires_authentication(&self) -> bool {
        self.username.is_some()
    }
}

impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Connection settings handed to libcurl. `None` timeouts mean "wait forever".
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Option<Duration>,
    /// Abort when no bytes move for this long (libcurl low-speed limit).
    pub socket_timeout: Option<Duration>,
    pub proxy: Option<ProxySettings>,
    /// Idle handles kept for reuse, and the connection cache size of each.
    pub max_connections_per_host: u32,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            socket_timeout: None,
            proxy: None,
            max_connections_per_host: 10,
        }
    }
}

pub struct CurlTransport {
    options: CurlOptions,
    idle: Mutex<Vec<Easy>>,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self {
            options,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.options
    }

    fn checkout(&self) -> Easy {
        self.idle
            .lock()
            .ok()
            .and_then(|mut idle| idle.pop())
            .unwrap_or_else(Easy::new)
    }

    fn checkin(&self, mut easy: Easy) {
        easy.reset();
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.options.max_connections_per_host as usize {
                idle.push(easy);
            }
        }
    }

    fn apply_options(&self, easy: &mut Easy) -> Result<(), curl::Error> {
        easy.follow_location(false)?;
        easy.max_connects(self.options.max_connections_per_host.max(1))?;
        if let Some(t) = self.options.connect_timeout {
            easy.connect_timeout(t)?;
        }
        if let Some(t) = self.options.socket_timeout {
            easy.low_speed_limit(1)?;
            easy.low_speed_time(t)?;
        }
        if let Some(proxy) = &self.options.proxy {
            easy.proxy(&proxy.host)?;
            easy.proxy_port(proxy.port)?;
            if let Some(user) = &proxy.username {
                easy.proxy_username(user)?;
                easy.proxy_password(proxy.password.as_deref().unwrap_or(""))?;
            }
        }
        Ok(())
    }

    fn perform(
        &self,
        easy: &mut Easy,
        request: TransportRequest<'_>,
    ) -> Result<TransportResponse, curl::Error> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
        } = request;

        easy.url(url.as_str())?;
        self.apply_options(easy)?;

        let mut list = List::new();
        for (name, value) in headers.iter() {
            list.append(&format!("{}: {}", name.trim(), value.trim()))?;
        }
        // No 100-continue round trip; bodies are small API payloads.
        list.append("Expect:")?;

        match method {
            Method::Get => easy.get(true)?,
            Method::Head => easy.nobody(true)?,
            m if m.has_entity() => {
                easy.post(true)?;
                if m != Method::Post {
                    easy.custom_request(m.as_str())?;
                }
                match body.as_ref().map(|b| b.content_length()) {
                    Some(Some(len)) => easy.post_field_size(len)?,
                    Some(None) => list.append("Transfer-Encoding: chunked")?,
                    None => easy.post_fields_copy(&[])?,
                }
            }
            m => easy.custom_request(m.as_str())?,
        }
        easy.http_headers(list)?;

        let mut raw_headers: Vec<String> = Vec::new();
        let mut entity: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    // A new status line (100 Continue, proxy CONNECT) starts a new header block.
                    if line.starts_with("HTTP/") {
                        raw_headers.clear();
                    }
                    raw_headers.push(line.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                entity.extend_from_slice(data);
                Ok(data.len())
            })?;
            if let Some(body) = body {
                transfer.read_function(move |buf| body.read(buf).map_err(|_| ReadError::Abort))?;
            }
            transfer.perform()?;
        }

        let status = easy.response_code()? as u16;
        let mut parsed = HttpHeaders::new();
        for line in &raw_headers {
            parsed.add_raw_line(line);
        }
        Ok(TransportResponse::new(status, parsed).with_entity(Cursor::new(entity)))
    }
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new(CurlOptions::default())
    }
}

impl fmt::Debug for CurlTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurlTransport")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Transport for CurlTransport {
    fn send(&self, request: TransportRequest<'_>) -> Result<TransportResponse, TransportError> {
        let mut easy = self.checkout();
        let result = self.perform(&mut easy, request);
        self.checkin(easy);
        result.map_err(|e| {
            TransportError::new(classify_curl_error(&e), e.description().to_string()).with_source(e)
        })
    }
}

/// Classify a curl error for retry decisions.
pub(crate) fn classify_curl_error(e: &curl::Error) -> TransportErrorKind {
    if e.is_operation_timedout() {
        return TransportErrorKind::Timeout;
    }
    if e.is_couldnt_connect() || e.is_couldnt_resolve_host() || e.is_couldnt_resolve_proxy() {
        return TransportErrorKind::Connect;
    }
    if e.is_recv_error() || e.is_send_error() || e.is_partial_file() {
        return TransportErrorKind::ConnectionReset;
    }
    if e.is_got_nothing() {
        return TransportErrorKind::NoResponse;
    }
    TransportErrorKind::Other
}
