//! Keyed digest signing.
//!
//! Every signature covers the method, path, query, all headers and a SHA-256
//! of the payload, and is scoped to a date and a fresh nonce. The signing key
//! is derived from the secret by chaining HMAC-SHA256 over date, nonce and a
//! fixed terminator.

use super::{Credential, RequestSigner, SignError};
use crate::http::{HttpHeaders, LogicalRequest};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

pub const DATE_HEADER: &str = "X-Request-Date";
pub const NONCE_HEADER: &str = "X-Request-Nonce";
pub const CONTENT_DIGEST_HEADER: &str = "X-Content-SHA256";

const ALGORITHM: &str = "RQL1-HMAC-SHA256";
const KEY_PREFIX: &str = "RQL1";
const SCOPE_TERMINATOR: &str = "rql1_request";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

#[derive(Debug, Clone, Default)]
pub struct DigestSigner {
    #[cfg(test)]
    fixed: Option<(DateTime<Utc>, String)>,
}

impl DigestSigner {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn at(now: DateTime<Utc>, nonce: &str) -> Self {
        Self {
            fixed: Some((now, nonce.to_string())),
        }
    }

    fn now_and_nonce(&self) -> (DateTime<Utc>, String) {
        #[cfg(test)]
        if let Some((now, nonce)) = &self.fixed {
            return (*now, nonce.clone());
        }
        (Utc::now(), format!("{:032x}", fastrand::u128(..)))
    }
}

impl RequestSigner for DigestSigner {
    fn sign(&self, request: &mut LogicalRequest, credential: &Credential) -> Result<(), SignError> {
        if credential.id().is_empty() || credential.secret().is_empty() {
            return Err(SignError::InvalidCredential("id and secret are required".to_string()));
        }
        let (now, nonce) = self.now_and_nonce();
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let host = host_header(request.target())?;
        let payload_digest = match request.entity() {
            Some(body) => match body.as_bytes() {
                Some(bytes) => sha256_hex(bytes),
                None => UNSIGNED_PAYLOAD.to_string(),
            },
            None => sha256_hex(b""),
        };

        let headers = request.headers_mut();
        headers.remove("Authorization");
        headers.set("Host", host);
        headers.set(DATE_HEADER, timestamp.as_str());
        headers.set(NONCE_HEADER, nonce.as_str());
        headers.set(CONTENT_DIGEST_HEADER, payload_digest.as_str());

        let (canonical_headers, signed_headers) = canonical_headers(request.headers());
        let canonical_request = [
            request.method().as_str().to_string(),
            canonical_path(request.target()),
            canonical_query(&request.url()),
            canonical_headers,
            signed_headers.clone(),
            payload_digest,
        ]
        .join("\n");

        let scope = format!("{}/{}/{}", date, nonce, SCOPE_TERMINATOR);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            timestamp,
            scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let secret = format!("{}{}", KEY_PREFIX, credential.secret());
        let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
        let k_nonce = hmac_sha256(&k_date, nonce.as_bytes())?;
        let k_signing = hmac_sha256(&k_nonce, SCOPE_TERMINATOR.as_bytes())?;
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

        request.headers_mut().set(
            "Authorization",
            format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM,
                credential.id(),
                scope,
                signed_headers,
                signature
            ),
        );
        Ok(())
    }
}

fn host_header(target: &Url) -> Result<String, SignError> {
    let host = target
        .host_str()
        .ok_or_else(|| SignError::InvalidRequest(format!("target has no host: {}", target)))?;
    Ok(match target.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Every query pair that goes on the wire, including any carried by the
/// target itself, sorted and form-encoded.
fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    pairs.sort();
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn canonical_path(target: &Url) -> String {
    match target.path() {
        "" => "/".to_string(),
        p => p.to_string(),
    }
}

/// `name:v1,v2\n` lines sorted by lowercase name, plus the `;`-joined names.
fn canonical_headers(headers: &HttpHeaders) -> (String, String) {
    let mut names: Vec<String> = headers.names().map(str::to_ascii_lowercase).collect();
    names.sort();
    let mut canonical = String::new();
    for name in &names {
        let values: Vec<&str> = headers.get_all(name).iter().map(|v| v.trim()).collect();
        canonical.push_str(name);
        canonical.push(':');
        canonical.push_str(&values.join(","));
        canonical.push('\n');
    }
    (canonical, names.join(";"))
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SignError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| SignError::InvalidCredential(format!("signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, RequestBody};
    use chrono::TimeZone;

    fn fixed_signer() -> DigestSigner {
        DigestSigner::at(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            "a43a9d25-ab06-421e-8605-33fd1e760825",
        )
    }

    #[test]
    fn hmac_matches_rfc4231_case_2() {
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn sign_sets_date_nonce_digest_and_authorization() {
        let mut req = LogicalRequest::parse(Method::Get, "https://api.example.com:8443/v1/tenants/current")
            .unwrap()
            .with_query("expand", "directories");
        fixed_signer()
            .sign(&mut req, &Credential::new("MyId", "Shush!"))
            .unwrap();

        let h = req.headers();
        assert_eq!(h.get("Host"), Some("api.example.com:8443"));
        assert_eq!(h.get(DATE_HEADER), Some("20240301T123000Z"));
        assert_eq!(h.get(NONCE_HEADER), Some("a43a9d25-ab06-421e-8605-33fd1e760825"));
        assert_eq!(
            h.get(CONTENT_DIGEST_HEADER),
            Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
        let auth = h.get("Authorization").unwrap();
        assert!(auth.starts_with(
            "RQL1-HMAC-SHA256 Credential=MyId/20240301/a43a9d25-ab06-421e-8605-33fd1e760825/rql1_request, "
        ));
        assert!(auth.contains("SignedHeaders=host;x-content-sha256;x-request-date;x-request-nonce,"));
    }

    #[test]
    fn signing_is_deterministic_for_fixed_inputs() {
        let cred = Credential::new("MyId", "Shush!");
        let mut a = LogicalRequest::parse(Method::Get, "https://api.example.com/v1/accounts").unwrap();
        let mut b = LogicalRequest::parse(Method::Get, "https://api.example.com/v1/accounts").unwrap();
        fixed_signer().sign(&mut a, &cred).unwrap();
        fixed_signer().sign(&mut b, &cred).unwrap();
        assert_eq!(a.headers().get("Authorization"), b.headers().get("Authorization"));
    }

    #[test]
    fn resigning_replaces_previous_values() {
        let cred = Credential::new("MyId", "Shush!");
        let mut req = LogicalRequest::parse(Method::Get, "https://api.example.com/v1/accounts").unwrap();
        let signer = DigestSigner::new();
        signer.sign(&mut req, &cred).unwrap();
        let first = req.headers().get("Authorization").unwrap().to_string();
        signer.sign(&mut req, &cred).unwrap();
        assert_eq!(req.headers().get_all("Authorization").len(), 1);
        assert_eq!(req.headers().get_all(NONCE_HEADER).len(), 1);
        assert_ne!(req.headers().get("Authorization").unwrap(), first);
    }

    #[test]
    fn payload_digest_covers_buffered_body_only() {
        let cred = Credential::new("MyId", "Shush!");
        let mut buffered = LogicalRequest::parse(Method::Post, "https://api.example.com/v1/accounts")
            .unwrap()
            .with_body(RequestBody::from_bytes("hello\n"));
        fixed_signer().sign(&mut buffered, &cred).unwrap();
        assert_eq!(
            buffered.headers().get(CONTENT_DIGEST_HEADER),
            Some("5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03")
        );

        let mut streamed = LogicalRequest::parse(Method::Post, "https://api.example.com/v1/accounts")
            .unwrap()
            .with_body(RequestBody::from_stream(std::io::empty(), None));
        fixed_signer().sign(&mut streamed, &cred).unwrap();
        assert_eq!(streamed.headers().get(CONTENT_DIGEST_HEADER), Some(UNSIGNED_PAYLOAD));
    }

    fn authorization_for(url: &str) -> String {
        let mut req = LogicalRequest::parse(Method::Get, url).unwrap();
        fixed_signer()
            .sign(&mut req, &Credential::new("MyId", "Shush!"))
            .unwrap();
        req.headers().get("Authorization").unwrap().to_string()
    }

    #[test]
    fn query_carried_by_target_is_signed() {
        assert_ne!(
            authorization_for("https://api.example.com/v2/res?page=2"),
            authorization_for("https://api.example.com/v2/res?page=3")
        );
    }

    #[test]
    fn target_query_and_query_string_sign_alike() {
        let mut split = LogicalRequest::parse(Method::Get, "https://api.example.com/v2/res?page=2")
            .unwrap()
            .with_query("expand", "groups");
        fixed_signer()
            .sign(&mut split, &Credential::new("MyId", "Shush!"))
            .unwrap();
        assert_eq!(
            split.headers().get("Authorization").unwrap(),
            authorization_for("https://api.example.com/v2/res?expand=groups&page=2")
        );
    }

    #[test]
    fn canonical_query_is_sorted() {
        let url = Url::parse("https://api.example.com/?b=2&a=1&a=0").unwrap();
        assert_eq!(canonical_query(&url), "a=0&a=1&b=2");
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut req = LogicalRequest::parse(Method::Get, "https://api.example.com/").unwrap();
        let err = fixed_signer().sign(&mut req, &Credential::new("id", "")).unwrap_err();
        assert!(matches!(err, SignError::InvalidCredential(_)));
    }
}
