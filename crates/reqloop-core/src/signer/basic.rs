use super::{Credential, RequestSigner, SignError};
use crate::http::LogicalRequest;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// HTTP Basic authentication (`Authorization: Basic base64(id:secret)`).
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicSigner;

impl RequestSigner for BasicSigner {
    fn sign(&self, request: &mut LogicalRequest, credential: &Credential) -> Result<(), SignError> {
        if credential.id().contains(':') {
            return Err(SignError::InvalidCredential(
                "id must not contain ':' for basic authentication".to_string(),
            ));
        }
        let token = STANDARD.encode(format!("{}:{}", credential.id(), credential.secret()));
        request
            .headers_mut()
            .set("Authorization", format!("Basic {}", token));
        Ok(())
    }
}
