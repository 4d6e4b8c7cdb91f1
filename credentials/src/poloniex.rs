//! Poloniex request signing.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use tally_common::SourceId;

use crate::error::{CredentialsError, CredentialsResult};
use crate::provider::{CredentialProvider, SignRequest};

/// Credentials for the Poloniex trading API.
///
/// The signature is an HMAC-SHA512 over the url-encoded request body, hex
/// encoded. The nonce lives inside the body, so it participates in the
/// signature through it.
pub struct PoloniexCredentials {
    key: String,
    secret: Vec<u8>,
}

impl PoloniexCredentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> CredentialsResult<Self> {
        let secret = secret.into().into_bytes();
        if secret.is_empty() {
            return Err(CredentialsError::InvalidSecret("secret is empty"));
        }
        Ok(Self {
            key: key.into(),
            secret,
        })
    }
}

impl CredentialProvider for PoloniexCredentials {
    fn source(&self) -> SourceId {
        SourceId::Poloniex
    }

    fn auth_headers(&self, request: &SignRequest<'_>) -> CredentialsResult<Vec<(String, String)>> {
        let body = request.body.unwrap_or("");

        let mut mac = Hmac::<Sha512>::new_from_slice(&self.secret)
            .map_err(|e| CredentialsError::Signing(e.to_string()))?;
        mac.update(body.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(vec![
            ("Key".to_string(), self.key.clone()),
            ("Sign".to_string(), signature),
        ])
    }
}
