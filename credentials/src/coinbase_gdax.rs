//! Coinbase/GDAX request signing.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tally_common::SourceId;

use crate::error::{CredentialsError, CredentialsResult};
use crate::provider::{CredentialProvider, SignRequest};

/// Credentials for the Coinbase/GDAX API.
///
/// The API key's secret is base64 encoded; the signature is an
/// HMAC-SHA256 over `"{timestamp}{METHOD}{path}{body}"`, base64 encoded.
pub struct CoinbaseGdaxCredentials {
    key: String,
    secret: Vec<u8>,
    passphrase: String,
}

impl CoinbaseGdaxCredentials {
    pub fn new(
        key: impl Into<String>,
        secret: &str,
        passphrase: impl Into<String>,
    ) -> CredentialsResult<Self> {
        let secret = BASE64
            .decode(secret)
            .map_err(|_| CredentialsError::InvalidSecret("secret is not base64 encoded"))?;
        Ok(Self {
            key: key.into(),
            secret,
            passphrase: passphrase.into(),
        })
    }
}

impl CredentialProvider for CoinbaseGdaxCredentials {
    fn source(&self) -> SourceId {
        SourceId::CoinbaseGdax
    }

    fn auth_headers(&self, request: &SignRequest<'_>) -> CredentialsResult<Vec<(String, String)>> {
        let body = request.body.unwrap_or("");
        let message = format!(
            "{}{}{}{}",
            request.timestamp,
            request.method.to_uppercase(),
            request.path,
            body
        );

        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| CredentialsError::Signing(e.to_string()))?;
        mac.update(message.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        Ok(vec![
            ("CB-ACCESS-KEY".to_string(), self.key.clone()),
            ("CB-ACCESS-SIGN".to_string(), signature),
            (
                "CB-ACCESS-TIMESTAMP".to_string(),
                request.timestamp.to_string(),
            ),
            ("CB-ACCESS-PASSPHRASE".to_string(), self.passphrase.clone()),
        ])
    }
}
