//! Bitfinex request signing.

use hmac::{Hmac, Mac};
use sha2::Sha384;
use tally_common::SourceId;

use crate::error::{CredentialsError, CredentialsResult};
use crate::provider::{CredentialProvider, SignRequest};

/// Credentials for the Bitfinex v2 API.
///
/// The signature is an HMAC-SHA384 over `"/api/{path}{nonce}{body}"`,
/// hex encoded.
pub struct BitfinexCredentials {
    key: String,
    secret: Vec<u8>,
}

impl BitfinexCredentials {
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

impl CredentialProvider for BitfinexCredentials {
    fn source(&self) -> SourceId {
        SourceId::Bitfinex
    }

    fn auth_headers(&self, request: &SignRequest<'_>) -> CredentialsResult<Vec<(String, String)>> {
        let body = request.body.unwrap_or("");
        let nonce = request.timestamp;
        let message = format!("/api/{}{}{}", request.path, nonce, body);

        let mut mac = Hmac::<Sha384>::new_from_slice(&self.secret)
            .map_err(|e| CredentialsError::Signing(e.to_string()))?;
        mac.update(message.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(vec![
            ("bfx-apikey".to_string(), self.key.clone()),
            ("bfx-nonce".to_string(), nonce.to_string()),
            ("bfx-signature".to_string(), signature),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_secret() {
        assert!(matches!(
            BitfinexCredentials::new("key", ""),
            Err(CredentialsError::InvalidSecret(_))
        ));
    }

    #[test]
    fn test_signature_is_hex_and_deterministic() {
        let creds = BitfinexCredentials::new("key", "secret").unwrap();
        let request = SignRequest::new("POST", "v2/auth/r/wallets").with_timestamp(1_500_000_000.0);

        let first = creds.auth_headers(&request).unwrap();
        let second = creds.auth_headers(&request).unwrap();
        assert_eq!(first, second);

        let signature = &first[2].1;
        // SHA-384 digest is 48 bytes.
        assert_eq!(signature.len(), 96);
        assert!(hex::decode(signature).is_ok());
    }

    #[test]
    fn test_different_secrets_differ() {
        let request = SignRequest::new("POST", "v2/auth/r/wallets").with_timestamp(1_500_000_000.0);
        let a = BitfinexCredentials::new("key", "secret-a").unwrap();
        let b = BitfinexCredentials::new("key", "secret-b").unwrap();
        assert_ne!(
            a.auth_headers(&request).unwrap()[2],
            b.auth_headers(&request).unwrap()[2]
        );
    }
}
