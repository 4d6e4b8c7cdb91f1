//! Tally Credential Providers
//!
//! Uniform request-signing capability over the exchange APIs' keyed-HMAC
//! authentication schemes. Each provider turns a [`SignRequest`] into the
//! auth headers its exchange expects; the hash algorithm and encoding are
//! implementation details behind the [`CredentialProvider`] trait.
//!
//! Credential *storage* (keychain, encrypted store) is out of scope;
//! callers construct providers from already-retrieved key material.

pub mod bitfinex;
pub mod coinbase_gdax;
pub mod error;
pub mod poloniex;
pub mod provider;

pub use bitfinex::BitfinexCredentials;
pub use coinbase_gdax::CoinbaseGdaxCredentials;
pub use error::{CredentialsError, CredentialsResult};
pub use poloniex::PoloniexCredentials;
pub use provider::{unix_now, CredentialProvider, SignRequest};
