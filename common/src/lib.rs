//! Tally Common Types
//!
//! Shared types used across the tally sync core: the currency registry,
//! exchange-rate source registry, rate types, account-source identifiers,
//! and the cooperative cancellation flag.

pub mod cancel;
pub mod currency;
pub mod rates;
pub mod sources;
pub mod time;

pub use cancel::*;
pub use currency::*;
pub use rates::*;
pub use sources::*;
pub use time::*;
