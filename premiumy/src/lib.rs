//! Premiumy billing API adapter.
//!
//! Fetches message detail records (MDR) through the JSON-RPC `csv` endpoint and
//! normalizes whatever comes back into [`inspector_types::SmsRecord`]s.
//!
//! # Example
//! ```no_run
//! use premiumy::{PremiumyClient, PremiumyConfig};
//!
//! let client = PremiumyClient::new(PremiumyConfig::default()).unwrap();
//! ```

mod client;
pub mod normalize;

pub use client::{
    DEFAULT_API_URL, DEFAULT_PROBE_URL, MDR_METHOD, PremiumyClient, PremiumyConfig,
};
pub use normalize::{parse_csv, parse_response};
