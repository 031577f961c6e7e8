//! ammoscope-common: Record model, tier labels, errors shared by all Ammoscope crates.

pub mod error;
pub mod record;
pub mod tier;

// Re-export commonly used types
pub use error::{AmmoscopeError, FieldTypeError, Result};
pub use record::{fields, flatten_nested, AmmoRecord, Document, MinBuyPrice, TradeOffer, NOT_AVAILABLE};
pub use tier::Tier;
