//! Two-level feature cache: source key, then range key.

mod key;
mod store;

pub use key::source_key;
pub use store::{CacheStats, FeatureCache};
