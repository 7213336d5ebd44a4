//! layerkit-util - Utility functions shared by the layerkit crates.
//!
//! Provides structural JSON comparison and random opaque identifiers.

pub mod json_equal;
pub mod random;

// Re-exports for convenience
pub use json_equal::{deep_equal, deep_equal_ignoring};
pub use random::{random_id, random_string, DEFAULT_ID_LENGTH};
