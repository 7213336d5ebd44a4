//! Random opaque identifiers.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the ids handed out to records that carry none of their own.
pub const DEFAULT_ID_LENGTH: usize = 16;

/// Generates a random alphanumeric string of `len` characters.
///
/// # Examples
///
/// ```
/// use layerkit_util::random_string;
///
/// let s = random_string(10);
/// assert_eq!(s.len(), 10);
/// assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generates an opaque feature id of [`DEFAULT_ID_LENGTH`] characters.
pub fn random_id() -> String {
    random_string(DEFAULT_ID_LENGTH)
}
