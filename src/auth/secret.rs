//! Per-user signing secret generation.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Returns `len` random alphanumeric characters (about 5.95 bits each).
///
/// Uses the thread-local CSPRNG, which is seeded from the OS.
pub fn generate_secret(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
