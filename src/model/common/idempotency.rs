use std::fmt::{Display, Formatter};

use data_encoding::HEXLOWER;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Number of random bytes in a key.
const KEY_BYTES: usize = 16;

/// Key attached to a ballot append so that retries land at most once.
///
/// Keys are drawn at random for each successful status transition and carry
/// nothing derived from the voter.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(HEXLOWER.encode(&bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdempotencyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
