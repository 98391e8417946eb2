//! State Hashing for Verification
//!
//! Provides deterministic hashing of game state for:
//! - Replay validation (same seed + same actions => same hash)
//! - Cheap equality checks in logs and tests

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Domain tag for game state hashes.
pub const STATE_DOMAIN: &[u8] = b"HEXHOLD_STATE_V1";

/// Deterministic hasher with a domain separator.
///
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with the canonical binary encoding of a serializable value.
    pub fn update_serialized<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), bincode::Error> {
        let bytes = bincode::serialize(value)?;
        self.update_u64(bytes.len() as u64);
        self.hasher.update(&bytes);
        Ok(())
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Hash a serializable value under a domain tag.
pub fn hash_serializable<T: Serialize + ?Sized>(domain: &[u8], value: &T) -> Result<StateHash, bincode::Error> {
    let mut hasher = StateHasher::new(domain);
    hasher.update_serialized(value)?;
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_separation() {
        let a = hash_serializable(STATE_DOMAIN, &7u32).unwrap();
        let b = hash_serializable(b"OTHER_DOMAIN", &7u32).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, hash_serializable(STATE_DOMAIN, &7u32).unwrap());
    }

    #[test]
    fn test_hash_serializable_is_stable() {
        let value = vec![(1u32, "one".to_string()), (2, "two".to_string())];
        let h1 = hash_serializable(STATE_DOMAIN, &value).unwrap();
        let h2 = hash_serializable(STATE_DOMAIN, &value.clone()).unwrap();
        assert_eq!(h1, h2);

        let other = vec![(2u32, "two".to_string()), (1, "one".to_string())];
        assert_ne!(h1, hash_serializable(STATE_DOMAIN, &other).unwrap());
    }

    #[test]
    fn test_serialized_updates_are_length_prefixed() {
        // ["ab"] then ["c"] must not collide with ["a"] then ["bc"].
        let mut a = StateHasher::new(STATE_DOMAIN);
        a.update_serialized("ab").unwrap();
        a.update_serialized("c").unwrap();
        let mut b = StateHasher::new(STATE_DOMAIN);
        b.update_serialized("a").unwrap();
        b.update_serialized("bc").unwrap();
        assert_ne!(a.finalize(), b.finalize());
    }
}
