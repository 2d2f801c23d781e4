//! Digest Helpers
//!
//! SHA-256 with domain separation, used to fingerprint leaderboard snapshots
//! so identical rankings can be recognised byte-for-byte across recomputes.

use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes)
pub type DigestBytes = [u8; 32];

/// Domain separator for leaderboard snapshots.
pub const LEADERBOARD_DOMAIN: &[u8] = b"SPEEDCUBE_LEADERBOARD_V1";

/// Incremental hasher with a domain prefix.
pub struct DigestHasher {
    hasher: Sha256,
}

impl DigestHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for leaderboard snapshots.
    pub fn for_leaderboard() -> Self {
        Self::new(LEADERBOARD_DOMAIN)
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> DigestBytes {
        self.hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hasher_determinism() {
        let mut a = DigestHasher::for_leaderboard();
        a.update_u64(42);
        a.update_bytes(b"entries");

        let mut b = DigestHasher::for_leaderboard();
        b.update_u64(42);
        b.update_bytes(b"entries");

        assert_eq!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_domain_separation() {
        let mut a = DigestHasher::new(b"A");
        a.update_bytes(b"same data");
        let mut b = DigestHasher::new(b"B");
        b.update_bytes(b"same data");
        assert_ne!(a.finalize(), b.finalize());
    }
}
