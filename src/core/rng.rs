//! Deterministic Random Number Generator
//!
//! Xorshift128+ seeded through SplitMix64. Scramble generation draws from this
//! generator so a scramble can be reproduced from its seed for audit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use speedcube::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // All-zero state would be a fixed point
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a uniformly distributed integer in `[0, max)`.
    ///
    /// Uses Lemire's widening multiply with rejection, so small ranges such
    /// as face and modifier choices carry no modulo bias.
    pub fn next_below(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        let threshold = max.wrapping_neg() % max;
        loop {
            let m = (self.next_u64() >> 32) * u64::from(max);
            if (m as u32) >= threshold {
                return (m >> 32) as u32;
            }
        }
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            return None;
        }
        let len = u32::try_from(slice.len()).unwrap_or(u32::MAX);
        slice.get(self.next_below(len) as usize)
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Fresh seed or nonce from operating-system entropy.
pub fn entropy_seed() -> u64 {
    rand::random::<u64>()
}

/// Derive a scramble seed for a competition day.
///
/// `nonce` distinguishes regenerations of the same day.
pub fn derive_scramble_seed(date: NaiveDate, nonce: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"SPEEDCUBE_SCRAMBLE_SEED_V1");
    hasher.update(date.to_string().as_bytes());
    hasher.update(nonce.to_le_bytes());
    let hash = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(seed)
}
