//! Fallback Scramble Pool
//!
//! Pre-vetted 20-move 3x3 scrambles used when the official random-state
//! scrambler cannot be reached.

use std::sync::OnceLock;

use crate::core::rng::DeterministicRng;
use crate::scramble::moves::ScrambleSequence;

/// Static fallback scrambles in notation form.
pub const FALLBACK_SCRAMBLES: &[&str] = &[
    "F' L B U' D2 R' F L' B U L' D' U B2 F2 L' R' B L2 F",
    "L F2 U F' R U' B' L2 R F B2 L2 F L' F2 U2 B' D R' U",
    "F' R B' D2 F2 L' F' U2 F L' D L2 R2 U' L2 B2 D' L B2 F2",
    "F U R L' D2 F L' D L2 D U2 L2 D' U' L D F' L B2 F",
    "U B' U R' B2 D2 U2 F' R2 F2 R F L F R2 L2 D R D' L'",
    "D' F' D2 F B' U2 R' F2 U2 B U' L2 U2 B2 U' R F' D' R' L2",
    "L' F' L2 B2 L2 R' F2 D U B2 F2 L' D' B' U F L2 U B L'",
    "L2 R2 U' D B2 L F' R2 U2 D' B2 F2 D2 B' R2 U B R2 L' U'",
    "B L R' U' D' R2 L B D' R' B2 U' B2 U B2 L F2 B2 U' B'",
    "F' D2 F R L2 B2 U' D' B U' F D2 R2 F U2 R' D' B F D2",
    "B2 R' L F2 D' L2 B2 U' D2 F' R2 B' U L U B D R' L D",
    "U B R2 U' L2 U2 R' L2 B2 F U' L' B' D R' U2 R' U F R'",
];

/// Parsed fallback pool.
pub fn fallback_pool() -> &'static [ScrambleSequence] {
    static POOL: OnceLock<Vec<ScrambleSequence>> = OnceLock::new();
    POOL.get_or_init(|| {
        FALLBACK_SCRAMBLES
            .iter()
            .filter_map(|text| text.parse().ok())
            .collect()
    })
}

/// Uniformly random fallback scramble.
pub fn fallback_scramble(rng: &mut DeterministicRng) -> Option<ScrambleSequence> {
    rng.choose(fallback_pool()).cloned()
}
