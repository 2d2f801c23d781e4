//! Constrained Random-Move Generator
//!
//! Each face is drawn uniformly from the faces still allowed after the
//! previous one or two moves:
//!
//! - not the previous face (`R R` collapses into one turn)
//! - not the previous face's opposite (`R L` commutes, inviting `R L R`)
//! - not the face two back when the previous face is its opposite
//!   (`R L R` reduces to `R2 L`)
//!
//! Filtering the six faces down to the allowed set and drawing from it yields
//! the same distribution as rejection sampling without an unbounded retry
//! loop. Modifiers are uniform and independent of the face.

use serde::{Deserialize, Serialize};

use crate::core::rng::DeterministicRng;
use crate::scramble::moves::{Face, Modifier, Move, ScrambleSequence};

/// Default length for constrained scrambles.
pub const DEFAULT_SCRAMBLE_LENGTH: usize = 25;

/// Why a move breaks the face constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Same face as the previous move.
    SameFace,
    /// Opposite of the previous move's face.
    OppositeFace,
    /// Completes an `X Y X` pattern on one axis.
    AxisSandwich,
}

/// A constraint violation at a given move index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// Index of the offending move.
    pub index: usize,
    /// Rule broken.
    pub kind: ViolationKind,
}

/// Check `candidate` against the previous and second-previous faces.
pub fn check_face(candidate: Face, prev: Option<Face>, before_prev: Option<Face>) -> Option<ViolationKind> {
    let prev = prev?;
    if candidate == prev {
        return Some(ViolationKind::SameFace);
    }
    if let Some(earlier) = before_prev {
        if prev == earlier.opposite() && candidate == earlier {
            return Some(ViolationKind::AxisSandwich);
        }
    }
    if candidate == prev.opposite() {
        return Some(ViolationKind::OppositeFace);
    }
    None
}

/// Every violation in `sequence`, in order.
pub fn violations(sequence: &ScrambleSequence) -> Vec<ConstraintViolation> {
    let moves = sequence.moves();
    moves
        .iter()
        .enumerate()
        .filter_map(|(index, mv)| {
            let prev = index.checked_sub(1).map(|i| moves[i].face);
            let before_prev = index.checked_sub(2).map(|i| moves[i].face);
            check_face(mv.face, prev, before_prev).map(|kind| ConstraintViolation { index, kind })
        })
        .collect()
}

/// Generator for fixed-length constrained scrambles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstrainedGenerator {
    /// Moves per scramble.
    pub length: usize,
}

impl Default for ConstrainedGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_SCRAMBLE_LENGTH,
        }
    }
}

impl ConstrainedGenerator {
    /// Generator producing `length` moves.
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    /// Generate a scramble drawing from `rng`.
    pub fn generate(&self, rng: &mut DeterministicRng) -> ScrambleSequence {
        let mut moves: Vec<Move> = Vec::with_capacity(self.length);

        for _ in 0..self.length {
            let prev = moves.last().map(|m| m.face);
            let before_prev = moves.len().checked_sub(2).map(|i| moves[i].face);

            let mut allowed = [Face::U; 6];
            let mut count = 0;
            for face in Face::ALL {
                if check_face(face, prev, before_prev).is_none() {
                    allowed[count] = face;
                    count += 1;
                }
            }

            // At least three faces always survive the filter.
            let Some(&face) = rng.choose(&allowed[..count]) else {
                break;
            };
            let modifier = rng.choose(&Modifier::ALL).copied().unwrap_or(Modifier::None);
            moves.push(Move::new(face, modifier));
        }

        ScrambleSequence::new(moves)
    }

    /// Generate from a fixed seed.
    pub fn generate_seeded(&self, seed: u64) -> ScrambleSequence {
        self.generate(&mut DeterministicRng::new(seed))
    }
}
