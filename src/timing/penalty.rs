//! Solve Penalties

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Time added to an attempt by a +2 penalty.
pub const PLUS2_MS: u64 = 2_000;

/// Penalty attached to an attempt.
///
/// Variants are ordered by severity, so `max` picks the harsher one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalty {
    /// Clean solve.
    #[default]
    None,
    /// Two seconds added.
    Plus2,
    /// Did not finish; the attempt has no time.
    Dnf,
}

impl Penalty {
    /// The more severe of `self` and `other`.
    #[inline]
    pub fn escalate(self, other: Penalty) -> Penalty {
        self.max(other)
    }

    /// Whether this penalty voids the attempt.
    #[inline]
    pub fn is_dnf(self) -> bool {
        self == Penalty::Dnf
    }

    /// Apply the penalty to a raw time. `None` for DNF.
    pub fn apply(self, raw_ms: u64) -> Option<u64> {
        match self {
            Penalty::None => Some(raw_ms),
            Penalty::Plus2 => Some(raw_ms.saturating_add(PLUS2_MS)),
            Penalty::Dnf => None,
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Penalty::None => "none",
            Penalty::Plus2 => "plus2",
            Penalty::Dnf => "dnf",
        }
    }
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised penalty name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown penalty: {0}")]
pub struct ParsePenaltyError(pub String);

impl FromStr for Penalty {
    type Err = ParsePenaltyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" | "ok" => Ok(Penalty::None),
            "plus2" | "+2" => Ok(Penalty::Plus2),
            "dnf" => Ok(Penalty::Dnf),
            other => Err(ParsePenaltyError(other.to_string())),
        }
    }
}
