//! Participant Statistics
//!
//! Summary figures over a participant's attempts, oldest first. Averages
//! follow competition rules: of the last N attempts the single best and
//! single worst are dropped and the rest are averaged. A DNF counts as the
//! worst result, so one DNF is dropped and two or more make the average a
//! DNF.

use serde::{Deserialize, Serialize};

use crate::competition::attempt::{Attempt, ParticipantId};

/// Window for the headline rolling average.
pub const AVERAGE_WINDOW: usize = 5;

/// Result of an average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "ms")]
pub enum Average {
    /// A valid average, milliseconds rounded to nearest.
    Time(u64),
    /// Too many DNFs in the window.
    Dnf,
}

/// Summary for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantStats {
    /// Who.
    pub participant_id: ParticipantId,
    /// Attempts considered.
    pub attempts: usize,
    /// Attempts that were not DNF.
    pub solved: usize,
    /// Lowest effective time.
    pub best_single_ms: Option<u64>,
    /// Mean of all non-DNF effective times.
    pub mean_ms: Option<u64>,
    /// Average of the latest five, if at least five exist.
    pub average_of_5: Option<Average>,
}

impl ParticipantStats {
    /// Compute from `attempts`, which must be ordered oldest first.
    pub fn compute(participant_id: ParticipantId, attempts: &[Attempt]) -> Self {
        let times: Vec<u64> = attempts.iter().filter_map(Attempt::effective_time_ms).collect();

        Self {
            participant_id,
            attempts: attempts.len(),
            solved: times.len(),
            best_single_ms: times.iter().copied().min(),
            mean_ms: mean(&times),
            average_of_5: average_of(attempts, AVERAGE_WINDOW),
        }
    }
}

/// Rounded arithmetic mean.
pub fn mean(times: &[u64]) -> Option<u64> {
    if times.is_empty() {
        return None;
    }
    let len = times.len() as u128;
    let sum: u128 = times.iter().map(|&t| u128::from(t)).sum();
    u64::try_from((sum + len / 2) / len).ok()
}

/// Trimmed average of the latest `n` attempts. `None` when fewer than `n`
/// attempts exist or `n < 3`.
pub fn average_of(attempts: &[Attempt], n: usize) -> Option<Average> {
    if n < 3 || attempts.len() < n {
        return None;
    }

    // DNF sorts last as `None` mapped to u64::MAX.
    let mut window: Vec<Option<u64>> = attempts[attempts.len() - n..]
        .iter()
        .map(Attempt::effective_time_ms)
        .collect();
    if window.iter().filter(|t| t.is_none()).count() > 1 {
        return Some(Average::Dnf);
    }
    window.sort_by_key(|t| t.unwrap_or(u64::MAX));

    let counting: Vec<u64> = window[1..n - 1].iter().flatten().copied().collect();
    mean(&counting).map(Average::Time)
}
