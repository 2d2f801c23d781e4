//! Daily Leaderboard
//!
//! A leaderboard is derived data: it is recomputed from the full attempt
//! set of a date and stored as an immutable snapshot.
//!
//! ## Ranking
//!
//! 1. Each participant's best is their lowest effective time (DNFs ignored).
//! 2. Participants whose every attempt is a DNF are left off.
//! 3. Order by best time, then by when that best was recorded (earlier
//!    first), then by participant id.
//! 4. Keep the top N; ranks are dense positions starting at 1.
//!
//! The computation is a pure function of the attempt set, so recomputing
//! without new writes yields a byte-identical snapshot and digest.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::competition::attempt::{Attempt, AttemptId, ParticipantId};
use crate::competition::store::{AttemptStore, StoreError};
use crate::core::hash::{DigestBytes, DigestHasher};

/// Default number of leaderboard entries.
pub const DEFAULT_LEADERBOARD_SIZE: usize = 5;

/// Leaderboard settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Entries kept per date.
    pub size: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_LEADERBOARD_SIZE,
        }
    }
}

/// One ranked participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: u32,
    /// Who.
    pub participant_id: ParticipantId,
    /// Lowest effective time of the day.
    pub best_effective_time_ms: u64,
    /// Attempts recorded that day, DNFs included.
    pub attempts_count: u32,
    /// Attempt that set the best time.
    pub best_attempt_id: AttemptId,
    /// When the best attempt was recorded.
    pub achieved_at: DateTime<Utc>,
}

/// Leaderboard failures.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// Reading attempts or writing the snapshot failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Entries could not be encoded for the digest.
    #[error("failed to encode leaderboard: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Immutable leaderboard for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    /// Competition date.
    pub date: NaiveDate,
    /// Date revision the entries were computed from.
    pub source_revision: u64,
    /// Ranked entries.
    pub entries: Vec<LeaderboardEntry>,
    /// SHA-256 over the date and the encoded entries.
    pub digest: DigestBytes,
}

impl LeaderboardSnapshot {
    /// Build a snapshot and compute its digest.
    pub fn new(date: NaiveDate, source_revision: u64, entries: Vec<LeaderboardEntry>) -> Result<Self, bincode::Error> {
        let digest = Self::compute_digest(date, &entries)?;
        Ok(Self {
            date,
            source_revision,
            entries,
            digest,
        })
    }

    /// Canonical binary encoding of the entries.
    pub fn encode_entries(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(&self.entries)
    }

    /// Digest as lowercase hex.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Recompute the digest and compare.
    pub fn verify(&self) -> bool {
        Self::compute_digest(self.date, &self.entries).is_ok_and(|d| d == self.digest)
    }

    fn compute_digest(date: NaiveDate, entries: &[LeaderboardEntry]) -> Result<DigestBytes, bincode::Error> {
        let mut hasher = DigestHasher::for_leaderboard();
        hasher.update_bytes(&bincode::serialize(&date)?);
        hasher.update_u64(entries.len() as u64);
        hasher.update_bytes(&bincode::serialize(entries)?);
        Ok(hasher.finalize())
    }
}

#[derive(Debug)]
struct Standing<'a> {
    attempts: u32,
    best: Option<&'a Attempt>,
}

/// Rank a date's attempts. Input order does not matter.
pub fn rank_attempts(attempts: &[Attempt], top_n: usize) -> Vec<LeaderboardEntry> {
    let mut standings: BTreeMap<&ParticipantId, Standing<'_>> = BTreeMap::new();

    for attempt in attempts {
        let standing = standings.entry(&attempt.participant_id).or_insert(Standing {
            attempts: 0,
            best: None,
        });
        standing.attempts = standing.attempts.saturating_add(1);

        let Some(time) = attempt.effective_time_ms() else {
            continue;
        };
        let better = match standing.best {
            None => true,
            Some(best) => (time, attempt.created_at, attempt.id) < (best_time(best), best.created_at, best.id),
        };
        if better {
            standing.best = Some(attempt);
        }
    }

    let mut ranked: Vec<(u64, &Attempt, u32)> = standings
        .into_values()
        .filter_map(|s| s.best.map(|best| (best_time(best), best, s.attempts)))
        .collect();
    ranked.sort_by(|(ta, a, _), (tb, b, _)| {
        ta.cmp(tb)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.participant_id.cmp(&b.participant_id))
    });

    ranked
        .into_iter()
        .take(top_n)
        .zip(1u32..)
        .map(|((time, best, attempts_count), rank)| LeaderboardEntry {
            rank,
            participant_id: best.participant_id.clone(),
            best_effective_time_ms: time,
            attempts_count,
            best_attempt_id: best.id,
            achieved_at: best.created_at,
        })
        .collect()
}

fn best_time(attempt: &Attempt) -> u64 {
    attempt.effective_time_ms().unwrap_or(u64::MAX)
}

// =============================================================================
// AGGREGATOR
// =============================================================================

/// Recomputes and persists leaderboards.
#[derive(Debug)]
pub struct LeaderboardAggregator<St> {
    store: Arc<St>,
    config: LeaderboardConfig,
}

impl<St> Clone for LeaderboardAggregator<St> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

impl<St: AttemptStore> LeaderboardAggregator<St> {
    /// Aggregator over `store`.
    pub fn new(store: Arc<St>, config: LeaderboardConfig) -> Self {
        Self { store, config }
    }

    /// Entries kept per date.
    pub fn size(&self) -> usize {
        self.config.size
    }

    /// Recompute the leaderboard for `date` from all its attempts and swap it
    /// in. Returns the snapshot current after the swap, which is a newer one
    /// if a concurrent recompute already stored it.
    pub async fn recompute(&self, date: NaiveDate) -> Result<Arc<LeaderboardSnapshot>, LeaderboardError> {
        let read = self.store.attempts_for_date(date).await?;
        let entries = rank_attempts(&read.attempts, self.config.size);
        let snapshot = LeaderboardSnapshot::new(date, read.revision, entries)?;

        let current = self.store.replace_leaderboard(snapshot).await?;
        info!(
            date = %date,
            revision = current.source_revision,
            entries = current.entries.len(),
            digest = %current.digest_hex(),
            "leaderboard recomputed"
        );
        Ok(current)
    }

    /// Stored snapshot for `date`, computing one if none exists yet.
    pub async fn snapshot(&self, date: NaiveDate) -> Result<Arc<LeaderboardSnapshot>, LeaderboardError> {
        match self.store.leaderboard(date).await? {
            Some(snapshot) => Ok(snapshot),
            None => self.recompute(date).await,
        }
    }
}
