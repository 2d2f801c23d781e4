//! Persistence Contract
//!
//! The engine talks to storage through two traits:
//!
//! - [`AttemptStore`]: attempt rows, per-date revision counters and the
//!   derived leaderboard snapshots
//! - [`ScrambleStore`]: one scramble per competition date
//!
//! [`MemoryStore`] implements both over `tokio::sync::RwLock`ed maps and is
//! what the demo binary and the tests run against.
//!
//! ## Revisions
//!
//! Every write that touches a date's attempts bumps that date's revision.
//! Snapshots record the revision they were computed from, and
//! [`AttemptStore::replace_leaderboard`] refuses to overwrite a snapshot
//! with one built from an older revision. Two concurrent recomputes can
//! therefore finish in any order and the newest data still wins.
//!
//! Attempt ids are random uuids, so inserts need no shared id sequence. The
//! revision is the one counter on the write path. Ordering snapshots needs
//! it, and it only changes under the attempt table's write lock.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::competition::attempt::{Attempt, AttemptId, ParticipantId};
use crate::competition::leaderboard::LeaderboardSnapshot;
use crate::scramble::{ScrambleSequence, ScrambleSource};
use crate::timing::penalty::Penalty;

/// Storage failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No attempt with that id.
    #[error("attempt not found: {0}")]
    AttemptNotFound(AttemptId),

    /// An attempt with that id already exists.
    #[error("duplicate attempt id: {0}")]
    DuplicateAttempt(AttemptId),

    /// Backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Attempts for one date along with the revision they were read at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateAttempts {
    /// Date revision at read time.
    pub revision: u64,
    /// Attempts ordered by `created_at`, then id.
    pub attempts: Vec<Attempt>,
}

/// The scramble assigned to a competition date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyScramble {
    /// Competition date.
    pub date: NaiveDate,
    /// The scramble.
    pub scramble: ScrambleSequence,
    /// Generator that produced it.
    pub source: ScrambleSource,
    /// Nonce mixed with the date to derive the generation seed.
    pub nonce: u64,
    /// When it was generated.
    pub generated_at: DateTime<Utc>,
    /// True only on the response that created it.
    #[serde(default)]
    pub generated: bool,
}

/// Attempt persistence.
pub trait AttemptStore: Send + Sync {
    /// Insert a new attempt and bump its date's revision.
    fn insert_attempt(&self, attempt: Attempt) -> impl Future<Output = Result<Attempt, StoreError>> + Send;

    /// Fetch one attempt.
    fn get_attempt(&self, id: AttemptId) -> impl Future<Output = Result<Attempt, StoreError>> + Send;

    /// Overwrite an attempt's penalty and bump its date's revision.
    fn update_penalty(
        &self,
        id: AttemptId,
        penalty: Penalty,
    ) -> impl Future<Output = Result<Attempt, StoreError>> + Send;

    /// All attempts for `date` with a consistent revision.
    fn attempts_for_date(&self, date: NaiveDate) -> impl Future<Output = Result<DateAttempts, StoreError>> + Send;

    /// A participant's attempts, optionally limited to one date, oldest first.
    fn attempts_for_participant(
        &self,
        participant_id: &ParticipantId,
        date: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<Attempt>, StoreError>> + Send;

    /// Atomically swap in `snapshot` unless a snapshot from a newer revision
    /// is already stored. Returns whichever snapshot is current afterwards.
    fn replace_leaderboard(
        &self,
        snapshot: LeaderboardSnapshot,
    ) -> impl Future<Output = Result<Arc<LeaderboardSnapshot>, StoreError>> + Send;

    /// Current snapshot for `date`, if any.
    fn leaderboard(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Option<Arc<LeaderboardSnapshot>>, StoreError>> + Send;
}

/// Daily scramble persistence.
pub trait ScrambleStore: Send + Sync {
    /// Stored scramble for `date`.
    fn get_scramble(&self, date: NaiveDate)
        -> impl Future<Output = Result<Option<DailyScramble>, StoreError>> + Send;

    /// Store `scramble` unless the date already has one. Returns the stored
    /// record and whether this call inserted it.
    fn put_scramble_if_absent(
        &self,
        scramble: DailyScramble,
    ) -> impl Future<Output = Result<(DailyScramble, bool), StoreError>> + Send;

    /// Store `scramble`, replacing any existing one.
    fn put_scramble(&self, scramble: DailyScramble) -> impl Future<Output = Result<(), StoreError>> + Send;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Debug, Default)]
struct AttemptTable {
    rows: BTreeMap<AttemptId, Attempt>,
    by_date: BTreeMap<NaiveDate, Vec<AttemptId>>,
    revisions: BTreeMap<NaiveDate, u64>,
}

impl AttemptTable {
    fn bump(&mut self, date: NaiveDate) -> u64 {
        let revision = self.revisions.entry(date).or_insert(0);
        *revision += 1;
        *revision
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    attempts: RwLock<AttemptTable>,
    leaderboards: RwLock<BTreeMap<NaiveDate, Arc<LeaderboardSnapshot>>>,
    scrambles: RwLock<BTreeMap<NaiveDate, DailyScramble>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current revision for `date` (0 before any write).
    pub async fn revision(&self, date: NaiveDate) -> u64 {
        self.attempts.read().await.revisions.get(&date).copied().unwrap_or(0)
    }

    /// Total stored attempts.
    pub async fn attempt_count(&self) -> usize {
        self.attempts.read().await.rows.len()
    }
}

impl AttemptStore for MemoryStore {
    async fn insert_attempt(&self, attempt: Attempt) -> Result<Attempt, StoreError> {
        let mut table = self.attempts.write().await;
        if table.rows.contains_key(&attempt.id) {
            return Err(StoreError::DuplicateAttempt(attempt.id));
        }

        let revision = table.bump(attempt.competition_date);
        table.by_date.entry(attempt.competition_date).or_default().push(attempt.id);
        table.rows.insert(attempt.id, attempt.clone());

        debug!(attempt = %attempt.id, date = %attempt.competition_date, revision, "attempt stored");
        Ok(attempt)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Attempt, StoreError> {
        self.attempts
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::AttemptNotFound(id))
    }

    async fn update_penalty(&self, id: AttemptId, penalty: Penalty) -> Result<Attempt, StoreError> {
        let mut table = self.attempts.write().await;
        let attempt = table.rows.get_mut(&id).ok_or(StoreError::AttemptNotFound(id))?;
        attempt.penalty = penalty;
        let updated = attempt.clone();

        let revision = table.bump(updated.competition_date);
        debug!(attempt = %id, penalty = %penalty, revision, "penalty updated");
        Ok(updated)
    }

    async fn attempts_for_date(&self, date: NaiveDate) -> Result<DateAttempts, StoreError> {
        let table = self.attempts.read().await;
        let mut attempts: Vec<Attempt> = table
            .by_date
            .get(&date)
            .into_iter()
            .flatten()
            .filter_map(|id| table.rows.get(id).cloned())
            .collect();
        attempts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(DateAttempts {
            revision: table.revisions.get(&date).copied().unwrap_or(0),
            attempts,
        })
    }

    async fn attempts_for_participant(
        &self,
        participant_id: &ParticipantId,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Attempt>, StoreError> {
        let table = self.attempts.read().await;
        let mut attempts: Vec<Attempt> = table
            .rows
            .values()
            .filter(|a| &a.participant_id == participant_id)
            .filter(|a| date.map_or(true, |d| a.competition_date == d))
            .cloned()
            .collect();
        attempts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(attempts)
    }

    async fn replace_leaderboard(&self, snapshot: LeaderboardSnapshot) -> Result<Arc<LeaderboardSnapshot>, StoreError> {
        let mut boards = self.leaderboards.write().await;
        if let Some(current) = boards.get(&snapshot.date) {
            if current.source_revision > snapshot.source_revision {
                debug!(
                    date = %snapshot.date,
                    stale = snapshot.source_revision,
                    current = current.source_revision,
                    "discarding stale leaderboard"
                );
                return Ok(Arc::clone(current));
            }
        }

        let snapshot = Arc::new(snapshot);
        boards.insert(snapshot.date, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    async fn leaderboard(&self, date: NaiveDate) -> Result<Option<Arc<LeaderboardSnapshot>>, StoreError> {
        Ok(self.leaderboards.read().await.get(&date).cloned())
    }
}

impl ScrambleStore for MemoryStore {
    async fn get_scramble(&self, date: NaiveDate) -> Result<Option<DailyScramble>, StoreError> {
        Ok(self.scrambles.read().await.get(&date).cloned())
    }

    async fn put_scramble_if_absent(&self, scramble: DailyScramble) -> Result<(DailyScramble, bool), StoreError> {
        let mut scrambles = self.scrambles.write().await;
        if let Some(existing) = scrambles.get(&scramble.date) {
            return Ok((existing.clone(), false));
        }
        scrambles.insert(scramble.date, scramble.clone());
        Ok((scramble, true))
    }

    async fn put_scramble(&self, scramble: DailyScramble) -> Result<(), StoreError> {
        self.scrambles.write().await.insert(scramble.date, scramble);
        Ok(())
    }
}
