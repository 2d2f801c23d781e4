//! Competition Service
//!
//! Entry point for the competition operations:
//!
//! - record an attempt, then recompute that date's leaderboard
//! - correct an attempt's penalty, then recompute
//! - query a date's leaderboard
//! - fetch (or force-regenerate) the scramble of the day
//! - participant statistics
//!
//! Attempts are the source of truth. When the recompute after a successful
//! write fails, the write stands and the caller gets
//! [`CompetitionError::LeaderboardStale`] carrying the stored attempt; the
//! next successful recompute repairs the leaderboard.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::competition::attempt::{Attempt, AttemptError, AttemptId, NewAttempt, ParticipantId};
use crate::competition::leaderboard::{
    LeaderboardAggregator, LeaderboardConfig, LeaderboardEntry, LeaderboardError, LeaderboardSnapshot,
};
use crate::competition::stats::ParticipantStats;
use crate::competition::store::{AttemptStore, DailyScramble, ScrambleStore, StoreError};
use crate::core::rng::{derive_scramble_seed, entropy_seed};
use crate::scramble::{RandomStateScrambler, ScrambleService};
use crate::timing::penalty::Penalty;

/// Competition operation failures.
#[derive(Debug, Error)]
pub enum CompetitionError {
    /// Submission failed validation.
    #[error("invalid attempt: {0}")]
    InvalidAttempt(#[from] AttemptError),

    /// Storage failed before anything was written.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Leaderboard could not be recomputed.
    #[error("leaderboard error: {0}")]
    Leaderboard(#[from] LeaderboardError),

    /// The write succeeded but the leaderboard was not refreshed.
    #[error("attempt {} recorded but leaderboard for {} is stale: {source}", .attempt.id, .attempt.competition_date)]
    LeaderboardStale {
        /// The persisted attempt.
        attempt: Box<Attempt>,
        /// Recompute failure.
        #[source]
        source: LeaderboardError,
    },
}

impl CompetitionError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CompetitionError::InvalidAttempt(_) => "invalid_attempt",
            CompetitionError::Store(StoreError::AttemptNotFound(_)) => "not_found",
            CompetitionError::Store(StoreError::DuplicateAttempt(_)) => "duplicate",
            CompetitionError::Store(StoreError::Unavailable(_)) => "unavailable",
            CompetitionError::Leaderboard(_) => "leaderboard_failed",
            CompetitionError::LeaderboardStale { .. } => "leaderboard_stale",
        }
    }

    /// The persisted attempt when the failure happened after the write.
    pub fn recorded_attempt(&self) -> Option<&Attempt> {
        match self {
            CompetitionError::LeaderboardStale { attempt, .. } => Some(attempt.as_ref()),
            _ => None,
        }
    }
}

/// Competition operations over a store and a scramble service.
#[derive(Debug)]
pub struct CompetitionService<St, Sc> {
    store: Arc<St>,
    leaderboards: LeaderboardAggregator<St>,
    scrambles: ScrambleService<Sc>,
}

impl<St, Sc> CompetitionService<St, Sc>
where
    St: AttemptStore + ScrambleStore,
    Sc: RandomStateScrambler,
{
    /// Build the service.
    pub fn new(store: Arc<St>, scrambles: ScrambleService<Sc>, leaderboard: LeaderboardConfig) -> Self {
        Self {
            leaderboards: LeaderboardAggregator::new(Arc::clone(&store), leaderboard),
            store,
            scrambles,
        }
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    /// Validate and record an attempt, then recompute its date.
    #[instrument(skip(self, new), fields(participant = %new.participant_id, date = %new.competition_date))]
    pub async fn create_attempt(&self, new: NewAttempt) -> Result<Attempt, CompetitionError> {
        new.validate()?;

        let attempt = new.into_attempt(AttemptId::new(), Utc::now());
        let attempt = self.store.insert_attempt(attempt).await.map_err(|e| {
            error!(error = %e, "failed to record attempt");
            e
        })?;
        info!(
            attempt = %attempt.id,
            raw_ms = attempt.raw_time_ms,
            penalty = %attempt.penalty,
            "attempt recorded"
        );

        self.refresh(attempt).await
    }

    /// Set an attempt's penalty, then recompute its date.
    #[instrument(skip(self))]
    pub async fn correct_penalty(&self, id: AttemptId, penalty: Penalty) -> Result<Attempt, CompetitionError> {
        let attempt = self.store.update_penalty(id, penalty).await?;
        info!(date = %attempt.competition_date, "penalty corrected");

        self.refresh(attempt).await
    }

    async fn refresh(&self, attempt: Attempt) -> Result<Attempt, CompetitionError> {
        match self.leaderboards.recompute(attempt.competition_date).await {
            Ok(_) => Ok(attempt),
            Err(source) => {
                error!(
                    attempt = %attempt.id,
                    date = %attempt.competition_date,
                    error = %source,
                    "leaderboard recompute failed"
                );
                Err(CompetitionError::LeaderboardStale {
                    attempt: Box::new(attempt),
                    source,
                })
            }
        }
    }

    /// Ranked entries for `date`.
    pub async fn leaderboard(&self, date: NaiveDate) -> Result<Vec<LeaderboardEntry>, CompetitionError> {
        Ok(self.leaderboard_snapshot(date).await?.entries.clone())
    }

    /// Current snapshot for `date`, computed on first request.
    pub async fn leaderboard_snapshot(&self, date: NaiveDate) -> Result<Arc<LeaderboardSnapshot>, CompetitionError> {
        Ok(self.leaderboards.snapshot(date).await?)
    }

    /// Recompute `date` explicitly, e.g. to repair a stale leaderboard.
    pub async fn recompute(&self, date: NaiveDate) -> Result<Arc<LeaderboardSnapshot>, CompetitionError> {
        Ok(self.leaderboards.recompute(date).await?)
    }

    /// Scramble of the day, generated and stored on first request.
    #[instrument(skip(self))]
    pub async fn scramble_for_date(&self, date: NaiveDate) -> Result<DailyScramble, CompetitionError> {
        if let Some(mut existing) = self.store.get_scramble(date).await? {
            existing.generated = false;
            return Ok(existing);
        }

        let fresh = self.generate_daily(date).await;
        let (mut stored, inserted) = self.store.put_scramble_if_absent(fresh).await?;
        stored.generated = inserted;
        if inserted {
            info!(source = ?stored.source, scramble = %stored.scramble, "daily scramble generated");
        }
        Ok(stored)
    }

    /// Generate a new scramble for `date`, replacing any stored one.
    #[instrument(skip(self))]
    pub async fn regenerate_scramble(&self, date: NaiveDate) -> Result<DailyScramble, CompetitionError> {
        let fresh = self.generate_daily(date).await;
        self.store.put_scramble(fresh.clone()).await?;
        info!(source = ?fresh.source, scramble = %fresh.scramble, "daily scramble regenerated");
        Ok(fresh)
    }

    async fn generate_daily(&self, date: NaiveDate) -> DailyScramble {
        let nonce = entropy_seed();
        let seed = derive_scramble_seed(date, nonce);
        let generated = self
            .scrambles
            .generate_seeded(self.scrambles.default_strategy(), seed)
            .await;

        DailyScramble {
            date,
            scramble: generated.sequence,
            source: generated.source,
            nonce,
            generated_at: Utc::now(),
            generated: true,
        }
    }

    /// Statistics for a participant, optionally for one date.
    pub async fn participant_stats(
        &self,
        participant_id: &ParticipantId,
        date: Option<NaiveDate>,
    ) -> Result<ParticipantStats, CompetitionError> {
        let attempts = self.store.attempts_for_participant(participant_id, date).await?;
        Ok(ParticipantStats::compute(participant_id.clone(), &attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competition::store::{DateAttempts, MemoryStore};
    use crate::scramble::{ProcessScrambler, ScrambleConfig, ScrambleSource, ScrambleStrategy};
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn submit(participant: &str, raw: u64, penalty: Penalty) -> NewAttempt {
        NewAttempt {
            participant_id: participant.into(),
            raw_time_ms: raw,
            penalty,
            competition_date: date(),
        }
    }

    fn service() -> CompetitionService<MemoryStore, Option<ProcessScrambler>> {
        CompetitionService::new(
            Arc::new(MemoryStore::new()),
            ScrambleService::from_config(&ScrambleConfig::default()),
            LeaderboardConfig::default(),
        )
    }

    /// Memory store whose leaderboard writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_leaderboard: AtomicBool,
    }

    impl AttemptStore for FlakyStore {
        fn insert_attempt(&self, attempt: Attempt) -> impl Future<Output = Result<Attempt, StoreError>> + Send {
            self.inner.insert_attempt(attempt)
        }

        fn get_attempt(&self, id: AttemptId) -> impl Future<Output = Result<Attempt, StoreError>> + Send {
            self.inner.get_attempt(id)
        }

        fn update_penalty(
            &self,
            id: AttemptId,
            penalty: Penalty,
        ) -> impl Future<Output = Result<Attempt, StoreError>> + Send {
            self.inner.update_penalty(id, penalty)
        }

        fn attempts_for_date(&self, date: NaiveDate) -> impl Future<Output = Result<DateAttempts, StoreError>> + Send {
            self.inner.attempts_for_date(date)
        }

        fn attempts_for_participant(
            &self,
            participant_id: &ParticipantId,
            date: Option<NaiveDate>,
        ) -> impl Future<Output = Result<Vec<Attempt>, StoreError>> + Send {
            self.inner.attempts_for_participant(participant_id, date)
        }

        async fn replace_leaderboard(
            &self,
            snapshot: LeaderboardSnapshot,
        ) -> Result<Arc<LeaderboardSnapshot>, StoreError> {
            if self.fail_leaderboard.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("leaderboard table locked".into()));
            }
            self.inner.replace_leaderboard(snapshot).await
        }

        fn leaderboard(
            &self,
            date: NaiveDate,
        ) -> impl Future<Output = Result<Option<Arc<LeaderboardSnapshot>>, StoreError>> + Send {
            self.inner.leaderboard(date)
        }
    }

    impl ScrambleStore for FlakyStore {
        fn get_scramble(&self, date: NaiveDate) -> impl Future<Output = Result<Option<DailyScramble>, StoreError>> + Send {
            self.inner.get_scramble(date)
        }

        fn put_scramble_if_absent(
            &self,
            scramble: DailyScramble,
        ) -> impl Future<Output = Result<(DailyScramble, bool), StoreError>> + Send {
            self.inner.put_scramble_if_absent(scramble)
        }

        fn put_scramble(&self, scramble: DailyScramble) -> impl Future<Output = Result<(), StoreError>> + Send {
            self.inner.put_scramble(scramble)
        }
    }

    #[tokio::test]
    async fn test_create_attempt_updates_leaderboard() {
        let service = service();
        service.create_attempt(submit("A", 1_000, Penalty::None)).await.unwrap();
        service.create_attempt(submit("A", 1_200, Penalty::Plus2)).await.unwrap();
        service.create_attempt(submit("B", 800, Penalty::Dnf)).await.unwrap();
        service.create_attempt(submit("C", 900, Penalty::None)).await.unwrap();

        let board = service.leaderboard(date()).await.unwrap();
        let ranked: Vec<_> = board
            .iter()
            .map(|e| (e.participant_id.as_str(), e.best_effective_time_ms, e.rank))
            .collect();
        assert_eq!(ranked, vec![("C", 900, 1), ("A", 1_000, 2)]);

        let snapshot = service.leaderboard_snapshot(date()).await.unwrap();
        assert_eq!(snapshot.source_revision, 4);
        assert!(snapshot.verify());
    }

    #[tokio::test]
    async fn test_invalid_attempt_is_not_stored() {
        let service = service();
        let err = service.create_attempt(submit("", 1_000, Penalty::None)).await.unwrap_err();

        assert!(matches!(err, CompetitionError::InvalidAttempt(AttemptError::EmptyParticipant)));
        assert_eq!(err.code(), "invalid_attempt");
        assert_eq!(service.store().attempt_count().await, 0);
    }

    #[tokio::test]
    async fn test_penalty_correction_reranks() {
        let service = service();
        let fast = service.create_attempt(submit("A", 700, Penalty::None)).await.unwrap();
        service.create_attempt(submit("B", 900, Penalty::None)).await.unwrap();
        assert_eq!(service.leaderboard(date()).await.unwrap()[0].participant_id.as_str(), "A");

        let corrected = service.correct_penalty(fast.id, Penalty::Dnf).await.unwrap();
        assert_eq!(corrected.penalty, Penalty::Dnf);

        let board = service.leaderboard(date()).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].participant_id.as_str(), "B");

        service.correct_penalty(fast.id, Penalty::Plus2).await.unwrap();
        let board = service.leaderboard(date()).await.unwrap();
        assert_eq!(board[0].participant_id.as_str(), "B");
        assert_eq!(board[1].best_effective_time_ms, 2_700);
    }

    #[tokio::test]
    async fn test_correct_unknown_attempt() {
        let service = service();
        let err = service.correct_penalty(AttemptId::new(), Penalty::Dnf).await.unwrap_err();
        assert!(matches!(err, CompetitionError::Store(StoreError::AttemptNotFound(_))));
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn test_failed_recompute_keeps_attempt_and_is_retryable() {
        let store = Arc::new(FlakyStore::default());
        let service = CompetitionService::new(
            Arc::clone(&store),
            ScrambleService::from_config(&ScrambleConfig::default()),
            LeaderboardConfig::default(),
        );
        service.create_attempt(submit("A", 1_000, Penalty::None)).await.unwrap();

        store.fail_leaderboard.store(true, Ordering::SeqCst);
        let err = service.create_attempt(submit("B", 500, Penalty::None)).await.unwrap_err();
        let recorded = err.recorded_attempt().cloned().unwrap();
        assert_eq!(err.code(), "leaderboard_stale");
        assert_eq!(store.get_attempt(recorded.id).await.unwrap(), recorded);

        // Stale but complete: the previous ranking is still served.
        let stale = service.leaderboard(date()).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].participant_id.as_str(), "A");

        store.fail_leaderboard.store(false, Ordering::SeqCst);
        let repaired = service.recompute(date()).await.unwrap();
        assert_eq!(repaired.entries[0].participant_id.as_str(), "B");
        assert_eq!(repaired.entries.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_converge() {
        let service = Arc::new(service());
        let mut tasks = Vec::new();
        for i in 0..20u64 {
            let service = Arc::clone(&service);
            tasks.push(tokio::spawn(async move {
                service
                    .create_attempt(submit(&format!("p{}", i % 7), 5_000 + i * 10, Penalty::None))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let snapshot = service.leaderboard_snapshot(date()).await.unwrap();
        assert_eq!(snapshot.source_revision, 20);
        assert_eq!(service.store().attempt_count().await, 20);

        let fresh = service.recompute(date()).await.unwrap();
        assert_eq!(fresh.digest, snapshot.digest);
        let order: Vec<_> = fresh.entries.iter().map(|e| e.participant_id.as_str()).collect();
        assert_eq!(order, vec!["p0", "p1", "p2", "p3", "p4"]);
    }

    #[tokio::test]
    async fn test_daily_scramble_cached_until_forced() {
        let service = service();
        let first = service.scramble_for_date(date()).await.unwrap();
        assert!(first.generated);
        assert_eq!(first.source, ScrambleSource::Fallback);

        let cached = service.scramble_for_date(date()).await.unwrap();
        assert!(!cached.generated);
        assert_eq!(cached.scramble, first.scramble);
        assert_eq!(cached.nonce, first.nonce);

        let forced = service.regenerate_scramble(date()).await.unwrap();
        assert!(forced.generated);
        let after = service.scramble_for_date(date()).await.unwrap();
        assert_eq!(after.nonce, forced.nonce);
        assert_eq!(after.scramble, forced.scramble);
    }

    #[tokio::test]
    async fn test_constrained_daily_scramble_is_reproducible() {
        let config = ScrambleConfig {
            strategy: ScrambleStrategy::Constrained,
            ..ScrambleConfig::default()
        };
        let service = CompetitionService::new(
            Arc::new(MemoryStore::new()),
            ScrambleService::from_config(&config),
            LeaderboardConfig::default(),
        );
        let daily = service.scramble_for_date(date()).await.unwrap();
        assert_eq!(daily.source, ScrambleSource::Constrained);

        let replay = ScrambleService::from_config(&config)
            .generate_seeded(ScrambleStrategy::Constrained, derive_scramble_seed(date(), daily.nonce))
            .await;
        assert_eq!(replay.sequence, daily.scramble);
    }

    #[tokio::test]
    async fn test_concurrent_first_scramble_requests_agree() {
        let service = Arc::new(service());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let service = Arc::clone(&service);
            tasks.push(tokio::spawn(async move { service.scramble_for_date(date()).await }));
        }
        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap().unwrap());
        }

        assert_eq!(results.iter().filter(|r| r.generated).count(), 1);
        assert!(results.iter().all(|r| r.scramble == results[0].scramble));
    }

    #[tokio::test]
    async fn test_participant_stats() {
        let service = service();
        for (raw, penalty) in [(10_000, Penalty::None), (9_000, Penalty::Plus2), (8_000, Penalty::Dnf)] {
            service.create_attempt(submit("A", raw, penalty)).await.unwrap();
        }
        service.create_attempt(submit("B", 5_000, Penalty::None)).await.unwrap();

        let stats = service
            .participant_stats(&ParticipantId::new("A"), Some(date()))
            .await
            .unwrap();
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.solved, 2);
        assert_eq!(stats.best_single_ms, Some(10_000));
        assert_eq!(stats.mean_ms, Some(10_500));
    }
}
