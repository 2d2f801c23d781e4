//! Competition Layer
//!
//! - `attempt`: attempt records and submission validation
//! - `leaderboard`: ranking and snapshot recomputation
//! - `store`: persistence traits and the in-memory store
//! - `stats`: per-participant statistics
//! - `service`: the operations exposed to clients

pub mod attempt;
pub mod leaderboard;
pub mod service;
pub mod stats;
pub mod store;

pub use attempt::{Attempt, AttemptError, AttemptId, NewAttempt, ParticipantId, MAX_RAW_TIME_MS};
pub use leaderboard::{
    rank_attempts, LeaderboardAggregator, LeaderboardConfig, LeaderboardEntry, LeaderboardError,
    LeaderboardSnapshot, DEFAULT_LEADERBOARD_SIZE,
};
pub use service::{CompetitionError, CompetitionService};
pub use stats::{average_of, Average, ParticipantStats};
pub use store::{AttemptStore, DailyScramble, DateAttempts, MemoryStore, ScrambleStore, StoreError};
