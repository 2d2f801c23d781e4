//! # Speedcube Server
//!
//! Solve timing, scramble generation and daily-challenge ranking for
//! twisty-puzzle speedsolving.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SPEEDCUBE SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── clock.rs    - Monotonic clock (system and manual)       │
//! │  ├── scheduler.rs- Repeating callbacks (tokio and manual)    │
//! │  ├── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │  ├── hash.rs     - Domain-separated SHA-256 digests          │
//! │  └── format.rs   - Solve time display                        │
//! │                                                              │
//! │  timing/         - Timers (single writer per attempt)        │
//! │  ├── penalty.rs  - +2 / DNF                                  │
//! │  ├── stopwatch.rs- Solve stopwatch                           │
//! │  └── inspection.rs - Inspection countdown                    │
//! │                                                              │
//! │  scramble/       - Scramble generation (stateless)           │
//! │  ├── moves.rs    - Face-turn notation                        │
//! │  ├── generator.rs- Constrained random moves                  │
//! │  ├── official.rs - External random-state scrambler           │
//! │  └── pool.rs     - Static fallback scrambles                 │
//! │                                                              │
//! │  competition/    - Shared, persisted state                   │
//! │  ├── attempt.rs  - Attempt records                           │
//! │  ├── leaderboard.rs - Ranking and snapshot swap              │
//! │  ├── store.rs    - Persistence traits, memory store          │
//! │  ├── stats.rs    - Participant statistics                    │
//! │  └── service.rs  - Client-facing operations                  │
//! │                                                              │
//! │  protocol.rs     - JSON request/response envelope            │
//! │  config.rs       - Settings and environment overrides        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Timing Guarantee
//!
//! Timers never accumulate tick deltas. Every reading is derived from the
//! absolute start timestamp, so late, skipped or coalesced scheduler
//! callbacks cannot drift the result.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod competition;
pub mod config;
pub mod core;
pub mod protocol;
pub mod scramble;
pub mod timing;

// Re-export commonly used types
pub use competition::{Attempt, AttemptId, CompetitionService, LeaderboardEntry, MemoryStore, NewAttempt, ParticipantId};
pub use config::EngineConfig;
pub use core::format::format_time;
pub use core::rng::DeterministicRng;
pub use scramble::{ScrambleSequence, ScrambleService, ScrambleStrategy};
pub use timing::{InspectionEngine, Penalty, StopwatchEngine};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
