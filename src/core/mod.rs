//! Core primitives.
//!
//! Time sources, tick scheduling, seeded randomness, digests and display
//! formatting. Nothing here knows about puzzles or competitions.

pub mod clock;
pub mod scheduler;
pub mod rng;
pub mod hash;
pub mod format;

// Re-export core types
pub use clock::{ManualClock, MonotonicClock, SystemClock, Timestamp};
pub use scheduler::{CancelHandle, ManualScheduler, Scheduler, TickCallback, TokioScheduler};
pub use rng::DeterministicRng;
pub use hash::DigestBytes;
pub use format::format_time;
