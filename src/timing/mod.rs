//! Solve Timing
//!
//! - `penalty`: +2 / DNF penalties and effective-time arithmetic
//! - `stopwatch`: solve stopwatch state machine and scheduled engine
//! - `inspection`: inspection countdown with automatic penalty escalation
//!
//! Both timers are single-writer: each instance belongs to the one caller
//! driving an attempt.

pub mod penalty;
pub mod stopwatch;
pub mod inspection;

pub use penalty::{Penalty, PLUS2_MS};
pub use stopwatch::{Stopwatch, StopwatchConfig, StopwatchEngine, StopwatchEvent, StopwatchState, TimerSession};
pub use inspection::{
    InspectionConfig, InspectionCountdown, InspectionEngine, InspectionEvent, InspectionPhase,
    InspectionResult, InspectionState,
};
