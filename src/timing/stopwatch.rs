//! Solve Stopwatch
//!
//! [`Stopwatch`] is the bare state machine (`Idle -> Running -> Stopped`);
//! [`StopwatchEngine`] wires it to a [`Scheduler`] for periodic display ticks
//! and publishes [`StopwatchEvent`]s.
//!
//! Elapsed time is always recomputed from the absolute start timestamp. Ticks
//! only refresh the displayed value, so late or dropped ticks cannot skew the
//! final time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::core::clock::{MonotonicClock, Timestamp};
use crate::core::scheduler::{lock, CancelHandle, Scheduler};

/// Event channel capacity; slow subscribers see `Lagged` rather than
/// blocking the timer.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Stopwatch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopwatchState {
    /// Not started.
    Idle,
    /// Measuring.
    Running,
    /// Final time captured.
    Stopped,
}

/// Observable state of one timed solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    /// Lifecycle state.
    pub state: StopwatchState,
    /// When the current run started.
    pub started_at: Option<Timestamp>,
    /// Last computed elapsed time.
    pub elapsed_ms: u64,
}

impl Default for TimerSession {
    fn default() -> Self {
        Self {
            state: StopwatchState::Idle,
            started_at: None,
            elapsed_ms: 0,
        }
    }
}

/// Stopwatch notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StopwatchEvent {
    /// Timing began.
    Started,
    /// Periodic refresh.
    Tick {
        /// Time since start.
        elapsed_ms: u64,
    },
    /// Final time captured.
    Stopped {
        /// Final elapsed time.
        elapsed_ms: u64,
    },
    /// Cleared back to idle.
    Reset,
}

/// Stopwatch tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopwatchConfig {
    /// Display refresh cadence.
    pub tick_interval: Duration,
}

impl Default for StopwatchConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(10),
        }
    }
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Stopwatch state machine over a monotonic clock.
///
/// Misuse is never an error: starting twice or stopping twice is a no-op.
#[derive(Debug, Clone)]
pub struct Stopwatch<C> {
    clock: C,
    session: TimerSession,
}

impl<C: MonotonicClock> Stopwatch<C> {
    /// Create an idle stopwatch.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            session: TimerSession::default(),
        }
    }

    /// Begin timing. Returns `false` (and changes nothing) if already running.
    pub fn start(&mut self) -> bool {
        if self.session.state == StopwatchState::Running {
            return false;
        }
        self.session = TimerSession {
            state: StopwatchState::Running,
            started_at: Some(self.clock.now()),
            elapsed_ms: 0,
        };
        true
    }

    /// Refresh the elapsed time. `None` unless running.
    pub fn tick(&mut self) -> Option<u64> {
        if self.session.state != StopwatchState::Running {
            return None;
        }
        let started_at = self.session.started_at?;
        self.session.elapsed_ms = self.clock.delta(started_at);
        Some(self.session.elapsed_ms)
    }

    /// Capture the final time.
    ///
    /// When not running this is a no-op returning the previous result:
    /// `Some` after a completed run, `None` when idle.
    pub fn stop(&mut self) -> Option<u64> {
        match self.session.state {
            StopwatchState::Idle => None,
            StopwatchState::Stopped => Some(self.session.elapsed_ms),
            StopwatchState::Running => {
                let elapsed = self.tick();
                self.session.state = StopwatchState::Stopped;
                elapsed
            }
        }
    }

    /// Back to idle from any state.
    pub fn reset(&mut self) {
        self.session = TimerSession::default();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StopwatchState {
        self.session.state
    }

    /// Last computed elapsed time.
    pub fn elapsed_ms(&self) -> u64 {
        self.session.elapsed_ms
    }

    /// Snapshot of the session.
    pub fn session(&self) -> TimerSession {
        self.session
    }
}

// =============================================================================
// SCHEDULED ENGINE
// =============================================================================

/// Stopwatch driven by a scheduler.
///
/// Owned by the single caller driving an attempt. Stopping or resetting
/// cancels the tick registration before touching state, so no tick lands
/// after termination.
pub struct StopwatchEngine<C: MonotonicClock + 'static, S: Scheduler> {
    core: Arc<Mutex<Stopwatch<C>>>,
    scheduler: S,
    config: StopwatchConfig,
    ticker: Option<CancelHandle>,
    events: broadcast::Sender<StopwatchEvent>,
}

impl<C: MonotonicClock + 'static, S: Scheduler> StopwatchEngine<C, S> {
    /// Create an idle engine.
    pub fn new(clock: C, scheduler: S, config: StopwatchConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            core: Arc::new(Mutex::new(Stopwatch::new(clock))),
            scheduler,
            config,
            ticker: None,
            events,
        }
    }

    /// Subscribe to stopwatch events.
    pub fn subscribe(&self) -> broadcast::Receiver<StopwatchEvent> {
        self.events.subscribe()
    }

    /// Begin timing and schedule display ticks. No-op if already running.
    pub fn start(&mut self) {
        if !lock(&self.core).start() {
            return;
        }
        debug!("stopwatch started");
        let _ = self.events.send(StopwatchEvent::Started);

        let core = self.core.clone();
        let events = self.events.clone();
        let handle = self.scheduler.schedule_repeating(
            self.config.tick_interval,
            Box::new(move || {
                let elapsed = lock(&core).tick();
                if let Some(elapsed_ms) = elapsed {
                    #[cfg(feature = "debug-tracing")]
                    tracing::trace!(elapsed_ms, "stopwatch tick");
                    let _ = events.send(StopwatchEvent::Tick { elapsed_ms });
                }
            }),
        );
        if let Some(previous) = self.ticker.replace(handle) {
            previous.cancel();
        }
    }

    /// Deliver a tick outside the schedule (e.g. on a render frame).
    pub fn tick(&self) -> Option<u64> {
        let elapsed = lock(&self.core).tick();
        if let Some(elapsed_ms) = elapsed {
            let _ = self.events.send(StopwatchEvent::Tick { elapsed_ms });
        }
        elapsed
    }

    /// Stop timing and return the final elapsed time.
    pub fn stop(&mut self) -> Option<u64> {
        self.cancel_ticks();

        let (was_running, elapsed) = {
            let mut core = lock(&self.core);
            let was_running = core.state() == StopwatchState::Running;
            (was_running, core.stop())
        };

        if was_running {
            if let Some(elapsed_ms) = elapsed {
                debug!(elapsed_ms, "stopwatch stopped");
                let _ = self.events.send(StopwatchEvent::Stopped { elapsed_ms });
            }
        }
        elapsed
    }

    /// Cancel ticks and return to idle.
    pub fn reset(&mut self) {
        self.cancel_ticks();
        lock(&self.core).reset();
        debug!("stopwatch reset");
        let _ = self.events.send(StopwatchEvent::Reset);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StopwatchState {
        lock(&self.core).state()
    }

    /// Last computed elapsed time.
    pub fn elapsed_ms(&self) -> u64 {
        lock(&self.core).elapsed_ms()
    }

    /// Snapshot of the session.
    pub fn session(&self) -> TimerSession {
        lock(&self.core).session()
    }

    fn cancel_ticks(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.cancel();
        }
    }
}
