//! Pre-Solve Inspection Countdown
//!
//! Counts down the inspection period and escalates the attempt penalty when
//! the solver overruns it: past the +2 threshold the attempt earns `Plus2`,
//! past the DNF threshold it becomes `Dnf`. Escalation is monotonic within a
//! session and each notification fires at most once.
//!
//! As with the stopwatch, every evaluation re-derives elapsed time from the
//! absolute start timestamp, so a late tick simply observes a later instant.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::core::clock::{MonotonicClock, Timestamp};
use crate::core::scheduler::{lock, CancelHandle, Scheduler};
use crate::timing::penalty::{Penalty, PLUS2_MS};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Inspection tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionConfig {
    /// Inspection length.
    pub duration: Duration,
    /// Elapsed time beyond which the attempt earns +2.
    pub plus2_threshold: Duration,
    /// Elapsed time beyond which the attempt is DNF.
    pub dnf_threshold: Duration,
    /// Countdown refresh cadence.
    pub tick_interval: Duration,
    /// Re-send `Complete` on every tick while remaining time is zero instead
    /// of once per session.
    pub repeat_complete: bool,
}

impl InspectionConfig {
    /// WCA inspection length.
    pub const DEFAULT_DURATION: Duration = Duration::from_millis(15_000);

    /// Config for a custom inspection length with thresholds derived from it
    /// (+2 at `duration`, DNF two seconds later).
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration,
            plus2_threshold: duration,
            dnf_threshold: duration + Duration::from_millis(PLUS2_MS),
            ..Self::default()
        }
    }
}

impl Default for InspectionConfig {
    fn default() -> Self {
        let duration = Self::DEFAULT_DURATION;
        Self {
            duration,
            plus2_threshold: duration,
            dnf_threshold: duration + Duration::from_millis(PLUS2_MS),
            tick_interval: Duration::from_millis(100),
            repeat_complete: false,
        }
    }
}

/// Inspection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionPhase {
    /// Not started.
    Idle,
    /// Counting down (or overrunning).
    Active,
    /// Solver started the solve; result captured.
    Stopped,
}

/// Observable inspection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionState {
    /// Lifecycle state.
    pub phase: InspectionPhase,
    /// When inspection began.
    pub started_at: Option<Timestamp>,
    /// Time since start at the last evaluation.
    pub elapsed_ms: u64,
    /// Countdown value at the last evaluation, floored at zero.
    pub remaining_ms: u64,
    /// Most severe penalty reached.
    pub penalty: Penalty,
}

impl InspectionState {
    fn idle(duration_ms: u64) -> Self {
        Self {
            phase: InspectionPhase::Idle,
            started_at: None,
            elapsed_ms: 0,
            remaining_ms: duration_ms,
            penalty: Penalty::None,
        }
    }
}

/// Final outcome of an inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionResult {
    /// Total inspection time.
    pub elapsed_ms: u64,
    /// Penalty to attach to the attempt.
    pub penalty: Penalty,
}

/// Inspection notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InspectionEvent {
    /// Countdown began.
    Started,
    /// Periodic refresh.
    Tick {
        /// Countdown value, floored at zero.
        remaining_ms: u64,
        /// Time since start.
        elapsed_ms: u64,
    },
    /// +2 threshold crossed.
    Plus2 {
        /// Elapsed time when noticed.
        elapsed_ms: u64,
    },
    /// DNF threshold crossed.
    Dnf {
        /// Elapsed time when noticed.
        elapsed_ms: u64,
    },
    /// Countdown reached zero.
    Complete,
    /// Inspection ended.
    Stopped {
        /// Total inspection time.
        elapsed_ms: u64,
        /// Final penalty.
        penalty: Penalty,
    },
    /// Cleared back to idle.
    Reset,
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Inspection countdown state machine.
///
/// Events produced by each call are queued and collected with
/// [`take_events`](Self::take_events).
#[derive(Debug, Clone)]
pub struct InspectionCountdown<C> {
    clock: C,
    config: InspectionConfig,
    state: InspectionState,
    plus2_fired: bool,
    dnf_fired: bool,
    completed: bool,
    events: Vec<InspectionEvent>,
}

impl<C: MonotonicClock> InspectionCountdown<C> {
    /// Create an idle countdown.
    pub fn new(clock: C, config: InspectionConfig) -> Self {
        let state = InspectionState::idle(duration_ms(config.duration));
        Self {
            clock,
            config,
            state,
            plus2_fired: false,
            dnf_fired: false,
            completed: false,
            events: Vec::new(),
        }
    }

    /// Begin inspection and evaluate once immediately.
    ///
    /// No-op while already active.
    pub fn start(&mut self) {
        if self.state.phase == InspectionPhase::Active {
            return;
        }
        self.clear_flags();
        self.state = InspectionState {
            phase: InspectionPhase::Active,
            started_at: Some(self.clock.now()),
            ..InspectionState::idle(duration_ms(self.config.duration))
        };
        self.events.push(InspectionEvent::Started);
        self.tick();
    }

    /// Re-evaluate the countdown. Does nothing unless active.
    pub fn tick(&mut self) {
        if !self.evaluate() {
            return;
        }
        self.events.push(InspectionEvent::Tick {
            remaining_ms: self.state.remaining_ms,
            elapsed_ms: self.state.elapsed_ms,
        });

        if self.state.remaining_ms == 0 && (!self.completed || self.config.repeat_complete) {
            self.completed = true;
            self.events.push(InspectionEvent::Complete);
        }
    }

    /// End inspection and return the elapsed time and most severe penalty.
    ///
    /// When not active, returns the last result without changing anything.
    pub fn stop(&mut self) -> InspectionResult {
        if self.evaluate() {
            self.state.phase = InspectionPhase::Stopped;
            self.events.push(InspectionEvent::Stopped {
                elapsed_ms: self.state.elapsed_ms,
                penalty: self.state.penalty,
            });
        }
        self.result()
    }

    /// Back to idle, clearing penalty and notification flags.
    pub fn reset(&mut self) {
        self.clear_flags();
        self.state = InspectionState::idle(duration_ms(self.config.duration));
        self.events.push(InspectionEvent::Reset);
    }

    /// Drain queued events.
    pub fn take_events(&mut self) -> Vec<InspectionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current snapshot.
    pub fn state(&self) -> InspectionState {
        self.state
    }

    /// Most severe penalty reached so far.
    pub fn penalty(&self) -> Penalty {
        self.state.penalty
    }

    /// Elapsed time and penalty at the last evaluation.
    pub fn result(&self) -> InspectionResult {
        InspectionResult {
            elapsed_ms: self.state.elapsed_ms,
            penalty: self.state.penalty,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &InspectionConfig {
        &self.config
    }

    /// Recompute elapsed/remaining and escalate the penalty.
    ///
    /// Thresholds are checked in order, so a late evaluation that lands past
    /// both still reports +2 before DNF.
    fn evaluate(&mut self) -> bool {
        if self.state.phase != InspectionPhase::Active {
            return false;
        }
        let Some(started_at) = self.state.started_at else {
            return false;
        };

        let elapsed = self.clock.delta(started_at);
        self.state.elapsed_ms = elapsed;
        self.state.remaining_ms = duration_ms(self.config.duration).saturating_sub(elapsed);

        if elapsed > duration_ms(self.config.plus2_threshold) && !self.plus2_fired {
            self.plus2_fired = true;
            self.state.penalty = self.state.penalty.escalate(Penalty::Plus2);
            self.events.push(InspectionEvent::Plus2 { elapsed_ms: elapsed });
        }
        if elapsed > duration_ms(self.config.dnf_threshold) && !self.dnf_fired {
            self.dnf_fired = true;
            self.state.penalty = self.state.penalty.escalate(Penalty::Dnf);
            self.events.push(InspectionEvent::Dnf { elapsed_ms: elapsed });
        }
        true
    }

    fn clear_flags(&mut self) {
        self.plus2_fired = false;
        self.dnf_fired = false;
        self.completed = false;
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// SCHEDULED ENGINE
// =============================================================================

/// Inspection countdown driven by a scheduler.
pub struct InspectionEngine<C: MonotonicClock + 'static, S: Scheduler> {
    core: Arc<Mutex<InspectionCountdown<C>>>,
    scheduler: S,
    ticker: Option<CancelHandle>,
    events: broadcast::Sender<InspectionEvent>,
}

impl<C: MonotonicClock + 'static, S: Scheduler> InspectionEngine<C, S> {
    /// Create an idle engine.
    pub fn new(clock: C, scheduler: S, config: InspectionConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            core: Arc::new(Mutex::new(InspectionCountdown::new(clock, config))),
            scheduler,
            ticker: None,
            events,
        }
    }

    /// Subscribe to inspection events.
    pub fn subscribe(&self) -> broadcast::Receiver<InspectionEvent> {
        self.events.subscribe()
    }

    /// Begin inspection and schedule countdown ticks. No-op while active.
    pub fn start(&mut self) {
        let (started, interval, produced) = {
            let mut core = lock(&self.core);
            let was_active = core.state().phase == InspectionPhase::Active;
            core.start();
            (!was_active, core.config().tick_interval, core.take_events())
        };
        if !started {
            return;
        }
        debug!("inspection started");
        publish(&self.events, produced);

        let core = self.core.clone();
        let events = self.events.clone();
        let handle = self.scheduler.schedule_repeating(
            interval,
            Box::new(move || {
                let produced = {
                    let mut core = lock(&core);
                    core.tick();
                    core.take_events()
                };
                publish(&events, produced);
            }),
        );
        if let Some(previous) = self.ticker.replace(handle) {
            previous.cancel();
        }
    }

    /// Stop inspection and return the result.
    pub fn stop(&mut self) -> InspectionResult {
        self.cancel_ticks();
        let (result, produced) = {
            let mut core = lock(&self.core);
            let result = core.stop();
            (result, core.take_events())
        };
        if !produced.is_empty() {
            debug!(elapsed_ms = result.elapsed_ms, penalty = %result.penalty, "inspection stopped");
        }
        publish(&self.events, produced);
        result
    }

    /// Cancel ticks and return to idle.
    pub fn reset(&mut self) {
        self.cancel_ticks();
        let produced = {
            let mut core = lock(&self.core);
            core.reset();
            core.take_events()
        };
        publish(&self.events, produced);
    }

    /// Current snapshot.
    pub fn state(&self) -> InspectionState {
        lock(&self.core).state()
    }

    /// Most severe penalty reached so far.
    pub fn penalty(&self) -> Penalty {
        lock(&self.core).penalty()
    }

    fn cancel_ticks(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.cancel();
        }
    }
}

fn publish(tx: &broadcast::Sender<InspectionEvent>, events: Vec<InspectionEvent>) {
    for event in events {
        match &event {
            InspectionEvent::Plus2 { elapsed_ms } => info!(elapsed_ms, "inspection overrun: +2"),
            InspectionEvent::Dnf { elapsed_ms } => info!(elapsed_ms, "inspection overrun: DNF"),
            _ => {}
        }
        let _ = tx.send(event);
    }
}
