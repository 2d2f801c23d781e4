//! Periodic Callback Scheduling
//!
//! Timers never talk to an event loop directly. They ask a [`Scheduler`] for a
//! repeating callback and keep the returned [`CancelHandle`]. Tick delivery is
//! best-effort: callbacks may arrive late or be coalesced, so callers must
//! derive elapsed time from an absolute start timestamp on every tick.
//!
//! - [`TokioScheduler`]: tokio interval task per registration
//! - [`ManualScheduler`]: virtual-time scheduler driven by tests

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

use super::clock::{ManualClock, MonotonicClock, Timestamp};

/// Callback invoked on every scheduled tick.
pub type TickCallback = Box<dyn FnMut() + Send + 'static>;

/// Smallest interval a scheduler will honour.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Source of repeating callbacks.
pub trait Scheduler: Send + Sync {
    /// Invoke `callback` every `interval` until the returned handle is
    /// cancelled or dropped.
    fn schedule_repeating(&self, interval: Duration, callback: TickCallback) -> CancelHandle;
}

/// Cancels a scheduled callback.
///
/// Cancellation is synchronous: once [`CancelHandle::cancel`] returns, the
/// callback is never invoked again, even if its tick was already due.
/// Dropping the handle cancels as well.
#[derive(Debug, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl CancelHandle {
    fn new(cancelled: Arc<AtomicBool>, abort: Option<AbortHandle>) -> Self {
        Self { cancelled, abort }
    }

    /// Stop future invocations.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// TOKIO SCHEDULER
// =============================================================================

/// Runs each registration as a tokio task driven by `tokio::time::interval`.
///
/// Missed ticks are skipped rather than replayed in a burst.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Schedule onto the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Schedule onto the runtime of the calling context, if there is one.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, interval: Duration, mut callback: TickCallback) -> CancelHandle {
        let period = interval.max(MIN_INTERVAL);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();

        let task = self.handle.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                callback();
            }
        });

        CancelHandle::new(cancelled, Some(task.abort_handle()))
    }
}

// =============================================================================
// MANUAL SCHEDULER
// =============================================================================

struct ManualTask {
    id: u64,
    interval_us: u64,
    next_due: Timestamp,
    callback: TickCallback,
    cancelled: Arc<AtomicBool>,
}

impl ManualTask {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Virtual-time scheduler.
///
/// Time only moves through [`advance`](Self::advance) (which fires every tick
/// that falls inside the window, moving the shared [`ManualClock`] to each due
/// time) or by advancing the clock directly and then calling
/// [`run_pending`](Self::run_pending) to simulate late, coalesced delivery.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: ManualClock,
    tasks: Arc<Mutex<Vec<ManualTask>>>,
    next_id: Arc<AtomicU64>,
}

impl ManualScheduler {
    /// Create a scheduler that drives `clock`.
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            tasks: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The clock this scheduler moves.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Number of live (uncancelled) registrations.
    pub fn pending_tasks(&self) -> usize {
        lock(&self.tasks).iter().filter(|t| !t.is_cancelled()).count()
    }

    /// Advance virtual time by `by`, firing every tick due in the window in
    /// timestamp order.
    pub fn advance(&self, by: Duration) {
        let by_us = u64::try_from(by.as_micros()).unwrap_or(u64::MAX);
        let target = Timestamp::from_micros(self.clock.now().as_micros().saturating_add(by_us));

        while self.fire_next_due(target) {}

        self.clock.advance_to(target);
    }

    /// Advance virtual time by `millis` milliseconds.
    pub fn advance_ms(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Fire each overdue task once at the current time and reschedule it one
    /// interval from now. Returns the number of callbacks invoked.
    pub fn run_pending(&self) -> usize {
        let now = self.clock.now();
        let due: Vec<ManualTask> = {
            let mut tasks = lock(&self.tasks);
            tasks.retain(|t| !t.is_cancelled());
            let (due, waiting): (Vec<_>, Vec<_>) = tasks.drain(..).partition(|t| t.next_due <= now);
            *tasks = waiting;
            due
        };

        let mut fired = 0;
        for mut task in due {
            if task.is_cancelled() {
                continue;
            }
            (task.callback)();
            fired += 1;
            task.next_due = Timestamp::from_micros(now.as_micros().saturating_add(task.interval_us));
            if !task.is_cancelled() {
                lock(&self.tasks).push(task);
            }
        }
        fired
    }

    /// Fire the earliest task due at or before `limit`. The task is taken out
    /// of the table while its callback runs so the callback may freely cancel
    /// or register tasks.
    fn fire_next_due(&self, limit: Timestamp) -> bool {
        let mut task = {
            let mut tasks = lock(&self.tasks);
            tasks.retain(|t| !t.is_cancelled());
            let next = tasks
                .iter()
                .enumerate()
                .filter(|(_, t)| t.next_due <= limit)
                .min_by_key(|(_, t)| (t.next_due, t.id))
                .map(|(idx, _)| idx);
            match next {
                Some(idx) => tasks.swap_remove(idx),
                None => return false,
            }
        };

        self.clock.advance_to(task.next_due);
        (task.callback)();

        task.next_due = Timestamp::from_micros(task.next_due.as_micros().saturating_add(task.interval_us));
        if !task.is_cancelled() {
            lock(&self.tasks).push(task);
        }
        true
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, interval: Duration, callback: TickCallback) -> CancelHandle {
        let interval_us = u64::try_from(interval.max(MIN_INTERVAL).as_micros()).unwrap_or(u64::MAX);
        let cancelled = Arc::new(AtomicBool::new(false));

        let task = ManualTask {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            interval_us,
            next_due: Timestamp::from_micros(self.clock.now().as_micros().saturating_add(interval_us)),
            callback,
            cancelled: cancelled.clone(),
        };
        lock(&self.tasks).push(task);

        CancelHandle::new(cancelled, None)
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.clock.now())
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Arc<AtomicU64>, TickCallback) {
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        (count, Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_manual_advance_fires_each_interval() {
        let scheduler = ManualScheduler::new(ManualClock::new());
        let (count, callback) = counter();

        let _handle = scheduler.schedule_repeating(Duration::from_millis(10), callback);
        scheduler.advance_ms(95);

        assert_eq!(count.load(Ordering::SeqCst), 9);
        assert_eq!(scheduler.clock().now(), Timestamp::from_millis(95));
    }

    #[test]
    fn test_manual_cancel_is_synchronous() {
        let scheduler = ManualScheduler::new(ManualClock::new());
        let (count, callback) = counter();

        let handle = scheduler.schedule_repeating(Duration::from_millis(10), callback);
        scheduler.advance_ms(30);
        handle.cancel();
        scheduler.advance_ms(100);

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.pending_tasks(), 0);
    }

    #[test]
    fn test_drop_cancels() {
        let scheduler = ManualScheduler::new(ManualClock::new());
        let (count, callback) = counter();

        drop(scheduler.schedule_repeating(Duration::from_millis(10), callback));
        scheduler.advance_ms(50);

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_run_pending_coalesces_missed_ticks() {
        let scheduler = ManualScheduler::new(ManualClock::new());
        let (count, callback) = counter();

        let _handle = scheduler.schedule_repeating(Duration::from_millis(10), callback);
        // Clock jumps without delivering ticks, then one late delivery.
        scheduler.clock().advance_ms(500);
        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        scheduler.advance_ms(10);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_ticks_and_cancels() {
        let scheduler = TokioScheduler::new(Handle::current());
        let (count, callback) = counter();

        let handle = scheduler.schedule_repeating(Duration::from_millis(10), callback);
        tokio::time::sleep(Duration::from_millis(55)).await;
        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 4, "expected ticks, got {seen}");

        handle.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn test_try_current_outside_runtime() {
        assert!(TokioScheduler::try_current().is_none());
    }
}
