//! Rest and workout-duration timers.
//!
//! [`RestTimer`] and [`DurationTimer`] are plain state machines advanced by
//! `tick()`. [`SessionTimers`] drives them from Tokio interval tasks, one
//! per timer, and aborts each task as soon as its timer has nothing left to
//! do. Snapshots are published on a `watch` channel after every change.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::config::TimerConfig;

// ============================================================================
// Timer State Machines
// ============================================================================

/// Countdown between sets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestTimer {
    seconds: u32,
    running: bool,
    default_duration: u32,
}

impl RestTimer {
    pub fn new(default_duration: u32) -> Self {
        Self {
            seconds: 0,
            running: false,
            default_duration,
        }
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn default_duration(&self) -> u32 {
        self.default_duration
    }

    /// Start counting down from `seconds`, or from the default duration
    pub fn start(&mut self, seconds: Option<u32>) {
        self.seconds = seconds.unwrap_or(self.default_duration);
        self.running = true;
    }

    /// Advance one second; reaching zero stops the timer
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        self.seconds = self.seconds.saturating_sub(1);
        if self.seconds == 0 {
            self.running = false;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.seconds = 0;
    }

    /// Extend the countdown, restarting it if it had stopped
    pub fn add_time(&mut self, seconds: u32) {
        self.seconds = self.seconds.saturating_add(seconds);
        self.running = true;
    }

    pub fn set_default_duration(&mut self, seconds: u32) {
        self.default_duration = seconds;
    }
}

impl Default for RestTimer {
    fn default() -> Self {
        Self::new(60)
    }
}

/// Elapsed time of the active workout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DurationTimer {
    elapsed: u64,
}

impl DurationTimer {
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn tick(&mut self) {
        self.elapsed += 1;
    }

    pub fn reset(&mut self) {
        self.elapsed = 0;
    }
}

/// Format seconds as `m:ss`, or `h:mm:ss` from one hour up
pub fn format_clock(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

// ============================================================================
// Session Timers
// ============================================================================

/// Point-in-time view of both timers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub rest_seconds: u32,
    pub rest_running: bool,
    pub elapsed_seconds: u64,
}

#[derive(Debug)]
struct TimerState {
    rest: RestTimer,
    duration: DurationTimer,
}

impl TimerState {
    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            rest_seconds: self.rest.seconds(),
            rest_running: self.rest.is_running(),
            elapsed_seconds: self.duration.elapsed(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<TimerState>,
    updates: watch::Sender<TimerSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply a change and publish the resulting snapshot
    fn update<R>(&self, change: impl FnOnce(&mut TimerState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.lock();
            let result = change(&mut state);
            (result, state.snapshot())
        };
        self.updates.send_replace(snapshot);
        result
    }
}

/// Rest and duration timers bound to one active-workout session
///
/// Methods that start a timer spawn onto the current Tokio runtime.
#[derive(Debug)]
pub struct SessionTimers {
    shared: Arc<Shared>,
    period: Duration,
    rest_increment: u32,
    rest_task: Option<JoinHandle<()>>,
    duration_task: Option<JoinHandle<()>>,
}

impl SessionTimers {
    pub fn new(period: Duration, default_rest_seconds: u32, rest_increment: u32) -> Self {
        let state = TimerState {
            rest: RestTimer::new(default_rest_seconds),
            duration: DurationTimer::default(),
        };
        let (updates, _) = watch::channel(state.snapshot());

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                updates,
            }),
            period,
            rest_increment,
            rest_task: None,
            duration_task: None,
        }
    }

    pub fn from_config(config: &TimerConfig) -> Self {
        Self::new(
            Duration::from_millis(config.tick_millis),
            config.default_rest_seconds,
            config.rest_increment_seconds,
        )
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.shared.lock().snapshot()
    }

    /// Receive a snapshot after every tick or change
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Align the timers with whether a workout is active
    ///
    /// The duration timer runs while a workout is active. When none is,
    /// both tickers are aborted, elapsed time is zeroed and the rest timer
    /// is stopped.
    pub fn sync(&mut self, workout_active: bool) {
        if workout_active {
            if self.duration_task.is_none() {
                debug!("Starting workout duration timer");
                self.duration_task = Some(self.spawn_ticker(|state| {
                    state.duration.tick();
                    true
                }));
            }
            return;
        }

        if let Some(handle) = self.duration_task.take() {
            handle.abort();
            debug!("Stopped workout duration timer");
        }
        self.abort_rest_task();
        self.shared.update(|state| {
            state.duration.reset();
            state.rest.stop();
        });
    }

    /// Start the rest countdown, replacing any countdown in progress
    pub fn start_rest(&mut self, seconds: Option<u32>) {
        self.abort_rest_task();
        self.shared.update(|state| state.rest.start(seconds));
        self.rest_task = Some(self.spawn_rest_ticker());
    }

    pub fn stop_rest(&mut self) {
        self.abort_rest_task();
        self.shared.update(|state| state.rest.stop());
    }

    /// Add time to the rest countdown, the configured increment by default
    ///
    /// A ticker that saw the countdown stopped has exited or is about to, so
    /// a stopped countdown always gets a fresh one.
    pub fn add_rest_time(&mut self, seconds: Option<u32>) {
        let seconds = seconds.unwrap_or(self.rest_increment);
        let was_running = self.shared.update(|state| {
            let was_running = state.rest.is_running();
            state.rest.add_time(seconds);
            was_running
        });

        if !was_running {
            self.abort_rest_task();
            self.rest_task = Some(self.spawn_rest_ticker());
        }
    }

    pub fn set_default_rest(&mut self, seconds: u32) {
        self.shared
            .update(|state| state.rest.set_default_duration(seconds));
    }

    pub fn default_rest(&self) -> u32 {
        self.shared.lock().rest.default_duration()
    }

    fn abort_rest_task(&mut self) {
        if let Some(handle) = self.rest_task.take() {
            handle.abort();
        }
    }

    fn spawn_rest_ticker(&self) -> JoinHandle<()> {
        self.spawn_ticker(|state| {
            state.rest.tick();
            state.rest.is_running()
        })
    }

    /// Run `step` once per period until it returns false
    fn spawn_ticker(&self, step: fn(&mut TimerState) -> bool) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let period = self.period;
        let first_tick = Instant::now() + period;

        tokio::spawn(async move {
            let mut interval = time::interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !shared.update(step) {
                    break;
                }
            }
        })
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        if let Some(handle) = self.rest_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.duration_task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timers() -> SessionTimers {
        SessionTimers::new(Duration::from_secs(1), 60, 15)
    }

    #[test]
    fn test_rest_tick_to_zero_stops() {
        let mut rest = RestTimer::new(60);
        rest.start(Some(2));
        rest.tick();
        assert!(rest.is_running());
        assert_eq!(rest.seconds(), 1);

        rest.tick();
        assert_eq!(rest.seconds(), 0);
        assert!(!rest.is_running());

        rest.tick();
        assert_eq!(rest.seconds(), 0);
    }

    #[test]
    fn test_rest_stop_and_add_time() {
        let mut rest = RestTimer::default();
        rest.start(None);
        assert_eq!(rest.seconds(), 60);

        rest.stop();
        assert_eq!(rest.seconds(), 0);
        assert!(!rest.is_running());

        rest.add_time(15);
        assert_eq!(rest.seconds(), 15);
        assert!(rest.is_running());

        rest.set_default_duration(90);
        rest.start(None);
        assert_eq!(rest.seconds(), 90);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(75), "1:15");
        assert_eq!(format_clock(3600), "1:00:00");
        assert_eq!(format_clock(3725), "1:02:05");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rest_counts_down_and_stops() {
        let mut timers = timers();
        timers.start_rest(Some(3));

        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(timers.snapshot().rest_seconds, 2);
        assert!(timers.snapshot().rest_running);

        time::sleep(Duration::from_millis(2000)).await;
        let snapshot = timers.snapshot();
        assert_eq!(snapshot.rest_seconds, 0);
        assert!(!snapshot.rest_running);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(timers.snapshot().rest_seconds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_time_restarts_finished_rest() {
        let mut timers = timers();
        timers.start_rest(Some(1));
        time::sleep(Duration::from_millis(1500)).await;
        assert!(!timers.snapshot().rest_running);

        timers.add_rest_time(None);
        assert_eq!(timers.snapshot().rest_seconds, 15);
        assert!(timers.snapshot().rest_running);

        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(timers.snapshot().rest_seconds, 13);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_time_rearms_exiting_ticker() {
        let mut timers = timers();
        // Ticker that has seen the countdown stop but not yet returned
        timers.rest_task = Some(tokio::spawn(std::future::pending::<()>()));
        assert!(!timers.snapshot().rest_running);

        timers.add_rest_time(Some(5));
        time::sleep(Duration::from_millis(2500)).await;

        let snapshot = timers.snapshot();
        assert_eq!(snapshot.rest_seconds, 3);
        assert!(snapshot.rest_running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_time_while_running_keeps_one_ticker() {
        let mut timers = timers();
        timers.start_rest(Some(10));
        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(timers.snapshot().rest_seconds, 9);

        timers.add_rest_time(None);
        assert_eq!(timers.snapshot().rest_seconds, 24);

        time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(timers.snapshot().rest_seconds, 22);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_rest_zeroes_immediately() {
        let mut timers = timers();
        timers.start_rest(None);
        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(timers.snapshot().rest_seconds, 58);

        timers.stop_rest();
        let snapshot = timers.snapshot();
        assert_eq!(snapshot.rest_seconds, 0);
        assert!(!snapshot.rest_running);

        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(timers.snapshot(), snapshot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_resets_and_cancels() {
        let mut timers = timers();
        timers.sync(true);
        timers.start_rest(Some(30));

        time::sleep(Duration::from_millis(3500)).await;
        let snapshot = timers.snapshot();
        assert_eq!(snapshot.elapsed_seconds, 3);
        assert_eq!(snapshot.rest_seconds, 27);

        timers.sync(false);
        assert_eq!(timers.snapshot(), TimerSnapshot::default());

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(timers.snapshot(), TimerSnapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_active_is_idempotent() {
        let mut timers = timers();
        timers.sync(true);
        time::sleep(Duration::from_millis(500)).await;
        timers.sync(true);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(timers.snapshot().elapsed_seconds, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_ticks() {
        let mut timers = timers();
        let mut updates = timers.subscribe();
        timers.start_rest(Some(2));

        updates.changed().await.unwrap();
        let mut last = *updates.borrow_and_update();
        while last.rest_running {
            updates.changed().await.unwrap();
            last = *updates.borrow_and_update();
        }
        assert_eq!(last.rest_seconds, 0);
    }
}
