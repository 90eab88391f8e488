//! Wall clock, cancellable sleeps and cancellation tokens

use crate::core::SLEEP_SLICE;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Raised when a sleep is interrupted by a [`CancelToken`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cancelled")]
pub struct Cancelled;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the token has fired
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Source of time and of blocking waits
pub trait Clock: Send + Sync {
    /// Time since the Unix epoch
    fn now(&self) -> Duration;

    /// Sleep for `duration`, returning early with `Err(Cancelled)` if `cancel` fires
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<(), Cancelled>;

    /// Whole seconds since the Unix epoch
    fn timestamp(&self) -> i64 {
        self.now().as_secs() as i64
    }
}

/// Real time, sleeping in short slices so cancellation is noticed promptly
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<(), Cancelled> {
        let deadline = Instant::now() + duration;
        loop {
            cancel.check()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            std::thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

#[derive(Debug, Default)]
struct MockClockState {
    now: Duration,
    slept: Duration,
    sleeps: Vec<Duration>,
    cancel_after: Option<usize>,
}

/// Virtual clock for tests: sleeping advances time instantly and is recorded
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    state: Arc<Mutex<MockClockState>>,
}

impl MockClock {
    /// Start at `start` seconds after the epoch
    pub fn new(start: Duration) -> Self {
        let clock = Self::default();
        clock.set(start);
        clock
    }

    pub fn set(&self, now: Duration) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).now = now;
    }

    /// Move time forward without counting it as a sleep
    pub fn advance(&self, by: Duration) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).now += by;
    }

    /// Total time spent in `sleep`
    pub fn slept(&self) -> Duration {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).slept
    }

    /// Individual sleeps, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sleeps
            .clone()
    }

    /// Fire `cancel` during the n-th sleep (counting from 1)
    pub fn cancel_on_sleep(&self, n: usize) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).cancel_after = Some(n);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Duration {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).now
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<(), Cancelled> {
        cancel.check()?;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sleeps.push(duration);
        if state.cancel_after == Some(state.sleeps.len()) {
            cancel.cancel();
            return Err(Cancelled);
        }
        state.now += duration;
        state.slept += duration;
        Ok(())
    }
}
