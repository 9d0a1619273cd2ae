use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Millisecond wall clock with a blocking sleep.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the UNIX epoch.
    fn now_ms(&self) -> u64;

    /// Block the calling thread for `ms` milliseconds.
    fn sleep_ms(&self, ms: u64);
}

/// The operating system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Simulated clock for tests and deterministic replay.
///
/// Time only moves when told to. `sleep_ms` does not block: it records the
/// requested wait and advances the clock by that amount plus a configurable
/// overshoot, mimicking a real sleep that never returns early.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
    overshoot_ms: u64,
    sleeps: Mutex<Vec<u64>>,
}

impl ManualClock {
    /// A clock frozen at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
            overshoot_ms: 0,
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Extra milliseconds added on top of every simulated sleep.
    pub fn with_overshoot(mut self, overshoot_ms: u64) -> Self {
        self.overshoot_ms = overshoot_ms;
        self
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Every wait requested so far, in order.
    pub fn sleeps(&self) -> Vec<u64> {
        self.sleeps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep_ms(&self, ms: u64) {
        self.sleeps.lock().unwrap_or_else(|e| e.into_inner()).push(ms);
        self.advance(ms + self.overshoot_ms);
    }
}
