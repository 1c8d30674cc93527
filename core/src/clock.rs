//! Time source used for session expiry and throttle backoff.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

/// Wall clock plus blocking sleep.
///
/// The dispatcher only reads time and sleeps through this trait so that
/// expiry and backoff behaviour can be driven deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Seconds added per retry attempt.
pub const BACKOFF_STEP_SECS: u64 = 20;

/// Inclusive jitter range in seconds.
pub const JITTER_SECS: (u64, u64) = (3, 10);

/// Delay before throttle retry `attempt` (1-based): `attempt * 20 + jitter`.
pub fn throttle_delay(attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(JITTER_SECS.0..=JITTER_SECS.1);
    Duration::from_secs(u64::from(attempt) * BACKOFF_STEP_SECS + jitter)
}
