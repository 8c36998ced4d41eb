//! Minimum-interval gate protecting a shared upstream rate-limit budget.
//!
//! The gate is a single shared slot, not a per-key limiter. Each caller
//! reserves the next free slot under a lock and only then sleeps until it,
//! so concurrent callers that observe the same stale timestamp still end up
//! spaced by at least the configured interval.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::debug;
use tokio::time::{Instant, sleep_until};

/// Default spacing between calls to the secondary geocoding provider.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(700);

/// Serialises callers so consecutive admissions are `min_interval` apart.
///
/// Owned by the client it protects; independent instances do not share
/// state.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tripfare_core::RateGate;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let gate = RateGate::new(Duration::from_millis(1));
/// gate.acquire().await;
/// gate.acquire().await;
/// # }
/// ```
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl RateGate {
    /// Create a gate admitting one caller per `min_interval`.
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Configured spacing between admissions.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until this caller's slot arrives.
    ///
    /// The slot is claimed before suspending. Dropping the returned future
    /// early forfeits the slot rather than releasing it.
    pub async fn acquire(&self) {
        let slot = self.reserve();
        let now = Instant::now();
        if slot > now {
            debug!("rate gate delaying call by {:?}", slot - now);
            sleep_until(slot).await;
        }
    }

    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut next_slot = self
            .next_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = match *next_slot {
            Some(next) if next > now => next,
            _ => now,
        };
        *next_slot = Some(slot + self.min_interval);
        slot
    }
}
