use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use crate::random::RandomSource;

pub const DEFAULT_MAX_PENDING_SECONDS: u64 = 10;

/// Lower bound of the pending window, in seconds.
pub const MIN_PENDING_SECONDS: u64 = 2;

/// Runtime-adjustable payout rules.
///
/// Shared between the outcome selector and the scheduler and read every time
/// a decision is made, so changes apply to the next decision.
#[derive(Debug)]
pub struct PayoutPolicy {
    force_success: AtomicBool,
    max_pending_seconds: AtomicU64,
}

impl PayoutPolicy {
    pub fn new(force_success: bool, max_pending_seconds: u64) -> Self {
        Self {
            force_success: AtomicBool::new(force_success),
            max_pending_seconds: AtomicU64::new(max_pending_seconds),
        }
    }

    pub fn force_success(&self) -> bool {
        self.force_success.load(Ordering::Relaxed)
    }

    pub fn set_force_success(&self, enabled: bool) {
        self.force_success.store(enabled, Ordering::Relaxed);
    }

    pub fn max_pending_seconds(&self) -> u64 {
        self.max_pending_seconds.load(Ordering::Relaxed)
    }

    pub fn set_max_pending_seconds(&self, seconds: u64) {
        self.max_pending_seconds.store(seconds, Ordering::Relaxed);
    }

    /// Draw how long a new order stays `PENDING`: uniform over
    /// `[MIN_PENDING_SECONDS, max_pending_seconds]` whole seconds.
    ///
    /// A maximum below the floor collapses the window to the maximum.
    pub fn pending_delay(&self, random: &dyn RandomSource) -> Duration {
        let max = self.max_pending_seconds();
        let min = MIN_PENDING_SECONDS.min(max);
        Duration::from_secs(random.range_inclusive(min, max))
    }
}

impl Default for PayoutPolicy {
    fn default() -> Self {
        Self::new(false, DEFAULT_MAX_PENDING_SECONDS)
    }
}
