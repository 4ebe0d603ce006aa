use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Source of the random draws used for outcomes and pending delays.
pub trait RandomSource: Send + Sync {
    /// Uniform draw from the closed range `[low, high]`.
    fn range_inclusive(&self, low: u64, high: u64) -> u64;

    /// Fair coin.
    fn coin_flip(&self) -> bool;
}

/// Thread-local RNG backed source used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn range_inclusive(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }

    fn coin_flip(&self) -> bool {
        rand::thread_rng().gen_bool(0.5)
    }
}

/// Replays queued draws in order, for deterministic tests and demos.
///
/// Once a queue runs dry, ranges yield their upper bound and coin flips
/// yield `true`. Queued range values are clamped into the requested range.
#[derive(Debug, Default)]
pub struct ScriptedRandom {
    ranges: Mutex<VecDeque<u64>>,
    flips: Mutex<VecDeque<bool>>,
}

impl ScriptedRandom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ranges(self, values: impl IntoIterator<Item = u64>) -> Self {
        self.ranges
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(values);
        self
    }

    pub fn with_flips(self, values: impl IntoIterator<Item = bool>) -> Self {
        self.flips
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(values);
        self
    }
}

impl RandomSource for ScriptedRandom {
    fn range_inclusive(&self, low: u64, high: u64) -> u64 {
        let next = self
            .ranges
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        match next {
            Some(v) => v.clamp(low, high.max(low)),
            None => high.max(low),
        }
    }

    fn coin_flip(&self) -> bool {
        self.flips
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or(true)
    }
}
