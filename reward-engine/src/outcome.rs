use std::sync::Arc;
use reward_core::OrderStatus;
use crate::policy::PayoutPolicy;
use crate::random::RandomSource;

/// Picks the terminal status of a payout.
#[derive(Clone)]
pub struct OutcomeSelector {
    policy: Arc<PayoutPolicy>,
    random: Arc<dyn RandomSource>,
}

impl OutcomeSelector {
    pub fn new(policy: Arc<PayoutPolicy>, random: Arc<dyn RandomSource>) -> Self {
        Self { policy, random }
    }

    /// `SUCCESS` or `FAILED` with equal odds, or always `SUCCESS` while the
    /// policy forces success.
    pub fn select_terminal_status(&self) -> OrderStatus {
        if self.policy.force_success() {
            return OrderStatus::Success;
        }
        if self.random.coin_flip() {
            OrderStatus::Success
        } else {
            OrderStatus::Failed
        }
    }
}
