use std::sync::Arc;
use std::time::Duration;
use reward_core::{Notifier, OrderRepository, OrderStatus};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;
use crate::outcome::OutcomeSelector;

/// Progress of a deferred transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Scheduled,
    Waiting,
    Updating,
    Done,
    UpdateFailed,
}

/// What happened to the webhook of a finished task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// No callback URL was captured for the order.
    NotRequested,
    Delivered,
    Failed,
    /// The settled order could not be re-read, so nothing was sent.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub order_id: Uuid,
    pub state: TaskState,
    pub terminal_status: Option<OrderStatus>,
    pub notification: NotificationOutcome,
}

/// Settles one `PENDING` order after a delay, then optionally fires its
/// webhook.
///
/// Runs to completion once started. Failures are logged and reported in the
/// returned `TaskReport`, never raised.
#[derive(Debug)]
pub struct DeferredTransition {
    order_id: Uuid,
    delay: Duration,
    callback_url: Option<Url>,
    state: TaskState,
}

impl DeferredTransition {
    pub fn new(order_id: Uuid, delay: Duration, callback_url: Option<Url>) -> Self {
        Self {
            order_id,
            delay,
            callback_url,
            state: TaskState::Scheduled,
        }
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub async fn run(
        mut self,
        repository: Arc<dyn OrderRepository>,
        selector: OutcomeSelector,
        notifier: Arc<dyn Notifier>,
    ) -> TaskReport {
        self.state = TaskState::Waiting;
        debug!(delay_secs = self.delay.as_secs(), "order pending");
        tokio::time::sleep(self.delay).await;

        self.state = TaskState::Updating;
        let terminal_status = selector.select_terminal_status();

        if let Err(e) = repository.complete_pending(self.order_id, terminal_status).await {
            self.state = TaskState::UpdateFailed;
            error!(terminal_status = %terminal_status, error = %e, "failed to update reward payout status");
            return self.report(Some(terminal_status), NotificationOutcome::NotRequested);
        }

        self.state = TaskState::Done;
        info!(terminal_status = %terminal_status, "updated order status");

        let notification = match self.callback_url.take() {
            Some(url) => self.send_webhook(&url, repository.as_ref(), notifier.as_ref()).await,
            None => NotificationOutcome::NotRequested,
        };

        self.report(Some(terminal_status), notification)
    }

    async fn send_webhook(
        &self,
        url: &Url,
        repository: &dyn OrderRepository,
        notifier: &dyn Notifier,
    ) -> NotificationOutcome {
        let order = match repository.get_order(self.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!("order missing after update, skipping webhook");
                return NotificationOutcome::Skipped;
            }
            Err(e) => {
                error!(error = %e, "failed to get reward payout after updating");
                return NotificationOutcome::Skipped;
            }
        };

        match notifier.notify(url, &order).await {
            Ok(()) => {
                info!(callback_url = %url, status = %order.status, "webhook delivered");
                NotificationOutcome::Delivered
            }
            Err(e) => {
                error!(callback_url = %url, error = %e, "failed to call webhook");
                NotificationOutcome::Failed
            }
        }
    }

    fn report(&self, terminal_status: Option<OrderStatus>, notification: NotificationOutcome) -> TaskReport {
        TaskReport {
            order_id: self.order_id,
            state: self.state,
            terminal_status,
            notification,
        }
    }
}
