use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use reward_core::{Notifier, Order, OrderRepository, OrderStatus, PayoutError, PayoutResult};
use tokio::task::JoinSet;
use tracing::{info, warn, Instrument};
use url::Url;
use uuid::Uuid;
use crate::outcome::OutcomeSelector;
use crate::policy::PayoutPolicy;
use crate::random::RandomSource;
use crate::transition::{DeferredTransition, TaskReport};

/// Creates payout orders and drives their transition to a terminal status.
///
/// Cheap to clone; all clones share the same store, policy and task registry.
#[derive(Clone)]
pub struct LifecycleEngine {
    repository: Arc<dyn OrderRepository>,
    notifier: Arc<dyn Notifier>,
    policy: Arc<PayoutPolicy>,
    random: Arc<dyn RandomSource>,
    selector: OutcomeSelector,
    // Detached deferred tasks, kept only so shutdown can wait for them.
    tasks: Arc<Mutex<JoinSet<TaskReport>>>,
    // Tasks not yet finished, including ones a timed out drain detached.
    live: Arc<AtomicUsize>,
}

impl LifecycleEngine {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        notifier: Arc<dyn Notifier>,
        policy: Arc<PayoutPolicy>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let selector = OutcomeSelector::new(policy.clone(), random.clone());
        Self {
            repository,
            notifier,
            policy,
            random,
            selector,
            tasks: Arc::new(Mutex::new(JoinSet::new())),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn policy(&self) -> &Arc<PayoutPolicy> {
        &self.policy
    }

    pub fn repository(&self) -> &Arc<dyn OrderRepository> {
        &self.repository
    }

    pub async fn create_order(&self, sc_id: Uuid, status: OrderStatus) -> PayoutResult<Order> {
        self.repository.create_order(sc_id, status).await
    }

    /// Synchronous payout: the order is stored already settled.
    pub async fn payout_now(&self, sc_id: Uuid) -> PayoutResult<Order> {
        let status = self.selector.select_terminal_status();
        let order = self.create_order(sc_id, status).await?;
        info!(order_id = %order.order_id, status = %order.status, "created settled payout");
        Ok(order)
    }

    /// Pending payout settled later in the background.
    pub async fn payout_deferred(&self, sc_id: Uuid) -> PayoutResult<Order> {
        let order = self.create_order(sc_id, OrderStatus::Pending).await?;
        self.schedule(order.order_id, None);
        Ok(order)
    }

    /// Pending payout settled later, then reported to `callback_url`.
    pub async fn payout_with_callback(&self, sc_id: Uuid, callback_url: Url) -> PayoutResult<Order> {
        let order = self.create_order(sc_id, OrderStatus::Pending).await?;
        self.schedule(order.order_id, Some(callback_url));
        Ok(order)
    }

    pub async fn get_status(&self, order_id: Uuid) -> PayoutResult<OrderStatus> {
        self.repository
            .get_order(order_id)
            .await?
            .map(|order| order.status)
            .ok_or(PayoutError::NotFound(order_id))
    }

    /// Same as `get_status` for an identifier that has not been parsed yet.
    pub async fn get_status_str(&self, raw_order_id: &str) -> PayoutResult<OrderStatus> {
        let order_id = Uuid::parse_str(raw_order_id.trim())
            .map_err(|_| PayoutError::InvalidIdentifier(raw_order_id.to_string()))?;
        self.get_status(order_id).await
    }

    pub async fn find_by_sc_id(&self, sc_id: Uuid) -> PayoutResult<Option<Order>> {
        self.repository.find_by_sc_id(sc_id).await
    }

    /// Number of deferred tasks that have not finished yet, whether or not
    /// the registry still tracks them.
    pub fn in_flight(&self) -> usize {
        reap(&mut self.lock_tasks());
        self.live.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout` for every scheduled task to finish.
    ///
    /// Returns `true` if all tasks completed. Tasks still running when the
    /// timeout expires are left alone.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let mut pending = std::mem::take(&mut *self.lock_tasks());
        if pending.is_empty() {
            return true;
        }

        info!(in_flight = pending.len(), "draining deferred payout tasks");
        let drained = tokio::time::timeout(timeout, async {
            while let Some(joined) = pending.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "deferred payout task panicked");
                }
            }
        })
        .await
        .is_ok();

        if !drained {
            warn!(abandoned = pending.len(), "drain timed out, orders may stay PENDING");
            pending.detach_all();
        }
        drained
    }

    fn schedule(&self, order_id: Uuid, callback_url: Option<Url>) {
        let delay = self.policy.pending_delay(self.random.as_ref());
        let task = DeferredTransition::new(order_id, delay, callback_url);
        let span = tracing::info_span!("deferred_transition", order_id = %order_id);
        let run = task
            .run(self.repository.clone(), self.selector.clone(), self.notifier.clone())
            .instrument(span);

        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveTask(self.live.clone());
        let run = async move {
            let _guard = guard;
            run.await
        };

        let mut tasks = self.lock_tasks();
        reap(&mut tasks);
        tasks.spawn(run);
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, JoinSet<TaskReport>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// Decrements the live count however the task ends.
struct LiveTask(Arc<AtomicUsize>);

impl Drop for LiveTask {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// Drop finished tasks so the registry only holds live work.
fn reap(tasks: &mut JoinSet<TaskReport>) {
    while let Some(joined) = tasks.try_join_next() {
        if let Err(e) = joined {
            warn!(error = %e, "deferred payout task panicked");
        }
    }
}
