use async_trait::async_trait;
use uuid::Uuid;
use crate::error::PayoutResult;
use crate::order::{Order, OrderStatus};

/// Durable storage for payout orders.
///
/// Implementations must give read-after-write consistency for a single
/// order id. Every failure surfaces as `PayoutError::Persistence`, apart from
/// `complete_pending` which reports `PayoutError::InvalidTransition` when the
/// order is no longer `PENDING`.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order with a freshly assigned id.
    async fn create_order(
        &self,
        sc_id: Uuid,
        status: OrderStatus,
    ) -> PayoutResult<Order>;

    async fn get_order(
        &self,
        order_id: Uuid,
    ) -> PayoutResult<Option<Order>>;

    /// Most recently created order for a scratch card.
    async fn find_by_sc_id(
        &self,
        sc_id: Uuid,
    ) -> PayoutResult<Option<Order>>;

    /// Conditional `PENDING -> status` update of a single order.
    async fn complete_pending(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> PayoutResult<()>;
}
