use async_trait::async_trait;
use chrono::Utc;
use reward_core::{Order, OrderRepository, OrderStatus, PayoutError, PayoutResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local order store.
///
/// Used by tests and by the `memory` database backend. Orders live only as
/// long as the process does.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, StoredOrder>>,
}

#[derive(Debug)]
struct StoredOrder {
    seq: u64,
    order: Order,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create_order(
        &self,
        sc_id: Uuid,
        status: OrderStatus,
    ) -> PayoutResult<Order> {
        let order = Order::new(sc_id, status);
        let mut orders = self.orders.write().await;
        let seq = orders.len() as u64;
        orders.insert(order.order_id, StoredOrder { seq, order: order.clone() });
        Ok(order)
    }

    async fn get_order(
        &self,
        order_id: Uuid,
    ) -> PayoutResult<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).map(|s| s.order.clone()))
    }

    async fn find_by_sc_id(
        &self,
        sc_id: Uuid,
    ) -> PayoutResult<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .filter(|s| s.order.sc_id == sc_id)
            .max_by_key(|s| s.seq)
            .map(|s| s.order.clone()))
    }

    async fn complete_pending(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> PayoutResult<()> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order_id) {
            Some(stored) if stored.order.is_pending() => {
                stored.order.status = status;
                stored.order.updated_at = Utc::now();
                Ok(())
            }
            Some(_) | None => Err(PayoutError::InvalidTransition { order_id, to: status }),
        }
    }
}
