use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reward_core::{Order, OrderRepository, OrderStatus, PayoutError, PayoutResult};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RewardPayoutRow {
    order_id: Uuid,
    sc_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RewardPayoutRow> for Order {
    type Error = PayoutError;

    fn try_from(row: RewardPayoutRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<OrderStatus>().map_err(PayoutError::persistence)?;
        Ok(Order {
            order_id: row.order_id,
            sc_id: row.sc_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create_order(
        &self,
        sc_id: Uuid,
        status: OrderStatus,
    ) -> PayoutResult<Order> {
        let row = sqlx::query_as::<_, RewardPayoutRow>(
            r#"
            INSERT INTO reward_payouts (order_id, sc_id, status)
            VALUES ($1, $2, $3)
            RETURNING order_id, sc_id, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sc_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(PayoutError::persistence)?;

        row.try_into()
    }

    async fn get_order(
        &self,
        order_id: Uuid,
    ) -> PayoutResult<Option<Order>> {
        let row = sqlx::query_as::<_, RewardPayoutRow>(
            "SELECT order_id, sc_id, status, created_at, updated_at FROM reward_payouts WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(PayoutError::persistence)?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_sc_id(
        &self,
        sc_id: Uuid,
    ) -> PayoutResult<Option<Order>> {
        let row = sqlx::query_as::<_, RewardPayoutRow>(
            r#"
            SELECT order_id, sc_id, status, created_at, updated_at
            FROM reward_payouts
            WHERE sc_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(sc_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(PayoutError::persistence)?;

        row.map(Order::try_from).transpose()
    }

    async fn complete_pending(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> PayoutResult<()> {
        let result = sqlx::query(
            "UPDATE reward_payouts SET status = $1, updated_at = NOW() WHERE order_id = $2 AND status = 'PENDING'",
        )
        .bind(status.as_str())
        .bind(order_id)
        .execute(&self.pool)
        .await
        .map_err(PayoutError::persistence)?;

        if result.rows_affected() == 0 {
            return Err(PayoutError::InvalidTransition { order_id, to: status });
        }
        Ok(())
    }
}
