use async_trait::async_trait;
use url::Url;
use crate::error::PayoutResult;
use crate::order::Order;

/// Outbound webhook delivering a settled order to the caller's endpoint.
///
/// One attempt only. Errors come back as `PayoutError::Notification` and the
/// caller decides whether to log them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        callback_url: &Url,
        order: &Order,
    ) -> PayoutResult<()>;
}
