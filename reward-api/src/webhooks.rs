use async_trait::async_trait;
use reward_core::{Notifier, Order, PayoutError, PayoutResult};
use std::time::Duration;
use url::Url;

pub const CALLBACK_URL_HEADER: &str = "x-callback-url";

/// Default bound on a single webhook call.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends `PUT <callback-url>` with the settled order as JSON.
#[derive(Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, callback_url: &Url, order: &Order) -> PayoutResult<()> {
        let response = self
            .client
            .put(callback_url.clone())
            .json(order)
            .send()
            .await
            .map_err(PayoutError::notification)?;

        // Only the status matters, the body is ignored
        response.error_for_status().map_err(PayoutError::notification)?;
        Ok(())
    }
}

/// Admission check for a caller supplied webhook target: absolute `http` or
/// `https` URL with a host.
pub fn parse_callback_url(raw: &str) -> PayoutResult<Url> {
    let invalid = || PayoutError::Validation(format!("{} must be a valid absolute URL", CALLBACK_URL_HEADER));

    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().map_or(true, str::is_empty) {
        return Err(invalid());
    }
    Ok(url)
}
