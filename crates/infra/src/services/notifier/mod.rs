use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use vicinity_domain::QueueEntry;

/// Why a delivery attempt failed. Retryable failures go back to the
/// queue with backoff, terminal ones are dead-lettered immediately.
#[derive(Error, Debug, Clone)]
#[error("Delivery to: {recipient} failed: {reason}")]
pub struct NotifyError {
    pub recipient: String,
    pub reason: String,
    pub retryable: bool,
}

/// Sends one rendered notification to its recipient. The entry carries an
/// idempotency key, so a transport that deduplicates can drop the
/// occasional redelivered message.
#[async_trait::async_trait]
pub trait INotifier: Send + Sync {
    async fn send(&self, entry: &QueueEntry) -> Result<(), NotifyError>;
}

/// Notifier that hands messages to an external relay service (the thing
/// that actually talks SMTP or SMS) over HTTP.
pub struct HttpRelayNotifier {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpRelayNotifier {
    pub fn new(url: String, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("To build notifier http client");
        Self {
            client,
            url,
            api_key,
        }
    }
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    channel: String,
    recipient: &'a str,
    subject: &'a str,
    body: &'a str,
    idempotency_key: &'a str,
}

#[async_trait::async_trait]
impl INotifier for HttpRelayNotifier {
    async fn send(&self, entry: &QueueEntry) -> Result<(), NotifyError> {
        let message = RelayMessage {
            channel: entry.channel.to_string(),
            recipient: &entry.recipient,
            subject: &entry.subject,
            body: &entry.body,
            idempotency_key: &entry.idempotency_key,
        };
        let mut req = self.client.post(&self.url).json(&message);
        if let Some(api_key) = &self.api_key {
            req = req.header("x-relay-key", api_key);
        }
        let res = req.send().await.map_err(|e| NotifyError {
            recipient: entry.recipient.clone(),
            reason: format!("request failed: {}", e),
            retryable: true,
        })?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        // Overload and server side failures are worth retrying, the rest
        // of the 4xx range is not
        let retryable = status.is_server_error()
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
        Err(NotifyError {
            recipient: entry.recipient.clone(),
            reason: format!("relay returned status: {}", status),
            retryable,
        })
    }
}

/// Notifier used when no relay is configured. Writes the notification to
/// the log and reports success.
pub struct LogNotifier {}

impl LogNotifier {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl INotifier for LogNotifier {
    async fn send(&self, entry: &QueueEntry) -> Result<(), NotifyError> {
        info!(
            "Delivering notification over channel: {} to recipient: {} with subject: {}",
            entry.channel, entry.recipient, entry.subject
        );
        Ok(())
    }
}
