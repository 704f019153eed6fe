use std::pin::Pin;
use std::time::Duration;

use time::OffsetDateTime;

use crate::ports;
use crate::types::PushMessage;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug)]
pub enum ExpoPushError {
    Http(reqwest::Error),
    Status(reqwest::StatusCode),
    Rejected(String),
}

impl std::fmt::Display for ExpoPushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpoPushError::Http(err) => write!(f, "push request failed: {err}"),
            ExpoPushError::Status(status) => write!(f, "push service answered {status}"),
            ExpoPushError::Rejected(message) => write!(f, "push rejected: {message}"),
        }
    }
}

impl From<reqwest::Error> for ExpoPushError {
    fn from(err: reqwest::Error) -> Self {
        ExpoPushError::Http(err)
    }
}

/// Delivers pushes through the Expo push HTTP API. The device token is the
/// Expo push token the app registered with.
#[derive(Clone)]
pub struct ExpoPushSender {
    endpoint: String,
    client: reqwest::Client,
}

impl ExpoPushSender {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }
}

#[derive(Debug, serde::Deserialize)]
struct ExpoPushResponse {
    data: ExpoPushTicket,
}

#[derive(Debug, serde::Deserialize)]
struct ExpoPushTicket {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

impl ports::PushSender for ExpoPushSender {
    type Error = ExpoPushError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, device_token: &'a str, message: &'a PushMessage) -> Self::Fut<'a> {
        Box::pin(async move {
            let body = serde_json::json!({
                "to": device_token,
                "title": message.title,
                "body": message.body,
                "data": message.data,
                "sound": "default",
            });
            let response = self.client.post(&self.endpoint).json(&body).send().await?;
            if !response.status().is_success() {
                return Err(ExpoPushError::Status(response.status()));
            }
            // Expo acknowledges with a per-message ticket; a ticket can carry
            // an error even when the HTTP request itself succeeded.
            let receipt: ExpoPushResponse = response.json().await?;
            if receipt.data.status != "ok" {
                return Err(ExpoPushError::Rejected(
                    receipt
                        .data
                        .message
                        .unwrap_or_else(|| receipt.data.status.clone()),
                ));
            }
            Ok(())
        })
    }
}
