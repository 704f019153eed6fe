use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A device registration: an opaque Expo push token plus the store names the
/// user wants price alerts for. `last_push_sent_at` is written only by the
/// flush path and drives the per-device cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub device_token: String,
    pub favorite_stores: Vec<String>,
    pub last_push_sent_at: Option<OffsetDateTime>,
}

/// Stores accumulated for one device within one delivery window. A batch is
/// "open" while `send_after` is still in the future; once it has passed, the
/// batch is due and will be deleted after a single send attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingBatch {
    pub id: i64,
    pub device_token: String,
    pub stores: Vec<String>,
    pub send_after: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// What an atomic enqueue did to the device's open batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Created,
    Appended,
    AlreadyQueued,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushSummary {
    pub sent: u32,
    pub errors: u32,
}
