//! The batching engine. Price-submission events are coalesced into at most
//! one push per device per delivery window: the first qualifying event opens
//! a batch that becomes due after a fixed delay, later events only add new
//! store names to it, and a device that was pushed recently is left alone
//! until its cooldown has passed.

use crate::ports;
use crate::types::{FlushSummary, PushMessage};

mod matching;

use time::Duration;

pub(crate) const PUSH_TITLE: &str = "New prices at your stores";

#[derive(Debug, Clone, Copy)]
pub struct NotifySettings {
    pub cooldown: Duration,
    pub batch_delay: Duration,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::hours(4),
            batch_delay: Duration::minutes(10),
        }
    }
}

#[derive(Clone)]
pub struct Engine<St, P, T> {
    store: St,
    sender: P,
    time: T,
    settings: NotifySettings,
}

impl<St, P, T> Engine<St, P, T>
where
    St: ports::NotificationStore,
    P: ports::PushSender,
    T: ports::TimeProvider,
{
    pub fn new(store: St, sender: P, time: T, settings: NotifySettings) -> Self {
        Self {
            store,
            sender,
            time,
            settings,
        }
    }

    /// React to one price-submission event. Fire-and-forget: failures are
    /// logged, never surfaced to the submitting caller.
    pub fn on_price_submitted(&self, store_name: Option<&str>) {
        let store_name = match store_name {
            Some(name) if !name.trim().is_empty() => name.trim(),
            _ => return,
        };

        let subscriptions = match self.store.subscriptions_with_favorites() {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                eprintln!("price alert error: failed to load subscriptions ({err})");
                return;
            }
        };

        let now = self.time.now();
        let send_after = now + self.settings.batch_delay;

        for subscription in &subscriptions {
            if !matching::matches_any(store_name, &subscription.favorite_stores) {
                continue;
            }
            // Still inside the quiet period from a previous push.
            if let Some(sent_at) = subscription.last_push_sent_at
                && sent_at > now - self.settings.cooldown
            {
                continue;
            }
            // `send_after` only applies when this opens a new batch; an open
            // batch keeps its original deadline so latency stays bounded.
            if let Err(err) =
                self.store
                    .enqueue_store(&subscription.device_token, store_name, now, send_after)
            {
                eprintln!(
                    "price alert error: failed to enqueue '{store_name}' for a subscriber ({err})"
                );
            }
        }
    }

    /// Send every due batch. Each batch gets exactly one delivery attempt and
    /// is deleted whatever the outcome; only a successful send stamps the
    /// device's cooldown.
    pub async fn process_due_batches(&self) -> Result<FlushSummary, St::Error> {
        let now = self.time.now();
        let due = self.store.due_batches(now)?;

        let mut summary = FlushSummary::default();
        for batch in due {
            let message = PushMessage {
                title: PUSH_TITLE.to_string(),
                body: notification_body(&batch.stores),
                data: serde_json::json!({ "screen": "prices", "stores": &batch.stores }),
            };
            match self.sender.send(&batch.device_token, &message).await {
                Ok(()) => {
                    if let Err(err) = self.store.record_push_sent(&batch.device_token, now) {
                        eprintln!(
                            "price alert error: failed to record push time for batch {} ({err})",
                            batch.id
                        );
                    }
                    summary.sent += 1;
                }
                Err(err) => {
                    eprintln!("push delivery error: {err} (batch {})", batch.id);
                    summary.errors += 1;
                }
            }
            // A batch is spent after one attempt; a failed one left behind
            // would just be picked up and fail again on every flush cycle.
            if let Err(err) = self.store.delete_batch(batch.id) {
                eprintln!(
                    "price alert error: failed to delete batch {} ({err})",
                    batch.id
                );
            }
        }
        Ok(summary)
    }
}

fn notification_body(stores: &[String]) -> String {
    if stores.is_empty() {
        return "New prices were added at your favorite stores.".to_string();
    }
    format!("New prices were added at {}.", stores.join(", "))
}
