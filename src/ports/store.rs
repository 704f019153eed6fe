use time::OffsetDateTime;

use crate::types::{EnqueueOutcome, PendingBatch, Subscription};

/// Durable shared state behind the engine. Nothing is cached across calls;
/// every method re-reads or conditionally writes current storage.
pub trait NotificationStore: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;

    /// Subscriptions with at least one favorite store.
    fn subscriptions_with_favorites(&self) -> Result<Vec<Subscription>, Self::Error>;

    /// Register or re-register a device, replacing its favorites wholesale.
    /// Any existing `last_push_sent_at` is preserved.
    fn upsert_subscription(
        &self,
        device_token: &str,
        favorite_stores: &[String],
    ) -> Result<(), Self::Error>;

    /// Atomically add `store_name` to the device's open batch (one whose
    /// `send_after` is after `now`), creating the batch with the given
    /// `send_after` if no open batch exists. An open batch's `send_after` is
    /// never changed, and a store already in the batch is not added twice.
    ///
    /// Must be a conditional write: concurrent calls for the same device may
    /// not produce two open batches.
    fn enqueue_store(
        &self,
        device_token: &str,
        store_name: &str,
        now: OffsetDateTime,
        send_after: OffsetDateTime,
    ) -> Result<EnqueueOutcome, Self::Error>;

    /// Batches whose `send_after` is at or before `now`.
    fn due_batches(&self, now: OffsetDateTime) -> Result<Vec<PendingBatch>, Self::Error>;

    /// Every stored batch, due or not. Debug/ops listing.
    fn pending_batches(&self) -> Result<Vec<PendingBatch>, Self::Error>;

    fn delete_batch(&self, batch_id: i64) -> Result<(), Self::Error>;

    fn record_push_sent(&self, device_token: &str, at: OffsetDateTime) -> Result<(), Self::Error>;
}
