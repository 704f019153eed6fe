//! SQLite-backed notification state. Subscriptions and pending batches are
//! plain rows; store-name lists are stored as JSON arrays. Timestamps are
//! unix nanoseconds so range queries compare numerically.

use crate::ports;
use crate::types::{EnqueueOutcome, PendingBatch, Subscription};

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use time::OffsetDateTime;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS subscriptions (
    device_token TEXT PRIMARY KEY,
    favorite_stores TEXT NOT NULL,
    last_push_sent_at INTEGER
);
CREATE TABLE IF NOT EXISTS pending_batches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_token TEXT NOT NULL,
    stores TEXT NOT NULL,
    send_after INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_pending_batches_send_after
    ON pending_batches(send_after);
CREATE INDEX IF NOT EXISTS idx_pending_batches_device_token
    ON pending_batches(device_token);
";

#[derive(Debug)]
pub enum StoreError {
    Db(rusqlite::Error),
    Corrupt(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Db(err) => write!(f, "database error: {err}"),
            StoreError::Corrupt(message) => write!(f, "corrupt stored value: {message}"),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Db(err)
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn ts_to_db(ts: OffsetDateTime) -> i64 {
    ts.unix_timestamp_nanos() as i64
}

fn ts_from_db(value: i64) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp_nanos(value as i128)
        .map_err(|err| StoreError::Corrupt(format!("bad timestamp {value}: {err}")))
}

fn stores_from_json(json: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(json).map_err(|err| StoreError::Corrupt(format!("bad store list: {err}")))
}

fn stores_to_json(stores: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(stores)
        .map_err(|err| StoreError::Corrupt(format!("unencodable store list: {err}")))
}

fn collect_batches(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<PendingBatch>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;

    let mut batches = Vec::new();
    for row in rows {
        let (id, device_token, stores_json, send_after) = row?;
        batches.push(PendingBatch {
            id,
            device_token,
            stores: stores_from_json(&stores_json)?,
            send_after: ts_from_db(send_after)?,
        });
    }
    Ok(batches)
}

impl ports::NotificationStore for SqliteStore {
    type Error = StoreError;

    fn subscriptions_with_favorites(&self) -> Result<Vec<Subscription>, Self::Error> {
        let conn = self.conn.lock().expect("db lock");
        let mut stmt = conn.prepare(
            "SELECT device_token, favorite_stores, last_push_sent_at
             FROM subscriptions WHERE favorite_stores <> '[]'",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })?;

        let mut subscriptions = Vec::new();
        for row in rows {
            let (device_token, favorites_json, last_push) = row?;
            let favorite_stores = stores_from_json(&favorites_json)?;
            if favorite_stores.is_empty() {
                continue;
            }
            subscriptions.push(Subscription {
                device_token,
                favorite_stores,
                last_push_sent_at: last_push.map(ts_from_db).transpose()?,
            });
        }
        Ok(subscriptions)
    }

    fn upsert_subscription(
        &self,
        device_token: &str,
        favorite_stores: &[String],
    ) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("db lock");
        conn.execute(
            "INSERT INTO subscriptions (device_token, favorite_stores) VALUES (?1, ?2)
             ON CONFLICT(device_token) DO UPDATE SET favorite_stores = excluded.favorite_stores",
            params![device_token, stores_to_json(favorite_stores)?],
        )?;
        Ok(())
    }

    fn enqueue_store(
        &self,
        device_token: &str,
        store_name: &str,
        now: OffsetDateTime,
        send_after: OffsetDateTime,
    ) -> Result<EnqueueOutcome, Self::Error> {
        let mut conn = self.conn.lock().expect("db lock");
        // The find-or-create must be one conditional write: two events for
        // the same device racing past a plain SELECT would open two batches.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let open = tx
            .query_row(
                "SELECT id, stores FROM pending_batches
                 WHERE device_token = ?1 AND send_after > ?2
                 ORDER BY send_after LIMIT 1",
                params![device_token, ts_to_db(now)],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let outcome = match open {
            Some((id, stores_json)) => {
                let mut stores = stores_from_json(&stores_json)?;
                if stores.iter().any(|existing| existing == store_name) {
                    EnqueueOutcome::AlreadyQueued
                } else {
                    stores.push(store_name.to_string());
                    tx.execute(
                        "UPDATE pending_batches SET stores = ?1 WHERE id = ?2",
                        params![stores_to_json(&stores)?, id],
                    )?;
                    EnqueueOutcome::Appended
                }
            }
            None => {
                tx.execute(
                    "INSERT INTO pending_batches (device_token, stores, send_after)
                     VALUES (?1, ?2, ?3)",
                    params![
                        device_token,
                        stores_to_json(&[store_name.to_string()])?,
                        ts_to_db(send_after)
                    ],
                )?;
                EnqueueOutcome::Created
            }
        };
        tx.commit()?;
        Ok(outcome)
    }

    fn due_batches(&self, now: OffsetDateTime) -> Result<Vec<PendingBatch>, Self::Error> {
        let conn = self.conn.lock().expect("db lock");
        collect_batches(
            &conn,
            "SELECT id, device_token, stores, send_after FROM pending_batches
             WHERE send_after <= ?1 ORDER BY id",
            &[&ts_to_db(now)],
        )
    }

    fn pending_batches(&self) -> Result<Vec<PendingBatch>, Self::Error> {
        let conn = self.conn.lock().expect("db lock");
        collect_batches(
            &conn,
            "SELECT id, device_token, stores, send_after FROM pending_batches ORDER BY id",
            &[],
        )
    }

    fn delete_batch(&self, batch_id: i64) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("db lock");
        conn.execute("DELETE FROM pending_batches WHERE id = ?1", params![batch_id])?;
        Ok(())
    }

    fn record_push_sent(&self, device_token: &str, at: OffsetDateTime) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("db lock");
        conn.execute(
            "UPDATE subscriptions SET last_push_sent_at = ?2 WHERE device_token = ?1",
            params![device_token, ts_to_db(at)],
        )?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::ports::NotificationStore;

    use time::Duration;
    use time::format_description::well_known::Rfc3339;

    fn open_store() -> SqliteStore {
        SqliteStore::open(Path::new(":memory:")).expect("open store")
    }

    fn test_now() -> OffsetDateTime {
        OffsetDateTime::parse("2025-03-08T12:00:00Z", &Rfc3339).expect("parse now")
    }

    fn favorites(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn subscriptions_with_favorites__should_round_trip_registration() {
        // Given
        let store = open_store();
        store
            .upsert_subscription("device-1", &favorites(&["Kiwi", "Meny"]))
            .expect("register");

        // When
        let subscriptions = store
            .subscriptions_with_favorites()
            .expect("list subscriptions");

        // Then
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].device_token, "device-1");
        assert_eq!(subscriptions[0].favorite_stores, favorites(&["Kiwi", "Meny"]));
        assert_eq!(subscriptions[0].last_push_sent_at, None);
    }

    #[test]
    fn subscriptions_with_favorites__should_skip_empty_favorite_lists() {
        // Given
        let store = open_store();
        store
            .upsert_subscription("device-1", &[])
            .expect("register");

        // When
        let subscriptions = store
            .subscriptions_with_favorites()
            .expect("list subscriptions");

        // Then
        assert!(subscriptions.is_empty());
    }

    #[test]
    fn upsert_subscription__should_replace_favorites_and_keep_last_push() {
        // Given
        let store = open_store();
        store
            .upsert_subscription("device-1", &favorites(&["Kiwi"]))
            .expect("register");
        store
            .record_push_sent("device-1", test_now())
            .expect("record push");

        // When
        store
            .upsert_subscription("device-1", &favorites(&["Rema 1000"]))
            .expect("re-register");

        // Then
        let subscriptions = store
            .subscriptions_with_favorites()
            .expect("list subscriptions");
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].favorite_stores, favorites(&["Rema 1000"]));
        assert_eq!(subscriptions[0].last_push_sent_at, Some(test_now()));
    }

    #[test]
    fn enqueue_store__should_create_open_batch() {
        // Given
        let store = open_store();
        let send_after = test_now() + Duration::minutes(10);

        // When
        let outcome = store
            .enqueue_store("device-1", "Kiwi Majorstuen", test_now(), send_after)
            .expect("enqueue");

        // Then
        assert_eq!(outcome, EnqueueOutcome::Created);
        let batches = store.pending_batches().expect("list batches");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].device_token, "device-1");
        assert_eq!(batches[0].stores, favorites(&["Kiwi Majorstuen"]));
        assert_eq!(batches[0].send_after, send_after);
    }

    #[test]
    fn enqueue_store__should_not_duplicate_store_in_open_batch() {
        // Given
        let store = open_store();
        let send_after = test_now() + Duration::minutes(10);
        store
            .enqueue_store("device-1", "Kiwi", test_now(), send_after)
            .expect("enqueue");

        // When
        let outcome = store
            .enqueue_store("device-1", "Kiwi", test_now() + Duration::minutes(1), send_after)
            .expect("enqueue again");

        // Then
        assert_eq!(outcome, EnqueueOutcome::AlreadyQueued);
        let batches = store.pending_batches().expect("list batches");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].stores, favorites(&["Kiwi"]));
    }

    #[test]
    fn enqueue_store__should_append_without_moving_send_after() {
        // Given
        let store = open_store();
        let send_after = test_now() + Duration::minutes(10);
        store
            .enqueue_store("device-1", "Kiwi", test_now(), send_after)
            .expect("enqueue");

        // When: a later event proposes a later deadline; the open batch keeps
        // its original one.
        let later = test_now() + Duration::minutes(5);
        let outcome = store
            .enqueue_store("device-1", "Meny", later, later + Duration::minutes(10))
            .expect("enqueue second store");

        // Then
        assert_eq!(outcome, EnqueueOutcome::Appended);
        let batches = store.pending_batches().expect("list batches");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].stores, favorites(&["Kiwi", "Meny"]));
        assert_eq!(batches[0].send_after, send_after);
    }

    #[test]
    fn enqueue_store__should_open_new_batch_once_window_passed() {
        // Given
        let store = open_store();
        let send_after = test_now() + Duration::minutes(10);
        store
            .enqueue_store("device-1", "Kiwi", test_now(), send_after)
            .expect("enqueue");

        // When: the first batch is due but not yet flushed.
        let later = test_now() + Duration::minutes(11);
        let outcome = store
            .enqueue_store("device-1", "Kiwi", later, later + Duration::minutes(10))
            .expect("enqueue after window");

        // Then
        assert_eq!(outcome, EnqueueOutcome::Created);
        assert_eq!(store.pending_batches().expect("list batches").len(), 2);
        let due = store.due_batches(later).expect("due batches");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].send_after, send_after);
    }

    #[test]
    fn due_batches__should_include_exact_boundary() {
        // Given
        let store = open_store();
        let send_after = test_now() + Duration::minutes(10);
        store
            .enqueue_store("device-1", "Kiwi", test_now(), send_after)
            .expect("enqueue");

        // Then
        assert!(store.due_batches(test_now()).expect("due").is_empty());
        assert_eq!(store.due_batches(send_after).expect("due").len(), 1);
    }

    #[test]
    fn delete_batch__should_remove_only_that_batch() {
        // Given
        let store = open_store();
        store
            .enqueue_store("device-1", "Kiwi", test_now(), test_now() + Duration::minutes(10))
            .expect("enqueue");
        store
            .enqueue_store("device-2", "Meny", test_now(), test_now() + Duration::minutes(10))
            .expect("enqueue");
        let batches = store.pending_batches().expect("list batches");

        // When
        store.delete_batch(batches[0].id).expect("delete");

        // Then
        let remaining = store.pending_batches().expect("list batches");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].device_token, "device-2");
    }

    #[test]
    fn record_push_sent__should_stamp_subscription() {
        // Given
        let store = open_store();
        store
            .upsert_subscription("device-1", &favorites(&["Kiwi"]))
            .expect("register");

        // When
        store
            .record_push_sent("device-1", test_now())
            .expect("record push");

        // Then
        let subscriptions = store
            .subscriptions_with_favorites()
            .expect("list subscriptions");
        assert_eq!(subscriptions[0].last_push_sent_at, Some(test_now()));
    }

    #[test]
    fn enqueue_store__should_keep_one_open_batch_under_concurrent_writers() {
        // Given
        let store = open_store();
        let now = test_now();
        let send_after = now + Duration::minutes(10);

        // When
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .enqueue_store("device-1", &format!("Store {i}"), now, send_after)
                        .expect("enqueue")
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join thread");
        }

        // Then
        let batches = store.pending_batches().expect("list batches");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].stores.len(), 8);
    }
}
