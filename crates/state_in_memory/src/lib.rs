use async_trait::async_trait;
use model::clock::{Clock, SystemClock};
use model::{IdempotencyRecord, ReservationOutcome, DEFAULT_TTL_SECONDS};
use state::{IdempotencyStore, StateError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Process local store, for tests and running handlers without AWS.
///
/// The mutex stands in for the backing store's atomic conditional write, so
/// concurrent `reserve` calls for one key resolve to exactly one `Fresh`.
/// Expired records are left in place until overwritten, mirroring a store
/// whose own TTL sweeper runs lazily.
#[derive(Debug, Clone)]
pub struct InMemoryIdempotencyStore {
    records: Arc<Mutex<HashMap<String, IdempotencyRecord>>>,
    clock: Arc<dyn Clock>,
    ttl_seconds: u64,
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        InMemoryIdempotencyStore::new(Arc::new(SystemClock), DEFAULT_TTL_SECONDS)
    }
}

impl InMemoryIdempotencyStore {
    pub fn new(clock: Arc<dyn Clock>, ttl_seconds: u64) -> Self {
        InMemoryIdempotencyStore {
            records: Arc::new(Mutex::new(Default::default())),
            clock,
            ttl_seconds,
        }
    }

    /// Snapshot of the record held for `key`, expired or not.
    pub fn record(&self, key: &str) -> Option<IdempotencyRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn reserve(&self, key: &str) -> Result<ReservationOutcome, StateError> {
        let now: u64 = self.clock.now();
        let mut records = self.records.lock().unwrap();

        if let Some(existing) = records.get(key) {
            if !existing.is_expired(now) {
                return Ok(ReservationOutcome::Occupied);
            }
        }

        records.insert(
            key.to_string(),
            IdempotencyRecord::reserved(key, now, self.ttl_seconds),
        );

        Ok(ReservationOutcome::Fresh)
    }

    async fn fetch(&self, key: &str) -> Result<Option<serde_json::Value>, StateError> {
        let records = self.records.lock().unwrap();

        Ok(records.get(key).and_then(|record| record.result.clone()))
    }

    async fn update(&self, key: &str, result: serde_json::Value) -> Result<(), StateError> {
        let record: IdempotencyRecord =
            IdempotencyRecord::completed(key, self.clock.now(), self.ttl_seconds, result);

        self.records.lock().unwrap().insert(key.to_string(), record);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_utils::{ManualClock, TEST_NOW};

    fn store_with_clock(ttl_seconds: u64) -> (InMemoryIdempotencyStore, Arc<ManualClock>) {
        let clock: Arc<ManualClock> = Arc::new(ManualClock::default());

        (
            InMemoryIdempotencyStore::new(clock.clone(), ttl_seconds),
            clock,
        )
    }

    #[tokio::test]
    async fn first_reservation_is_fresh_and_second_is_occupied() {
        let (store, _clock) = store_with_clock(5);

        assert_eq!(ReservationOutcome::Fresh, store.reserve("k").await.unwrap());
        assert_eq!(ReservationOutcome::Occupied, store.reserve("k").await.unwrap());
        // Other keys are unaffected
        assert_eq!(ReservationOutcome::Fresh, store.reserve("other").await.unwrap());
    }

    #[tokio::test]
    async fn reservation_sets_expiry_from_ttl() {
        let (store, _clock) = store_with_clock(30);

        store.reserve("k").await.unwrap();

        let record: IdempotencyRecord = store.record("k").expect("Record should exist");
        assert_eq!(TEST_NOW + 30, record.expires_at);
        assert_eq!(None, record.result);
    }

    #[tokio::test]
    async fn fetch_is_absent_until_updated() {
        let (store, _clock) = store_with_clock(5);

        assert_eq!(None, store.fetch("k").await.unwrap());

        store.reserve("k").await.unwrap();
        assert_eq!(None, store.fetch("k").await.unwrap());

        store.update("k", json!({"status": "done"})).await.unwrap();
        assert_eq!(
            Some(json!({"status": "done"})),
            store.fetch("k").await.unwrap()
        );
    }

    #[tokio::test]
    async fn expired_reservation_is_revalidated() {
        let (store, clock) = store_with_clock(5);

        assert_eq!(ReservationOutcome::Fresh, store.reserve("k").await.unwrap());

        // One second before expiry the reservation still holds
        clock.advance(4);
        assert_eq!(ReservationOutcome::Occupied, store.reserve("k").await.unwrap());

        // Past the expiry a new reservation proceeds as if the key were new
        clock.advance(2);
        assert_eq!(ReservationOutcome::Fresh, store.reserve("k").await.unwrap());
        assert_eq!(
            TEST_NOW + 6 + 5,
            store.record("k").expect("Record should exist").expires_at
        );
    }

    #[tokio::test]
    async fn revalidation_discards_previous_result() {
        let (store, clock) = store_with_clock(5);

        store.reserve("k").await.unwrap();
        store.update("k", json!("first")).await.unwrap();

        clock.advance(6);
        assert_eq!(ReservationOutcome::Fresh, store.reserve("k").await.unwrap());
        assert_eq!(None, store.fetch("k").await.unwrap());
    }

    #[tokio::test]
    async fn default_ttl_matches_explicit_five_seconds() {
        let clock: Arc<ManualClock> = Arc::new(ManualClock::default());
        let default_store = InMemoryIdempotencyStore {
            clock: clock.clone(),
            ..InMemoryIdempotencyStore::default()
        };
        let explicit_store = InMemoryIdempotencyStore::new(clock.clone(), 5);

        default_store.reserve("k").await.unwrap();
        explicit_store.reserve("k").await.unwrap();

        assert_eq!(default_store.record("k"), explicit_store.record("k"));
    }

    #[tokio::test]
    async fn concurrent_reservations_grant_one_fresh() {
        let (store, _clock) = store_with_clock(5);

        let attempts = (0..16).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.reserve("contended").await.unwrap() })
        });

        let outcomes: Vec<ReservationOutcome> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|outcome| outcome.expect("Task should not panic"))
            .collect();

        let fresh: usize = outcomes
            .iter()
            .filter(|&&outcome| outcome == ReservationOutcome::Fresh)
            .count();
        assert_eq!(1, fresh);
    }
}
