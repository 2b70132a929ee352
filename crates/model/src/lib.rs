use serde::{Deserialize, Serialize};

pub mod clock;
pub mod config;
pub mod env;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Default number of seconds a reservation stays live.
pub const DEFAULT_TTL_SECONDS: u64 = 5;

/// Longest accepted reservation window, one year.
pub const MAX_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Result of attempting to reserve an idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// This invocation holds the key and must run the handler.
    Fresh,
    /// A live reservation already exists for the key.
    Occupied,
}

/// A stored reservation, optionally carrying the handler's result.
///
/// A record is stale once `now > expires_at`. Stale records are treated by
/// `reserve` exactly as if they did not exist, even while the backing store
/// has not yet garbage collected them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub expires_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl IdempotencyRecord {
    /// A record without a result, created by the reservation winner.
    pub fn reserved(key: impl Into<String>, now: u64, ttl_seconds: u64) -> Self {
        IdempotencyRecord {
            key: key.into(),
            expires_at: now.saturating_add(ttl_seconds),
            result: None,
        }
    }

    /// A record carrying the handler result with a refreshed expiry.
    pub fn completed(
        key: impl Into<String>,
        now: u64,
        ttl_seconds: u64,
        result: serde_json::Value,
    ) -> Self {
        IdempotencyRecord {
            key: key.into(),
            expires_at: now.saturating_add(ttl_seconds),
            result: Some(result),
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_expires_after_ttl_elapses() {
        let record = IdempotencyRecord::reserved("key", 100, 5);

        assert_eq!(105, record.expires_at);
        assert!(!record.is_expired(104));
        // Still live on the expiry second itself
        assert!(!record.is_expired(105));
        assert!(record.is_expired(106));
    }

    #[test]
    fn completed_record_refreshes_expiry() {
        let record = IdempotencyRecord::completed("key", 200, 5, json!({"ok": true}));

        assert_eq!(205, record.expires_at);
        assert_eq!(Some(json!({"ok": true})), record.result);
    }

    #[test]
    fn expiry_saturates_instead_of_wrapping() {
        let record = IdempotencyRecord::reserved("key", 1_700_000_000, u64::MAX);

        assert_eq!(u64::MAX, record.expires_at);
        assert!(!record.is_expired(1_700_000_000));
    }
}
