use async_trait::async_trait;
use model::{Error, ReservationOutcome};
use std::fmt::{Debug, Display, Formatter};

/// Reservation and result cache backing the idempotency wrappers.
///
/// Any backend offering an atomic "insert unless a live entry exists" write
/// with an expiry attribute can implement this. Each implementation owns its
/// TTL; every write sets `expires_at = now + ttl`.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Atomically reserve `key`.
    ///
    /// Returns `Fresh` only if no live record exists; an expired record is
    /// overwritten as if it were absent. A live record yields `Occupied`
    /// without mutating anything. Backend failures are errors and are never
    /// reported as either outcome.
    async fn reserve(&self, key: &str) -> Result<ReservationOutcome, StateError>;

    /// Fetch the stored result for `key`, if one has been recorded.
    async fn fetch(&self, key: &str) -> Result<Option<serde_json::Value>, StateError>;

    /// Store the result for `key`, refreshing its expiry.
    async fn update(&self, key: &str, result: serde_json::Value) -> Result<(), StateError>;
}

/// Errors arising from the idempotency store.
#[derive(Debug)]
pub struct StateError {
    pub state_key: String,

    pub operation: StateOperation,
    pub reason: StateErrorReason,
}

#[derive(Debug)]
pub enum StateErrorReason {
    // The stored entry could not be converted to or from a record
    BadState(String),
    // An error from the underlying state store
    BackendFailure(Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOperation {
    Reserve,
    Fetch,
    Update,
}

impl StateError {
    pub fn new(state_key: String, operation: StateOperation, reason: StateErrorReason) -> Self {
        StateError {
            state_key,
            operation,
            reason,
        }
    }
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            StateErrorReason::BadState(message) => write!(
                f,
                "{:?} failed for key [{}]: bad state: {}",
                self.operation, self.state_key, message
            ),
            StateErrorReason::BackendFailure(err) => write!(
                f,
                "{:?} failed for key [{}]: {}",
                self.operation, self.state_key, err
            ),
        }
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.reason {
            StateErrorReason::BadState(_) => None,
            StateErrorReason::BackendFailure(err) => Some(err.as_ref()),
        }
    }
}
