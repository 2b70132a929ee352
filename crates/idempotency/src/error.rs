use model::config::ConfigError;
use thiserror::Error;

/// Failures raised by the wrappers themselves, as opposed to the store,
/// the queue or the wrapped handler.
#[derive(Debug, Error)]
pub enum IdempotencyError {
    /// A live reservation exists but its owner has not stored a result yet.
    #[error("request with idempotency key [{key}] is still being processed")]
    InProgress { key: String },
    /// A duplicate message cannot be deleted without its receipt handle.
    #[error("duplicate message [{message_id}] has no receipt handle")]
    MissingReceiptHandle { message_id: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
