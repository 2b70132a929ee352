use async_trait::async_trait;
use model::Error;

/// Acknowledges a single message so the source queue does not redeliver it.
///
/// Failures are returned to the caller untouched; there is no retry here.
#[async_trait]
pub trait MessageDeleter: Send + Sync {
    async fn delete_message(&self, receipt_handle: &str) -> Result<(), Error>;
}
