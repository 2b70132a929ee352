use crate::aws::{self, AwsBatchHandles};
use crate::error::IdempotencyError;
use crate::key::resolve_sqs_key;
use aws_lambda_events::sqs::{SqsEvent, SqsMessage};
use lambda_runtime::tracing::{Instrument, Span};
use lambda_runtime::{tracing, LambdaEvent};
use model::config::{SqsIdempotencyConfig, SqsKeyStrategy};
use model::{Error, ReservationOutcome};
use queue::MessageDeleter;
use state::IdempotencyStore;
use std::future::Future;
use std::sync::Arc;

/// Store and queue handles used while filtering one batch.
#[derive(Clone)]
pub struct BatchResources {
    pub store: Arc<dyn IdempotencyStore>,
    pub deleter: Arc<dyn MessageDeleter>,
}

/// Hands out fresh resources for every batch, so no state is shared
/// between invocations.
pub trait BatchHandles: Send + Sync {
    fn acquire(&self) -> BatchResources;
}

impl<F> BatchHandles for F
where
    F: Fn() -> BatchResources + Send + Sync,
{
    fn acquire(&self) -> BatchResources {
        self()
    }
}

/// An SQS batch handler which only sees records it has not seen before.
pub struct IdempotentSqsHandler<Handler, Handles = AwsBatchHandles> {
    key_strategy: SqsKeyStrategy,
    handles: Handles,
    handler: Handler,
}

impl<Handler, Handles: BatchHandles> IdempotentSqsHandler<Handler, Handles> {
    pub fn new(
        key_strategy: SqsKeyStrategy,
        handles: Handles,
        handler: Handler,
    ) -> Result<Self, IdempotencyError> {
        key_strategy.validate()?;

        Ok(IdempotentSqsHandler {
            key_strategy,
            handles,
            handler,
        })
    }

    /// Filter the batch down to unseen records and invoke the handler once
    /// with whatever is left, which may be nothing.
    ///
    /// Duplicates are deleted from the queue. Results are not cached for
    /// batches; the reservation alone fences off reprocessing.
    pub async fn call<Response, Fut>(
        &self,
        mut event: LambdaEvent<SqsEvent>,
    ) -> Result<Response, Error>
    where
        Handler: Fn(LambdaEvent<SqsEvent>) -> Fut,
        Fut: Future<Output = Result<Response, Error>>,
    {
        let resources: BatchResources = self.handles.acquire();
        let records: Vec<SqsMessage> = std::mem::take(&mut event.payload.records);
        let received: usize = records.len();

        tracing::info!("Filtering batch of [{}] from SQS", received);

        let mut unseen: Vec<SqsMessage> = Vec::with_capacity(received);

        // Sequential so deletions follow arrival order
        for message in records {
            let message_id: String = message.message_id.clone().unwrap_or_default();
            let message_span: Span =
                tracing::span!(tracing::Level::INFO, "Idempotency filter", message_id);

            if self
                .is_unseen(&message, &resources)
                .instrument(message_span)
                .await?
            {
                unseen.push(message);
            }
        }

        tracing::info!(
            "Forwarding [{}] of [{}] records to handler",
            unseen.len(),
            received
        );

        event.payload.records = unseen;

        (self.handler)(event).await
    }

    async fn is_unseen(
        &self,
        message: &SqsMessage,
        resources: &BatchResources,
    ) -> Result<bool, Error> {
        let Some(key) = resolve_sqs_key(message, &self.key_strategy) else {
            tracing::debug!("No idempotency key, forwarding record");

            return Ok(true);
        };

        match resources.store.reserve(&key).await? {
            ReservationOutcome::Fresh => Ok(true),
            ReservationOutcome::Occupied => {
                let receipt_handle: &str = message.receipt_handle.as_deref().ok_or_else(|| {
                    IdempotencyError::MissingReceiptHandle {
                        message_id: message.message_id.clone().unwrap_or_default(),
                    }
                })?;

                tracing::info!(key = %key, "Deleting duplicate message");
                resources.deleter.delete_message(receipt_handle).await?;

                Ok(false)
            }
        }
    }
}

impl<Handler> IdempotentSqsHandler<Handler, AwsBatchHandles> {
    /// Validate the configuration and back the wrapper with DynamoDB and SQS.
    pub async fn from_config(
        config: SqsIdempotencyConfig,
        handler: Handler,
    ) -> Result<Self, IdempotencyError> {
        config.validate()?;

        let handles: AwsBatchHandles = aws::batch_handles(&config).await;

        Self::new(config.key_strategy, handles, handler)
    }
}
