use crate::aws;
use crate::error::IdempotencyError;
use crate::key::{resolve_http_key, HttpRequestIdentity};
use lambda_runtime::tracing::{Instrument, Span};
use lambda_runtime::{tracing, LambdaEvent};
use model::config::{HttpIdempotencyConfig, HttpKeyStrategy};
use model::{Error, ReservationOutcome};
use serde::de::DeserializeOwned;
use serde::Serialize;
use state::IdempotencyStore;
use std::future::Future;
use std::sync::Arc;

/// A single event handler guarded by an idempotency key.
///
/// The store is created once and shared by every invocation of the wrapper.
pub struct IdempotentHttpHandler<Handler> {
    key_strategy: HttpKeyStrategy,
    store: Arc<dyn IdempotencyStore>,
    handler: Handler,
}

impl<Handler> IdempotentHttpHandler<Handler> {
    pub fn new(
        key_strategy: HttpKeyStrategy,
        store: Arc<dyn IdempotencyStore>,
        handler: Handler,
    ) -> Result<Self, IdempotencyError> {
        key_strategy.validate()?;

        Ok(IdempotentHttpHandler {
            key_strategy,
            store,
            handler,
        })
    }

    /// Validate the configuration and back the wrapper with DynamoDB.
    pub async fn from_config(
        config: HttpIdempotencyConfig,
        handler: Handler,
    ) -> Result<Self, IdempotencyError> {
        config.validate()?;

        let store = aws::dynamodb_store(&config.provider, config.ttl_seconds).await;

        Self::new(config.key_strategy, Arc::new(store), handler)
    }

    /// Run the wrapped handler at most once per key and TTL window.
    ///
    /// Duplicates get the stored result back. A duplicate arriving before the
    /// first invocation stored its result fails with
    /// [`IdempotencyError::InProgress`].
    pub async fn call<Event, Response, Fut>(
        &self,
        event: LambdaEvent<Event>,
    ) -> Result<Response, Error>
    where
        Handler: Fn(LambdaEvent<Event>) -> Fut,
        Fut: Future<Output = Result<Response, Error>>,
        Event: HttpRequestIdentity,
        Response: Serialize + DeserializeOwned,
    {
        let Some(key) = resolve_http_key(&event.payload, &self.key_strategy) else {
            tracing::debug!("No idempotency key, invoking handler directly");

            return (self.handler)(event).await;
        };

        match self.store.reserve(&key).await? {
            ReservationOutcome::Fresh => {
                let handler_span: Span =
                    tracing::span!(tracing::Level::INFO, "Idempotent handler", key = %key);
                let response: Response = (self.handler)(event).instrument(handler_span).await?;

                self.store
                    .update(&key, serde_json::to_value(&response)?)
                    .await?;

                Ok(response)
            }
            ReservationOutcome::Occupied => {
                tracing::info!(key = %key, "Duplicate request, returning stored result");

                match self.store.fetch(&key).await? {
                    Some(result) => Ok(serde_json::from_value(result)?),
                    None => Err(IdempotencyError::InProgress { key }.into()),
                }
            }
        }
    }
}
