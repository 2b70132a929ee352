use aws_lambda_events::sqs::SqsEvent;
use idempotency::{idempotent_sqs_fn, IdempotentSqsHandler};
use lambda_runtime::{service_fn, tracing, LambdaEvent};
use model::config::{ProviderConfig, QueueConfig, SqsIdempotencyConfig, SqsKeyStrategy};
use model::env::{
    IDEMPOTENCY_ENDPOINT, IDEMPOTENCY_QUEUE_URL, IDEMPOTENCY_REGION, IDEMPOTENCY_TABLE_NAME,
    IDEMPOTENCY_TTL_SECONDS,
};
use model::{Error, DEFAULT_TTL_SECONDS};
use serde::Serialize;
use std::env;

#[derive(Debug, Serialize)]
struct BatchSummary {
    processed: usize,
}

/// Only ever sees records which have not been delivered before.
async fn process(event: LambdaEvent<SqsEvent>) -> Result<BatchSummary, Error> {
    for message in event.payload.records.iter() {
        tracing::info!(
            message_id = message.message_id.as_deref().unwrap_or_default(),
            "Processing message"
        );
    }

    Ok(BatchSummary {
        processed: event.payload.records.len(),
    })
}

fn config_from_env() -> Result<SqsIdempotencyConfig, Error> {
    let region: String = env::var(IDEMPOTENCY_REGION)?;

    Ok(SqsIdempotencyConfig {
        ttl_seconds: match env::var(IDEMPOTENCY_TTL_SECONDS) {
            Ok(ttl) => ttl.parse()?,
            Err(_) => DEFAULT_TTL_SECONDS,
        },
        key_strategy: SqsKeyStrategy::MessageId,
        provider: ProviderConfig {
            name: Default::default(),
            endpoint: env::var(IDEMPOTENCY_ENDPOINT).ok(),
            region: region.clone(),
            table_name: env::var(IDEMPOTENCY_TABLE_NAME)?,
        },
        queue: QueueConfig {
            region,
            url: env::var(IDEMPOTENCY_QUEUE_URL)?,
        },
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let guarded = IdempotentSqsHandler::from_config(config_from_env()?, process).await?;

    lambda_runtime::run(service_fn(idempotent_sqs_fn(guarded))).await
}
