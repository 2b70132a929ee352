use crate::batch_handler::{BatchHandles, BatchResources};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use model::config::{ProviderConfig, QueueConfig, SqsIdempotencyConfig};
use queue_sqs::SqsMessageDeleter;
use state_dynamodb::DynamoDbIdempotencyStore;
use std::sync::Arc;

/// Load the shared SDK configuration, pinned to a region and optionally to
/// a custom endpoint such as DynamoDB local or LocalStack.
pub async fn sdk_config(region: &str, endpoint: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()));

    if let Some(endpoint) = endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    loader.load().await
}

pub async fn dynamodb_client(provider: &ProviderConfig) -> aws_sdk_dynamodb::Client {
    let config: SdkConfig = sdk_config(&provider.region, provider.endpoint.as_deref()).await;

    aws_sdk_dynamodb::Client::new(&config)
}

pub async fn sqs_client(queue: &QueueConfig) -> aws_sdk_sqs::Client {
    let config: SdkConfig = sdk_config(&queue.region, None).await;

    aws_sdk_sqs::Client::new(&config)
}

pub async fn dynamodb_store(provider: &ProviderConfig, ttl_seconds: u64) -> DynamoDbIdempotencyStore {
    DynamoDbIdempotencyStore::new(
        dynamodb_client(provider).await,
        provider.table_name.clone(),
        ttl_seconds,
    )
}

/// Clients are built once per wrapper; each batch wraps them in a new store
/// and deleter.
#[derive(Debug, Clone)]
pub struct AwsBatchHandles {
    dynamodb: aws_sdk_dynamodb::Client,
    sqs: aws_sdk_sqs::Client,
    table_name: String,
    queue_url: String,
    ttl_seconds: u64,
}

impl AwsBatchHandles {
    pub fn new(
        dynamodb: aws_sdk_dynamodb::Client,
        sqs: aws_sdk_sqs::Client,
        table_name: impl Into<String>,
        queue_url: impl Into<String>,
        ttl_seconds: u64,
    ) -> Self {
        AwsBatchHandles {
            dynamodb,
            sqs,
            table_name: table_name.into(),
            queue_url: queue_url.into(),
            ttl_seconds,
        }
    }
}

impl BatchHandles for AwsBatchHandles {
    fn acquire(&self) -> BatchResources {
        BatchResources {
            store: Arc::new(DynamoDbIdempotencyStore::new(
                self.dynamodb.clone(),
                self.table_name.clone(),
                self.ttl_seconds,
            )),
            deleter: Arc::new(SqsMessageDeleter::new(
                self.sqs.clone(),
                self.queue_url.clone(),
            )),
        }
    }
}

pub async fn batch_handles(config: &SqsIdempotencyConfig) -> AwsBatchHandles {
    AwsBatchHandles::new(
        dynamodb_client(&config.provider).await,
        sqs_client(&config.queue).await,
        config.provider.table_name.clone(),
        config.queue.url.clone(),
        config.ttl_seconds,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdempotentSqsHandler;
    use aws_lambda_events::sqs::SqsEvent;
    use aws_sdk_dynamodb::operation::put_item::{PutItemError, PutItemOutput};
    use aws_sdk_dynamodb::types::error::ConditionalCheckFailedException;
    use aws_smithy_mocks::{mock, mock_client, Rule, RuleMode};
    use lambda_runtime::{Context, LambdaEvent};
    use model::config::SqsKeyStrategy;
    use model::Error;
    use test_utils::{delete_message_rule, sqs_event, TEST_QUEUE_URL, TEST_TABLE};

    #[tokio::test]
    async fn duplicate_is_deleted_through_sqs() {
        let fresh_rule: Rule = mock!(aws_sdk_dynamodb::Client::put_item)
            .match_requests(|req| {
                req.item().and_then(|item| item.get("messageId"))
                    == Some(&aws_sdk_dynamodb::types::AttributeValue::S("msg-1".to_string()))
            })
            .then_output(|| PutItemOutput::builder().build());
        let occupied_rule: Rule = mock!(aws_sdk_dynamodb::Client::put_item)
            .match_requests(|req| {
                req.item().and_then(|item| item.get("messageId"))
                    == Some(&aws_sdk_dynamodb::types::AttributeValue::S("msg-2".to_string()))
            })
            .then_error(|| {
                PutItemError::ConditionalCheckFailedException(
                    ConditionalCheckFailedException::builder().build(),
                )
            });
        let dynamodb: aws_sdk_dynamodb::Client = mock_client!(
            aws_sdk_dynamodb,
            RuleMode::MatchAny,
            [&fresh_rule, &occupied_rule]
        );
        let delete_rule: Rule = delete_message_rule("handle-2");
        let sqs: aws_sdk_sqs::Client = mock_client!(aws_sdk_sqs, [&delete_rule]);
        let handles = AwsBatchHandles::new(
            dynamodb,
            sqs,
            TEST_TABLE,
            TEST_QUEUE_URL,
            5,
        );
        let wrapped = IdempotentSqsHandler::new(
            SqsKeyStrategy::MessageId,
            handles,
            |event: LambdaEvent<SqsEvent>| async move { Ok::<usize, Error>(event.payload.records.len()) },
        )
        .expect("Strategy should be valid");

        let forwarded: usize = wrapped
            .call(LambdaEvent::new(sqs_event(2), Context::default()))
            .await
            .expect("Batch should succeed");

        assert_eq!(1, forwarded);
        assert_eq!(1, fresh_rule.num_calls());
        assert_eq!(1, occupied_rule.num_calls());
        assert_eq!(1, delete_rule.num_calls());
    }
}
