use crate::idempotency_record::{IdempotencyItem, MESSAGE_ID, RESERVE_CONDITION, TTL};
use async_trait::async_trait;
use aws_sdk_dynamodb::config::http::HttpResponse;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::get_item::{GetItemError, GetItemOutput};
use aws_sdk_dynamodb::operation::put_item::{PutItemError, PutItemOutput};
use aws_sdk_dynamodb::types::AttributeValue;
use model::clock::{Clock, SystemClock};
use model::{IdempotencyRecord, ReservationOutcome};
use state::StateErrorReason::{BackendFailure, BadState};
use state::StateOperation::{Fetch, Reserve, Update};
use state::{IdempotencyStore, StateError};
use std::collections::HashMap;
use std::sync::Arc;

mod idempotency_record;

/// Idempotency store backed by a DynamoDB table with native TTL enabled.
///
/// Reservations are a single conditional `PutItem`, which makes DynamoDB the
/// only arbiter between concurrent invocations of the same key.
#[derive(Debug, Clone)]
pub struct DynamoDbIdempotencyStore {
    table_name: String,
    dynamodb_client: aws_sdk_dynamodb::Client,
    ttl_seconds: u64,
    clock: Arc<dyn Clock>,
}

impl DynamoDbIdempotencyStore {
    pub fn new(
        dynamodb_client: aws_sdk_dynamodb::Client,
        table_name: impl Into<String>,
        ttl_seconds: u64,
    ) -> Self {
        DynamoDbIdempotencyStore {
            table_name: table_name.into(),
            dynamodb_client,
            ttl_seconds,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn to_item(
        &self,
        record: IdempotencyRecord,
        operation: state::StateOperation,
    ) -> Result<HashMap<String, AttributeValue>, StateError> {
        let key: String = record.key.clone();

        serde_dynamo::to_item(IdempotencyItem::from(record))
            .map_err(|err| StateError::new(key, operation, BadState(err.to_string())))
    }
}

#[async_trait]
impl IdempotencyStore for DynamoDbIdempotencyStore {
    async fn reserve(&self, key: &str) -> Result<ReservationOutcome, StateError> {
        let now: u64 = self.clock.now();
        let item: HashMap<String, AttributeValue> = self.to_item(
            IdempotencyRecord::reserved(key, now, self.ttl_seconds),
            Reserve,
        )?;

        let result = self
            .dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression(RESERVE_CONDITION)
            .expression_attribute_names("#ttl", TTL)
            .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(ReservationOutcome::Fresh),
            Err(err) if is_conditional_check_failure(&err) => {
                tracing::debug!(key, "Reservation already held");

                Ok(ReservationOutcome::Occupied)
            }
            Err(err) => Err(StateError::new(
                key.to_string(),
                Reserve,
                BackendFailure(err.into()),
            )),
        }
    }

    async fn fetch(&self, key: &str) -> Result<Option<serde_json::Value>, StateError> {
        let output: GetItemOutput = self.get_item(key).await.map_err(|err| {
            StateError::new(key.to_string(), Fetch, BackendFailure(err.into()))
        })?;

        let Some(item) = output.item else {
            return Ok(None);
        };

        let item: IdempotencyItem = serde_dynamo::from_item(item)
            .map_err(|err| StateError::new(key.to_string(), Fetch, BadState(err.to_string())))?;

        Ok(IdempotencyRecord::from(item).result)
    }

    async fn update(&self, key: &str, result: serde_json::Value) -> Result<(), StateError> {
        let item: HashMap<String, AttributeValue> = self.to_item(
            IdempotencyRecord::completed(key, self.clock.now(), self.ttl_seconds, result),
            Update,
        )?;

        self.put_item(item).await.map_err(|err| {
            StateError::new(key.to_string(), Update, BackendFailure(err.into()))
        })?;

        Ok(())
    }
}

impl DynamoDbIdempotencyStore {
    async fn get_item(
        &self,
        key: &str,
    ) -> Result<GetItemOutput, SdkError<GetItemError, HttpResponse>> {
        self.dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .consistent_read(true)
            .key(MESSAGE_ID, AttributeValue::S(key.to_string()))
            .send()
            .await
    }

    async fn put_item(
        &self,
        item: HashMap<String, AttributeValue>,
    ) -> Result<PutItemOutput, SdkError<PutItemError, HttpResponse>> {
        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
    }
}

fn is_conditional_check_failure(err: &SdkError<PutItemError, HttpResponse>) -> bool {
    err.as_service_error()
        .is_some_and(PutItemError::is_conditional_check_failed_exception)
}
