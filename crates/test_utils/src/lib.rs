use async_trait::async_trait;
use aws_lambda_events::apigw::ApiGatewayProxyRequest;
use aws_lambda_events::sqs::{SqsEvent, SqsMessage};
use aws_sdk_sqs::operation::delete_message::DeleteMessageOutput;
use aws_smithy_mocks::{mock, mock_client, Rule};
use http::{HeaderName, HeaderValue};
use model::clock::Clock;
use model::Error;
use queue::MessageDeleter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Test table and queue values
pub const TEST_TABLE: &str = "idempotency_table";
pub const TEST_QUEUE_URL: &str = "https://sqs.eu-west-1.amazonaws.com/000000000000/input";

/// Fixed epoch seconds used as the starting point for test clocks
pub const TEST_NOW: u64 = 1_700_000_000;

/// A clock which only moves when told to.
#[derive(Debug)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(now: u64) -> Self {
        ManualClock(AtomicU64::new(now))
    }

    pub fn advance(&self, seconds: u64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::new(TEST_NOW)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Create a dummy SQS message with an id, receipt handle and body
pub fn sqs_message(message_id: &str, receipt_handle: &str, body: Option<&str>) -> SqsMessage {
    SqsMessage {
        message_id: Some(message_id.to_string()),
        receipt_handle: Some(receipt_handle.to_string()),
        body: body.map(str::to_string),
        md5_of_body: None,
        md5_of_message_attributes: None,
        attributes: Default::default(),
        message_attributes: Default::default(),
        event_source_arn: None,
        event_source: None,
        aws_region: None,
    }
}

/// Create a batch of messages with ids `msg-N` and receipt handles `handle-N`
pub fn sqs_event(count: usize) -> SqsEvent {
    SqsEvent {
        records: (1..=count)
            .map(|n| sqs_message(&format!("msg-{n}"), &format!("handle-{n}"), None))
            .collect(),
    }
}

/// Wrap a payload the way SNS delivers it to a subscribed SQS queue
pub fn sns_envelope(payload: &serde_json::Value) -> String {
    serde_json::json!({
        "Type": "Notification",
        "MessageId": "522a4e99-206a-5543-882a-190be7f974c5",
        "TopicArn": "arn:aws:sns:eu-west-1:000000000000:events",
        "Message": payload.to_string(),
        "Timestamp": "2020-07-22T23:01:39.707Z",
    })
    .to_string()
}

/// Create an API Gateway proxy request with a request id and headers
pub fn api_gateway_request(
    request_id: Option<&str>,
    headers: &[(&'static str, &'static str)],
) -> ApiGatewayProxyRequest {
    let mut request: ApiGatewayProxyRequest = ApiGatewayProxyRequest::default();
    request.request_context.request_id = request_id.map(str::to_string);

    for &(name, value) in headers {
        request
            .headers
            .insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    request
}

/// Records every receipt handle it is asked to delete.
#[derive(Debug, Default)]
pub struct RecordingDeleter {
    deleted: Mutex<Vec<String>>,
}

impl RecordingDeleter {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageDeleter for RecordingDeleter {
    async fn delete_message(&self, receipt_handle: &str) -> Result<(), Error> {
        self.deleted.lock().unwrap().push(receipt_handle.to_string());

        Ok(())
    }
}

/// A deleter which always fails, standing in for an unreachable queue.
#[derive(Debug, Default)]
pub struct FailingDeleter;

#[async_trait]
impl MessageDeleter for FailingDeleter {
    async fn delete_message(&self, receipt_handle: &str) -> Result<(), Error> {
        Err(format!("Access denied deleting {receipt_handle}").into())
    }
}

/// A rule accepting a single `DeleteMessage` for the receipt handle on the
/// test queue
pub fn delete_message_rule(receipt_handle: &'static str) -> Rule {
    mock!(aws_sdk_sqs::Client::delete_message)
        .match_requests(move |req| {
            req.queue_url() == Some(TEST_QUEUE_URL) && req.receipt_handle() == Some(receipt_handle)
        })
        .then_output(|| DeleteMessageOutput::builder().build())
}
