use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayV2httpRequest};
use aws_lambda_events::sqs::SqsMessage;
use model::config::{HttpKeyStrategy, SqsKeyStrategy};
use serde::Deserialize;
use serde_json::Value;

/// Identity of a single HTTP style event.
pub trait HttpRequestIdentity {
    /// The request id assigned by the transport.
    fn request_id(&self) -> Option<&str>;
    /// A request header, matched case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;
}

impl HttpRequestIdentity for ApiGatewayProxyRequest {
    fn request_id(&self) -> Option<&str> {
        self.request_context.request_id.as_deref()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

impl HttpRequestIdentity for ApiGatewayV2httpRequest {
    fn request_id(&self) -> Option<&str> {
        self.request_context.request_id.as_deref()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Raw JSON events shaped like an API Gateway proxy request.
impl HttpRequestIdentity for Value {
    fn request_id(&self) -> Option<&str> {
        self.pointer("/requestContext/requestId")
            .and_then(Value::as_str)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.get("headers")
            .and_then(Value::as_object)?
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_str())
    }
}

/// Resolve the idempotency key of a single event.
///
/// `None` means idempotency does not apply and the handler should run
/// unconditionally.
pub fn resolve_http_key<Event: HttpRequestIdentity>(
    event: &Event,
    strategy: &HttpKeyStrategy,
) -> Option<String> {
    let request_id = || non_empty(event.request_id());

    match strategy {
        HttpKeyStrategy::RequestId => request_id(),
        HttpKeyStrategy::Header { name, fallback } => non_empty(event.header(name))
            .or_else(|| if *fallback { request_id() } else { None }),
    }
}

/// Resolve the idempotency key of one queue record.
///
/// Path sets fall back to the message id when nothing could be extracted.
pub fn resolve_sqs_key(message: &SqsMessage, strategy: &SqsKeyStrategy) -> Option<String> {
    let message_id = || non_empty(message.message_id.as_deref());

    match strategy {
        SqsKeyStrategy::MessageId => message_id(),
        SqsKeyStrategy::PathSet { paths } => {
            let key: String = message
                .body
                .as_deref()
                .and_then(envelope_payload)
                .map(|payload| {
                    paths
                        .iter()
                        .filter_map(|path| first_scalar(&payload, path))
                        .collect()
                })
                .unwrap_or_default();

            non_empty(Some(&key)).or_else(message_id)
        }
    }
}

/// The subset of an SNS notification we care about.
#[derive(Deserialize)]
struct SnsEnvelope {
    #[serde(rename = "Message")]
    message: String,
}

fn envelope_payload(body: &str) -> Option<Value> {
    let envelope: SnsEnvelope = serde_json::from_str(body).ok()?;

    serde_json::from_str(&envelope.message).ok()
}

/// Walk a dotted path, stopping at the first scalar on the way.
fn first_scalar(payload: &Value, path: &str) -> Option<String> {
    let mut current: &Value = payload;

    for field in path.split('.') {
        current = current.get(field)?;

        if let Some(text) = scalar_text(current) {
            return Some(text);
        }
    }

    None
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_utils::{api_gateway_request, sns_envelope, sqs_message};

    fn header(name: &str, fallback: bool) -> HttpKeyStrategy {
        HttpKeyStrategy::Header {
            name: name.to_string(),
            fallback,
        }
    }

    fn paths(paths: &[&str]) -> SqsKeyStrategy {
        SqsKeyStrategy::PathSet {
            paths: paths.iter().map(|path| path.to_string()).collect(),
        }
    }

    fn boleto_payload() -> Value {
        json!({
            "event": { "commitTimestamp": 1593016163521u64, "eventType": "ISSUED_BOLETO" },
            "stream": { "aggregation": "BOLETO", "id": "1474245c-414e-43b5-bb6a-c9690c5579a0" },
        })
    }

    #[test]
    fn request_id_strategy_uses_request_context() {
        let request = api_gateway_request(Some("req-1"), &[("x-idempotency-key", "abc")]);

        assert_eq!(
            Some("req-1".to_string()),
            resolve_http_key(&request, &HttpKeyStrategy::RequestId)
        );
    }

    #[test]
    fn header_strategy_reads_header() {
        let request = api_gateway_request(Some("req-1"), &[("x-idempotency-key", "abc")]);

        assert_eq!(
            Some("abc".to_string()),
            resolve_http_key(&request, &header("X-Idempotency-Key", false))
        );
    }

    #[test]
    fn header_strategy_falls_back_to_request_id() {
        let request = api_gateway_request(Some("req-1"), &[]);

        assert_eq!(
            Some("req-1".to_string()),
            resolve_http_key(&request, &header("x-idempotency-key", true))
        );
    }

    #[test]
    fn empty_header_without_fallback_skips_idempotency() {
        let missing = api_gateway_request(Some("req-1"), &[]);
        let empty = api_gateway_request(Some("req-1"), &[("x-idempotency-key", "")]);

        assert_eq!(None, resolve_http_key(&missing, &header("x-idempotency-key", false)));
        assert_eq!(None, resolve_http_key(&empty, &header("x-idempotency-key", false)));
    }

    #[test]
    fn json_events_resolve_like_proxy_requests() {
        let event: Value = json!({
            "headers": { "X-Idempotency-Key": "abc" },
            "requestContext": { "requestId": "req-1" },
        });

        assert_eq!(
            Some("abc".to_string()),
            resolve_http_key(&event, &header("x-idempotency-key", false))
        );
        assert_eq!(
            Some("req-1".to_string()),
            resolve_http_key(&event, &HttpKeyStrategy::RequestId)
        );
        assert_eq!(
            None,
            resolve_http_key(&json!({ "headers": {} }), &HttpKeyStrategy::RequestId)
        );
    }

    #[test]
    fn message_id_strategy_uses_message_id() {
        let message = sqs_message("msg-1", "handle-1", None);

        assert_eq!(
            Some("msg-1".to_string()),
            resolve_sqs_key(&message, &SqsKeyStrategy::MessageId)
        );
    }

    #[test]
    fn path_set_concatenates_scalars_in_order() {
        let body: String = sns_envelope(&boleto_payload());
        let message = sqs_message("msg-1", "handle-1", Some(&body));

        assert_eq!(
            Some("1474245c-414e-43b5-bb6a-c9690c5579a0ISSUED_BOLETO".to_string()),
            resolve_sqs_key(&message, &paths(&["stream.id", "event.eventType"]))
        );
        assert_eq!(
            Some("15930161635211474245c-414e-43b5-bb6a-c9690c5579a0".to_string()),
            resolve_sqs_key(&message, &paths(&["event.commitTimestamp", "stream.id"]))
        );
    }

    #[test]
    fn path_set_stops_at_first_scalar() {
        let body: String = sns_envelope(&json!({ "stream": "flat", "active": true }));
        let message = sqs_message("msg-1", "handle-1", Some(&body));

        assert_eq!(
            Some("flattrue".to_string()),
            resolve_sqs_key(&message, &paths(&["stream.id.deeper", "active"]))
        );
    }

    #[test]
    fn path_set_skips_missing_paths() {
        let body: String = sns_envelope(&boleto_payload());
        let message = sqs_message("msg-1", "handle-1", Some(&body));

        assert_eq!(
            Some("BOLETO".to_string()),
            resolve_sqs_key(&message, &paths(&["missing.field", "stream.aggregation"]))
        );
    }

    #[test]
    fn path_set_falls_back_to_message_id() {
        let body: String = sns_envelope(&boleto_payload());
        let with_envelope = sqs_message("msg-1", "handle-1", Some(&body));
        let not_json = sqs_message("msg-2", "handle-2", Some("plain text"));
        let no_body = sqs_message("msg-3", "handle-3", None);
        let strategy: SqsKeyStrategy = paths(&["nothing.here"]);

        assert_eq!(Some("msg-1".to_string()), resolve_sqs_key(&with_envelope, &strategy));
        assert_eq!(Some("msg-2".to_string()), resolve_sqs_key(&not_json, &strategy));
        assert_eq!(Some("msg-3".to_string()), resolve_sqs_key(&no_body, &strategy));
    }
}
