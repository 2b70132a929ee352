use model::IdempotencyRecord;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Item layout of the idempotency table.
///
/// The table has a single string partition key `messageId` and uses `ttl`
/// as its DynamoDB time to live attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct IdempotencyItem {
    #[serde(rename = "messageId")]
    pub(crate) message_id: String,
    pub(crate) ttl: u64,
    /// A stored `null` comes back as `Some(Value::Null)`, only a missing
    /// attribute is `None`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub(crate) result: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

pub(crate) const MESSAGE_ID: &str = "messageId";
pub(crate) const TTL: &str = "ttl";

/// Insert unless a live item exists for the key.
pub(crate) const RESERVE_CONDITION: &str = "attribute_not_exists(messageId) OR #ttl < :now";

impl From<IdempotencyRecord> for IdempotencyItem {
    fn from(record: IdempotencyRecord) -> Self {
        IdempotencyItem {
            message_id: record.key,
            ttl: record.expires_at,
            result: record.result,
        }
    }
}

impl From<IdempotencyItem> for IdempotencyRecord {
    fn from(item: IdempotencyItem) -> Self {
        IdempotencyRecord {
            key: item.message_id,
            expires_at: item.ttl,
            result: item.result,
        }
    }
}
