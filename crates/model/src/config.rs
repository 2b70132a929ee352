use crate::{DEFAULT_TTL_SECONDS, MAX_TTL_SECONDS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a wrapper configuration is rejected at wrap time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ttl_seconds must be greater than zero")]
    ZeroTtl,
    #[error("ttl_seconds must not exceed {max}, got {ttl_seconds}")]
    TtlTooLarge { ttl_seconds: u64, max: u64 },
    #[error("header key strategy requires a header name")]
    EmptyHeaderName,
    #[error("event key strategy requires at least one path")]
    EmptyPathSet,
    #[error("event key strategy contains an empty path at position {0}")]
    EmptyPath(usize),
    #[error("provider is missing a {0}")]
    MissingProviderField(&'static str),
    #[error("queue is missing a {0}")]
    MissingQueueField(&'static str),
}

fn default_ttl_seconds() -> u64 {
    DEFAULT_TTL_SECONDS
}

/// How the key is derived from a single HTTP style event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "camelCase", deny_unknown_fields)]
pub enum HttpKeyStrategy {
    /// Use the request id assigned by API Gateway.
    RequestId,
    /// Use the value of a header, optionally falling back to the request id.
    Header {
        name: String,
        #[serde(default)]
        fallback: bool,
    },
}

impl HttpKeyStrategy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            HttpKeyStrategy::RequestId => Ok(()),
            HttpKeyStrategy::Header { name, .. } if name.trim().is_empty() => {
                Err(ConfigError::EmptyHeaderName)
            }
            HttpKeyStrategy::Header { .. } => Ok(()),
        }
    }
}

/// How the key is derived from each record of a queue batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "camelCase", deny_unknown_fields)]
pub enum SqsKeyStrategy {
    /// Use the message id assigned by SQS.
    #[default]
    MessageId,
    /// Concatenate the scalars found at dotted paths inside the payload
    /// carried by an SNS notification envelope.
    #[serde(rename = "event")]
    PathSet {
        #[serde(alias = "name")]
        paths: Vec<String>,
    },
}

impl SqsKeyStrategy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            SqsKeyStrategy::MessageId => Ok(()),
            SqsKeyStrategy::PathSet { paths } if paths.is_empty() => Err(ConfigError::EmptyPathSet),
            SqsKeyStrategy::PathSet { paths } => match paths
                .iter()
                .position(|path| path.trim().is_empty())
            {
                Some(position) => Err(ConfigError::EmptyPath(position)),
                None => Ok(()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    DynamoDb,
}

/// Where reservations are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default)]
    pub name: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub region: String,
    pub table_name: String,
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::MissingProviderField("region"));
        }
        if self.table_name.trim().is_empty() {
            return Err(ConfigError::MissingProviderField("table name"));
        }

        Ok(())
    }
}

/// The queue a batch is received from, used to delete duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueueConfig {
    pub region: String,
    pub url: String,
}

impl QueueConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::MissingQueueField("region"));
        }
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingQueueField("url"));
        }

        Ok(())
    }
}

/// Options for wrapping a single event (API Gateway) handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HttpIdempotencyConfig {
    #[serde(default = "default_ttl_seconds", alias = "ttl")]
    pub ttl_seconds: u64,
    #[serde(alias = "id")]
    pub key_strategy: HttpKeyStrategy,
    pub provider: ProviderConfig,
}

impl HttpIdempotencyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ttl(self.ttl_seconds)?;
        self.key_strategy.validate()?;
        self.provider.validate()
    }
}

/// Options for wrapping a batch (SQS) handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SqsIdempotencyConfig {
    #[serde(default = "default_ttl_seconds", alias = "ttl")]
    pub ttl_seconds: u64,
    #[serde(default, alias = "id")]
    pub key_strategy: SqsKeyStrategy,
    pub provider: ProviderConfig,
    pub queue: QueueConfig,
}

impl SqsIdempotencyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ttl(self.ttl_seconds)?;
        self.key_strategy.validate()?;
        self.provider.validate()?;
        self.queue.validate()
    }
}

pub fn validate_ttl(ttl_seconds: u64) -> Result<(), ConfigError> {
    if ttl_seconds == 0 {
        return Err(ConfigError::ZeroTtl);
    }
    if ttl_seconds > MAX_TTL_SECONDS {
        return Err(ConfigError::TtlTooLarge {
            ttl_seconds,
            max: MAX_TTL_SECONDS,
        });
    }

    Ok(())
}
