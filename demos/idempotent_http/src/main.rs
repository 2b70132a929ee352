use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use aws_lambda_events::encodings::Body;
use idempotency::{idempotent_http_fn, IdempotentHttpHandler};
use lambda_runtime::{service_fn, tracing, LambdaEvent};
use model::config::{HttpIdempotencyConfig, HttpKeyStrategy, ProviderConfig};
use model::env::{
    IDEMPOTENCY_ENDPOINT, IDEMPOTENCY_HEADER, IDEMPOTENCY_REGION, IDEMPOTENCY_TABLE_NAME,
    IDEMPOTENCY_TTL_SECONDS,
};
use model::{Error, DEFAULT_TTL_SECONDS};
use std::env;

/// Replies once per idempotency key; duplicates receive the same body.
async fn greet(
    event: LambdaEvent<ApiGatewayProxyRequest>,
) -> Result<ApiGatewayProxyResponse, Error> {
    tracing::info!(request_id = %event.context.request_id, "Processing request");

    let name: &str = event
        .payload
        .query_string_parameters
        .first("name")
        .unwrap_or("world");

    Ok(ApiGatewayProxyResponse {
        status_code: 200,
        body: Some(Body::Text(format!("Hello {name}!"))),
        ..Default::default()
    })
}

/// Keys on the configured header when present, falling back to the API
/// Gateway request id.
fn config_from_env() -> Result<HttpIdempotencyConfig, Error> {
    let key_strategy: HttpKeyStrategy = match env::var(IDEMPOTENCY_HEADER) {
        Ok(name) => HttpKeyStrategy::Header {
            name,
            fallback: true,
        },
        Err(_) => HttpKeyStrategy::RequestId,
    };

    Ok(HttpIdempotencyConfig {
        ttl_seconds: match env::var(IDEMPOTENCY_TTL_SECONDS) {
            Ok(ttl) => ttl.parse()?,
            Err(_) => DEFAULT_TTL_SECONDS,
        },
        key_strategy,
        provider: ProviderConfig {
            name: Default::default(),
            endpoint: env::var(IDEMPOTENCY_ENDPOINT).ok(),
            region: env::var(IDEMPOTENCY_REGION)?,
            table_name: env::var(IDEMPOTENCY_TABLE_NAME)?,
        },
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let guarded = IdempotentHttpHandler::from_config(config_from_env()?, greet).await?;

    lambda_runtime::run(service_fn(idempotent_http_fn(guarded))).await
}
