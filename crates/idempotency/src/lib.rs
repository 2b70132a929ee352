use aws_lambda_events::sqs::SqsEvent;
use lambda_runtime::LambdaEvent;
use model::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub mod aws;
mod batch_handler;
mod error;
mod http_handler;
pub mod key;

pub use batch_handler::{BatchHandles, BatchResources, IdempotentSqsHandler};
pub use error::IdempotencyError;
pub use http_handler::IdempotentHttpHandler;
pub use key::HttpRequestIdentity;

pub type HandlerFuture<Response> = Pin<Box<dyn Future<Output = Result<Response, Error>> + Send>>;

/// Turns a guarded single event handler back into a plain handler function
/// for use with `lambda_runtime::run()`.
///
/// ```ignore
/// use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
/// use idempotency::{idempotent_http_fn, IdempotentHttpHandler};
/// use lambda_runtime::{service_fn, LambdaEvent};
/// use model::config::HttpIdempotencyConfig;
/// use model::Error;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Error> {
///     let config: HttpIdempotencyConfig = load_config()?;
///     let guarded = IdempotentHttpHandler::from_config(config, create_order).await?;
///
///     lambda_runtime::run(service_fn(idempotent_http_fn(guarded))).await
/// }
///
/// async fn create_order(
///     event: LambdaEvent<ApiGatewayProxyRequest>,
/// ) -> Result<ApiGatewayProxyResponse, Error> {
///     Ok(ApiGatewayProxyResponse::default())
/// }
/// ```
pub fn idempotent_http_fn<Event, Response, Handler, Fut>(
    guarded: IdempotentHttpHandler<Handler>,
) -> impl Fn(LambdaEvent<Event>) -> HandlerFuture<Response>
where
    Handler: Fn(LambdaEvent<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
    Event: HttpRequestIdentity + Send + 'static,
    Response: Serialize + DeserializeOwned + Send + 'static,
{
    let guarded: Arc<IdempotentHttpHandler<Handler>> = Arc::new(guarded);

    move |event: LambdaEvent<Event>| {
        let guarded: Arc<IdempotentHttpHandler<Handler>> = guarded.clone();

        Box::pin(async move { guarded.call(event).await })
    }
}

/// Turns a guarded SQS batch handler back into a plain handler function for
/// use with `lambda_runtime::run()`.
pub fn idempotent_sqs_fn<Response, Handler, Handles, Fut>(
    guarded: IdempotentSqsHandler<Handler, Handles>,
) -> impl Fn(LambdaEvent<SqsEvent>) -> HandlerFuture<Response>
where
    Handler: Fn(LambdaEvent<SqsEvent>) -> Fut + Send + Sync + 'static,
    Handles: BatchHandles + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
    Response: Send + 'static,
{
    let guarded: Arc<IdempotentSqsHandler<Handler, Handles>> = Arc::new(guarded);

    move |event: LambdaEvent<SqsEvent>| {
        let guarded: Arc<IdempotentSqsHandler<Handler, Handles>> = guarded.clone();

        Box::pin(async move { guarded.call(event).await })
    }
}
