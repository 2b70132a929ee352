/// Environment variable containing the DynamoDB table used for reservations
pub const IDEMPOTENCY_TABLE_NAME: &str = "IDEMPOTENCY_TABLE_NAME";
/// Environment variable containing the AWS region of the table and queue
pub const IDEMPOTENCY_REGION: &str = "IDEMPOTENCY_REGION";
/// Optional environment variable overriding the DynamoDB endpoint, e.g. DynamoDB local
pub const IDEMPOTENCY_ENDPOINT: &str = "IDEMPOTENCY_ENDPOINT";
/// Optional environment variable containing the reservation TTL in seconds
pub const IDEMPOTENCY_TTL_SECONDS: &str = "IDEMPOTENCY_TTL_SECONDS";
/// Environment variable containing the URL of the queue feeding a batch handler
pub const IDEMPOTENCY_QUEUE_URL: &str = "IDEMPOTENCY_QUEUE_URL";
/// Optional environment variable naming the header carrying an idempotency key
pub const IDEMPOTENCY_HEADER: &str = "IDEMPOTENCY_HEADER";
