use async_trait::async_trait;
use model::Error;
use queue::MessageDeleter;

/// Deletes messages from one SQS queue.
#[derive(Debug, Clone)]
pub struct SqsMessageDeleter {
    pub sqs: aws_sdk_sqs::Client,
    pub queue_url: String,
}

impl SqsMessageDeleter {
    pub fn new(sqs: aws_sdk_sqs::Client, queue_url: impl Into<String>) -> Self {
        Self {
            sqs,
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl MessageDeleter for SqsMessageDeleter {
    async fn delete_message(&self, receipt_handle: &str) -> Result<(), Error> {
        self.sqs
            .delete_message()
            .queue_url(self.queue_url.as_str())
            .receipt_handle(receipt_handle)
            .send()
            .await?;

        Ok(())
    }
}
