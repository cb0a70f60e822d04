//! AMQP broker plumbing
//!
//! One connection, one channel, owned by the coordinator for the whole run.
//! Publishing is fire-and-forget (no confirms, no retries) and consumption is
//! auto-acknowledged, so the broker's own delivery semantics pass through
//! unmodified. A connect failure is a fatal startup fault.

use crate::config::BrokerConfig;
use anyhow::{Context, Result};
use lapin::options::{
    BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};

/// Broker connection handle
pub struct Broker {
    connection: Connection,
    channel: Channel,
    task_queue: String,
    result_queue: String,
}

impl Broker {
    /// Connect to the broker and open the coordinator's channel
    pub async fn connect(config: &BrokerConfig) -> Result<Self> {
        let options = ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio);

        let connection = Connection::connect(&config.url, options)
            .await
            .with_context(|| format!("Failed to connect to broker at {}", config.url))?;
        let channel = connection
            .create_channel()
            .await
            .context("Failed to open broker channel")?;

        Ok(Self {
            connection,
            channel,
            task_queue: config.task_queue.clone(),
            result_queue: config.result_queue.clone(),
        })
    }

    /// Task queue name
    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    /// Result queue name
    pub fn result_queue(&self) -> &str {
        &self.result_queue
    }

    /// Declare both durable queues; repeated declaration is a no-op
    pub async fn declare_queues(&self) -> Result<()> {
        for queue in [&self.task_queue, &self.result_queue] {
            self.channel
                .queue_declare(
                    queue,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
                .with_context(|| format!("Failed to declare queue '{queue}'"))?;
        }

        Ok(())
    }

    /// Publish to the task queue, fire-and-forget
    pub async fn publish_task(&self, payload: &[u8], properties: BasicProperties) -> Result<()> {
        self.publish(&self.task_queue, payload, properties).await
    }

    async fn publish(
        &self,
        queue: &str,
        payload: &[u8],
        properties: BasicProperties,
    ) -> Result<()> {
        self.channel
            .basic_publish("", queue, BasicPublishOptions::default(), payload, properties)
            .await
            .with_context(|| format!("Failed to publish to queue '{queue}'"))?;

        Ok(())
    }

    /// Start an auto-acknowledged consumer on the result queue
    ///
    /// Auto-ack means a delivery is acknowledged before it is processed; a
    /// coordinator crash mid-processing loses that unit's contribution
    /// silently rather than triggering redelivery.
    pub async fn consume_results(&self, consumer_tag: &str) -> Result<Consumer> {
        self.channel
            .basic_consume(
                &self.result_queue,
                consumer_tag,
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| {
                format!("Failed to consume from queue '{}'", self.result_queue)
            })
    }

    /// Cancel a consumer (unsubscribe; the connection stays open)
    pub async fn cancel(&self, consumer: &Consumer) -> Result<()> {
        self.channel
            .basic_cancel(consumer.tag().as_str(), BasicCancelOptions::default())
            .await
            .context("Failed to cancel result consumer")?;

        Ok(())
    }

    /// Close the broker connection
    ///
    /// Takes `self` by value so the connection is closed exactly once.
    pub async fn close(self) -> Result<()> {
        self.connection
            .close(200, "analysis complete")
            .await
            .context("Failed to close broker connection")?;

        Ok(())
    }
}
