//! Termination broadcast
//!
//! After completion the coordinator publishes one `fin` sentinel per worker
//! instance onto the task queue. Workers recognize the sentinel, finish
//! their current unit of work, and exit without requeuing it. A poison-pill
//! broadcast is used because the coordinator has no channel to discover live
//! worker identities; the instance count is deployment configuration.

use crate::broker::Broker;
use crate::protocol;
use crate::Result;

/// Publishes the fixed termination broadcast
pub struct ShutdownBroadcaster {
    worker_count: usize,
}

impl ShutdownBroadcaster {
    /// Create a broadcaster for a deployment of `worker_count` instances
    pub fn new(worker_count: usize) -> Self {
        Self { worker_count }
    }

    /// Number of sentinels a broadcast publishes
    pub fn sentinel_count(&self) -> usize {
        self.worker_count
    }

    /// Publish one sentinel per worker instance to the task queue
    pub async fn broadcast(&self, broker: &Broker) -> Result<()> {
        for _ in 0..self.worker_count {
            let (payload, properties) = protocol::encode_fin();
            broker.publish_task(&payload, properties).await?;
        }

        println!(
            "Published {} termination sentinel(s) to '{}'",
            self.worker_count,
            broker.task_queue()
        );

        Ok(())
    }
}
