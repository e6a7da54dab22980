#![forbid(unsafe_code)]

use crate::relay::pipeline::RelayPipeline;
use crate::relay::record::MessageRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

/// Spawns one supervised task per inbound text and tracks them so shutdown
/// can wait for in-flight deliveries.
#[derive(Clone)]
pub struct RelayDispatcher {
    pipeline: Arc<RelayPipeline>,
    tasks: TaskTracker,
}

impl RelayDispatcher {
    pub fn new(pipeline: Arc<RelayPipeline>) -> Self {
        Self {
            pipeline,
            tasks: TaskTracker::new(),
        }
    }

    pub fn pipeline(&self) -> &RelayPipeline {
        &self.pipeline
    }

    /// Fire and forget. Returns `false` once shutdown has started and the
    /// record was dropped instead of relayed.
    pub fn dispatch(&self, record: MessageRecord) -> bool {
        if self.tasks.is_closed() {
            warn!(to = %record.destination, "shutting down, dropping inbound text");
            return false;
        }

        let pipeline = Arc::clone(&self.pipeline);
        let relay = tokio::spawn(async move { pipeline.run(record).await });

        self.tasks.spawn(async move {
            match relay.await {
                Ok(outcome) => debug!(outcome = %outcome, "relay task finished"),
                Err(err) if err.is_panic() => error!(error = %err, "relay task panicked"),
                Err(err) => warn!(error = %err, "relay task cancelled"),
            }
        });

        true
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Stops accepting work and waits up to `drain` for running relays.
    /// Returns `true` when every task finished in time.
    pub async fn shutdown(&self, drain: Duration) -> bool {
        self.tasks.close();
        timeout(drain, self.tasks.wait()).await.is_ok()
    }
}
