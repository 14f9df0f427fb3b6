//! Download worker
//!
//! Consumes task-creation events and drives task execution. The claim
//! inside the task service makes redelivery safe, so the worker only has
//! to decode the envelope and tolerate the publish-before-commit race on
//! freshly created tasks.

use crate::bus::{BusError, EventConsumer, EventHandler, TaskCreatedEvent, TOPIC_DOWNLOAD_TASK_CREATED};
use crate::service::{CoreError, TaskService};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

// The creation event is published before the inserting transaction
// commits, so the first claim can miss the row; retry briefly.
const CLAIM_RETRY_ATTEMPTS: u32 = 3;
const CLAIM_RETRY_DELAY: Duration = Duration::from_millis(200);

const SESSION_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Handler for `topic-download_task_created`.
pub struct TaskCreatedHandler {
    tasks: Arc<TaskService>,
    cancel: CancellationToken,
}

impl TaskCreatedHandler {
    pub fn new(tasks: Arc<TaskService>, cancel: CancellationToken) -> Self {
        Self { tasks, cancel }
    }
}

#[async_trait]
impl EventHandler for TaskCreatedHandler {
    async fn handle(&self, _topic: &str, payload: &[u8]) -> crate::bus::Result<()> {
        let event: TaskCreatedEvent = serde_json::from_slice(payload)
            .map_err(|e| BusError::Handler(format!("failed to decode event: {}", e)))?;
        let id = event.download_task_id;

        info!(id, "Download task created event received");

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.tasks.execute_download_task(&self.cancel, id).await {
                Ok(()) => return Ok(()),
                Err(CoreError::NotFound(_)) if attempt < CLAIM_RETRY_ATTEMPTS => {
                    warn!(id, attempt, "Task not visible yet, retrying claim");
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            return Err(BusError::Handler("worker cancelled".to_string()));
                        }
                        _ = tokio::time::sleep(CLAIM_RETRY_DELAY) => {}
                    }
                }
                Err(err) => {
                    error!(id, error = %err, "Failed to handle download task created event");
                    return Err(BusError::Handler(err.to_string()));
                }
            }
        }
    }
}

/// Run the consumer loop until cancelled, rejoining after aborted
/// sessions so uncommitted messages are delivered again.
pub async fn run(
    consumer: Arc<dyn EventConsumer>,
    tasks: Arc<TaskService>,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        let handler = Arc::new(TaskCreatedHandler::new(tasks.clone(), cancel.clone()));
        match consumer
            .consume(TOPIC_DOWNLOAD_TASK_CREATED, handler, cancel.clone())
            .await
        {
            Ok(()) => break,
            Err(err) => {
                error!(error = %err, "Consumer session ended");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(SESSION_RESTART_DELAY) => {}
                }
            }
        }
    }

    info!("Worker stopped");
}
