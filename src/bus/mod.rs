//! Event bus port
//!
//! Producers publish task-creation envelopes; consumers join a consumer
//! group and hand each delivered payload to a handler. Delivery is
//! at-least-once: a handler failure aborts the session without committing
//! the offset, so the broker delivers the message again.

pub mod iggy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Topic carrying task-creation events.
pub const TOPIC_DOWNLOAD_TASK_CREATED: &str = "topic-download_task_created";

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Consume failed: {0}")]
    Consume(String),

    #[error("Handler failed: {0}")]
    Handler(String),
}

pub type Result<T> = std::result::Result<T, BusError>;

/// Wire envelope for `topic-download_task_created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreatedEvent {
    pub download_task_id: i64,
}

/// Message producer for publishing events
#[async_trait]
pub trait EventProducer: Send + Sync {
    /// Publish a payload to a topic; returns once the broker has
    /// acknowledged the write.
    async fn produce(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

/// Per-message callback invoked by a consumer session.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, topic: &str, payload: &[u8]) -> Result<()>;
}

/// Consumer-group subscription on a topic.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Consume until cancelled. A handler error aborts the session and is
    /// returned to the caller; the uncommitted message is redelivered.
    async fn consume(
        &self,
        topic: &str,
        handler: std::sync::Arc<dyn EventHandler>,
        cancel: CancellationToken,
    ) -> Result<()>;
}

/// Recording producer for tests and development.
#[derive(Debug, Default)]
pub struct MockProducer {
    published: std::sync::Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventProducer for MockProducer {
    async fn produce(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        tracing::info!(topic, size = payload.len(), "Mock publish");
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = TaskCreatedEvent {
            download_task_id: 42,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"download_task_id":42}"#);

        let decoded: TaskCreatedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[tokio::test]
    async fn test_mock_producer_records() {
        let producer = MockProducer::new();
        producer
            .produce(TOPIC_DOWNLOAD_TASK_CREATED, b"{}".to_vec())
            .await
            .unwrap();

        let published = producer.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, TOPIC_DOWNLOAD_TASK_CREATED);
    }
}
