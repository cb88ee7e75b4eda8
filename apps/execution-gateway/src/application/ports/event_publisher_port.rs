//! Event Publisher Port (Driven Port)
//!
//! Interface for publishing execution events to external subscribers.

use async_trait::async_trait;

use crate::domain::order_execution::ExecutionEvent;

/// Event publishing error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventPublishError {
    /// Serialization error.
    #[error("Event serialization error: {message}")]
    SerializationError {
        /// Error details.
        message: String,
    },

    /// Publishing failed.
    #[error("Event publish failed: {message}")]
    PublishFailed {
        /// Error details.
        message: String,
    },
}

/// Port for publishing execution events.
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: ExecutionEvent) -> Result<(), EventPublishError>;

    /// Publish events in order.
    async fn publish_all(&self, events: Vec<ExecutionEvent>) -> Result<(), EventPublishError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

/// No-op event publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisherPort for NoOpEventPublisher {
    async fn publish(&self, _event: ExecutionEvent) -> Result<(), EventPublishError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{OrderCancelled, OrderEvent};
    use crate::domain::shared::{MessageId, OrderId, Timestamp};

    fn cancelled(order_id: &str) -> ExecutionEvent {
        OrderEvent::Cancelled(OrderCancelled {
            id: MessageId::generate(),
            order_id: OrderId::new(order_id),
            timestamp: Timestamp::now(),
        })
        .into()
    }

    #[tokio::test]
    async fn no_op_publisher_succeeds() {
        let publisher = NoOpEventPublisher;
        assert!(publisher.publish(cancelled("O-1")).await.is_ok());
    }

    #[tokio::test]
    async fn no_op_publisher_multiple_events() {
        let publisher = NoOpEventPublisher;
        let result = publisher
            .publish_all(vec![cancelled("O-1"), cancelled("O-2")])
            .await;
        assert!(result.is_ok());
    }
}
