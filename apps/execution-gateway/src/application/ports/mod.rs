//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Endpoints**: How actors hand messages to each other
//! - **Driven Ports** (Secondary/Outbound): How our application uses external systems

mod endpoint;
mod event_publisher_port;
mod execution_client_port;

pub use endpoint::{Endpoint, SendError};
pub use event_publisher_port::{EventPublishError, EventPublisherPort, NoOpEventPublisher};
pub use execution_client_port::{ExecutionClientError, ExecutionClientPort};
