//! Endpoint Port
//!
//! A destination that accepts one message at a time. Actors are wired to
//! each other through endpoints rather than named addresses.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Delivery failed because the receiving actor has shut down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Endpoint closed: {endpoint}")]
pub struct SendError {
    /// Name of the closed endpoint.
    pub endpoint: String,
}

impl SendError {
    /// Create a send error for the named endpoint.
    #[must_use]
    pub fn closed(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

/// Something that can receive messages of type `T`.
#[async_trait]
pub trait Endpoint<T: Send + 'static>: Send + Sync {
    /// Deliver one message, waiting for mailbox capacity if needed.
    async fn deliver(&self, message: T) -> Result<(), SendError>;
}

/// Any mailbox whose message type can be built from `T` is an endpoint for `T`.
#[async_trait]
impl<T, M> Endpoint<T> for mpsc::Sender<M>
where
    T: Send + 'static,
    M: From<T> + Send + 'static,
{
    async fn deliver(&self, message: T) -> Result<(), SendError> {
        self.send(M::from(message))
            .await
            .map_err(|_| SendError::closed(std::any::type_name::<M>()))
    }
}
