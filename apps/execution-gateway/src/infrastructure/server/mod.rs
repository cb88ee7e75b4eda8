//! Protocol Server
//!
//! Sessions, reply correlation and the message server actor behind the
//! commands socket.

mod correlation;
mod message_server;
mod sessions;

use std::net::SocketAddr;

use thiserror::Error;

use crate::infrastructure::transport::TransportError;

pub use correlation::CorrelationIndex;
pub use message_server::{
    DEFAULT_SERVER_MAILBOX, INBOUND_FRAME_COUNT, MessageServer, MessageServerConfig,
    MessageServerHandle, Serializers, ServerMessage, ServerStats,
};
pub use sessions::{SessionOpen, SessionRegistry};

/// Server startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Socket could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Requested address.
        address: SocketAddr,
        /// Transport failure.
        source: TransportError,
    },
}
