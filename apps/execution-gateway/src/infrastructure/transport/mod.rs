//! Multipart Transport
//!
//! Router/dealer messaging over TCP. A message is a list of byte frames,
//! written as a `u32` frame count followed by a `u32` length and the bytes of
//! each frame (big-endian). The router assigns every accepted connection an
//! opaque peer address and prepends it as frame 0 of inbound messages;
//! outbound frame 0 selects the connection and is stripped before writing.

pub mod codec;
pub mod dealer;
pub mod router;

use bytes::Bytes;
use thiserror::Error;

pub use codec::{DEFAULT_MAX_FRAME_SIZE, MAX_FRAMES_PER_MESSAGE, MultipartCodec};
pub use dealer::DealerSocket;
pub use router::{DEFAULT_PEER_OUTBOX, RouterSocket};

/// One multipart message.
pub type Multipart = Vec<Bytes>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame exceeds the configured size.
    #[error("Frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge {
        /// Frame length.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// A message has too many frames.
    #[error("Message of {count} frames exceeds limit of {max}")]
    TooManyFrames {
        /// Frame count.
        count: usize,
        /// Limit.
        max: usize,
    },

    /// Outbound message without an address frame.
    #[error("Outbound message has no address frame")]
    MissingAddress,

    /// No connection with this address.
    #[error("Unknown peer {peer}")]
    UnknownPeer {
        /// Hex-encoded peer address.
        peer: String,
    },

    /// Peer outbox is full; the message was dropped.
    #[error("Peer {peer} is not keeping up, message dropped")]
    PeerBackpressure {
        /// Hex-encoded peer address.
        peer: String,
    },
}

/// Outbound side of a router, as seen by the message server.
pub trait PeerSink: Send + Sync {
    /// Send a message to the peer named by frame 0.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be queued for that peer.
    fn send(&self, frames: Multipart) -> Result<(), TransportError>;

    /// Stop the transport.
    fn stop(&self);
}

/// Render a peer address for logs and errors.
#[must_use]
pub fn peer_label(peer: &[u8]) -> String {
    hex::encode(peer)
}
