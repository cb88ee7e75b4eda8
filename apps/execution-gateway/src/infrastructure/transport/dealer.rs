//! Dealer socket: a single client connection.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use super::{Multipart, MultipartCodec, TransportError};

/// Client side of a router connection, also used to subscribe to events.
pub struct DealerSocket {
    framed: Framed<TcpStream, MultipartCodec>,
}

impl DealerSocket {
    /// Connect to a router or publisher.
    ///
    /// # Errors
    ///
    /// Returns error if the connection fails.
    pub async fn connect(addr: SocketAddr, codec: MultipartCodec) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            framed: Framed::new(stream, codec),
        })
    }

    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns error if the message breaks codec limits or the write fails.
    pub async fn send(&mut self, frames: Multipart) -> Result<(), TransportError> {
        self.framed.send(frames).await
    }

    /// Receive the next message; `None` once the peer has closed.
    ///
    /// # Errors
    ///
    /// Returns error if the stream is corrupt or the read fails.
    pub async fn recv(&mut self) -> Result<Option<Multipart>, TransportError> {
        self.framed.next().await.transpose()
    }
}
