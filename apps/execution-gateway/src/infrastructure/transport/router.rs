//! Router socket: many peers, addressed by frame 0.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use super::{Multipart, MultipartCodec, PeerSink, TransportError, peer_label};

/// Outbound messages buffered per connection before sends are dropped.
pub const DEFAULT_PEER_OUTBOX: usize = 1024;

type PeerTable = DashMap<Bytes, mpsc::Sender<Multipart>>;

/// Accepts connections and exchanges addressed multipart messages with them.
///
/// Inbound messages are forwarded to the owner's mailbox with the peer
/// address prepended. Reads happen on per-connection tasks; the owner never
/// touches a socket directly.
pub struct RouterSocket {
    local_addr: SocketAddr,
    peers: Arc<PeerTable>,
    shutdown: CancellationToken,
}

impl RouterSocket {
    /// Bind and start accepting.
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be bound.
    pub async fn bind<M>(
        addr: SocketAddr,
        codec: MultipartCodec,
        inbound: mpsc::Sender<M>,
        shutdown: CancellationToken,
    ) -> Result<Self, TransportError>
    where
        M: From<Multipart> + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let peers: Arc<PeerTable> = Arc::new(DashMap::new());

        tracing::info!(%local_addr, max_frame_size = codec.max_frame_size(), "Router bound");

        tokio::spawn(accept_loop(
            listener,
            codec,
            inbound,
            Arc::clone(&peers),
            shutdown.clone(),
        ));

        Ok(Self {
            local_addr,
            peers,
            shutdown,
        })
    }

    /// Address actually bound (useful with port 0).
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connected peers.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Queue a message for the peer named by frame 0.
    ///
    /// Never waits: a full peer outbox drops the message.
    ///
    /// # Errors
    ///
    /// Returns error if the address frame is missing, the peer is unknown,
    /// or the peer is not keeping up.
    pub fn send(&self, mut frames: Multipart) -> Result<(), TransportError> {
        if frames.is_empty() {
            return Err(TransportError::MissingAddress);
        }
        let peer = frames.remove(0);

        let outbox = self
            .peers
            .get(&peer)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::UnknownPeer {
                peer: peer_label(&peer),
            })?;

        outbox.try_send(frames).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::PeerBackpressure {
                peer: peer_label(&peer),
            },
            mpsc::error::TrySendError::Closed(_) => TransportError::UnknownPeer {
                peer: peer_label(&peer),
            },
        })
    }

    /// Stop accepting and close every connection.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl PeerSink for RouterSocket {
    fn send(&self, frames: Multipart) -> Result<(), TransportError> {
        Self::send(self, frames)
    }

    fn stop(&self) {
        Self::stop(self);
    }
}

/// ZeroMQ-style generated identity: a zero byte followed by a counter.
fn peer_address(sequence: u32) -> Bytes {
    let mut address = BytesMut::with_capacity(5);
    address.put_u8(0);
    address.put_u32(sequence);
    address.freeze()
}

async fn accept_loop<M>(
    listener: TcpListener,
    codec: MultipartCodec,
    inbound: mpsc::Sender<M>,
    peers: Arc<PeerTable>,
    shutdown: CancellationToken,
) where
    M: From<Multipart> + Send + 'static,
{
    let mut sequence: u32 = 0;

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    sequence = sequence.wrapping_add(1);
                    let peer = peer_address(sequence);
                    tracing::debug!(%remote, peer = %peer_label(&peer), "Peer connected");

                    tokio::spawn(serve_peer(
                        stream,
                        peer,
                        codec,
                        inbound.clone(),
                        Arc::clone(&peers),
                        shutdown.child_token(),
                    ));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                }
            },
        }
    }

    tracing::info!(peers = peers.len(), "Router stopped accepting");
}

async fn serve_peer<M>(
    stream: TcpStream,
    peer: Bytes,
    codec: MultipartCodec,
    inbound: mpsc::Sender<M>,
    peers: Arc<PeerTable>,
    shutdown: CancellationToken,
) where
    M: From<Multipart> + Send + 'static,
{
    let (outbox, mut pending) = mpsc::channel(DEFAULT_PEER_OUTBOX);
    peers.insert(peer.clone(), outbox);

    let (mut sink, mut source) = Framed::new(stream, codec).split();
    let label = peer_label(&peer);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            received = source.next() => match received {
                Some(Ok(frames)) => {
                    let mut message = Vec::with_capacity(frames.len() + 1);
                    message.push(peer.clone());
                    message.extend(frames);
                    if inbound.send(M::from(message)).await.is_err() {
                        tracing::debug!(peer = %label, "Router owner gone, closing connection");
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(peer = %label, error = %e, "Receive failed, closing connection");
                    break;
                }
                None => {
                    tracing::debug!(peer = %label, "Peer disconnected");
                    break;
                }
            },
            Some(frames) = pending.recv() => {
                if let Err(e) = sink.send(frames).await {
                    tracing::warn!(peer = %label, error = %e, "Send failed, closing connection");
                    break;
                }
            }
        }
    }

    peers.remove(&peer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::DealerSocket;
    use std::time::Duration;

    async fn bound() -> (RouterSocket, mpsc::Receiver<Multipart>) {
        let (tx, rx) = mpsc::channel(16);
        let router = RouterSocket::bind(
            "127.0.0.1:0".parse().unwrap(),
            MultipartCodec::default(),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        (router, rx)
    }

    #[test]
    fn peer_addresses_are_distinct() {
        assert_eq!(&peer_address(1)[..], [0u8, 0, 0, 0, 1]);
        assert_ne!(peer_address(1), peer_address(2));
    }

    #[tokio::test]
    async fn inbound_gets_address_and_reply_is_routed_back() {
        let (router, mut rx) = bound().await;
        let mut dealer = DealerSocket::connect(router.local_addr(), MultipartCodec::default())
            .await
            .unwrap();

        dealer
            .send(vec![Bytes::from_static(b"ping")])
            .await
            .unwrap();
        let inbound = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inbound.len(), 2);
        assert_eq!(&inbound[1][..], b"ping");
        assert_eq!(router.peer_count(), 1);

        router
            .send(vec![inbound[0].clone(), Bytes::from_static(b"pong")])
            .unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(2), dealer.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(reply, vec![Bytes::from_static(b"pong")]);

        router.stop();
    }

    #[tokio::test]
    async fn unknown_peer_is_an_error() {
        let (router, _rx) = bound().await;
        let result = router.send(vec![peer_address(99), Bytes::from_static(b"x")]);
        assert!(matches!(result, Err(TransportError::UnknownPeer { .. })));
        assert!(matches!(
            router.send(Vec::new()),
            Err(TransportError::MissingAddress)
        ));
    }
}
