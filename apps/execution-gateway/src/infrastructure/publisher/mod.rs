//! Event Publisher
//!
//! Republishes execution events to subscribers on the events socket.
//!
//! A subscriber connects, sends one frame holding a topic prefix (empty for
//! everything) and then receives `[topic][Event][sizeI64LE][body]` messages
//! whose topic starts with that prefix. Topics are `events.order.<ORDER_ID>`
//! and `events.account.<ACCOUNT_ID>`.
//!
//! Publishing never waits on subscribers: messages fan out through a bounded
//! broadcast hub and a subscriber that falls behind loses the oldest ones.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{EventPublishError, EventPublisherPort};
use crate::domain::order_execution::ExecutionEvent;
use crate::infrastructure::transport::{Multipart, MultipartCodec, TransportError};
use crate::infrastructure::wire::{MessageKind, MessageSerializer, WireCodec};

/// Topic prefix for order events.
pub const ORDER_TOPIC_PREFIX: &str = "events.order.";

/// Topic prefix for account events.
pub const ACCOUNT_TOPIC_PREFIX: &str = "events.account.";

/// Default broadcast buffer per subscriber.
pub const DEFAULT_PUBLISHER_CAPACITY: usize = 4096;

/// How long a new connection may take to send its subscription frame.
const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Publisher settings.
#[derive(Debug, Clone, Copy)]
pub struct EventPublisherConfig {
    /// Events socket address.
    pub bind_address: SocketAddr,
    /// Per-frame size limit.
    pub max_frame_size: usize,
    /// Messages buffered for a slow subscriber before it starts losing them.
    pub capacity: usize,
}

/// Topic an event is published under.
#[must_use]
pub fn topic_for(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::Order(event) => format!("{ORDER_TOPIC_PREFIX}{}", event.order_id()),
        ExecutionEvent::Account(event) => format!("{ACCOUNT_TOPIC_PREFIX}{}", event.account_id),
    }
}

/// Publishes execution events over TCP.
pub struct TcpEventPublisher {
    codec: WireCodec,
    serializer: Arc<dyn MessageSerializer<ExecutionEvent>>,
    hub: broadcast::Sender<Multipart>,
    local_addr: SocketAddr,
    subscribers: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

impl TcpEventPublisher {
    /// Bind the events socket and start accepting subscribers.
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be bound.
    pub async fn bind(
        config: EventPublisherConfig,
        codec: WireCodec,
        serializer: Arc<dyn MessageSerializer<ExecutionEvent>>,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(config.bind_address).await?;
        let local_addr = listener.local_addr()?;
        let (hub, _) = broadcast::channel(config.capacity.max(1));
        let subscribers = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        tracing::info!(%local_addr, capacity = config.capacity, "Event publisher listening");

        tokio::spawn(accept_subscribers(
            listener,
            MultipartCodec::new(config.max_frame_size),
            hub.clone(),
            Arc::clone(&subscribers),
            shutdown.clone(),
        ));

        Ok(Self {
            codec,
            serializer,
            hub,
            local_addr,
            subscribers,
            shutdown,
        })
    }

    /// Address the events socket is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }

    /// Stop accepting and disconnect every subscriber.
    pub fn stop(&self) {
        self.shutdown.cancel();
        tracing::info!("Event publisher stopped");
    }
}

#[async_trait]
impl EventPublisherPort for TcpEventPublisher {
    async fn publish(&self, event: ExecutionEvent) -> Result<(), EventPublishError> {
        let payload =
            self.serializer
                .serialize(&event)
                .map_err(|e| EventPublishError::SerializationError {
                    message: e.to_string(),
                })?;
        let frames = self
            .codec
            .encode(MessageKind::Event, &payload)
            .map_err(|e| EventPublishError::PublishFailed {
                message: e.to_string(),
            })?;

        let topic = topic_for(&event);
        tracing::trace!(topic = %topic, event_type = event.event_type(), "Publishing event");

        let mut message = Vec::with_capacity(frames.len() + 1);
        message.push(Bytes::from(topic));
        message.extend(frames);

        // No subscribers is not an error.
        self.hub.send(message).ok();
        Ok(())
    }
}

async fn accept_subscribers(
    listener: TcpListener,
    codec: MultipartCodec,
    hub: broadcast::Sender<Multipart>,
    subscribers: Arc<AtomicUsize>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    tokio::spawn(serve_subscriber(
                        stream,
                        remote,
                        codec,
                        hub.clone(),
                        Arc::clone(&subscribers),
                        shutdown.child_token(),
                    ));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept subscriber");
                }
            },
        }
    }
}

async fn serve_subscriber(
    stream: TcpStream,
    remote: SocketAddr,
    codec: MultipartCodec,
    hub: broadcast::Sender<Multipart>,
    subscribers: Arc<AtomicUsize>,
    shutdown: CancellationToken,
) {
    let mut framed = Framed::new(stream, codec);

    let prefix = match tokio::time::timeout(SUBSCRIBE_TIMEOUT, framed.next()).await {
        Ok(Some(Ok(frames))) => frames.into_iter().next().unwrap_or_default(),
        Ok(Some(Err(e))) => {
            tracing::warn!(%remote, error = %e, "Invalid subscription");
            return;
        }
        Ok(None) => return,
        Err(_) => {
            tracing::warn!(%remote, "No subscription frame received, closing");
            return;
        }
    };

    let mut events = hub.subscribe();
    let count = subscribers.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::info!(
        %remote,
        topic_prefix = %String::from_utf8_lossy(&prefix),
        subscribers = count,
        "Subscriber registered"
    );

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            received = events.recv() => match received {
                Ok(message) => {
                    let wanted = message
                        .first()
                        .is_some_and(|topic| topic.starts_with(prefix.as_ref()));
                    if !wanted {
                        continue;
                    }
                    if let Err(e) = framed.send(message).await {
                        tracing::warn!(%remote, error = %e, "Failed to send event, dropping subscriber");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%remote, skipped, "Subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = framed.next() => match incoming {
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }

    subscribers.fetch_sub(1, Ordering::SeqCst);
    tracing::debug!(%remote, "Subscriber disconnected");
}
