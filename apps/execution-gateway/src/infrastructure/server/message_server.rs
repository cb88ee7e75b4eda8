//! Message Server
//!
//! Terminates the client-facing router socket. Inbound frame sets arrive in
//! the actor's mailbox from the transport's connection tasks and are
//! validated, decoded and dispatched one at a time:
//!
//! - `Request` frames carry session handshakes and order queries.
//! - `Command` frames carry trading commands for the command router.
//!
//! Every decoded message records `message id -> sender` in the correlation
//! index before it is routed, so any reply produced later, by this actor or
//! by a spawned query, finds its way back. Recoverable protocol failures are
//! answered with `MessageRejected` or `QueryFailure` and never stop the loop.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::correlation::CorrelationIndex;
use super::sessions::{SessionOpen, SessionRegistry};
use super::ServerError;
use crate::application::ports::{Endpoint, SendError};
use crate::application::services::OrderManagerMessage;
use crate::domain::order_execution::TradingCommand;
use crate::domain::shared::{MessageId, ServerId, Timestamp};
use crate::error::{ErrorCode, ProtocolError};
use crate::infrastructure::transport::{
    Multipart, MultipartCodec, PeerSink, RouterSocket, peer_label,
};
use crate::infrastructure::wire::{
    Connect, Connected, Disconnect, Disconnected, MessageKind, MessageSerializer, QueryOrder,
    Request, Response, SerializationFormat, WIRE_FRAME_COUNT, WireCodec,
};
use crate::observability::{
    record_message_received, record_message_rejected, record_message_sent, update_open_sessions,
};

/// Frames of an inbound message: address, type, size, body.
pub const INBOUND_FRAME_COUNT: usize = WIRE_FRAME_COUNT + 1;

/// Default mailbox capacity for the server.
pub const DEFAULT_SERVER_MAILBOX: usize = 4096;

/// Server settings.
#[derive(Debug, Clone)]
pub struct MessageServerConfig {
    /// Identity reported in handshake replies.
    pub server_id: ServerId,
    /// Commands socket address.
    pub bind_address: SocketAddr,
    /// Per-frame size limit.
    pub max_frame_size: usize,
    /// Mailbox capacity.
    pub mailbox_capacity: usize,
}

/// Independent serializer slots for the three message families.
#[derive(Clone)]
pub struct Serializers {
    /// Inbound requests.
    pub requests: Arc<dyn MessageSerializer<Request>>,
    /// Inbound commands.
    pub commands: Arc<dyn MessageSerializer<TradingCommand>>,
    /// Outbound responses.
    pub responses: Arc<dyn MessageSerializer<Response>>,
}

impl Serializers {
    /// Use one format for every slot.
    #[must_use]
    pub fn uniform(format: SerializationFormat) -> Self {
        Self {
            requests: format.serializer(),
            commands: format.serializer(),
            responses: format.serializer(),
        }
    }
}

impl Default for Serializers {
    fn default() -> Self {
        Self::uniform(SerializationFormat::default())
    }
}

/// Mailbox messages of the server.
#[derive(Debug)]
pub enum ServerMessage {
    /// A frame set from the transport, peer address first.
    Inbound(Multipart),
    /// A reply produced outside the actor.
    Reply {
        /// The reply.
        response: Response,
        /// Message being answered.
        correlation_id: MessageId,
    },
    /// Report counters.
    Stats(oneshot::Sender<ServerStats>),
}

impl From<Multipart> for ServerMessage {
    fn from(frames: Multipart) -> Self {
        Self::Inbound(frames)
    }
}

/// Server counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Replies sent.
    pub sent: u64,
    /// Frame sets received.
    pub received: u64,
    /// Open sessions.
    pub sessions: usize,
    /// Replies still owed.
    pub pending_correlations: usize,
}

/// Handle to a running server.
#[derive(Clone)]
pub struct MessageServerHandle {
    sender: mpsc::Sender<ServerMessage>,
    local_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl MessageServerHandle {
    /// Address the commands socket is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Send a reply to the originator of `correlation_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the server has stopped.
    pub async fn send_message(
        &self,
        response: Response,
        correlation_id: MessageId,
    ) -> Result<(), SendError> {
        self.sender
            .send(ServerMessage::Reply {
                response,
                correlation_id,
            })
            .await
            .map_err(|_| SendError::closed("message_server"))
    }

    /// Counters.
    ///
    /// # Errors
    ///
    /// Returns error if the server has stopped.
    pub async fn stats(&self) -> Result<ServerStats, SendError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(ServerMessage::Stats(reply))
            .await
            .map_err(|_| SendError::closed("message_server"))?;
        rx.await.map_err(|_| SendError::closed("message_server"))
    }

    /// Stop the server and its socket.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

/// Protocol server actor.
pub struct MessageServer<R, S> {
    server_id: ServerId,
    codec: WireCodec,
    serializers: Serializers,
    router: R,
    orders: mpsc::Sender<OrderManagerMessage>,
    socket: S,
    mailbox: mpsc::Sender<ServerMessage>,
    sessions: SessionRegistry,
    correlation: CorrelationIndex,
    sent: u64,
    received: u64,
}

impl<R> MessageServer<R, RouterSocket>
where
    R: Endpoint<TradingCommand> + 'static,
{
    /// Bind the commands socket and spawn the server.
    ///
    /// # Errors
    ///
    /// Returns error if the socket cannot be bound.
    pub async fn bind(
        config: MessageServerConfig,
        codec: WireCodec,
        serializers: Serializers,
        router: R,
        orders: mpsc::Sender<OrderManagerMessage>,
    ) -> Result<MessageServerHandle, ServerError> {
        let (sender, inbox) = mpsc::channel(config.mailbox_capacity.max(1));
        let shutdown = CancellationToken::new();

        let socket = RouterSocket::bind(
            config.bind_address,
            MultipartCodec::new(config.max_frame_size),
            sender.clone(),
            shutdown.child_token(),
        )
        .await
        .map_err(|e| ServerError::Bind {
            address: config.bind_address,
            source: e,
        })?;
        let local_addr = socket.local_addr();

        tracing::info!(
            server_id = %config.server_id,
            %local_addr,
            compression = codec.compression(),
            encryption = codec.encryption(),
            serializer = serializers.commands.name(),
            "Message server started"
        );

        let server = Self::new(
            config.server_id,
            codec,
            serializers,
            router,
            orders,
            socket,
            sender.clone(),
        );
        tokio::spawn(server.run(inbox, shutdown.clone()));

        Ok(MessageServerHandle {
            sender,
            local_addr,
            shutdown,
        })
    }
}

impl<R, S> MessageServer<R, S>
where
    R: Endpoint<TradingCommand> + 'static,
    S: PeerSink + 'static,
{
    /// Create a server over an already-running transport.
    #[must_use]
    pub fn new(
        server_id: ServerId,
        codec: WireCodec,
        serializers: Serializers,
        router: R,
        orders: mpsc::Sender<OrderManagerMessage>,
        socket: S,
        mailbox: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            server_id,
            codec,
            serializers,
            router,
            orders,
            socket,
            mailbox,
            sessions: SessionRegistry::new(),
            correlation: CorrelationIndex::new(),
            sent: 0,
            received: 0,
        }
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<ServerMessage>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                message = inbox.recv() => match message {
                    Some(message) => self.handle(message).await,
                    None => break,
                },
            }
        }
        self.shutdown();
    }

    fn shutdown(&self) {
        for (client_id, session_id) in self.sessions.iter() {
            tracing::warn!(
                client_id = %client_id,
                session_id = %session_id,
                "Session still open at shutdown"
            );
        }
        if !self.correlation.is_empty() {
            tracing::warn!(
                pending = self.correlation.len(),
                "Replies never sent for recorded correlations"
            );
        }
        self.socket.stop();
        tracing::info!(
            server_id = %self.server_id,
            sent = self.sent,
            received = self.received,
            "Message server stopped"
        );
    }

    /// Process one mailbox message.
    pub async fn handle(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Inbound(frames) => self.handle_inbound(frames).await,
            ServerMessage::Reply {
                response,
                correlation_id,
            } => {
                self.send_message(&response, &correlation_id);
            }
            ServerMessage::Stats(reply) => {
                reply.send(self.stats()).ok();
            }
        }
    }

    /// Validate, decode and dispatch one inbound frame set.
    pub async fn handle_inbound(&mut self, frames: Multipart) {
        self.received += 1;

        let Some((sender, rest)) = frames.split_first() else {
            tracing::error!("Received empty frame set, no peer to answer");
            record_message_rejected(ErrorCode::MalformedFrames.reason());
            return;
        };
        let sender = sender.clone();

        if frames.len() != INBOUND_FRAME_COUNT {
            let error = ProtocolError::malformed_frames(INBOUND_FRAME_COUNT, frames.len());
            self.reject(sender, None, &error);
            return;
        }

        let decoded = match self.codec.decode(rest) {
            Ok(decoded) => decoded,
            Err(error) => {
                self.reject(sender, None, &error);
                return;
            }
        };

        tracing::trace!(
            peer = %peer_label(&sender),
            message_type = decoded.kind.as_str(),
            bytes = decoded.payload.len(),
            received = self.received,
            "Received message"
        );
        record_message_received(decoded.kind.as_str());

        match decoded.kind {
            MessageKind::Request => self.handle_request(sender, &decoded.payload).await,
            MessageKind::Command => self.handle_command(sender, &decoded.payload).await,
            kind @ (MessageKind::Response | MessageKind::Event) => {
                let error = ProtocolError::unknown_message_type(kind.as_str());
                self.reject(sender, None, &error);
            }
        }
    }

    async fn handle_request(&mut self, sender: Bytes, payload: &[u8]) {
        let request = match self.serializers.requests.deserialize(payload) {
            Ok(request) => request,
            Err(e) => {
                let error = ProtocolError::deserialization_failed("Request", e);
                self.reject(sender, None, &error);
                return;
            }
        };

        self.correlation.record(request.id().clone(), sender);

        match request {
            Request::Connect(request) => self.handle_connect(request),
            Request::Disconnect(request) => self.handle_disconnect(request),
            Request::QueryOrder(request) => self.handle_query(request).await,
        }
    }

    fn handle_connect(&mut self, request: Connect) {
        let opened = self.sessions.connect(&request.client_id);
        let message = match &opened {
            SessionOpen::Opened(session_id) => {
                tracing::info!(
                    client_id = %request.client_id,
                    session_id = %session_id,
                    "Session opened"
                );
                format!("{} connected to {}", request.client_id, self.server_id)
            }
            SessionOpen::Existing(session_id) => {
                tracing::warn!(
                    client_id = %request.client_id,
                    session_id = %session_id,
                    "Client already connected, keeping existing session"
                );
                format!("{} already connected to {}", request.client_id, self.server_id)
            }
        };
        update_open_sessions(self.sessions.len());

        let response = Response::Connected(Connected {
            id: MessageId::generate(),
            correlation_id: request.id.clone(),
            server_id: self.server_id.clone(),
            session_id: opened.session_id().clone(),
            message,
            timestamp: Timestamp::now(),
        });
        self.send_message(&response, &request.id);
    }

    fn handle_disconnect(&mut self, request: Disconnect) {
        let session_id = self.sessions.disconnect(&request.client_id);
        let message = match &session_id {
            Some(session_id) => {
                tracing::info!(
                    client_id = %request.client_id,
                    session_id = %session_id,
                    "Session closed"
                );
                format!("{} disconnected from {}", request.client_id, self.server_id)
            }
            None => {
                tracing::warn!(
                    client_id = %request.client_id,
                    "Disconnect from client with no session"
                );
                format!("{} had no session", request.client_id)
            }
        };
        update_open_sessions(self.sessions.len());

        let response = Response::Disconnected(Disconnected {
            id: MessageId::generate(),
            correlation_id: request.id.clone(),
            server_id: self.server_id.clone(),
            session_id,
            message,
            timestamp: Timestamp::now(),
        });
        self.send_message(&response, &request.id);
    }

    async fn handle_query(&mut self, request: QueryOrder) {
        let (reply, rx) = oneshot::channel();
        let query = OrderManagerMessage::Query {
            order_id: request.order_id.clone(),
            reply,
        };

        if self.orders.send(query).await.is_err() {
            let error =
                ProtocolError::new(ErrorCode::QueryUnavailable, "Order manager is not running");
            self.fail_query(&request.id, &error);
            return;
        }

        // The order manager answers asynchronously; the reply re-enters
        // through the mailbox so only this actor touches the socket.
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let QueryOrder { id, order_id, .. } = request;
            let response = match rx.await {
                Ok(Some(order)) => Response::order_status(id.clone(), &order),
                Ok(None) => Response::query_failure(
                    id.clone(),
                    ProtocolError::order_not_found(order_id.as_str()).reason(),
                ),
                Err(_) => Response::query_failure(
                    id.clone(),
                    ProtocolError::new(ErrorCode::QueryUnavailable, "Order manager stopped")
                        .reason(),
                ),
            };
            mailbox
                .send(ServerMessage::Reply {
                    response,
                    correlation_id: id,
                })
                .await
                .ok();
        });
    }

    async fn handle_command(&mut self, sender: Bytes, payload: &[u8]) {
        let command = match self.serializers.commands.deserialize(payload) {
            Ok(command) => command,
            Err(e) => {
                let error = ProtocolError::deserialization_failed("Command", e);
                self.reject(sender, None, &error);
                return;
            }
        };

        let correlation_id = command.id().clone();
        let command_type = command.command_type();
        self.correlation.record(correlation_id.clone(), sender);

        tracing::debug!(
            command_id = %correlation_id,
            command_type,
            trader_id = %command.trader_id(),
            "Command received"
        );

        let response = match self.router.deliver(command).await {
            Ok(()) => Response::message_received(correlation_id.clone(), command_type),
            Err(e) => {
                tracing::error!(
                    command_id = %correlation_id,
                    error = %e,
                    "Failed to route command"
                );
                let error = ProtocolError::new(ErrorCode::RoutingFailed, e.to_string());
                record_message_rejected(error.code().reason());
                Response::message_rejected(Some(correlation_id.clone()), error.reason())
            }
        };
        self.send_message(&response, &correlation_id);
    }

    fn fail_query(&mut self, correlation_id: &MessageId, error: &ProtocolError) {
        tracing::warn!(
            correlation_id = %correlation_id,
            reason = error.code().reason(),
            error = %error,
            "Query failed"
        );
        let response = Response::query_failure(correlation_id.clone(), error.reason());
        self.send_message(&response, correlation_id);
    }

    /// Answer a message that never reached the correlation index.
    fn reject(&mut self, sender: Bytes, correlation_id: Option<MessageId>, error: &ProtocolError) {
        tracing::warn!(
            peer = %peer_label(&sender),
            reason = error.code().reason(),
            error = %error,
            "Rejecting message"
        );
        record_message_rejected(error.code().reason());
        let response = Response::message_rejected(correlation_id, error.reason());
        self.send_to(sender, &response);
    }

    /// Send a reply to whoever sent `correlation_id`, consuming the entry.
    ///
    /// Returns false if there is no entry (already answered, or never
    /// recorded) or the send failed.
    pub fn send_message(&mut self, response: &Response, correlation_id: &MessageId) -> bool {
        let Some(peer) = self.correlation.take(correlation_id) else {
            tracing::error!(
                correlation_id = %correlation_id,
                response_type = response.response_type(),
                "No reply address for correlation id, dropping response"
            );
            return false;
        };
        self.send_to(peer, response)
    }

    fn send_to(&mut self, peer: Bytes, response: &Response) -> bool {
        let payload = match self.serializers.responses.serialize(response) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    response_type = response.response_type(),
                    error = %e,
                    "Failed to serialize response"
                );
                return false;
            }
        };
        let frames = match self.codec.encode(MessageKind::Response, &payload) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::error!(
                    response_type = response.response_type(),
                    error = %e,
                    "Failed to encode response"
                );
                return false;
            }
        };

        let label = peer_label(&peer);
        let mut message = Vec::with_capacity(INBOUND_FRAME_COUNT);
        message.push(peer);
        message.extend(frames);

        match self.socket.send(message) {
            Ok(()) => {
                self.sent += 1;
                tracing::trace!(
                    peer = %label,
                    response_type = response.response_type(),
                    sent = self.sent,
                    "Sent response"
                );
                record_message_sent(response.response_type(), payload.len());
                true
            }
            Err(e) => {
                tracing::warn!(
                    peer = %label,
                    response_type = response.response_type(),
                    error = %e,
                    "Failed to send response"
                );
                false
            }
        }
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> ServerStats {
        ServerStats {
            sent: self.sent,
            received: self.received,
            sessions: self.sessions.len(),
            pending_correlations: self.correlation.len(),
        }
    }

    /// Open sessions.
    #[must_use]
    pub const fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{CancelOrder, Order, OrderSide};
    use crate::domain::shared::{AccountId, ClientId, InstrumentId, OrderId, Quantity, TraderId};
    use crate::infrastructure::transport::TransportError;
    use crate::infrastructure::wire::{MsgPackSerializer, OrderStatusReport};
    use parking_lot::Mutex;

    #[derive(Default, Clone)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<Multipart>>>,
    }

    impl PeerSink for RecordingSink {
        fn send(&self, frames: Multipart) -> Result<(), TransportError> {
            self.sent.lock().push(frames);
            Ok(())
        }

        fn stop(&self) {}
    }

    impl RecordingSink {
        fn responses(&self) -> Vec<(Bytes, Response)> {
            let codec = WireCodec::default();
            self.sent
                .lock()
                .iter()
                .map(|frames| {
                    let decoded = codec.decode(&frames[1..]).unwrap();
                    assert_eq!(decoded.kind, MessageKind::Response);
                    let response: Response = MsgPackSerializer.deserialize(&decoded.payload).unwrap();
                    (frames[0].clone(), response)
                })
                .collect()
        }
    }

    struct Fixture {
        server: MessageServer<mpsc::Sender<TradingCommand>, RecordingSink>,
        sink: RecordingSink,
        commands: mpsc::Receiver<TradingCommand>,
        orders: mpsc::Receiver<OrderManagerMessage>,
        mailbox: mpsc::Receiver<ServerMessage>,
    }

    fn fixture() -> Fixture {
        let sink = RecordingSink::default();
        let (router, commands) = mpsc::channel(16);
        let (orders_tx, orders) = mpsc::channel(16);
        let (mailbox_tx, mailbox) = mpsc::channel(16);
        let server = MessageServer::new(
            ServerId::new("GATEWAY-001"),
            WireCodec::default(),
            Serializers::default(),
            router,
            orders_tx,
            sink.clone(),
            mailbox_tx,
        );
        Fixture {
            server,
            sink,
            commands,
            orders,
            mailbox,
        }
    }

    const PEER: &[u8] = b"\0peer";

    fn inbound<T: serde::Serialize>(kind: MessageKind, message: &T) -> Multipart {
        let payload = rmp_serde::to_vec_named(message).unwrap();
        let mut frames = vec![Bytes::from_static(PEER)];
        frames.extend(WireCodec::default().encode(kind, &payload).unwrap());
        frames
    }

    fn connect(id: &str, client: &str) -> Multipart {
        let request: Request = Connect {
            id: MessageId::new(id),
            client_id: ClientId::new(client),
            timestamp: Timestamp::now(),
        }
        .into();
        inbound(MessageKind::Request, &request)
    }

    fn disconnect(id: &str, client: &str) -> Multipart {
        let request: Request = Disconnect {
            id: MessageId::new(id),
            client_id: ClientId::new(client),
            timestamp: Timestamp::now(),
        }
        .into();
        inbound(MessageKind::Request, &request)
    }

    fn cancel(id: &str) -> TradingCommand {
        CancelOrder {
            id: MessageId::new(id),
            trader_id: TraderId::new("TESTER-000"),
            account_id: AccountId::new("SIM-001"),
            order_id: OrderId::new("O-1"),
            cancel_reason: "NONE".to_string(),
            timestamp: Timestamp::now(),
        }
        .into()
    }

    #[tokio::test]
    async fn connect_mints_one_session_per_client() {
        let mut f = fixture();
        f.server.handle_inbound(connect("M-1", "client-1")).await;
        f.server.handle_inbound(connect("M-2", "client-1")).await;

        let responses = f.sink.responses();
        assert_eq!(responses.len(), 2);
        let sessions: Vec<_> = responses
            .iter()
            .map(|(peer, response)| {
                assert_eq!(&peer[..], PEER);
                match response {
                    Response::Connected(r) => r.session_id.clone(),
                    other => panic!("unexpected response {other:?}"),
                }
            })
            .collect();
        assert_eq!(sessions[0], sessions[1]);
        assert_eq!(f.server.stats().sessions, 1);
        assert_eq!(f.server.stats().pending_correlations, 0);
    }

    #[tokio::test]
    async fn disconnect_without_session_is_acknowledged() {
        let mut f = fixture();
        f.server.handle_inbound(disconnect("M-1", "client-9")).await;

        match &f.sink.responses()[0].1 {
            Response::Disconnected(r) => {
                assert_eq!(r.session_id, None);
                assert_eq!(r.correlation_id.as_str(), "M-1");
                assert!(r.message.contains("no session"));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn disconnect_closes_session() {
        let mut f = fixture();
        f.server.handle_inbound(connect("M-1", "client-1")).await;
        f.server.handle_inbound(disconnect("M-2", "client-1")).await;

        assert!(f.server.sessions().is_empty());
        match &f.sink.responses()[1].1 {
            Response::Disconnected(r) => assert!(r.session_id.is_some()),
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_frame_count_is_rejected_to_sender() {
        let mut f = fixture();
        f.server
            .handle_inbound(vec![Bytes::from_static(PEER), Bytes::from_static(b"Command")])
            .await;

        let responses = f.sink.responses();
        assert_eq!(&responses[0].0[..], PEER);
        match &responses[0].1 {
            Response::MessageRejected(r) => {
                assert_eq!(r.correlation_id, None);
                assert!(r.reason.contains("MALFORMED_FRAMES"));
            }
            other => panic!("unexpected response {other:?}"),
        }
        assert_eq!(f.server.stats().received, 1);
    }

    #[tokio::test]
    async fn empty_frame_set_is_only_logged() {
        let mut f = fixture();
        f.server.handle_inbound(Vec::new()).await;

        assert!(f.sink.sent.lock().is_empty());
        assert_eq!(f.server.stats().received, 1);
    }

    #[tokio::test]
    async fn undecodable_command_is_rejected() {
        let mut f = fixture();
        let mut frames = vec![Bytes::from_static(PEER)];
        frames.extend(
            WireCodec::default()
                .encode(MessageKind::Command, b"not msgpack")
                .unwrap(),
        );
        f.server.handle_inbound(frames).await;

        match &f.sink.responses()[0].1 {
            Response::MessageRejected(r) => assert!(r.reason.contains("DESERIALIZATION_FAILED")),
            other => panic!("unexpected response {other:?}"),
        }
        assert!(f.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn response_frames_are_not_accepted_inbound() {
        let mut f = fixture();
        let response = Response::message_rejected(None, "echo");
        f.server
            .handle_inbound(inbound(MessageKind::Response, &response))
            .await;

        match &f.sink.responses()[0].1 {
            Response::MessageRejected(r) => assert!(r.reason.contains("UNKNOWN_MESSAGE_TYPE")),
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn command_is_routed_then_acknowledged() {
        let mut f = fixture();
        f.server
            .handle_inbound(inbound(MessageKind::Command, &cancel("M-5")))
            .await;

        let routed = f.commands.try_recv().unwrap();
        assert_eq!(routed.id().as_str(), "M-5");
        match &f.sink.responses()[0].1 {
            Response::MessageReceived(r) => {
                assert_eq!(r.correlation_id.as_str(), "M-5");
                assert_eq!(r.received_type, "CancelOrder");
            }
            other => panic!("unexpected response {other:?}"),
        }
        assert_eq!(f.server.stats().sent, 1);
    }

    #[tokio::test]
    async fn correlation_is_consumed_once() {
        let mut f = fixture();
        f.server
            .handle_inbound(inbound(MessageKind::Command, &cancel("M-5")))
            .await;

        let again = Response::message_received(MessageId::new("M-5"), "CancelOrder");
        assert!(!f.server.send_message(&again, &MessageId::new("M-5")));
        assert_eq!(f.server.stats().sent, 1);
    }

    #[tokio::test]
    async fn closed_router_rejects_with_correlation() {
        let mut f = fixture();
        f.commands.close();
        f.server
            .handle_inbound(inbound(MessageKind::Command, &cancel("M-6")))
            .await;

        match &f.sink.responses()[0].1 {
            Response::MessageRejected(r) => {
                assert_eq!(r.correlation_id.as_ref().map(MessageId::as_str), Some("M-6"));
                assert!(r.reason.contains("ROUTING_FAILED"));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn query_reply_returns_through_mailbox() {
        let mut f = fixture();
        let request: Request = QueryOrder {
            id: MessageId::new("M-8"),
            order_id: OrderId::new("O-1"),
            timestamp: Timestamp::now(),
        }
        .into();
        f.server
            .handle_inbound(inbound(MessageKind::Request, &request))
            .await;

        match f.orders.recv().await.unwrap() {
            OrderManagerMessage::Query { order_id, reply } => {
                let order = Order::market(
                    order_id,
                    InstrumentId::new("AUDUSD.FXCM"),
                    OrderSide::Buy,
                    Quantity::from_i64(1000),
                )
                .unwrap();
                reply.send(Some(order)).unwrap();
            }
            other => panic!("unexpected message {other:?}"),
        }

        let reply = f.mailbox.recv().await.unwrap();
        f.server.handle(reply).await;

        match &f.sink.responses()[0].1 {
            Response::OrderStatusReport(OrderStatusReport {
                correlation_id,
                order_id,
                quantity,
                ..
            }) => {
                assert_eq!(correlation_id.as_str(), "M-8");
                assert_eq!(order_id.as_str(), "O-1");
                assert_eq!(*quantity, Quantity::from_i64(1000));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn query_for_unknown_order_fails() {
        let mut f = fixture();
        let request: Request = QueryOrder {
            id: MessageId::new("M-9"),
            order_id: OrderId::new("O-404"),
            timestamp: Timestamp::now(),
        }
        .into();
        f.server
            .handle_inbound(inbound(MessageKind::Request, &request))
            .await;

        if let OrderManagerMessage::Query { reply, .. } = f.orders.recv().await.unwrap() {
            reply.send(None).unwrap();
        }
        let reply = f.mailbox.recv().await.unwrap();
        f.server.handle(reply).await;

        match &f.sink.responses()[0].1 {
            Response::QueryFailure(r) => {
                assert_eq!(r.correlation_id.as_str(), "M-9");
                assert!(r.reason.contains("ORDER_NOT_FOUND"));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn query_with_stopped_order_manager_fails_immediately() {
        let mut f = fixture();
        f.orders.close();
        let request: Request = QueryOrder {
            id: MessageId::new("M-10"),
            order_id: OrderId::new("O-1"),
            timestamp: Timestamp::now(),
        }
        .into();
        f.server
            .handle_inbound(inbound(MessageKind::Request, &request))
            .await;

        match &f.sink.responses()[0].1 {
            Response::QueryFailure(r) => assert!(r.reason.contains("QUERY_UNAVAILABLE")),
            other => panic!("unexpected response {other:?}"),
        }
    }
}
