//! End-to-end tests over real sockets.
//!
//! A dealer connects to the commands socket of a fully wired gateway and a
//! second connection subscribes to the events socket.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use bytes::Bytes;
use execution_gateway::config::Config;
use execution_gateway::domain::order_execution::{ExecutionEvent, OrderStatus, TradingCommand};
use execution_gateway::domain::shared::{ClientId, MessageId, OrderId, Timestamp};
use execution_gateway::infrastructure::config::{Container, wire_codec};
use execution_gateway::infrastructure::transport::{DealerSocket, Multipart, MultipartCodec};
use execution_gateway::infrastructure::wire::{
    CompressionKind, Connect, Disconnect, MessageKind, MessageSerializer, MsgPackSerializer,
    QueryOrder, Request, Response, WireCodec,
};

use common::{limit_order, submit};

struct Client {
    socket: DealerSocket,
    codec: WireCodec,
}

impl Client {
    async fn connect(container: &Container, codec: WireCodec) -> Self {
        let socket = DealerSocket::connect(container.commands_addr(), MultipartCodec::default())
            .await
            .unwrap();
        Self { socket, codec }
    }

    async fn send_request(&mut self, request: Request) {
        let payload = MsgPackSerializer.serialize(&request).unwrap();
        let frames = self.codec.encode(MessageKind::Request, &payload).unwrap();
        self.socket.send(frames).await.unwrap();
    }

    async fn send_command(&mut self, command: &TradingCommand) {
        let payload = MsgPackSerializer.serialize(command).unwrap();
        let frames = self.codec.encode(MessageKind::Command, &payload).unwrap();
        self.socket.send(frames).await.unwrap();
    }

    async fn recv(&mut self) -> Response {
        let frames = recv_frames(&mut self.socket).await;
        let decoded = self.codec.decode(&frames).unwrap();
        assert_eq!(decoded.kind, MessageKind::Response);
        MsgPackSerializer.deserialize(&decoded.payload).unwrap()
    }
}

async fn recv_frames(socket: &mut DealerSocket) -> Multipart {
    tokio::time::timeout(Duration::from_secs(2), socket.recv())
        .await
        .expect("timed out waiting for a message")
        .unwrap()
        .expect("connection closed")
}

fn local_config() -> Config {
    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1".to_string();
    config.server.commands_port = 0;
    config.server.events_port = 0;
    config
}

fn connect_request(client_id: &str) -> Request {
    Connect {
        id: MessageId::generate(),
        client_id: ClientId::new(client_id),
        timestamp: Timestamp::now(),
    }
    .into()
}

fn query_request(order_id: &str) -> Request {
    QueryOrder {
        id: MessageId::generate(),
        order_id: OrderId::new(order_id),
        timestamp: Timestamp::now(),
    }
    .into()
}

#[tokio::test]
async fn test_handshake_is_idempotent_per_client() {
    let container = Container::start(&local_config()).await.unwrap();
    let mut client = Client::connect(&container, WireCodec::default()).await;

    let first = connect_request("CLIENT-1");
    let first_id = first.id().clone();
    client.send_request(first).await;
    let Response::Connected(opened) = client.recv().await else {
        panic!("expected Connected");
    };
    assert_eq!(opened.correlation_id, first_id);
    assert_eq!(opened.server_id.as_str(), "EXECUTION-GATEWAY-001");

    client.send_request(connect_request("CLIENT-1")).await;
    let Response::Connected(again) = client.recv().await else {
        panic!("expected Connected");
    };
    assert_eq!(again.session_id, opened.session_id);

    client
        .send_request(
            Disconnect {
                id: MessageId::generate(),
                client_id: ClientId::new("CLIENT-1"),
                timestamp: Timestamp::now(),
            }
            .into(),
        )
        .await;
    let Response::Disconnected(closed) = client.recv().await else {
        panic!("expected Disconnected");
    };
    assert_eq!(closed.session_id, Some(opened.session_id));

    let stats = container.server().stats().await.unwrap();
    assert_eq!(stats.sessions, 0);
    assert_eq!(stats.received, 3);
    assert_eq!(stats.sent, 3);
    assert_eq!(stats.pending_correlations, 0);
    container.stop();
}

#[tokio::test]
async fn test_command_is_acknowledged_then_queryable() {
    let container = Container::start(&local_config()).await.unwrap();
    let mut client = Client::connect(&container, WireCodec::default()).await;

    let command = submit(limit_order("O-1", 100));
    client.send_command(&command).await;
    let Response::MessageReceived(ack) = client.recv().await else {
        panic!("expected MessageReceived");
    };
    assert_eq!(&ack.correlation_id, command.id());
    assert_eq!(ack.received_type, "SubmitOrder");

    let mut report = None;
    for _ in 0..100 {
        client.send_request(query_request("O-1")).await;
        if let Response::OrderStatusReport(r) = client.recv().await
            && r.status == OrderStatus::Working
        {
            report = Some(r);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let report = report.expect("order never reached WORKING");
    assert_eq!(report.order_id.as_str(), "O-1");
    assert_eq!(container.client().command_count(), 1);
    container.stop();
}

#[tokio::test]
async fn test_query_for_unknown_order_fails() {
    let container = Container::start(&local_config()).await.unwrap();
    let mut client = Client::connect(&container, WireCodec::default()).await;

    let query = query_request("NOPE");
    let query_id = query.id().clone();
    client.send_request(query).await;

    let Response::QueryFailure(failure) = client.recv().await else {
        panic!("expected QueryFailure");
    };
    assert_eq!(failure.correlation_id, query_id);
    assert!(failure.reason.contains("ORDER_NOT_FOUND"));
    container.stop();
}

#[tokio::test]
async fn test_malformed_messages_are_rejected_without_correlation() {
    let container = Container::start(&local_config()).await.unwrap();
    let mut client = Client::connect(&container, WireCodec::default()).await;

    // Two frames instead of three.
    client
        .socket
        .send(vec![Bytes::from_static(b"Command"), Bytes::from_static(b"x")])
        .await
        .unwrap();
    let Response::MessageRejected(rejected) = client.recv().await else {
        panic!("expected MessageRejected");
    };
    assert!(rejected.correlation_id.is_none());
    assert!(rejected.reason.contains("MALFORMED_FRAMES"));

    // Unknown type name.
    client
        .socket
        .send(vec![
            Bytes::from_static(b"Gossip"),
            Bytes::copy_from_slice(&1i64.to_le_bytes()),
            Bytes::from_static(b"x"),
        ])
        .await
        .unwrap();
    let Response::MessageRejected(rejected) = client.recv().await else {
        panic!("expected MessageRejected");
    };
    assert!(rejected.reason.contains("UNKNOWN_MESSAGE_TYPE"));

    // Empty body.
    client
        .socket
        .send(vec![
            Bytes::from_static(b"Command"),
            Bytes::copy_from_slice(&0i64.to_le_bytes()),
            Bytes::new(),
        ])
        .await
        .unwrap();
    let Response::MessageRejected(rejected) = client.recv().await else {
        panic!("expected MessageRejected");
    };
    assert!(rejected.reason.contains("EMPTY_PAYLOAD"));

    let stats = container.server().stats().await.unwrap();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.pending_correlations, 0);
    container.stop();
}

#[tokio::test]
async fn test_events_are_published_to_subscribers() {
    let container = Container::start(&local_config()).await.unwrap();

    let mut subscriber = DealerSocket::connect(container.events_addr(), MultipartCodec::default())
        .await
        .unwrap();
    subscriber
        .send(vec![Bytes::from_static(b"events.order.")])
        .await
        .unwrap();
    let publisher = container.publisher();
    common::eventually(|| {
        let publisher = publisher.clone();
        async move { publisher.subscriber_count() == 1 }
    })
    .await;

    let mut client = Client::connect(&container, WireCodec::default()).await;
    client.send_command(&submit(limit_order("O-7", 100))).await;
    let _ack = client.recv().await;

    let codec = WireCodec::default();
    let mut event_types = Vec::new();
    for _ in 0..3 {
        let frames = recv_frames(&mut subscriber).await;
        assert_eq!(&frames[0][..], b"events.order.O-7");
        let decoded = codec.decode(&frames[1..]).unwrap();
        assert_eq!(decoded.kind, MessageKind::Event);
        let event: ExecutionEvent = MsgPackSerializer.deserialize(&decoded.payload).unwrap();
        event_types.push(event.event_type());
    }
    assert_eq!(
        event_types,
        ["ORDER_SUBMITTED", "ORDER_ACCEPTED", "ORDER_WORKING"]
    );
    container.stop();
}

#[tokio::test]
async fn test_compressed_and_encrypted_round_trip() {
    let mut config = local_config();
    config.wire.compression = CompressionKind::Lz4;
    config.wire.encryption.enabled = true;
    config.wire.encryption.key_hex =
        "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f".to_string();

    let container = Container::start(&config).await.unwrap();
    let codec = wire_codec(&config.wire).unwrap();
    let mut client = Client::connect(&container, codec).await;

    client.send_request(connect_request("CLIENT-SECURE")).await;
    assert!(matches!(client.recv().await, Response::Connected(_)));

    // A plaintext client cannot be understood.
    let mut plain = Client::connect(&container, WireCodec::default()).await;
    plain.send_request(connect_request("CLIENT-PLAIN")).await;
    let frames = recv_frames(&mut plain.socket).await;
    let decoded = wire_codec(&config.wire).unwrap().decode(&frames).unwrap();
    let response: Response = MsgPackSerializer.deserialize(&decoded.payload).unwrap();
    let Response::MessageRejected(rejected) = response else {
        panic!("expected MessageRejected");
    };
    assert!(rejected.reason.contains("DECRYPTION_FAILED"));
    container.stop();
}
