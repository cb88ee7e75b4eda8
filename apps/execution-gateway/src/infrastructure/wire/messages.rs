//! Protocol messages: the type header, session requests and server responses.
//!
//! Trading commands travel as `TradingCommand` under the `Command` type
//! header; everything else a client can say is a `Request`.

use serde::{Deserialize, Serialize};

use crate::domain::order_execution::{Order, OrderStatus};
use crate::domain::shared::{
    ClientId, MessageId, OrderId, Price, Quantity, ServerId, SessionId, Timestamp,
};

/// Message family carried in the type frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Session or query request from a client.
    Request,
    /// Trading command from a client.
    Command,
    /// Reply from the server.
    Response,
    /// Published execution event.
    Event,
}

impl MessageKind {
    /// Type frame text.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "Request",
            Self::Command => "Command",
            Self::Response => "Response",
            Self::Event => "Event",
        }
    }

    /// Parse a type frame.
    #[must_use]
    pub fn parse(frame: &[u8]) -> Option<Self> {
        match frame {
            b"Request" => Some(Self::Request),
            b"Command" => Some(Self::Command),
            b"Response" => Some(Self::Response),
            b"Event" => Some(Self::Event),
            _ => None,
        }
    }

    /// Returns true for kinds a client may send to the server.
    #[must_use]
    pub const fn is_inbound(&self) -> bool {
        matches!(self, Self::Request | Self::Command)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Open a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connect {
    /// Request ID.
    pub id: MessageId,
    /// Client identifier; sessions are keyed by it.
    pub client_id: ClientId,
    /// When the request was created.
    pub timestamp: Timestamp,
}

/// Close a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disconnect {
    /// Request ID.
    pub id: MessageId,
    /// Client identifier.
    pub client_id: ClientId,
    /// When the request was created.
    pub timestamp: Timestamp,
}

/// Ask for the current state of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOrder {
    /// Request ID.
    pub id: MessageId,
    /// Order to report.
    pub order_id: OrderId,
    /// When the request was created.
    pub timestamp: Timestamp,
}

/// Any request a client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// Open a session.
    Connect(Connect),
    /// Close a session.
    Disconnect(Disconnect),
    /// Order status query.
    QueryOrder(QueryOrder),
}

impl Request {
    /// Get the request ID.
    #[must_use]
    pub const fn id(&self) -> &MessageId {
        match self {
            Self::Connect(r) => &r.id,
            Self::Disconnect(r) => &r.id,
            Self::QueryOrder(r) => &r.id,
        }
    }

    /// Get the request type name.
    #[must_use]
    pub const fn request_type(&self) -> &'static str {
        match self {
            Self::Connect(_) => "Connect",
            Self::Disconnect(_) => "Disconnect",
            Self::QueryOrder(_) => "QueryOrder",
        }
    }
}

impl From<Connect> for Request {
    fn from(request: Connect) -> Self {
        Self::Connect(request)
    }
}

impl From<Disconnect> for Request {
    fn from(request: Disconnect) -> Self {
        Self::Disconnect(request)
    }
}

impl From<QueryOrder> for Request {
    fn from(request: QueryOrder) -> Self {
        Self::QueryOrder(request)
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Session opened (or already open).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connected {
    /// Response ID.
    pub id: MessageId,
    /// ID of the `Connect` request.
    pub correlation_id: MessageId,
    /// Gateway instance.
    pub server_id: ServerId,
    /// Session of the client.
    pub session_id: SessionId,
    /// Human-readable outcome.
    pub message: String,
    /// When the response was created.
    pub timestamp: Timestamp,
}

/// Session closed, or there was none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disconnected {
    /// Response ID.
    pub id: MessageId,
    /// ID of the `Disconnect` request.
    pub correlation_id: MessageId,
    /// Gateway instance.
    pub server_id: ServerId,
    /// Closed session, absent if the client had none.
    pub session_id: Option<SessionId>,
    /// Human-readable outcome.
    pub message: String,
    /// When the response was created.
    pub timestamp: Timestamp,
}

/// A command was decoded and accepted for routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceived {
    /// Response ID.
    pub id: MessageId,
    /// ID of the accepted command.
    pub correlation_id: MessageId,
    /// Type of the accepted message.
    pub received_type: String,
    /// When the response was created.
    pub timestamp: Timestamp,
}

/// An inbound frame set could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRejected {
    /// Response ID.
    pub id: MessageId,
    /// ID of the rejected message, if it got far enough to have one.
    pub correlation_id: Option<MessageId>,
    /// Why it was rejected.
    pub reason: String,
    /// When the response was created.
    pub timestamp: Timestamp,
}

/// A well-formed request could not be answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailure {
    /// Response ID.
    pub id: MessageId,
    /// ID of the failed request.
    pub correlation_id: MessageId,
    /// Why it failed.
    pub reason: String,
    /// When the response was created.
    pub timestamp: Timestamp,
}

/// Current state of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    /// Response ID.
    pub id: MessageId,
    /// ID of the `QueryOrder` request.
    pub correlation_id: MessageId,
    /// Order ID.
    pub order_id: OrderId,
    /// Order status.
    pub status: OrderStatus,
    /// Working price, if priced.
    pub price: Option<Price>,
    /// Order quantity.
    pub quantity: Quantity,
    /// Quantity filled so far.
    pub filled_quantity: Quantity,
    /// When the response was created.
    pub timestamp: Timestamp,
}

/// Any reply the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    /// Session opened.
    Connected(Connected),
    /// Session closed.
    Disconnected(Disconnected),
    /// Command accepted.
    MessageReceived(MessageReceived),
    /// Inbound message rejected.
    MessageRejected(MessageRejected),
    /// Request failed.
    QueryFailure(QueryFailure),
    /// Order status.
    OrderStatusReport(OrderStatusReport),
}

impl Response {
    /// Acknowledge an accepted message.
    #[must_use]
    pub fn message_received(correlation_id: MessageId, received_type: impl Into<String>) -> Self {
        Self::MessageReceived(MessageReceived {
            id: MessageId::generate(),
            correlation_id,
            received_type: received_type.into(),
            timestamp: Timestamp::now(),
        })
    }

    /// Reject an inbound message.
    #[must_use]
    pub fn message_rejected(correlation_id: Option<MessageId>, reason: impl Into<String>) -> Self {
        Self::MessageRejected(MessageRejected {
            id: MessageId::generate(),
            correlation_id,
            reason: reason.into(),
            timestamp: Timestamp::now(),
        })
    }

    /// Fail a request.
    #[must_use]
    pub fn query_failure(correlation_id: MessageId, reason: impl Into<String>) -> Self {
        Self::QueryFailure(QueryFailure {
            id: MessageId::generate(),
            correlation_id,
            reason: reason.into(),
            timestamp: Timestamp::now(),
        })
    }

    /// Report an order's state.
    #[must_use]
    pub fn order_status(correlation_id: MessageId, order: &Order) -> Self {
        Self::OrderStatusReport(OrderStatusReport {
            id: MessageId::generate(),
            correlation_id,
            order_id: order.id().clone(),
            status: order.status(),
            price: order.price(),
            quantity: order.quantity(),
            filled_quantity: order.filled_quantity(),
            timestamp: Timestamp::now(),
        })
    }

    /// Get the response ID.
    #[must_use]
    pub const fn id(&self) -> &MessageId {
        match self {
            Self::Connected(r) => &r.id,
            Self::Disconnected(r) => &r.id,
            Self::MessageReceived(r) => &r.id,
            Self::MessageRejected(r) => &r.id,
            Self::QueryFailure(r) => &r.id,
            Self::OrderStatusReport(r) => &r.id,
        }
    }

    /// Get the ID of the message this answers.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&MessageId> {
        match self {
            Self::Connected(r) => Some(&r.correlation_id),
            Self::Disconnected(r) => Some(&r.correlation_id),
            Self::MessageReceived(r) => Some(&r.correlation_id),
            Self::MessageRejected(r) => r.correlation_id.as_ref(),
            Self::QueryFailure(r) => Some(&r.correlation_id),
            Self::OrderStatusReport(r) => Some(&r.correlation_id),
        }
    }

    /// Get the response type name.
    #[must_use]
    pub const fn response_type(&self) -> &'static str {
        match self {
            Self::Connected(_) => "Connected",
            Self::Disconnected(_) => "Disconnected",
            Self::MessageReceived(_) => "MessageReceived",
            Self::MessageRejected(_) => "MessageRejected",
            Self::QueryFailure(_) => "QueryFailure",
            Self::OrderStatusReport(_) => "OrderStatusReport",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(MessageKind::Request)]
    #[test_case(MessageKind::Command)]
    #[test_case(MessageKind::Response)]
    #[test_case(MessageKind::Event)]
    fn kind_parses_its_own_name(kind: MessageKind) {
        assert_eq!(MessageKind::parse(kind.as_str().as_bytes()), Some(kind));
    }

    #[test]
    fn unknown_kind_is_none() {
        assert_eq!(MessageKind::parse(b"command"), None);
        assert_eq!(MessageKind::parse(b""), None);
    }

    #[test]
    fn only_requests_and_commands_are_inbound() {
        assert!(MessageKind::Request.is_inbound());
        assert!(MessageKind::Command.is_inbound());
        assert!(!MessageKind::Response.is_inbound());
        assert!(!MessageKind::Event.is_inbound());
    }

    #[test]
    fn request_serde_is_tagged() {
        let request: Request = Connect {
            id: MessageId::new("M-1"),
            client_id: ClientId::new("client-1"),
            timestamp: Timestamp::now(),
        }
        .into();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "CONNECT");
        assert_eq!(json["client_id"], "client-1");
        assert_eq!(request.request_type(), "Connect");
        assert_eq!(request.id().as_str(), "M-1");
    }

    #[test]
    fn rejection_may_lack_correlation() {
        let response = Response::message_rejected(None, "bad frames");
        assert_eq!(response.correlation_id(), None);
        assert_eq!(response.response_type(), "MessageRejected");
    }

    #[test]
    fn received_carries_correlation() {
        let response = Response::message_received(MessageId::new("M-7"), "SubmitOrder");
        assert_eq!(response.correlation_id().unwrap().as_str(), "M-7");
        match response {
            Response::MessageReceived(r) => assert_eq!(r.received_type, "SubmitOrder"),
            other => panic!("unexpected response {other:?}"),
        }
    }
}
