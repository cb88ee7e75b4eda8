//! Protocol error taxonomy for the execution gateway.
//!
//! Recoverable protocol failures are never thrown across the server loop.
//! They are turned into a `ProtocolError`, whose rendered text becomes the
//! `reason` of a `MessageRejected` or `QueryFailure` reply.
//!
//! | Reason | Reply | Cause |
//! |--------|-------|-------|
//! | `MALFORMED_FRAMES` | `MessageRejected` | Wrong frame count |
//! | `UNKNOWN_MESSAGE_TYPE` | `MessageRejected` | Type frame not accepted inbound |
//! | `INVALID_SIZE_HEADER` | `MessageRejected` | Size frame not 8 bytes or negative |
//! | `EMPTY_PAYLOAD` | `MessageRejected` | Body frame empty |
//! | `DECRYPTION_FAILED` | `MessageRejected` | Cipher could not open the body |
//! | `DECOMPRESSION_FAILED` | `MessageRejected` | Compressor could not inflate the body |
//! | `DESERIALIZATION_FAILED` | `MessageRejected` | Serializer could not decode the payload |
//! | `ROUTING_FAILED` | `MessageRejected` | Command router has stopped |
//! | `ORDER_NOT_FOUND` | `QueryFailure` | Query for an unknown order |
//! | `QUERY_UNAVAILABLE` | `QueryFailure` | Order manager has stopped |

use serde::{Deserialize, Serialize};

/// Error codes for protocol rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Framing
    /// Frame set does not have the expected number of frames.
    MalformedFrames,
    /// Type frame names no inbound message kind.
    UnknownMessageType,
    /// Size header is not an 8-byte non-negative integer.
    InvalidSizeHeader,
    /// Body frame is empty.
    EmptyPayload,

    // Body pipeline
    /// Body could not be decrypted.
    DecryptionFailed,
    /// Body could not be decompressed.
    DecompressionFailed,
    /// Payload could not be deserialized.
    DeserializationFailed,

    // Downstream
    /// Command could not be handed to the router.
    RoutingFailed,
    /// Order not found.
    OrderNotFound,
    /// Order manager is not answering queries.
    QueryUnavailable,
}

impl ErrorCode {
    /// Get the stable reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MalformedFrames => "MALFORMED_FRAMES",
            Self::UnknownMessageType => "UNKNOWN_MESSAGE_TYPE",
            Self::InvalidSizeHeader => "INVALID_SIZE_HEADER",
            Self::EmptyPayload => "EMPTY_PAYLOAD",
            Self::DecryptionFailed => "DECRYPTION_FAILED",
            Self::DecompressionFailed => "DECOMPRESSION_FAILED",
            Self::DeserializationFailed => "DESERIALIZATION_FAILED",
            Self::RoutingFailed => "ROUTING_FAILED",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::QueryUnavailable => "QUERY_UNAVAILABLE",
        }
    }

    /// Returns true for failures of a well-formed request, answered with
    /// `QueryFailure` rather than `MessageRejected`.
    #[must_use]
    pub const fn is_query_failure(&self) -> bool {
        matches!(self, Self::OrderNotFound | Self::QueryUnavailable)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// A protocol failure with context, rendered into a rejection reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    /// Error code.
    code: ErrorCode,
    /// Human-readable message.
    message: String,
    /// Additional context (key-value pairs).
    context: Vec<(String, String)>,
}

impl ProtocolError {
    /// Create a new protocol error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Add context to the error.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the context.
    #[must_use]
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// Render as the `reason` text of a reply.
    #[must_use]
    pub fn reason(&self) -> String {
        if self.context.is_empty() {
            return self.to_string();
        }
        let context = self
            .context
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{self} ({context})")
    }
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.reason(), self.message)
    }
}

impl std::error::Error for ProtocolError {}

/// Convenience constructors for common errors.
impl ProtocolError {
    /// Wrong number of frames.
    #[must_use]
    pub fn malformed_frames(expected: usize, actual: usize) -> Self {
        Self::new(
            ErrorCode::MalformedFrames,
            format!("Expected {expected} frames, received {actual}"),
        )
    }

    /// Unrecognized type frame.
    #[must_use]
    pub fn unknown_message_type(type_name: &str) -> Self {
        Self::new(
            ErrorCode::UnknownMessageType,
            format!("Message type '{type_name}' is not accepted"),
        )
    }

    /// Payload could not be deserialized.
    #[must_use]
    pub fn deserialization_failed(type_name: &str, detail: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::DeserializationFailed,
            format!("Could not deserialize {type_name}: {detail}"),
        )
    }

    /// Order not found.
    #[must_use]
    pub fn order_not_found(order_id: &str) -> Self {
        Self::new(
            ErrorCode::OrderNotFound,
            format!("Order {order_id} not found"),
        )
        .with_context("order_id", order_id)
    }
}
