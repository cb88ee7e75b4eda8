//! Wire Protocol
//!
//! Turns application messages into the frame triple
//! `[typeName][uncompressedSizeI64LE][body]` and back, where
//! `body = cipher.seal(compressor.compress(payload))`.
//!
//! Compression, encryption and serialization are pluggable values chosen at
//! startup; requests, commands and responses each get their own serializer.

pub mod codec;
pub mod compression;
pub mod encryption;
pub mod messages;
pub mod serializer;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use codec::{DecodedMessage, SIZE_HEADER_LEN, WIRE_FRAME_COUNT, WireCodec};
pub use compression::{Compressor, DEFAULT_MAX_DECOMPRESSED_SIZE, Lz4Compressor, NoCompression};
pub use encryption::{ChaChaCipher, Cipher, NoEncryption};
pub use messages::{
    Connect, Connected, Disconnect, Disconnected, MessageKind, MessageReceived, MessageRejected,
    OrderStatusReport, QueryFailure, QueryOrder, Request, Response,
};
pub use serializer::{JsonSerializer, MessageSerializer, MsgPackSerializer};

/// Errors raised while encoding or decoding a message body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Message could not be serialized.
    #[error("Serialization failed: {message}")]
    Serialization {
        /// Error details.
        message: String,
    },

    /// Payload could not be deserialized.
    #[error("Deserialization failed: {message}")]
    Deserialization {
        /// Error details.
        message: String,
    },

    /// Body could not be decompressed.
    #[error("Decompression failed: {message}")]
    Decompression {
        /// Error details.
        message: String,
    },

    /// Body could not be sealed.
    #[error("Encryption failed: {message}")]
    Encryption {
        /// Error details.
        message: String,
    },

    /// Body could not be opened.
    #[error("Decryption failed: {message}")]
    Decryption {
        /// Error details.
        message: String,
    },

    /// Cipher key is unusable.
    #[error("Invalid cipher key: {message}")]
    InvalidKey {
        /// Error details.
        message: String,
    },

    /// Payload length does not fit the size header.
    #[error("Payload of {size} bytes cannot be framed")]
    PayloadTooLarge {
        /// Payload length.
        size: usize,
    },
}

/// Body compression algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    /// Bodies are sent as serialized.
    #[default]
    None,
    /// LZ4 block format with the uncompressed size prepended.
    Lz4,
}

impl CompressionKind {
    /// Build the matching compressor.
    #[must_use]
    pub fn compressor(self) -> Arc<dyn Compressor> {
        match self {
            Self::None => Arc::new(NoCompression),
            Self::Lz4 => Arc::new(Lz4Compressor::default()),
        }
    }
}

/// Payload serialization format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializationFormat {
    /// MessagePack with named fields.
    #[default]
    Msgpack,
    /// JSON, useful when inspecting traffic.
    Json,
}

impl SerializationFormat {
    /// Build a serializer for one message family.
    #[must_use]
    pub fn serializer<T>(self) -> Arc<dyn MessageSerializer<T>>
    where
        T: Serialize + serde::de::DeserializeOwned + 'static,
    {
        match self {
            Self::Msgpack => Arc::new(MsgPackSerializer),
            Self::Json => Arc::new(JsonSerializer),
        }
    }
}
