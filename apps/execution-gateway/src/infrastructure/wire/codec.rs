//! Frame codec: `[typeName][uncompressedSizeI64LE][body]`.

use std::sync::Arc;

use bytes::Bytes;

use super::compression::{Compressor, NoCompression};
use super::encryption::{Cipher, NoEncryption};
use super::messages::MessageKind;
use super::WireError;
use crate::error::{ErrorCode, ProtocolError};

/// Frames produced per message, excluding the address or topic frame.
pub const WIRE_FRAME_COUNT: usize = 3;

/// Length of the uncompressed-size header.
pub const SIZE_HEADER_LEN: usize = 8;

/// A decoded message body awaiting deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Message family from the type frame.
    pub kind: MessageKind,
    /// Decrypted, decompressed payload.
    pub payload: Vec<u8>,
}

/// Compression and encryption pipeline shared by server and publisher.
#[derive(Debug, Clone)]
pub struct WireCodec {
    compressor: Arc<dyn Compressor>,
    cipher: Arc<dyn Cipher>,
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new(Arc::new(NoCompression), Arc::new(NoEncryption))
    }
}

impl WireCodec {
    /// Create a codec.
    #[must_use]
    pub fn new(compressor: Arc<dyn Compressor>, cipher: Arc<dyn Cipher>) -> Self {
        Self { compressor, cipher }
    }

    /// Compressor name.
    #[must_use]
    pub fn compression(&self) -> &'static str {
        self.compressor.name()
    }

    /// Cipher name.
    #[must_use]
    pub fn encryption(&self) -> &'static str {
        self.cipher.name()
    }

    /// Encode a serialized payload into its three frames.
    ///
    /// # Errors
    ///
    /// Returns error if the payload cannot be sealed.
    pub fn encode(&self, kind: MessageKind, payload: &[u8]) -> Result<Vec<Bytes>, WireError> {
        let size = i64::try_from(payload.len()).map_err(|_| WireError::PayloadTooLarge {
            size: payload.len(),
        })?;
        let body = self.cipher.seal(&self.compressor.compress(payload))?;

        Ok(vec![
            Bytes::from_static(kind.as_str().as_bytes()),
            Bytes::copy_from_slice(&size.to_le_bytes()),
            Bytes::from(body),
        ])
    }

    /// Decode the three frames following the address frame.
    ///
    /// A size header that disagrees with the restored payload is logged and
    /// the payload is still returned.
    ///
    /// # Errors
    ///
    /// Returns the protocol error to reject the message with.
    pub fn decode(&self, frames: &[Bytes]) -> Result<DecodedMessage, ProtocolError> {
        let [type_frame, size_frame, body] = frames else {
            return Err(ProtocolError::malformed_frames(
                WIRE_FRAME_COUNT,
                frames.len(),
            ));
        };

        let kind = MessageKind::parse(type_frame).ok_or_else(|| {
            ProtocolError::unknown_message_type(&String::from_utf8_lossy(type_frame))
        })?;

        let size_bytes: [u8; SIZE_HEADER_LEN] =
            size_frame.as_ref().try_into().map_err(|_| {
                ProtocolError::new(
                    ErrorCode::InvalidSizeHeader,
                    format!(
                        "Size header is {} bytes, expected {SIZE_HEADER_LEN}",
                        size_frame.len()
                    ),
                )
            })?;
        let declared = i64::from_le_bytes(size_bytes);
        let expected = usize::try_from(declared).map_err(|_| {
            ProtocolError::new(
                ErrorCode::InvalidSizeHeader,
                format!("Size header is negative ({declared})"),
            )
        })?;

        if body.is_empty() {
            return Err(ProtocolError::new(
                ErrorCode::EmptyPayload,
                "Body frame is empty",
            )
            .with_context("type", kind.as_str()));
        }

        let compressed = self
            .cipher
            .open(body)
            .map_err(|e| ProtocolError::new(ErrorCode::DecryptionFailed, e.to_string()))?;
        let payload = self
            .compressor
            .decompress(&compressed)
            .map_err(|e| ProtocolError::new(ErrorCode::DecompressionFailed, e.to_string()))?;

        if payload.len() != expected {
            tracing::warn!(
                message_type = kind.as_str(),
                expected,
                actual = payload.len(),
                "Payload size does not match size header"
            );
        }

        Ok(DecodedMessage { kind, payload })
    }
}
