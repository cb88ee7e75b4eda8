//! Wire format configuration: compression, serialization and encryption.

use serde::{Deserialize, Serialize};

use crate::infrastructure::wire::{CompressionKind, SerializationFormat};

/// Wire configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireConfig {
    /// Body compression.
    #[serde(default)]
    pub compression: CompressionKind,
    /// Payload serializer for requests, commands, responses and events.
    #[serde(default)]
    pub serializer: SerializationFormat,
    /// Body encryption.
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

/// Symmetric encryption of message bodies.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Encrypt bodies with ChaCha20-Poly1305.
    #[serde(default)]
    pub enabled: bool,
    /// 32-byte key, hex encoded.
    #[serde(default)]
    pub key_hex: String,
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("enabled", &self.enabled)
            .field("key_hex", &"<redacted>")
            .finish()
    }
}
