//! Payload serializers.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::WireError;

/// Serializer slot for one message family.
pub trait MessageSerializer<T>: Send + Sync {
    /// Format name for logs.
    fn name(&self) -> &'static str;

    /// Encode a message.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be encoded.
    fn serialize(&self, message: &T) -> Result<Vec<u8>, WireError>;

    /// Decode a message.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid message.
    fn deserialize(&self, bytes: &[u8]) -> Result<T, WireError>;
}

/// MessagePack with named fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackSerializer;

impl<T> MessageSerializer<T> for MsgPackSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn serialize(&self, message: &T) -> Result<Vec<u8>, WireError> {
        rmp_serde::to_vec_named(message).map_err(|e| WireError::Serialization {
            message: e.to_string(),
        })
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, WireError> {
        rmp_serde::from_slice(bytes).map_err(|e| WireError::Deserialization {
            message: e.to_string(),
        })
    }
}

/// JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl<T> MessageSerializer<T> for JsonSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, message: &T) -> Result<Vec<u8>, WireError> {
        serde_json::to_vec(message).map_err(|e| WireError::Serialization {
            message: e.to_string(),
        })
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, WireError> {
        serde_json::from_slice(bytes).map_err(|e| WireError::Deserialization {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{CancelOrder, TradingCommand};
    use crate::domain::shared::{AccountId, MessageId, OrderId, Timestamp, TraderId};

    fn cancel() -> TradingCommand {
        CancelOrder {
            id: MessageId::new("M-1"),
            trader_id: TraderId::new("TESTER-000"),
            account_id: AccountId::new("SIM-001"),
            order_id: OrderId::new("O-1"),
            cancel_reason: "EXPIRED_SIGNAL".to_string(),
            timestamp: Timestamp::now(),
        }
        .into()
    }

    #[test]
    fn msgpack_decodes_commands() {
        let command = cancel();
        let bytes = MessageSerializer::<TradingCommand>::serialize(&MsgPackSerializer, &command)
            .unwrap();
        let decoded: TradingCommand = MsgPackSerializer.deserialize(&bytes).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn json_decodes_commands() {
        let command = cancel();
        let bytes =
            MessageSerializer::<TradingCommand>::serialize(&JsonSerializer, &command).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("\"CANCEL_ORDER\""));

        let decoded: TradingCommand = JsonSerializer.deserialize(&bytes).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn garbage_is_a_deserialization_error() {
        let result: Result<TradingCommand, _> = MsgPackSerializer.deserialize(&[0xc1, 0x00]);
        assert!(matches!(result, Err(WireError::Deserialization { .. })));
    }
}
