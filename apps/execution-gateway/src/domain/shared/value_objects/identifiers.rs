//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different contexts (an order id is
//! never accepted where a message id is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(OrderId, "Unique client-side identifier for an order.");
define_id!(
    AtomicOrderId,
    "Identifier for a bracket (entry + stop-loss + optional take-profit)."
);
define_id!(BrokerOrderId, "Broker's unique identifier for an order.");
define_id!(InstrumentId, "Identifier for a tradeable instrument.");
define_id!(TraderId, "Identifier of the trader owning orders.");
define_id!(StrategyId, "Identifier of a strategy within a trader.");
define_id!(AccountId, "Identifier of a brokerage account.");
define_id!(ClientId, "Identifier a remote client presents in its handshake.");
define_id!(SessionId, "Identifier of a logical client session.");
define_id!(ServerId, "Identifier of this gateway instance.");
define_id!(
    MessageId,
    "Identifier of a command, request or response; doubles as the correlation id."
);
