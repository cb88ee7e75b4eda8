//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.
//! Value objects are compared by value, not identity.

mod identifiers;
mod price;
mod quantity;
mod timestamp;

pub use identifiers::{
    AccountId, AtomicOrderId, BrokerOrderId, ClientId, InstrumentId, MessageId, OrderId, ServerId,
    SessionId, StrategyId, TraderId,
};
pub use price::Price;
pub use quantity::Quantity;
pub use timestamp::Timestamp;
