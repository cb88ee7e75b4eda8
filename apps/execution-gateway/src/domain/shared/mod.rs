//! Shared Domain Types
//!
//! Value objects and errors shared across bounded contexts.

pub mod errors;
pub mod value_objects;

pub use errors::DomainError;
pub use value_objects::{
    AccountId, AtomicOrderId, BrokerOrderId, ClientId, InstrumentId, MessageId, OrderId, Price,
    Quantity, ServerId, SessionId, StrategyId, Timestamp, TraderId,
};
