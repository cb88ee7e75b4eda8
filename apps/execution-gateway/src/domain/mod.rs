//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: Orders and atomic brackets with their invariants
//! - **Value Objects**: Identifiers, prices, quantities, timestamps
//! - **Domain Events**: Broker confirmations applied to orders
//! - **Domain Services**: The status transition table and the order register
//!
//! # Bounded Contexts
//!
//! - [`order_execution`]: Order lifecycle, commands and events
//! - [`shared`]: Types shared across contexts

pub mod order_execution;
pub mod shared;
