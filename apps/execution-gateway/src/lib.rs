// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Execution Gateway - Rust Core Library
//!
//! Execution-side messaging core for the Cream trading system.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Orders, their status lifecycle, events, commands and the order register
//!
//! - **Application**: Actors and the ports they talk through
//!   - `ports`: `ExecutionClientPort`, `EventPublisherPort`, `Endpoint`
//!   - `services`: `Throttler`, `CommandRouter`, `OrderManager`
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `transport`: Multipart framing over TCP
//!   - `wire`: Frame codec, compression, encryption, serializers, protocol messages
//!   - `server`: Protocol server with sessions and reply correlation
//!   - `publisher`: Event publisher
//!   - `execution`: Simulated execution client
//!   - `config`: Dependency injection container
//!
//! ## Message flow
//!
//! ```text
//! remote client ─► MessageServer ─► CommandRouter (new orders ─► commands) ─► OrderManager ─► ExecutionClient
//!                                                                                  ▲               │
//!                                                 subscribers ◄─ EventPublisher ◄──┴── events ◄────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Actors and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Protocol error codes.
pub mod error;

/// Prometheus metrics.
pub mod observability;

/// Tracing setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use domain::order_execution::{
    ExecutionEvent, Order, OrderEvent, OrderSide, OrderStatus, OrderType, TimeInForce,
    TradingCommand,
};
pub use domain::shared::{ClientId, MessageId, OrderId, Price, Quantity, Timestamp};

pub use application::ports::{Endpoint, EventPublisherPort, ExecutionClientPort};
pub use application::services::{CommandRouter, OrderManager, Throttler};

pub use error::{ErrorCode, ProtocolError};
pub use infrastructure::config::Container;
