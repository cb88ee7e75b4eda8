//! Execution client adapters.
//!
//! Broker connectivity sits behind `ExecutionClientPort`. Only the simulated
//! client ships with the gateway.

mod mock;

pub use mock::MockExecutionClient;
