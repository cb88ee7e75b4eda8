//! Execution Client Port (Driven Port)
//!
//! Interface to the broker connectivity adapter. Calls only hand commands
//! over; confirmations come back asynchronously as `ExecutionEvent`s.

use async_trait::async_trait;

use crate::domain::order_execution::{
    AccountInquiry, CancelOrder, ModifyOrder, SubmitAtomicOrder, SubmitOrder,
};

/// Execution client error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutionClientError {
    /// Broker session is down.
    #[error("Execution client disconnected: {message}")]
    Disconnected {
        /// Error details.
        message: String,
    },

    /// The adapter refused the command before sending it.
    #[error("Command refused by execution client: {reason}")]
    Refused {
        /// Refusal reason.
        reason: String,
    },

    /// Rate limited by the broker.
    #[error("Rate limited by broker")]
    RateLimited,

    /// Unknown error.
    #[error("Execution client error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

/// Port for sending trading commands to the broker.
#[async_trait]
pub trait ExecutionClientPort: Send + Sync {
    /// Send a new order.
    async fn submit_order(&self, command: SubmitOrder) -> Result<(), ExecutionClientError>;

    /// Send all legs of a bracket as one unit.
    async fn submit_atomic_order(
        &self,
        command: SubmitAtomicOrder,
    ) -> Result<(), ExecutionClientError>;

    /// Amend a working order.
    async fn modify_order(&self, command: ModifyOrder) -> Result<(), ExecutionClientError>;

    /// Cancel an order.
    async fn cancel_order(&self, command: CancelOrder) -> Result<(), ExecutionClientError>;

    /// Request account state.
    async fn account_inquiry(&self, command: AccountInquiry) -> Result<(), ExecutionClientError>;
}
