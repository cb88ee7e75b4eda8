//! Order Execution Bounded Context
//!
//! Orders, the commands that create and amend them, and the broker
//! confirmations that drive their lifecycle.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: Owns its state; broker events are applied, never swapped in
//! - **Atomic Orders**: Entry, stop-loss and optional take-profit as one unit
//! - **Commands vs Events**: Commands are top-down intent, events bottom-up confirmation

pub mod aggregate;
pub mod commands;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;

pub use aggregate::{AtomicOrder, Order, OrderParams};
pub use commands::{
    AccountInquiry, CancelOrder, ModifyOrder, SubmitAtomicOrder, SubmitOrder, TradingCommand,
};
pub use errors::OrderError;
pub use events::{
    AccountStateEvent, ExecutionEvent, OrderAccepted, OrderCancelReject, OrderCancelled,
    OrderEvent, OrderExpired, OrderFilled, OrderModified, OrderPartiallyFilled, OrderRejected,
    OrderSubmitted, OrderWorking,
};
pub use services::{OrderRegister, OrderStateMachine};
pub use value_objects::{OrderSide, OrderStatus, OrderType, TimeInForce};
