//! Order Execution Domain Services
//!
//! Business logic that doesn't fit in a single aggregate.

mod order_register;
mod order_state_machine;

pub use order_register::OrderRegister;
pub use order_state_machine::OrderStateMachine;
