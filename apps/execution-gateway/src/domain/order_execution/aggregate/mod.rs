//! Order Aggregate
//!
//! The Order aggregate is the root entity for order lifecycle management;
//! an `AtomicOrder` bundles the legs of a bracket submitted as one unit.

mod atomic_order;
mod order;

pub use atomic_order::AtomicOrder;
pub use order::{Order, OrderParams};
