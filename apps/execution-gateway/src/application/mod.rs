//! Application Layer
//!
//! The application layer drives the domain through long-lived actors.
//! It defines:
//!
//! - **Ports**: Interfaces for the broker adapter, the event publisher and actor endpoints
//! - **Services**: Throttlers, the command router and the order manager

pub mod ports;
pub mod services;

pub use ports::*;
pub use services::*;
