//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - **Driven Adapters (Outbound)**
//!   - `execution/`: Execution client implementations
//!   - `publisher/`: Event publishing over the events socket
//!
//! - **Driver Adapters (Inbound)**
//!   - `server/`: Protocol server on the commands socket
//!
//! - **Plumbing**
//!   - `transport/`: Multipart framing over TCP, router and dealer sockets
//!   - `wire/`: Frame codec, compression, encryption, serializers and protocol messages
//!   - `config/`: Dependency injection container

pub mod config;
pub mod execution;
pub mod publisher;
pub mod server;
pub mod transport;
pub mod wire;
