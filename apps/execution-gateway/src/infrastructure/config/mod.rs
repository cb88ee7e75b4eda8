//! Dependency wiring.

mod container;

pub use container::{Container, ContainerError, wire_codec};
