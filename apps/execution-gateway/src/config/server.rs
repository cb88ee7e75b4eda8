//! Server configuration for the commands and events sockets.

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Identifier reported to clients in `Connected`.
    #[serde(default = "default_server_id")]
    pub server_id: String,
    /// Bind address for both sockets.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port receiving requests and commands.
    #[serde(default = "default_commands_port")]
    pub commands_port: u16,
    /// Port publishing execution events.
    #[serde(default = "default_events_port")]
    pub events_port: u16,
    /// Largest frame accepted on either socket, in bytes.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    /// Mailbox capacity of each actor.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_id: default_server_id(),
            bind_address: default_bind_address(),
            commands_port: default_commands_port(),
            events_port: default_events_port(),
            max_frame_size: default_max_frame_size(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

impl ServerConfig {
    /// Parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `bind_address` is not an IP address.
    pub fn bind_ip(&self) -> Result<IpAddr, std::net::AddrParseError> {
        self.bind_address.parse()
    }

    /// Commands socket address.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `bind_address` is not an IP address.
    pub fn commands_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        Ok(SocketAddr::new(self.bind_ip()?, self.commands_port))
    }

    /// Events socket address.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `bind_address` is not an IP address.
    pub fn events_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        Ok(SocketAddr::new(self.bind_ip()?, self.events_port))
    }
}

fn default_server_id() -> String {
    "EXECUTION-GATEWAY-001".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

pub(crate) const fn default_commands_port() -> u16 {
    55555
}

pub(crate) const fn default_events_port() -> u16 {
    55556
}

const fn default_max_frame_size() -> usize {
    1024 * 1024
}

const fn default_mailbox_capacity() -> usize {
    4096
}
