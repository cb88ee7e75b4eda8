//! Dependency Injection Container
//!
//! Builds the actor graph from configuration and owns the handles:
//!
//! ```text
//! client ──► MessageServer ──► CommandRouter ──► OrderManager ──► ExecutionClient
//!                 ▲                                   │  ▲               │
//!                 └──────────── Query replies ────────┘  └── events ─────┘
//!                                                     │
//!                                                     └──► TcpEventPublisher ──► subscribers
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::application::services::{
    CommandRouter, CommandRouterConfig, OrderManager, OrderManagerHandle, ThrottleError,
};
use crate::config::{Config, WireConfig};
use crate::domain::shared::ServerId;
use crate::infrastructure::execution::MockExecutionClient;
use crate::infrastructure::publisher::{EventPublisherConfig, TcpEventPublisher};
use crate::infrastructure::server::{
    MessageServer, MessageServerConfig, MessageServerHandle, Serializers, ServerError,
};
use crate::infrastructure::transport::TransportError;
use crate::infrastructure::wire::{ChaChaCipher, Cipher, NoEncryption, WireCodec, WireError};

/// Startup failures.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Bind address could not be parsed.
    #[error("Invalid bind address '{address}'")]
    InvalidAddress {
        /// Configured address.
        address: String,
    },

    /// Wire codec could not be built.
    #[error("Wire setup failed: {0}")]
    Wire(#[from] WireError),

    /// Throttle limits were rejected.
    #[error("Throttler setup failed: {0}")]
    Throttle(#[from] ThrottleError),

    /// Commands socket could not be bound.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Events socket could not be bound.
    #[error("Failed to bind events socket: {0}")]
    Publisher(#[source] TransportError),
}

/// Build the compression and encryption pipeline.
///
/// # Errors
///
/// Returns error if encryption is enabled with an unusable key.
pub fn wire_codec(config: &WireConfig) -> Result<WireCodec, WireError> {
    let cipher: Arc<dyn Cipher> = if config.encryption.enabled {
        Arc::new(ChaChaCipher::from_hex(&config.encryption.key_hex)?)
    } else {
        Arc::new(NoEncryption)
    };
    Ok(WireCodec::new(config.compression.compressor(), cipher))
}

/// The running gateway.
pub struct Container {
    client: Arc<MockExecutionClient>,
    publisher: Arc<TcpEventPublisher>,
    order_manager: OrderManagerHandle,
    router: CommandRouter,
    server: MessageServerHandle,
}

impl Container {
    /// Wire and start every actor.
    ///
    /// Actors are started downstream first so nothing is routed to a
    /// component that does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns error if a socket cannot be bound or a setting is unusable.
    pub async fn start(config: &Config) -> Result<Self, ContainerError> {
        let server_config = &config.server;
        let invalid_address = || ContainerError::InvalidAddress {
            address: server_config.bind_address.clone(),
        };
        let commands_addr = server_config
            .commands_addr()
            .map_err(|_| invalid_address())?;
        let events_addr = server_config.events_addr().map_err(|_| invalid_address())?;

        let codec = wire_codec(&config.wire)?;
        let format = config.wire.serializer;

        let publisher = Arc::new(
            TcpEventPublisher::bind(
                EventPublisherConfig {
                    bind_address: events_addr,
                    max_frame_size: server_config.max_frame_size,
                    capacity: server_config.mailbox_capacity,
                },
                codec.clone(),
                format.serializer(),
            )
            .await
            .map_err(ContainerError::Publisher)?,
        );

        let client = Arc::new(MockExecutionClient::with_auto_ack());
        let order_manager = OrderManager::new(Arc::clone(&client), Arc::clone(&publisher))
            .start(server_config.mailbox_capacity);
        client.attach(order_manager.sender());

        let router = match CommandRouter::start(
            CommandRouterConfig {
                commands_per_interval: config.throttling.commands_per_second,
                new_orders_per_interval: config.throttling.new_orders_per_second,
                interval: config.throttling.interval(),
            },
            order_manager.sender(),
        ) {
            Ok(router) => router,
            Err(e) => {
                order_manager.stop();
                publisher.stop();
                return Err(e.into());
            }
        };

        let server = match MessageServer::bind(
            MessageServerConfig {
                server_id: ServerId::new(server_config.server_id.clone()),
                bind_address: commands_addr,
                max_frame_size: server_config.max_frame_size,
                mailbox_capacity: server_config.mailbox_capacity,
            },
            codec,
            Serializers::uniform(format),
            router.clone(),
            order_manager.sender(),
        )
        .await
        {
            Ok(server) => server,
            Err(e) => {
                router.stop();
                order_manager.stop();
                publisher.stop();
                return Err(e.into());
            }
        };

        tracing::info!(
            commands = %server.local_addr(),
            events = %publisher.local_addr(),
            "Execution gateway started"
        );

        Ok(Self {
            client,
            publisher,
            order_manager,
            router,
            server,
        })
    }

    /// Commands socket address.
    #[must_use]
    pub fn commands_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Events socket address.
    #[must_use]
    pub fn events_addr(&self) -> SocketAddr {
        self.publisher.local_addr()
    }

    /// Execution client behind the order manager.
    #[must_use]
    pub fn client(&self) -> Arc<MockExecutionClient> {
        Arc::clone(&self.client)
    }

    /// Order manager handle.
    #[must_use]
    pub fn order_manager(&self) -> OrderManagerHandle {
        self.order_manager.clone()
    }

    /// Command router.
    #[must_use]
    pub fn router(&self) -> CommandRouter {
        self.router.clone()
    }

    /// Message server handle.
    #[must_use]
    pub fn server(&self) -> MessageServerHandle {
        self.server.clone()
    }

    /// Event publisher.
    #[must_use]
    pub fn publisher(&self) -> Arc<TcpEventPublisher> {
        Arc::clone(&self.publisher)
    }

    /// Stop every actor, upstream first.
    pub fn stop(&self) {
        self.server.stop();
        self.router.stop();
        self.order_manager.stop();
        self.publisher.stop();
        tracing::info!("Execution gateway stopped");
    }
}
