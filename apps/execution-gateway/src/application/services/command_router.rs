//! Command Router
//!
//! Two chained throttlers in front of the order manager. New orders pass the
//! stricter new-order gate and then the general command gate; every other
//! command passes the general gate only. New-order throughput can therefore
//! never exceed general throughput.

use std::time::Duration;

use async_trait::async_trait;

use super::throttler::{
    ThrottleConfig, ThrottleError, Throttler, ThrottlerHandle, ThrottlerStats,
};
use crate::application::ports::{Endpoint, SendError};
use crate::domain::order_execution::TradingCommand;

/// Name of the general command throttler.
pub const COMMANDS_THROTTLER: &str = "commands";

/// Name of the new-order throttler.
pub const NEW_ORDERS_THROTTLER: &str = "new_orders";

/// Limits for both lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRouterConfig {
    /// Commands of any kind per interval.
    pub commands_per_interval: usize,
    /// New orders per interval.
    pub new_orders_per_interval: usize,
    /// Refill period shared by both throttlers.
    pub interval: Duration,
}

impl Default for CommandRouterConfig {
    fn default() -> Self {
        Self {
            commands_per_interval: 1000,
            new_orders_per_interval: 100,
            interval: Duration::from_secs(1),
        }
    }
}

impl CommandRouterConfig {
    const fn commands(&self) -> ThrottleConfig {
        ThrottleConfig {
            interval: self.interval,
            limit: self.commands_per_interval,
        }
    }

    const fn new_orders(&self) -> ThrottleConfig {
        ThrottleConfig {
            interval: self.interval,
            limit: self.new_orders_per_interval,
        }
    }
}

/// Queue snapshot of both lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRouterStats {
    /// General command throttler.
    pub commands: ThrottlerStats,
    /// New-order throttler.
    pub new_orders: ThrottlerStats,
}

/// Routes trading commands through the throttler chain.
#[derive(Clone)]
pub struct CommandRouter {
    commands: ThrottlerHandle<TradingCommand>,
    new_orders: ThrottlerHandle<TradingCommand>,
}

impl CommandRouter {
    /// Start both throttlers, feeding `downstream`.
    ///
    /// Nothing is spawned unless both limits are valid.
    ///
    /// # Errors
    ///
    /// Returns error if either limit or the interval is zero.
    pub fn start<D>(config: CommandRouterConfig, downstream: D) -> Result<Self, ThrottleError>
    where
        D: Endpoint<TradingCommand> + 'static,
    {
        config.commands().validate(COMMANDS_THROTTLER)?;
        config.new_orders().validate(NEW_ORDERS_THROTTLER)?;

        let commands =
            Throttler::<TradingCommand, _>::new(COMMANDS_THROTTLER, config.commands(), downstream)?
                .start();
        let new_orders =
            Throttler::new(NEW_ORDERS_THROTTLER, config.new_orders(), commands.clone())?.start();

        tracing::info!(
            commands_per_interval = config.commands_per_interval,
            new_orders_per_interval = config.new_orders_per_interval,
            interval_ms = config.interval.as_millis(),
            "Command router started"
        );

        Ok(Self {
            commands,
            new_orders,
        })
    }

    /// Route one command into the matching lane.
    ///
    /// # Errors
    ///
    /// Returns error if the lane has stopped.
    pub async fn route(&self, command: TradingCommand) -> Result<(), SendError> {
        tracing::debug!(
            command_id = %command.id(),
            command_type = command.command_type(),
            "Routing command"
        );
        if command.is_new_order() {
            self.new_orders.enqueue(command).await
        } else {
            self.commands.enqueue(command).await
        }
    }

    /// Snapshot of both throttlers.
    ///
    /// # Errors
    ///
    /// Returns error if either throttler has stopped.
    pub async fn stats(&self) -> Result<CommandRouterStats, SendError> {
        Ok(CommandRouterStats {
            commands: self.commands.stats().await?,
            new_orders: self.new_orders.stats().await?,
        })
    }

    /// Stop both throttlers.
    pub fn stop(&self) {
        self.new_orders.stop();
        self.commands.stop();
        tracing::info!("Command router stopped");
    }
}

#[async_trait]
impl Endpoint<TradingCommand> for CommandRouter {
    async fn deliver(&self, command: TradingCommand) -> Result<(), SendError> {
        self.route(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{CancelOrder, Order, OrderSide, SubmitOrder};
    use crate::domain::shared::{
        AccountId, InstrumentId, MessageId, OrderId, Quantity, StrategyId, Timestamp, TraderId,
    };
    use tokio::sync::mpsc;

    fn submit(id: &str) -> TradingCommand {
        SubmitOrder {
            id: MessageId::generate(),
            trader_id: TraderId::new("TESTER-000"),
            strategy_id: StrategyId::new("EMA-CROSS"),
            account_id: AccountId::new("SIM-001"),
            order: Order::market(
                OrderId::new(id),
                InstrumentId::new("AUDUSD.FXCM"),
                OrderSide::Buy,
                Quantity::from_i64(1000),
            )
            .unwrap(),
            timestamp: Timestamp::now(),
        }
        .into()
    }

    fn cancel(id: &str) -> TradingCommand {
        CancelOrder {
            id: MessageId::generate(),
            trader_id: TraderId::new("TESTER-000"),
            account_id: AccountId::new("SIM-001"),
            order_id: OrderId::new(id),
            cancel_reason: "NONE".to_string(),
            timestamp: Timestamp::now(),
        }
        .into()
    }

    #[test]
    fn invalid_new_order_limit_spawns_nothing() {
        let (tx, _rx) = mpsc::channel::<TradingCommand>(8);
        let config = CommandRouterConfig {
            new_orders_per_interval: 0,
            ..CommandRouterConfig::default()
        };
        let result = CommandRouter::start(config, tx);
        assert!(matches!(
            result,
            Err(ThrottleError::InvalidLimit { name }) if name == NEW_ORDERS_THROTTLER
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn new_orders_are_capped_below_commands() {
        let (tx, mut rx) = mpsc::channel::<TradingCommand>(64);
        let router = CommandRouter::start(
            CommandRouterConfig {
                commands_per_interval: 5,
                new_orders_per_interval: 2,
                interval: Duration::from_secs(1),
            },
            tx,
        )
        .unwrap();

        for i in 0..4 {
            router.route(submit(&format!("O-{i}"))).await.unwrap();
        }
        router.route(cancel("O-0")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut first_window = Vec::new();
        while let Ok(command) = rx.try_recv() {
            first_window.push(command);
        }
        assert_eq!(first_window.len(), 3);
        assert_eq!(first_window.iter().filter(|c| c.is_new_order()).count(), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let mut second_window = Vec::new();
        while let Ok(command) = rx.try_recv() {
            second_window.push(command);
        }
        assert_eq!(second_window.len(), 2);
        assert!(second_window.iter().all(TradingCommand::is_new_order));

        router.stop();
    }
}
