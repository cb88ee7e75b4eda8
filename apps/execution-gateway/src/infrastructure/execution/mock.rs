//! Simulated execution client.
//!
//! Records every command it receives. With acknowledgements enabled it also
//! answers each command with the confirmations a well-behaved broker would
//! send, delivered asynchronously to whatever endpoint is attached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::application::ports::{Endpoint, ExecutionClientError, ExecutionClientPort};
use crate::domain::order_execution::{
    AccountInquiry, AccountStateEvent, CancelOrder, ExecutionEvent, ModifyOrder, Order,
    OrderAccepted, OrderCancelled, OrderEvent, OrderModified, OrderSubmitted, OrderWorking,
    SubmitAtomicOrder, SubmitOrder, TradingCommand,
};
use crate::domain::shared::{AccountId, BrokerOrderId, MessageId, OrderId, Timestamp};

/// Cash balance reported for every account inquiry.
const SIMULATED_CASH_BALANCE: i64 = 1_000_000;

/// Execution client that never leaves the process.
#[derive(Debug)]
pub struct MockExecutionClient {
    order_counter: AtomicU64,
    auto_ack: bool,
    commands: Mutex<Vec<TradingCommand>>,
    broker_ids: Mutex<HashMap<OrderId, BrokerOrderId>>,
    events_tx: mpsc::UnboundedSender<ExecutionEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<ExecutionEvent>>>,
}

impl Default for MockExecutionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutionClient {
    /// Client that records commands and confirms nothing.
    #[must_use]
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            order_counter: AtomicU64::new(1),
            auto_ack: false,
            commands: Mutex::new(Vec::new()),
            broker_ids: Mutex::new(HashMap::new()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Client that confirms every command it receives.
    #[must_use]
    pub fn with_auto_ack() -> Self {
        Self {
            auto_ack: true,
            ..Self::new()
        }
    }

    /// Start delivering confirmations to `endpoint`.
    ///
    /// Confirmations produced before attaching are held and delivered first.
    /// Returns false if an endpoint was already attached. Must be called from
    /// within a Tokio runtime.
    pub fn attach<E>(&self, endpoint: E) -> bool
    where
        E: Endpoint<ExecutionEvent> + 'static,
    {
        let Some(mut events) = self.events_rx.lock().take() else {
            tracing::warn!("Execution client already attached");
            return false;
        };

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Err(e) = endpoint.deliver(event).await {
                    tracing::warn!(error = %e, "Confirmation endpoint closed, stopping");
                    break;
                }
            }
        });
        true
    }

    /// Commands received so far, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<TradingCommand> {
        self.commands.lock().clone()
    }

    /// Number of commands received.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.lock().len()
    }

    /// Broker id assigned to an order, once accepted.
    #[must_use]
    pub fn broker_order_id(&self, order_id: &OrderId) -> Option<BrokerOrderId> {
        self.broker_ids.lock().get(order_id).cloned()
    }

    fn record(&self, command: TradingCommand) {
        tracing::debug!(
            command_type = command.command_type(),
            message_id = %command.id(),
            "Mock execution client received command"
        );
        self.commands.lock().push(command);
    }

    fn emit(&self, event: impl Into<ExecutionEvent>) {
        // Receiver only goes away when the client itself is dropped.
        self.events_tx.send(event.into()).ok();
    }

    fn broker_id_for(&self, order_id: &OrderId) -> BrokerOrderId {
        self.broker_ids
            .lock()
            .entry(order_id.clone())
            .or_insert_with(|| {
                let n = self.order_counter.fetch_add(1, Ordering::SeqCst);
                BrokerOrderId::new(format!("broker-{n}"))
            })
            .clone()
    }

    fn acknowledge_new(&self, order: &Order, account_id: &AccountId) {
        let order_id = order.id().clone();
        let broker_order_id = self.broker_id_for(&order_id);

        self.emit(OrderEvent::Submitted(OrderSubmitted {
            id: MessageId::generate(),
            order_id: order_id.clone(),
            account_id: account_id.clone(),
            timestamp: Timestamp::now(),
        }));
        self.emit(OrderEvent::Accepted(OrderAccepted {
            id: MessageId::generate(),
            order_id: order_id.clone(),
            broker_order_id: broker_order_id.clone(),
            timestamp: Timestamp::now(),
        }));
        self.emit(OrderEvent::Working(OrderWorking {
            id: MessageId::generate(),
            order_id,
            broker_order_id,
            price: order.price(),
            quantity: order.quantity(),
            timestamp: Timestamp::now(),
        }));
    }
}

#[async_trait]
impl ExecutionClientPort for MockExecutionClient {
    async fn submit_order(&self, command: SubmitOrder) -> Result<(), ExecutionClientError> {
        if self.auto_ack {
            self.acknowledge_new(&command.order, &command.account_id);
        }
        self.record(command.into());
        Ok(())
    }

    async fn submit_atomic_order(
        &self,
        command: SubmitAtomicOrder,
    ) -> Result<(), ExecutionClientError> {
        if self.auto_ack {
            for leg in command.atomic_order.legs() {
                self.acknowledge_new(leg, &command.account_id);
            }
        }
        self.record(command.into());
        Ok(())
    }

    async fn modify_order(&self, command: ModifyOrder) -> Result<(), ExecutionClientError> {
        if self.auto_ack {
            self.emit(OrderEvent::Modified(OrderModified {
                id: MessageId::generate(),
                order_id: command.order_id.clone(),
                broker_order_id: self.broker_id_for(&command.order_id),
                modified_price: command.modified_price,
                modified_quantity: command.modified_quantity,
                timestamp: Timestamp::now(),
            }));
        }
        self.record(command.into());
        Ok(())
    }

    async fn cancel_order(&self, command: CancelOrder) -> Result<(), ExecutionClientError> {
        if self.auto_ack {
            self.emit(OrderEvent::Cancelled(OrderCancelled {
                id: MessageId::generate(),
                order_id: command.order_id.clone(),
                timestamp: Timestamp::now(),
            }));
        }
        self.record(command.into());
        Ok(())
    }

    async fn account_inquiry(&self, command: AccountInquiry) -> Result<(), ExecutionClientError> {
        if self.auto_ack {
            self.emit(AccountStateEvent {
                id: MessageId::generate(),
                account_id: command.account_id.clone(),
                currency: "USD".to_string(),
                cash_balance: Decimal::new(SIMULATED_CASH_BALANCE, 0),
                margin_used: Decimal::ZERO,
                timestamp: Timestamp::now(),
            });
        }
        self.record(command.into());
        Ok(())
    }
}
