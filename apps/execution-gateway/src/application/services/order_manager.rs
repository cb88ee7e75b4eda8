//! Order Manager Service
//!
//! Single authority between trading commands (top-down intent) and broker
//! events (bottom-up confirmation). Runs as one actor owning the order book,
//! the per-order modify cache and the buffers for commands that race ahead
//! of their order's submission.
//!
//! # Invariants
//!
//! - Order ids are unique for the lifetime of the book; duplicates are rejected.
//! - At most one modification per order is in flight at the broker.
//! - Commands for unknown orders are buffered; events for unknown orders are errors.
//! - Every event applied to a known order is republished.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{EventPublisherPort, ExecutionClientPort, SendError};
use crate::domain::order_execution::{
    AccountInquiry, CancelOrder, ExecutionEvent, ModifyOrder, Order, OrderEvent, OrderRegister,
    SubmitAtomicOrder, SubmitOrder, TradingCommand,
};
use crate::domain::shared::{OrderId, Price, StrategyId, TraderId};
use crate::observability::{
    record_command_buffered, record_command_forwarded, record_event_published,
    update_order_partitions,
};

/// Default mailbox capacity for the order manager.
pub const DEFAULT_ORDER_MANAGER_MAILBOX: usize = 4096;

/// Mailbox messages of the order manager.
#[derive(Debug)]
pub enum OrderManagerMessage {
    /// A throttled trading command.
    Command(TradingCommand),
    /// A confirmation from the execution client.
    Event(ExecutionEvent),
    /// Look up an order's current state.
    Query {
        /// Order to look up.
        order_id: OrderId,
        /// Where to send the result.
        reply: oneshot::Sender<Option<Order>>,
    },
    /// Report book and buffer sizes.
    Snapshot(oneshot::Sender<OrderManagerSnapshot>),
}

impl From<TradingCommand> for OrderManagerMessage {
    fn from(command: TradingCommand) -> Self {
        Self::Command(command)
    }
}

impl From<ExecutionEvent> for OrderManagerMessage {
    fn from(event: ExecutionEvent) -> Self {
        Self::Event(event)
    }
}

impl From<OrderEvent> for OrderManagerMessage {
    fn from(event: OrderEvent) -> Self {
        Self::Event(event.into())
    }
}

/// Sizes of the book, partitions and buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderManagerSnapshot {
    /// Orders ever registered.
    pub orders: usize,
    /// Orders accepted and not yet complete.
    pub active: usize,
    /// Orders in a terminal state.
    pub completed: usize,
    /// Modifies waiting for their order to be submitted.
    pub buffered_modifies: usize,
    /// Cancels waiting for their order to be submitted.
    pub buffered_cancels: usize,
    /// Modifies queued or in flight across all orders.
    pub pending_modifies: usize,
}

/// Handle to a running order manager.
#[derive(Clone)]
pub struct OrderManagerHandle {
    sender: mpsc::Sender<OrderManagerMessage>,
    shutdown: CancellationToken,
}

impl OrderManagerHandle {
    /// Mailbox sender, usable as an endpoint for commands and events.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<OrderManagerMessage> {
        self.sender.clone()
    }

    /// Look up an order.
    ///
    /// # Errors
    ///
    /// Returns error if the order manager has stopped.
    pub async fn query(&self, order_id: OrderId) -> Result<Option<Order>, SendError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(OrderManagerMessage::Query { order_id, reply })
            .await
            .map_err(|_| SendError::closed("order_manager"))?;
        rx.await.map_err(|_| SendError::closed("order_manager"))
    }

    /// Book and buffer sizes.
    ///
    /// # Errors
    ///
    /// Returns error if the order manager has stopped.
    pub async fn snapshot(&self) -> Result<OrderManagerSnapshot, SendError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(OrderManagerMessage::Snapshot(reply))
            .await
            .map_err(|_| SendError::closed("order_manager"))?;
        rx.await.map_err(|_| SendError::closed("order_manager"))
    }

    /// Stop the actor.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

/// The order lifecycle state machine.
pub struct OrderManager<C, P>
where
    C: ExecutionClientPort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    client: Arc<C>,
    publisher: Arc<P>,
    order_book: HashMap<OrderId, Order>,
    orders_active: HashSet<OrderId>,
    orders_completed: HashSet<OrderId>,
    modify_cache: HashMap<OrderId, VecDeque<ModifyOrder>>,
    modify_buffer: HashMap<OrderId, ModifyOrder>,
    cancel_buffer: HashMap<OrderId, CancelOrder>,
    register: OrderRegister,
}

impl<C, P> OrderManager<C, P>
where
    C: ExecutionClientPort + ?Sized + 'static,
    P: EventPublisherPort + ?Sized + 'static,
{
    /// Create an order manager with an empty book.
    pub fn new(client: Arc<C>, publisher: Arc<P>) -> Self {
        Self {
            client,
            publisher,
            order_book: HashMap::new(),
            orders_active: HashSet::new(),
            orders_completed: HashSet::new(),
            modify_cache: HashMap::new(),
            modify_buffer: HashMap::new(),
            cancel_buffer: HashMap::new(),
            register: OrderRegister::new(),
        }
    }

    /// Spawn the actor on the current runtime.
    #[must_use]
    pub fn start(self, capacity: usize) -> OrderManagerHandle {
        let (sender, inbox) = mpsc::channel(capacity.max(1));
        let shutdown = CancellationToken::new();
        let handle = OrderManagerHandle {
            sender,
            shutdown: shutdown.clone(),
        };

        tracing::info!("Starting order manager");
        tokio::spawn(self.run(inbox, shutdown));
        handle
    }

    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<OrderManagerMessage>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                message = inbox.recv() => match message {
                    Some(message) => self.handle(message).await,
                    None => break,
                },
            }
        }

        let snapshot = self.snapshot();
        tracing::info!(
            orders = snapshot.orders,
            active = snapshot.active,
            buffered_modifies = snapshot.buffered_modifies,
            buffered_cancels = snapshot.buffered_cancels,
            "Order manager stopped"
        );
    }

    /// Process one mailbox message to completion.
    pub async fn handle(&mut self, message: OrderManagerMessage) {
        match message {
            OrderManagerMessage::Command(command) => self.handle_command(command).await,
            OrderManagerMessage::Event(event) => self.handle_event(event).await,
            OrderManagerMessage::Query { order_id, reply } => {
                reply.send(self.order_book.get(&order_id).cloned()).ok();
            }
            OrderManagerMessage::Snapshot(reply) => {
                reply.send(self.snapshot()).ok();
            }
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Dispatch a trading command.
    pub async fn handle_command(&mut self, command: TradingCommand) {
        match command {
            TradingCommand::SubmitOrder(command) => self.submit_order(command).await,
            TradingCommand::SubmitAtomicOrder(command) => self.submit_atomic_order(command).await,
            TradingCommand::ModifyOrder(command) => self.modify_order(command).await,
            TradingCommand::CancelOrder(command) => self.cancel_order(command).await,
            TradingCommand::AccountInquiry(command) => self.account_inquiry(command).await,
        }
    }

    async fn submit_order(&mut self, command: SubmitOrder) {
        let order_id = command.order.id().clone();

        if self.order_book.contains_key(&order_id) {
            tracing::error!(order_id = %order_id, "Cannot submit order, id already exists");
            return;
        }

        if self.cancel_buffer.remove(&order_id).is_some() {
            tracing::warn!(
                order_id = %order_id,
                "Order was cancelled before submission, discarding submit"
            );
            return;
        }

        self.add_order(&command.order, &command.trader_id, &command.strategy_id);

        record_command_forwarded("SubmitOrder");
        if let Err(e) = self.client.submit_order(command).await {
            tracing::error!(order_id = %order_id, error = %e, "Execution client failed to submit order");
        }
    }

    async fn submit_atomic_order(&mut self, command: SubmitAtomicOrder) {
        let atomic_id = command.atomic_order.id().clone();
        let leg_ids = command.atomic_order.order_ids();

        if let Some(duplicate) = leg_ids.iter().find(|id| self.order_book.contains_key(*id)) {
            tracing::error!(
                atomic_order_id = %atomic_id,
                order_id = %duplicate,
                "Cannot submit atomic order, leg id already exists"
            );
            return;
        }

        let cancelled: Vec<&OrderId> = leg_ids
            .iter()
            .filter(|id| self.cancel_buffer.remove(*id).is_some())
            .collect();
        if !cancelled.is_empty() {
            tracing::warn!(
                atomic_order_id = %atomic_id,
                cancelled_legs = ?cancelled,
                "Atomic order leg cancelled before submission, discarding submit"
            );
            return;
        }

        for leg in command.atomic_order.legs() {
            self.add_order(leg, &command.trader_id, &command.strategy_id);
        }

        record_command_forwarded("SubmitAtomicOrder");
        if let Err(e) = self.client.submit_atomic_order(command).await {
            tracing::error!(
                atomic_order_id = %atomic_id,
                error = %e,
                "Execution client failed to submit atomic order"
            );
        }
    }

    async fn cancel_order(&mut self, command: CancelOrder) {
        let order_id = command.order_id.clone();

        if !self.order_book.contains_key(&order_id) {
            tracing::warn!(order_id = %order_id, "Cancel for unknown order, buffering");
            record_command_buffered("CancelOrder");
            self.cancel_buffer.insert(order_id, command);
            return;
        }

        record_command_forwarded("CancelOrder");
        if let Err(e) = self.client.cancel_order(command).await {
            tracing::error!(order_id = %order_id, error = %e, "Execution client failed to cancel order");
        }
    }

    async fn modify_order(&mut self, command: ModifyOrder) {
        let order_id = command.order_id.clone();

        if !self.order_book.contains_key(&order_id) {
            tracing::warn!(order_id = %order_id, "Modify for unknown order, buffering");
            record_command_buffered("ModifyOrder");
            if self.modify_buffer.insert(order_id.clone(), command).is_some() {
                tracing::warn!(order_id = %order_id, "Replaced earlier buffered modify");
            }
            return;
        }

        let Some(queue) = self.modify_cache.get_mut(&order_id) else {
            if self.order_book.get(&order_id).is_some_and(Order::is_complete) {
                tracing::warn!(order_id = %order_id, "Modify for completed order, dropping");
            } else {
                tracing::error!(order_id = %order_id, "No modify cache for order, dropping modify");
            }
            return;
        };

        let in_flight = !queue.is_empty();
        queue.push_back(command);
        if in_flight {
            tracing::debug!(
                order_id = %order_id,
                queued = queue.len(),
                "Modification in flight, queued"
            );
            return;
        }

        self.forward_next_modify(&order_id).await;
    }

    async fn account_inquiry(&mut self, command: AccountInquiry) {
        record_command_forwarded("AccountInquiry");
        let account_id = command.account_id.clone();
        if let Err(e) = self.client.account_inquiry(command).await {
            tracing::error!(account_id = %account_id, error = %e, "Execution client failed account inquiry");
        }
    }

    /// Forward the head of the order's modify queue.
    ///
    /// The head stays queued until its confirmation arrives. If the client
    /// refuses it, it is dropped and the next one is tried.
    async fn forward_next_modify(&mut self, order_id: &OrderId) {
        let Some(queue) = self.modify_cache.get_mut(order_id) else {
            return;
        };

        while let Some(head) = queue.front().cloned() {
            record_command_forwarded("ModifyOrder");
            match self.client.modify_order(head).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::error!(order_id = %order_id, error = %e, "Execution client failed to modify order");
                    queue.pop_front();
                }
            }
        }
    }

    fn add_order(&mut self, order: &Order, trader_id: &TraderId, strategy_id: &StrategyId) {
        let order_id = order.id().clone();

        if order.price().is_some() {
            if self.modify_cache.contains_key(&order_id) {
                tracing::error!(order_id = %order_id, "Modify cache already exists");
            } else {
                self.modify_cache.insert(order_id.clone(), VecDeque::new());
            }
        }

        self.register.register(trader_id, strategy_id, &order_id);
        self.order_book.insert(order_id.clone(), order.clone());
        tracing::debug!(order_id = %order_id, trader_id = %trader_id, "Order added to book");
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Apply and republish an execution event.
    pub async fn handle_event(&mut self, event: ExecutionEvent) {
        match event {
            ExecutionEvent::Order(order_event) => self.handle_order_event(order_event).await,
            ExecutionEvent::Account(_) => self.publish(event).await,
        }
    }

    async fn handle_order_event(&mut self, event: OrderEvent) {
        let order_id = event.order_id().clone();

        let Some(order) = self.order_book.get_mut(&order_id) else {
            tracing::error!(
                order_id = %order_id,
                event_type = event.event_type(),
                "Event for unknown order, discarding"
            );
            return;
        };

        if let Err(e) = order.apply(&event) {
            tracing::error!(
                order_id = %order_id,
                event_type = event.event_type(),
                error = %e,
                "Failed to apply event"
            );
            self.publish(event.into()).await;
            return;
        }

        let is_complete = order.is_complete();
        let is_active = order.is_active();
        let current_price = order.price();

        if is_complete {
            self.orders_active.remove(&order_id);
            self.orders_completed.insert(order_id.clone());
            self.modify_cache.remove(&order_id);
        } else if is_active {
            self.orders_active.insert(order_id.clone());
        }
        update_order_partitions(self.orders_active.len(), self.orders_completed.len());

        match &event {
            OrderEvent::Working(_) => {
                if let Some(modify) = self.modify_buffer.remove(&order_id) {
                    tracing::info!(order_id = %order_id, "Order working, replaying buffered modify");
                    self.modify_order(modify).await;
                }
            }
            OrderEvent::Modified(_) => {
                if let Some(price) = current_price {
                    self.advance_modify_cache(&order_id, price).await;
                }
            }
            OrderEvent::Rejected(e) => {
                tracing::warn!(order_id = %order_id, reason = %e.reason, "Order rejected");
            }
            OrderEvent::CancelReject(e) => {
                tracing::warn!(
                    order_id = %order_id,
                    response_to = %e.response_to,
                    reason = %e.reason,
                    "Cancel rejected"
                );
            }
            _ => {}
        }

        if is_complete && self.modify_buffer.remove(&order_id).is_some() {
            tracing::warn!(order_id = %order_id, "Order completed with a buffered modify, discarded");
        }

        self.publish(event.into()).await;
    }

    /// Retire the in-flight modification and send the next one.
    ///
    /// Any confirmation retires the head, whatever price the broker settled
    /// on. Queued requests already at that price are satisfied too.
    async fn advance_modify_cache(&mut self, order_id: &OrderId, current_price: Price) {
        let Some(queue) = self.modify_cache.get_mut(order_id) else {
            return;
        };

        let Some(confirmed) = queue.pop_front() else {
            tracing::warn!(
                order_id = %order_id,
                price = %current_price,
                "Modification confirmed with none in flight"
            );
            return;
        };

        if confirmed.modified_price != current_price {
            tracing::warn!(
                order_id = %order_id,
                requested = %confirmed.modified_price,
                price = %current_price,
                "Modification confirmed at a different price than requested"
            );
        }
        queue.retain(|modify| modify.modified_price != current_price);

        if !queue.is_empty() {
            self.forward_next_modify(order_id).await;
        }
    }

    async fn publish(&self, event: ExecutionEvent) {
        let event_type = event.event_type();
        match self.publisher.publish(event).await {
            Ok(()) => record_event_published(event_type),
            Err(e) => tracing::error!(event_type, error = %e, "Failed to publish event"),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Get an order from the book.
    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.order_book.get(order_id)
    }

    /// Whether the order is in the active partition.
    #[must_use]
    pub fn is_order_active(&self, order_id: &OrderId) -> bool {
        self.orders_active.contains(order_id)
    }

    /// Whether the order is in the completed partition.
    #[must_use]
    pub fn is_order_completed(&self, order_id: &OrderId) -> bool {
        self.orders_completed.contains(order_id)
    }

    /// Queued modifications for an order, `None` if it has no cache.
    #[must_use]
    pub fn pending_modifies(&self, order_id: &OrderId) -> Option<usize> {
        self.modify_cache.get(order_id).map(VecDeque::len)
    }

    /// Whether a modify is buffered for this (unknown) order.
    #[must_use]
    pub fn has_buffered_modify(&self, order_id: &OrderId) -> bool {
        self.modify_buffer.contains_key(order_id)
    }

    /// Whether a cancel is buffered for this (unknown) order.
    #[must_use]
    pub fn has_buffered_cancel(&self, order_id: &OrderId) -> bool {
        self.cancel_buffer.contains_key(order_id)
    }

    /// Ownership index of registered orders.
    #[must_use]
    pub const fn register(&self) -> &OrderRegister {
        &self.register
    }

    /// Book and buffer sizes.
    #[must_use]
    pub fn snapshot(&self) -> OrderManagerSnapshot {
        OrderManagerSnapshot {
            orders: self.order_book.len(),
            active: self.orders_active.len(),
            completed: self.orders_completed.len(),
            buffered_modifies: self.modify_buffer.len(),
            buffered_cancels: self.cancel_buffer.len(),
            pending_modifies: self.modify_cache.values().map(VecDeque::len).sum(),
        }
    }
}
