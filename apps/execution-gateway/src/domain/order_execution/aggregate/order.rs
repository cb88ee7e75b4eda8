//! Order Aggregate Root
//!
//! The Order aggregate holds one order's broker-visible state. Once the
//! order manager registers it, broker events are *applied* to it; it is never
//! replaced wholesale.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::events::OrderEvent;
use crate::domain::order_execution::services::OrderStateMachine;
use crate::domain::order_execution::value_objects::{
    OrderSide, OrderStatus, OrderType, TimeInForce,
};
use crate::domain::shared::{BrokerOrderId, InstrumentId, OrderId, Price, Quantity, Timestamp};

/// Parameters for building a new order.
#[derive(Debug, Clone)]
pub struct OrderParams {
    /// Client order ID.
    pub id: OrderId,
    /// Instrument to trade.
    pub instrument_id: InstrumentId,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity to trade.
    pub quantity: Quantity,
    /// Price (required for every type except market).
    pub price: Option<Price>,
    /// Time in force.
    pub time_in_force: TimeInForce,
}

impl OrderParams {
    /// Validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns error if the quantity is not positive or the price does not
    /// match the order type.
    pub fn validate(&self) -> Result<(), OrderError> {
        self.quantity
            .validate_for_order()
            .map_err(|e| OrderError::InvalidParameters {
                field: "quantity".to_string(),
                message: e.to_string(),
            })?;

        match (self.order_type.is_priced(), &self.price) {
            (true, None) => Err(OrderError::InvalidParameters {
                field: "price".to_string(),
                message: format!("{} orders require a price", self.order_type),
            }),
            (false, Some(_)) => Err(OrderError::InvalidParameters {
                field: "price".to_string(),
                message: "Market orders cannot carry a price".to_string(),
            }),
            (true, Some(price)) => {
                price
                    .validate_for_order()
                    .map_err(|e| OrderError::InvalidParameters {
                        field: "price".to_string(),
                        message: e.to_string(),
                    })
            }
            (false, None) => Ok(()),
        }
    }
}

/// Order Aggregate Root.
// `order_type` mirrors FIX OrdType (tag 40).
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    instrument_id: InstrumentId,
    side: OrderSide,
    order_type: OrderType,
    quantity: Quantity,
    price: Option<Price>,
    time_in_force: TimeInForce,
    status: OrderStatus,
    filled_quantity: Quantity,
    average_price: Option<Price>,
    broker_order_id: Option<BrokerOrderId>,
    #[serde(skip)]
    events: Vec<OrderEvent>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Order {
    /// Create a new `Initialized` order.
    ///
    /// # Errors
    ///
    /// Returns error if parameter validation fails.
    pub fn new(params: OrderParams) -> Result<Self, OrderError> {
        params.validate()?;

        let now = Timestamp::now();
        Ok(Self {
            id: params.id,
            instrument_id: params.instrument_id,
            side: params.side,
            order_type: params.order_type,
            quantity: params.quantity,
            price: params.price,
            time_in_force: params.time_in_force,
            status: OrderStatus::Initialized,
            filled_quantity: Quantity::ZERO,
            average_price: None,
            broker_order_id: None,
            events: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Convenience constructor for a market order.
    ///
    /// # Errors
    ///
    /// Returns error if the quantity is not positive.
    pub fn market(
        id: OrderId,
        instrument_id: InstrumentId,
        side: OrderSide,
        quantity: Quantity,
    ) -> Result<Self, OrderError> {
        Self::new(OrderParams {
            id,
            instrument_id,
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            time_in_force: TimeInForce::Day,
        })
    }

    /// Convenience constructor for a limit order.
    ///
    /// # Errors
    ///
    /// Returns error if the quantity or price is not positive.
    pub fn limit(
        id: OrderId,
        instrument_id: InstrumentId,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
    ) -> Result<Self, OrderError> {
        Self::new(OrderParams {
            id,
            instrument_id,
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            time_in_force: TimeInForce::Gtc,
        })
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Get the order ID.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Get the instrument.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    /// Get the order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Get the order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Get the working quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Get the working price (`None` for market orders).
    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        self.price
    }

    /// Get the time in force.
    #[must_use]
    pub const fn time_in_force(&self) -> TimeInForce {
        self.time_in_force
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Get the cumulative filled quantity.
    #[must_use]
    pub const fn filled_quantity(&self) -> Quantity {
        self.filled_quantity
    }

    /// Get the quantity still open.
    #[must_use]
    pub fn leaves_quantity(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    /// Get the volume-weighted average fill price.
    #[must_use]
    pub const fn average_price(&self) -> Option<Price> {
        self.average_price
    }

    /// Get the broker order ID.
    #[must_use]
    pub const fn broker_order_id(&self) -> Option<&BrokerOrderId> {
        self.broker_order_id.as_ref()
    }

    /// Events applied to this order, oldest first.
    #[must_use]
    pub fn events(&self) -> &[OrderEvent] {
        &self.events
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Get the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns true while the order is live at the broker.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Returns true once the order reached a terminal status.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    // ========================================================================
    // Event application
    // ========================================================================

    /// Apply a broker event to this order.
    ///
    /// The order is left untouched when the event is rejected.
    ///
    /// # Errors
    ///
    /// Returns error if the event targets another order or implies an
    /// invalid status transition.
    pub fn apply(&mut self, event: &OrderEvent) -> Result<(), OrderError> {
        if event.order_id() != &self.id {
            return Err(OrderError::OrderIdMismatch {
                expected: self.id.to_string(),
                actual: event.order_id().to_string(),
            });
        }

        if let Some(to) = event.target_status() {
            OrderStateMachine::validate_transition(self.status, to)?;
        }

        match event {
            OrderEvent::Accepted(e) => {
                self.broker_order_id = Some(e.broker_order_id.clone());
            }
            OrderEvent::Working(e) => {
                self.broker_order_id = Some(e.broker_order_id.clone());
                if e.price.is_some() {
                    self.price = e.price;
                }
            }
            OrderEvent::Modified(e) => {
                if !self.is_active() {
                    return Err(OrderError::InvalidStateTransition {
                        from: self.status,
                        to: self.status,
                        reason: format!("Cannot modify order in status {}", self.status),
                    });
                }
                self.price = Some(e.modified_price);
                self.quantity = e.modified_quantity;
            }
            OrderEvent::PartiallyFilled(e) => self.record_fill(e.fill_quantity, e.fill_price),
            OrderEvent::Filled(e) => self.record_fill(e.fill_quantity, e.fill_price),
            OrderEvent::Submitted(_)
            | OrderEvent::Rejected(_)
            | OrderEvent::CancelReject(_)
            | OrderEvent::Cancelled(_)
            | OrderEvent::Expired(_) => {}
        }

        if let Some(to) = event.target_status() {
            self.status = to;
        }
        self.updated_at = event.timestamp();
        self.events.push(event.clone());
        Ok(())
    }

    fn record_fill(&mut self, fill_quantity: Quantity, fill_price: Price) {
        let previous = self.filled_quantity.amount();
        let total = previous + fill_quantity.amount();
        if total > Decimal::ZERO {
            let prior_notional = self
                .average_price
                .map_or(Decimal::ZERO, |p| p.value() * previous);
            let notional = prior_notional + fill_price.value() * fill_quantity.amount();
            self.average_price = Some(Price::new(notional / total));
        }
        self.filled_quantity = Quantity::new(total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::events::{
        OrderAccepted, OrderCancelled, OrderFilled, OrderModified, OrderPartiallyFilled,
        OrderSubmitted, OrderWorking,
    };
    use crate::domain::shared::{AccountId, MessageId};

    fn limit_order(id: &str, price: i64) -> Order {
        Order::limit(
            OrderId::new(id),
            InstrumentId::new("AUDUSD.FXCM"),
            OrderSide::Buy,
            Quantity::from_i64(100),
            Price::from(price),
        )
        .unwrap()
    }

    fn submitted(id: &str) -> OrderEvent {
        OrderEvent::Submitted(OrderSubmitted {
            id: MessageId::generate(),
            order_id: OrderId::new(id),
            account_id: AccountId::new("SIM-001"),
            timestamp: Timestamp::now(),
        })
    }

    fn accepted(id: &str) -> OrderEvent {
        OrderEvent::Accepted(OrderAccepted {
            id: MessageId::generate(),
            order_id: OrderId::new(id),
            broker_order_id: BrokerOrderId::new("B-1"),
            timestamp: Timestamp::now(),
        })
    }

    fn working(id: &str) -> OrderEvent {
        OrderEvent::Working(OrderWorking {
            id: MessageId::generate(),
            order_id: OrderId::new(id),
            broker_order_id: BrokerOrderId::new("B-1"),
            price: Some(Price::from(100)),
            quantity: Quantity::from_i64(100),
            timestamp: Timestamp::now(),
        })
    }

    fn modified(id: &str, price: i64) -> OrderEvent {
        OrderEvent::Modified(OrderModified {
            id: MessageId::generate(),
            order_id: OrderId::new(id),
            broker_order_id: BrokerOrderId::new("B-1"),
            modified_price: Price::from(price),
            modified_quantity: Quantity::from_i64(100),
            timestamp: Timestamp::now(),
        })
    }

    fn work(order: &mut Order) {
        let id = order.id().to_string();
        order.apply(&submitted(&id)).unwrap();
        order.apply(&accepted(&id)).unwrap();
        order.apply(&working(&id)).unwrap();
    }

    #[test]
    fn market_order_has_no_price() {
        let order = Order::market(
            OrderId::new("O-1"),
            InstrumentId::new("AUDUSD.FXCM"),
            OrderSide::Sell,
            Quantity::from_i64(10),
        )
        .unwrap();
        assert!(order.price().is_none());
        assert_eq!(order.status(), OrderStatus::Initialized);
    }

    #[test]
    fn limit_order_requires_price() {
        let result = Order::new(OrderParams {
            id: OrderId::new("O-1"),
            instrument_id: InstrumentId::new("AUDUSD.FXCM"),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: Quantity::from_i64(10),
            price: None,
            time_in_force: TimeInForce::Day,
        });
        assert!(matches!(
            result,
            Err(OrderError::InvalidParameters { ref field, .. }) if field == "price"
        ));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let result = Order::market(
            OrderId::new("O-1"),
            InstrumentId::new("AUDUSD.FXCM"),
            OrderSide::Buy,
            Quantity::ZERO,
        );
        assert!(result.is_err());
    }

    #[test]
    fn lifecycle_to_working_is_active() {
        let mut order = limit_order("O-1", 100);
        work(&mut order);
        assert_eq!(order.status(), OrderStatus::Working);
        assert!(order.is_active());
        assert!(!order.is_complete());
        assert_eq!(order.broker_order_id().map(BrokerOrderId::as_str), Some("B-1"));
        assert_eq!(order.events().len(), 3);
    }

    #[test]
    fn modified_updates_price_without_status_change() {
        let mut order = limit_order("O-1", 100);
        work(&mut order);
        order.apply(&modified("O-1", 101)).unwrap();
        assert_eq!(order.price(), Some(Price::from(101)));
        assert_eq!(order.status(), OrderStatus::Working);
    }

    #[test]
    fn modified_before_working_is_rejected() {
        let mut order = limit_order("O-1", 100);
        order.apply(&submitted("O-1")).unwrap();
        assert!(order.apply(&modified("O-1", 101)).is_err());
        assert_eq!(order.price(), Some(Price::from(100)));
    }

    #[test]
    fn fills_accumulate_average_price() {
        let mut order = limit_order("O-1", 100);
        work(&mut order);
        order
            .apply(&OrderEvent::PartiallyFilled(OrderPartiallyFilled {
                id: MessageId::generate(),
                order_id: OrderId::new("O-1"),
                fill_quantity: Quantity::from_i64(40),
                fill_price: Price::from(100),
                leaves_quantity: Quantity::from_i64(60),
                timestamp: Timestamp::now(),
            }))
            .unwrap();
        order
            .apply(&OrderEvent::Filled(OrderFilled {
                id: MessageId::generate(),
                order_id: OrderId::new("O-1"),
                fill_quantity: Quantity::from_i64(60),
                fill_price: Price::from(105),
                timestamp: Timestamp::now(),
            }))
            .unwrap();

        assert!(order.is_complete());
        assert_eq!(order.filled_quantity(), Quantity::from_i64(100));
        assert_eq!(order.leaves_quantity(), Quantity::ZERO);
        assert_eq!(order.average_price(), Some(Price::from(103)));
    }

    #[test]
    fn terminal_order_rejects_further_events() {
        let mut order = limit_order("O-1", 100);
        work(&mut order);
        let cancelled = OrderEvent::Cancelled(OrderCancelled {
            id: MessageId::generate(),
            order_id: OrderId::new("O-1"),
            timestamp: Timestamp::now(),
        });
        order.apply(&cancelled).unwrap();
        assert!(order.apply(&working("O-1")).is_err());
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn event_for_other_order_is_rejected() {
        let mut order = limit_order("O-1", 100);
        let result = order.apply(&submitted("O-2"));
        assert!(matches!(result, Err(OrderError::OrderIdMismatch { .. })));
        assert_eq!(order.status(), OrderStatus::Initialized);
    }
}
