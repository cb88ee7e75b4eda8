//! Domain events for order execution.
//!
//! Events are confirmations flowing bottom-up from the broker adapter. They
//! are applied to the `Order` aggregate and then republished to subscribers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::value_objects::OrderStatus;
use crate::domain::shared::{
    AccountId, BrokerOrderId, MessageId, OrderId, Price, Quantity, Timestamp,
};

/// All possible order events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    /// Order sent to the broker.
    Submitted(OrderSubmitted),
    /// Order acknowledged by the broker.
    Accepted(OrderAccepted),
    /// Order rejected by the broker.
    Rejected(OrderRejected),
    /// Order working at the venue.
    Working(OrderWorking),
    /// Order modification confirmed.
    Modified(OrderModified),
    /// Cancel or modify request refused by the broker.
    CancelReject(OrderCancelReject),
    /// Order cancelled.
    Cancelled(OrderCancelled),
    /// Order expired.
    Expired(OrderExpired),
    /// Order partially filled.
    PartiallyFilled(OrderPartiallyFilled),
    /// Order completely filled.
    Filled(OrderFilled),
}

impl OrderEvent {
    /// Get the order ID for this event.
    #[must_use]
    pub fn order_id(&self) -> &OrderId {
        match self {
            Self::Submitted(e) => &e.order_id,
            Self::Accepted(e) => &e.order_id,
            Self::Rejected(e) => &e.order_id,
            Self::Working(e) => &e.order_id,
            Self::Modified(e) => &e.order_id,
            Self::CancelReject(e) => &e.order_id,
            Self::Cancelled(e) => &e.order_id,
            Self::Expired(e) => &e.order_id,
            Self::PartiallyFilled(e) => &e.order_id,
            Self::Filled(e) => &e.order_id,
        }
    }

    /// Get the event's own message ID.
    #[must_use]
    pub fn id(&self) -> &MessageId {
        match self {
            Self::Submitted(e) => &e.id,
            Self::Accepted(e) => &e.id,
            Self::Rejected(e) => &e.id,
            Self::Working(e) => &e.id,
            Self::Modified(e) => &e.id,
            Self::CancelReject(e) => &e.id,
            Self::Cancelled(e) => &e.id,
            Self::Expired(e) => &e.id,
            Self::PartiallyFilled(e) => &e.id,
            Self::Filled(e) => &e.id,
        }
    }

    /// Get the timestamp when this event occurred.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::Submitted(e) => e.timestamp,
            Self::Accepted(e) => e.timestamp,
            Self::Rejected(e) => e.timestamp,
            Self::Working(e) => e.timestamp,
            Self::Modified(e) => e.timestamp,
            Self::CancelReject(e) => e.timestamp,
            Self::Cancelled(e) => e.timestamp,
            Self::Expired(e) => e.timestamp,
            Self::PartiallyFilled(e) => e.timestamp,
            Self::Filled(e) => e.timestamp,
        }
    }

    /// Status the order moves to when this event is applied.
    ///
    /// `None` for events that never change status (modification confirmations
    /// keep the order in place, cancel rejects leave it untouched).
    #[must_use]
    pub const fn target_status(&self) -> Option<OrderStatus> {
        match self {
            Self::Submitted(_) => Some(OrderStatus::Submitted),
            Self::Accepted(_) => Some(OrderStatus::Accepted),
            Self::Rejected(_) => Some(OrderStatus::Rejected),
            Self::Working(_) => Some(OrderStatus::Working),
            Self::Cancelled(_) => Some(OrderStatus::Cancelled),
            Self::Expired(_) => Some(OrderStatus::Expired),
            Self::PartiallyFilled(_) => Some(OrderStatus::PartiallyFilled),
            Self::Filled(_) => Some(OrderStatus::Filled),
            Self::Modified(_) | Self::CancelReject(_) => None,
        }
    }

    /// Get the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Submitted(_) => "ORDER_SUBMITTED",
            Self::Accepted(_) => "ORDER_ACCEPTED",
            Self::Rejected(_) => "ORDER_REJECTED",
            Self::Working(_) => "ORDER_WORKING",
            Self::Modified(_) => "ORDER_MODIFIED",
            Self::CancelReject(_) => "ORDER_CANCEL_REJECT",
            Self::Cancelled(_) => "ORDER_CANCELLED",
            Self::Expired(_) => "ORDER_EXPIRED",
            Self::PartiallyFilled(_) => "ORDER_PARTIALLY_FILLED",
            Self::Filled(_) => "ORDER_FILLED",
        }
    }
}

/// Event: Order sent to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmitted {
    /// Event ID.
    pub id: MessageId,
    /// Order ID.
    pub order_id: OrderId,
    /// Account the order was submitted to.
    pub account_id: AccountId,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

/// Event: Order acknowledged by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAccepted {
    /// Event ID.
    pub id: MessageId,
    /// Order ID.
    pub order_id: OrderId,
    /// Broker's order ID.
    pub broker_order_id: BrokerOrderId,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

/// Event: Order rejected by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRejected {
    /// Event ID.
    pub id: MessageId,
    /// Order ID.
    pub order_id: OrderId,
    /// Rejection reason as reported by the broker.
    pub reason: String,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

/// Event: Order working at the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWorking {
    /// Event ID.
    pub id: MessageId,
    /// Order ID.
    pub order_id: OrderId,
    /// Broker's order ID.
    pub broker_order_id: BrokerOrderId,
    /// Working price, if the order is priced.
    pub price: Option<Price>,
    /// Working quantity.
    pub quantity: Quantity,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

/// Event: Order modification confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderModified {
    /// Event ID.
    pub id: MessageId,
    /// Order ID.
    pub order_id: OrderId,
    /// Broker's order ID.
    pub broker_order_id: BrokerOrderId,
    /// Price now working.
    pub modified_price: Price,
    /// Quantity now working.
    pub modified_quantity: Quantity,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

/// Event: Cancel (or modify) request refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelReject {
    /// Event ID.
    pub id: MessageId,
    /// Order ID.
    pub order_id: OrderId,
    /// Which request was refused (e.g. `CANCEL`, `MODIFY`).
    pub response_to: String,
    /// Reason reported by the broker.
    pub reason: String,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

/// Event: Order cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    /// Event ID.
    pub id: MessageId,
    /// Order ID.
    pub order_id: OrderId,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

/// Event: Order expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExpired {
    /// Event ID.
    pub id: MessageId,
    /// Order ID.
    pub order_id: OrderId,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

/// Event: Order partially filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPartiallyFilled {
    /// Event ID.
    pub id: MessageId,
    /// Order ID.
    pub order_id: OrderId,
    /// Quantity filled by this execution.
    pub fill_quantity: Quantity,
    /// Price of this execution.
    pub fill_price: Price,
    /// Quantity still working.
    pub leaves_quantity: Quantity,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

/// Event: Order completely filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilled {
    /// Event ID.
    pub id: MessageId,
    /// Order ID.
    pub order_id: OrderId,
    /// Quantity filled by this (final) execution.
    pub fill_quantity: Quantity,
    /// Price of this execution.
    pub fill_price: Price,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

/// Account state reported by the broker, e.g. in answer to an inquiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStateEvent {
    /// Event ID.
    pub id: MessageId,
    /// Account ID.
    pub account_id: AccountId,
    /// Account currency (ISO code).
    pub currency: String,
    /// Cash balance.
    pub cash_balance: Decimal,
    /// Margin currently in use.
    pub margin_used: Decimal,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

/// Any event the broker adapter reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", content = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionEvent {
    /// Order-state confirmation.
    Order(OrderEvent),
    /// Account-state report.
    Account(AccountStateEvent),
}

impl ExecutionEvent {
    /// Get the event's message ID.
    #[must_use]
    pub fn id(&self) -> &MessageId {
        match self {
            Self::Order(e) => e.id(),
            Self::Account(e) => &e.id,
        }
    }

    /// Get the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Order(e) => e.event_type(),
            Self::Account(_) => "ACCOUNT_STATE",
        }
    }
}

impl From<OrderEvent> for ExecutionEvent {
    fn from(event: OrderEvent) -> Self {
        Self::Order(event)
    }
}

impl From<AccountStateEvent> for ExecutionEvent {
    fn from(event: AccountStateEvent) -> Self {
        Self::Account(event)
    }
}
