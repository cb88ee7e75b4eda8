//! Trading commands.
//!
//! Commands carry top-down client intent. Each carries its own `MessageId`,
//! used for idempotency/logging and, at the protocol edge, as the correlation
//! id of the acknowledgment.

use serde::{Deserialize, Serialize};

use super::aggregate::{AtomicOrder, Order};
use crate::domain::shared::{
    AccountId, MessageId, OrderId, Price, Quantity, StrategyId, Timestamp, TraderId,
};

/// Submit a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrder {
    /// Command ID.
    pub id: MessageId,
    /// Owning trader.
    pub trader_id: TraderId,
    /// Owning strategy.
    pub strategy_id: StrategyId,
    /// Target account.
    pub account_id: AccountId,
    /// The order to register and send.
    pub order: Order,
    /// Creation time.
    pub timestamp: Timestamp,
}

/// Submit a bracket as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAtomicOrder {
    /// Command ID.
    pub id: MessageId,
    /// Owning trader.
    pub trader_id: TraderId,
    /// Owning strategy.
    pub strategy_id: StrategyId,
    /// Target account.
    pub account_id: AccountId,
    /// The bracket.
    pub atomic_order: AtomicOrder,
    /// Creation time.
    pub timestamp: Timestamp,
}

/// Amend the price/quantity of a working order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyOrder {
    /// Command ID.
    pub id: MessageId,
    /// Requesting trader.
    pub trader_id: TraderId,
    /// Target account.
    pub account_id: AccountId,
    /// Order to amend.
    pub order_id: OrderId,
    /// Requested quantity.
    pub modified_quantity: Quantity,
    /// Requested price.
    pub modified_price: Price,
    /// Creation time.
    pub timestamp: Timestamp,
}

/// Cancel an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    /// Command ID.
    pub id: MessageId,
    /// Requesting trader.
    pub trader_id: TraderId,
    /// Target account.
    pub account_id: AccountId,
    /// Order to cancel.
    pub order_id: OrderId,
    /// Free-text reason, passed through to the broker.
    pub cancel_reason: String,
    /// Creation time.
    pub timestamp: Timestamp,
}

/// Ask the broker for a fresh account state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInquiry {
    /// Command ID.
    pub id: MessageId,
    /// Requesting trader.
    pub trader_id: TraderId,
    /// Account to report.
    pub account_id: AccountId,
    /// Creation time.
    pub timestamp: Timestamp,
}

/// Every command a remote client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingCommand {
    /// Submit a single order.
    SubmitOrder(SubmitOrder),
    /// Submit a bracket.
    SubmitAtomicOrder(SubmitAtomicOrder),
    /// Amend an order.
    ModifyOrder(ModifyOrder),
    /// Cancel an order.
    CancelOrder(CancelOrder),
    /// Request account state.
    AccountInquiry(AccountInquiry),
}

impl TradingCommand {
    /// Get the command ID.
    #[must_use]
    pub fn id(&self) -> &MessageId {
        match self {
            Self::SubmitOrder(c) => &c.id,
            Self::SubmitAtomicOrder(c) => &c.id,
            Self::ModifyOrder(c) => &c.id,
            Self::CancelOrder(c) => &c.id,
            Self::AccountInquiry(c) => &c.id,
        }
    }

    /// Get the issuing trader.
    #[must_use]
    pub fn trader_id(&self) -> &TraderId {
        match self {
            Self::SubmitOrder(c) => &c.trader_id,
            Self::SubmitAtomicOrder(c) => &c.trader_id,
            Self::ModifyOrder(c) => &c.trader_id,
            Self::CancelOrder(c) => &c.trader_id,
            Self::AccountInquiry(c) => &c.trader_id,
        }
    }

    /// Get the command type name.
    #[must_use]
    pub const fn command_type(&self) -> &'static str {
        match self {
            Self::SubmitOrder(_) => "SubmitOrder",
            Self::SubmitAtomicOrder(_) => "SubmitAtomicOrder",
            Self::ModifyOrder(_) => "ModifyOrder",
            Self::CancelOrder(_) => "CancelOrder",
            Self::AccountInquiry(_) => "AccountInquiry",
        }
    }

    /// Returns true for commands that create orders (the stricter throttle lane).
    #[must_use]
    pub const fn is_new_order(&self) -> bool {
        matches!(self, Self::SubmitOrder(_) | Self::SubmitAtomicOrder(_))
    }
}

impl From<SubmitOrder> for TradingCommand {
    fn from(command: SubmitOrder) -> Self {
        Self::SubmitOrder(command)
    }
}

impl From<SubmitAtomicOrder> for TradingCommand {
    fn from(command: SubmitAtomicOrder) -> Self {
        Self::SubmitAtomicOrder(command)
    }
}

impl From<ModifyOrder> for TradingCommand {
    fn from(command: ModifyOrder) -> Self {
        Self::ModifyOrder(command)
    }
}

impl From<CancelOrder> for TradingCommand {
    fn from(command: CancelOrder) -> Self {
        Self::CancelOrder(command)
    }
}

impl From<AccountInquiry> for TradingCommand {
    fn from(command: AccountInquiry) -> Self {
        Self::AccountInquiry(command)
    }
}
