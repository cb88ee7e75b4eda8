//! Order status in the lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broker-visible order status.
///
/// An order starts `Initialized` when the client builds it and only moves
/// forward as execution events are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Built by the client, not yet sent to the broker.
    Initialized,
    /// Sent to the broker, awaiting acknowledgment.
    Submitted,
    /// Acknowledged by the broker.
    Accepted,
    /// Rejected by the broker.
    Rejected,
    /// Resting at the venue and eligible to fill.
    Working,
    /// Partially filled, remainder still working.
    PartiallyFilled,
    /// Completely filled.
    Filled,
    /// Cancelled.
    Cancelled,
    /// Expired by its time in force.
    Expired,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired
        )
    }

    /// Returns true if the order is live at the broker.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Accepted | Self::Working | Self::PartiallyFilled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialized => write!(f, "INITIALIZED"),
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Working => write!(f, "WORKING"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}
