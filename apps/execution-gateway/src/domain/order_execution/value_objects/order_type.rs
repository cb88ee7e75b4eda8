//! Order type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order type specifying execution behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Execute at best available price; carries no price.
    Market,
    /// Execute at the given price or better.
    Limit,
    /// Becomes a market order once the price trades.
    StopMarket,
    /// Becomes a limit order once the price trades.
    StopLimit,
}

impl OrderType {
    /// Returns true if orders of this type must carry a price.
    #[must_use]
    pub const fn is_priced(&self) -> bool {
        !matches!(self, Self::Market)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
            Self::StopMarket => write!(f, "STOP_MARKET"),
            Self::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}
