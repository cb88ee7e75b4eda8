//! Atomic (bracket) order: entry plus protective legs.

use serde::{Deserialize, Serialize};

use super::Order;
use crate::domain::order_execution::errors::OrderError;
use crate::domain::shared::{AtomicOrderId, OrderId};

/// A linked bracket of an entry, a stop-loss and an optional take-profit.
///
/// The legs are registered and submitted together; none of them is known to
/// the order book unless all of them are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicOrder {
    id: AtomicOrderId,
    entry: Order,
    stop_loss: Order,
    take_profit: Option<Order>,
}

impl AtomicOrder {
    /// Build a bracket from its legs.
    ///
    /// # Errors
    ///
    /// Returns error if leg ids collide, or a protective leg is on the same
    /// side as the entry or carries no price.
    pub fn new(
        id: AtomicOrderId,
        entry: Order,
        stop_loss: Order,
        take_profit: Option<Order>,
    ) -> Result<Self, OrderError> {
        let bracket = Self {
            id,
            entry,
            stop_loss,
            take_profit,
        };
        bracket.validate()?;
        Ok(bracket)
    }

    fn validate(&self) -> Result<(), OrderError> {
        let closing = self.entry.side().closing();
        let protective = std::iter::once(("stop_loss", &self.stop_loss))
            .chain(self.take_profit.as_ref().map(|tp| ("take_profit", tp)));

        for (field, leg) in protective {
            if leg.side() != closing {
                return Err(OrderError::InvalidParameters {
                    field: field.to_string(),
                    message: format!("Leg must be {closing} to protect a {} entry", self.entry.side()),
                });
            }
            if leg.price().is_none() {
                return Err(OrderError::InvalidParameters {
                    field: field.to_string(),
                    message: "Protective legs require a price".to_string(),
                });
            }
        }

        let ids = self.order_ids();
        for (i, id) in ids.iter().enumerate() {
            if ids[i + 1..].contains(id) {
                return Err(OrderError::InvalidParameters {
                    field: "order_id".to_string(),
                    message: format!("Duplicate leg id {id}"),
                });
            }
        }
        Ok(())
    }

    /// Get the bracket ID.
    #[must_use]
    pub const fn id(&self) -> &AtomicOrderId {
        &self.id
    }

    /// Get the entry leg.
    #[must_use]
    pub const fn entry(&self) -> &Order {
        &self.entry
    }

    /// Get the stop-loss leg.
    #[must_use]
    pub const fn stop_loss(&self) -> &Order {
        &self.stop_loss
    }

    /// Get the take-profit leg, if any.
    #[must_use]
    pub const fn take_profit(&self) -> Option<&Order> {
        self.take_profit.as_ref()
    }

    /// All legs, entry first.
    #[must_use]
    pub fn legs(&self) -> Vec<&Order> {
        let mut legs = vec![&self.entry, &self.stop_loss];
        if let Some(tp) = &self.take_profit {
            legs.push(tp);
        }
        legs
    }

    /// Ids of all legs, entry first.
    #[must_use]
    pub fn order_ids(&self) -> Vec<OrderId> {
        self.legs().into_iter().map(|o| o.id().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::aggregate::OrderParams;
    use crate::domain::order_execution::value_objects::{OrderSide, OrderType, TimeInForce};
    use crate::domain::shared::{InstrumentId, Price, Quantity};

    fn leg(id: &str, side: OrderSide, order_type: OrderType, price: Option<i64>) -> Order {
        Order::new(OrderParams {
            id: OrderId::new(id),
            instrument_id: InstrumentId::new("AUDUSD.FXCM"),
            side,
            order_type,
            quantity: Quantity::from_i64(100),
            price: price.map(Price::from),
            time_in_force: TimeInForce::Gtc,
        })
        .unwrap()
    }

    #[test]
    fn bracket_with_take_profit_has_three_legs() {
        let bracket = AtomicOrder::new(
            AtomicOrderId::new("AO-1"),
            leg("O-1", OrderSide::Buy, OrderType::Market, None),
            leg("O-2", OrderSide::Sell, OrderType::StopMarket, Some(95)),
            Some(leg("O-3", OrderSide::Sell, OrderType::Limit, Some(110))),
        )
        .unwrap();

        let ids: Vec<String> = bracket.order_ids().into_iter().map(OrderId::into_inner).collect();
        assert_eq!(ids, ["O-1", "O-2", "O-3"]);
    }

    #[test]
    fn stop_loss_on_entry_side_is_rejected() {
        let result = AtomicOrder::new(
            AtomicOrderId::new("AO-1"),
            leg("O-1", OrderSide::Buy, OrderType::Market, None),
            leg("O-2", OrderSide::Buy, OrderType::StopMarket, Some(95)),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_leg_ids_are_rejected() {
        let result = AtomicOrder::new(
            AtomicOrderId::new("AO-1"),
            leg("O-1", OrderSide::Buy, OrderType::Market, None),
            leg("O-1", OrderSide::Sell, OrderType::StopMarket, Some(95)),
            None,
        );
        assert!(result.is_err());
    }
}
