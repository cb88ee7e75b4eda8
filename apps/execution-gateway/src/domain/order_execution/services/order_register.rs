//! Order Register
//!
//! Audit index of which trader/strategy owns which orders. Purely additive.

use std::collections::HashMap;

use crate::domain::shared::{OrderId, StrategyId, TraderId};

/// Lookup index `TraderId -> StrategyId -> [OrderId]`.
#[derive(Debug, Default, Clone)]
pub struct OrderRegister {
    index: HashMap<TraderId, HashMap<StrategyId, Vec<OrderId>>>,
    count: usize,
}

impl OrderRegister {
    /// Create an empty register.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `order_id` belongs to `trader_id`/`strategy_id`.
    ///
    /// Registering the same id twice under the same owner is logged and ignored.
    pub fn register(&mut self, trader_id: &TraderId, strategy_id: &StrategyId, order_id: &OrderId) {
        let orders = self
            .index
            .entry(trader_id.clone())
            .or_default()
            .entry(strategy_id.clone())
            .or_default();

        if orders.contains(order_id) {
            tracing::error!(
                trader_id = %trader_id,
                strategy_id = %strategy_id,
                order_id = %order_id,
                "Order already registered"
            );
            return;
        }

        orders.push(order_id.clone());
        self.count += 1;
    }

    /// All orders owned by a trader, across strategies.
    #[must_use]
    pub fn order_ids(&self, trader_id: &TraderId) -> Vec<OrderId> {
        self.index
            .get(trader_id)
            .map(|strategies| strategies.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Orders owned by one strategy of a trader, in registration order.
    #[must_use]
    pub fn order_ids_for_strategy(
        &self,
        trader_id: &TraderId,
        strategy_id: &StrategyId,
    ) -> Vec<OrderId> {
        self.index
            .get(trader_id)
            .and_then(|strategies| strategies.get(strategy_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether any owner has registered this order.
    #[must_use]
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index
            .values()
            .flat_map(HashMap::values)
            .any(|orders| orders.contains(order_id))
    }

    /// Number of registered orders.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if nothing has been registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trader() -> TraderId {
        TraderId::new("TESTER-000")
    }

    #[test]
    fn register_groups_by_strategy() {
        let mut register = OrderRegister::new();
        let ema = StrategyId::new("EMA-CROSS");
        let mr = StrategyId::new("MEAN-REV");

        register.register(&trader(), &ema, &OrderId::new("O-1"));
        register.register(&trader(), &ema, &OrderId::new("O-2"));
        register.register(&trader(), &mr, &OrderId::new("O-3"));

        assert_eq!(register.len(), 3);
        assert_eq!(
            register.order_ids_for_strategy(&trader(), &ema),
            vec![OrderId::new("O-1"), OrderId::new("O-2")]
        );
        let mut all = register.order_ids(&trader());
        all.sort();
        assert_eq!(all.len(), 3);
        assert!(register.contains(&OrderId::new("O-3")));
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let mut register = OrderRegister::new();
        let strategy = StrategyId::new("EMA-CROSS");

        register.register(&trader(), &strategy, &OrderId::new("O-1"));
        register.register(&trader(), &strategy, &OrderId::new("O-1"));

        assert_eq!(register.len(), 1);
        assert_eq!(register.order_ids_for_strategy(&trader(), &strategy).len(), 1);
    }

    #[test]
    fn unknown_trader_has_no_orders() {
        let register = OrderRegister::new();
        assert!(register.is_empty());
        assert!(register.order_ids(&trader()).is_empty());
        assert!(!register.contains(&OrderId::new("O-1")));
    }
}
