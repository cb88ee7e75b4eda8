//! Fixtures shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::future::Future;
use std::time::Duration;

use execution_gateway::domain::order_execution::{
    AccountInquiry, CancelOrder, ModifyOrder, Order, OrderSide, SubmitOrder, TradingCommand,
};
use execution_gateway::domain::shared::{
    AccountId, InstrumentId, MessageId, OrderId, Price, Quantity, StrategyId, Timestamp, TraderId,
};

pub fn limit_order(id: &str, price: i64) -> Order {
    Order::limit(
        OrderId::new(id),
        InstrumentId::new("AUDUSD.FXCM"),
        OrderSide::Buy,
        Quantity::from_i64(100_000),
        Price::from(price),
    )
    .unwrap()
}

pub fn market_order(id: &str) -> Order {
    Order::market(
        OrderId::new(id),
        InstrumentId::new("AUDUSD.FXCM"),
        OrderSide::Sell,
        Quantity::from_i64(100_000),
    )
    .unwrap()
}

pub fn submit(order: Order) -> TradingCommand {
    SubmitOrder {
        id: MessageId::generate(),
        trader_id: TraderId::new("TESTER-000"),
        strategy_id: StrategyId::new("EMA-CROSS"),
        account_id: AccountId::new("SIM-001"),
        order,
        timestamp: Timestamp::now(),
    }
    .into()
}

pub fn modify(id: &str, price: i64) -> TradingCommand {
    ModifyOrder {
        id: MessageId::generate(),
        trader_id: TraderId::new("TESTER-000"),
        account_id: AccountId::new("SIM-001"),
        order_id: OrderId::new(id),
        modified_quantity: Quantity::from_i64(100_000),
        modified_price: Price::from(price),
        timestamp: Timestamp::now(),
    }
    .into()
}

pub fn cancel(id: &str) -> TradingCommand {
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

pub fn account_inquiry() -> TradingCommand {
    AccountInquiry {
        id: MessageId::generate(),
        trader_id: TraderId::new("TESTER-000"),
        account_id: AccountId::new("SIM-001"),
        timestamp: Timestamp::now(),
    }
    .into()
}

/// Poll `check` until it returns true or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 2s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
