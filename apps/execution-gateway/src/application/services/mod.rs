//! Application Services
//!
//! The actors of the execution path: throttlers, the command router that
//! chains them, and the order manager behind them.

mod command_router;
mod order_manager;
mod throttler;

pub use command_router::{
    COMMANDS_THROTTLER, CommandRouter, CommandRouterConfig, CommandRouterStats,
    NEW_ORDERS_THROTTLER,
};
pub use order_manager::{
    DEFAULT_ORDER_MANAGER_MAILBOX, OrderManager, OrderManagerHandle, OrderManagerMessage,
    OrderManagerSnapshot,
};
pub use throttler::{
    DEFAULT_THROTTLER_MAILBOX, MAX_THROTTLE_INTERVAL, ThrottleConfig, ThrottleError, Throttler,
    ThrottlerHandle, ThrottlerStats,
};
