//! Observability module for metrics.
//!
//! Prometheus export of wire, throttling and order-manager counters.
//! Tracing setup lives in [`crate::telemetry`].

mod metrics;

pub use metrics::{
    init_metrics, record_command_buffered, record_command_forwarded, record_event_published,
    record_message_received, record_message_rejected, record_message_sent,
    record_throttle_released, update_open_sessions, update_order_partitions,
    update_throttle_queue_depth, MetricsConfig, MetricsError,
};
