//! Prometheus metrics for the execution gateway.
//!
//! Covers wire traffic, throttling, the order manager and event fan-out.
//!
//! # Example
//!
//! ```ignore
//! use execution_gateway::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::default();
//! init_metrics(&config)?;
//!
//! record_message_received("Command");
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for payload size measurements (in bytes).
    pub size_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            // Size buckets from 64B to 1MB
            size_buckets: vec![
                64.0,
                256.0,
                1024.0,
                4096.0,
                16384.0,
                65536.0,
                262_144.0,
                1_048_576.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.size_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Wire Protocol Metrics
// ============================================================================

/// Record an inbound frame set accepted for processing.
///
/// # Arguments
///
/// * `message_kind` - Type frame of the message (e.g., "Request", "Command")
pub fn record_message_received(message_kind: &str) {
    counter!("messages_received_total", "kind" => message_kind.to_string()).increment(1);
}

/// Record an outbound reply.
///
/// # Arguments
///
/// * `response_type` - Response variant (e.g., "Connected", "MessageRejected")
/// * `payload_bytes` - Uncompressed payload length
pub fn record_message_sent(response_type: &str, payload_bytes: usize) {
    counter!("messages_sent_total", "response" => response_type.to_string()).increment(1);

    #[allow(clippy::cast_precision_loss)]
    histogram!("message_payload_bytes", "direction" => "outbound").record(payload_bytes as f64);
}

/// Record an inbound message rejected at the protocol edge.
///
/// # Arguments
///
/// * `reason` - Stable rejection code (e.g., `"MALFORMED_FRAMES"`)
pub fn record_message_rejected(reason: &str) {
    counter!("messages_rejected_total", "reason" => reason.to_string()).increment(1);
}

/// Update the open sessions gauge.
pub fn update_open_sessions(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("open_sessions").set(count as f64);
}

// ============================================================================
// Throttling Metrics
// ============================================================================

/// Update a throttler's queue depth.
pub fn update_throttle_queue_depth(throttler: &str, depth: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("throttle_queue_depth", "throttler" => throttler.to_string()).set(depth as f64);
}

/// Record a message released by a throttler.
pub fn record_throttle_released(throttler: &str) {
    counter!("throttle_released_total", "throttler" => throttler.to_string()).increment(1);
}

// ============================================================================
// Order Manager Metrics
// ============================================================================

/// Record a command forwarded to the execution client.
///
/// # Arguments
///
/// * `command_type` - Command name (e.g., "SubmitOrder", "ModifyOrder")
pub fn record_command_forwarded(command_type: &str) {
    counter!("commands_forwarded_total", "command" => command_type.to_string()).increment(1);
}

/// Record a command buffered because its order is not yet known.
pub fn record_command_buffered(command_type: &str) {
    counter!("commands_buffered_total", "command" => command_type.to_string()).increment(1);
}

/// Update the active and completed order gauges.
pub fn update_order_partitions(active: usize, completed: usize) {
    #[allow(clippy::cast_precision_loss)]
    {
        gauge!("orders_active").set(active as f64);
        gauge!("orders_completed").set(completed as f64);
    }
}

// ============================================================================
// Event Publisher Metrics
// ============================================================================

/// Record an event handed to the publisher.
///
/// # Arguments
///
/// * `event_type` - Event name (e.g., `"ORDER_FILLED"`)
pub fn record_event_published(event_type: &str) {
    counter!("events_published_total", "event" => event_type.to_string()).increment(1);
}
