//! Order execution errors.

use std::fmt;

use super::value_objects::OrderStatus;

/// Errors that can occur in order execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Invalid state transition attempted.
    InvalidStateTransition {
        /// Current order status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid order parameters.
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },

    /// Event applied to the wrong order.
    OrderIdMismatch {
        /// Order the event was applied to.
        expected: String,
        /// Order named by the event.
        actual: String,
    },
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { from, to, reason } => {
                write!(
                    f,
                    "Invalid order state transition: {from} -> {to}: {reason}"
                )
            }
            Self::InvalidParameters { field, message } => {
                write!(f, "Invalid order parameter '{field}': {message}")
            }
            Self::OrderIdMismatch { expected, actual } => {
                write!(f, "Event for order {actual} applied to order {expected}")
            }
        }
    }
}

impl std::error::Error for OrderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_error_invalid_state_transition_display() {
        let err = OrderError::InvalidStateTransition {
            from: OrderStatus::Initialized,
            to: OrderStatus::Filled,
            reason: "Order must be working first".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("INITIALIZED"));
        assert!(msg.contains("FILLED"));
    }

    #[test]
    fn order_error_invalid_parameters_display() {
        let err = OrderError::InvalidParameters {
            field: "price".to_string(),
            message: "Limit orders require a price".to_string(),
        };
        assert!(err.to_string().contains("'price'"));
    }
}
