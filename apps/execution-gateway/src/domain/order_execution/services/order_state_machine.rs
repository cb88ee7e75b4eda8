//! Order State Machine Service
//!
//! Validates status transitions driven by broker events.

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::OrderStatus;

/// Order State Machine for validating transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            // From Initialized
            (OrderStatus::Initialized, OrderStatus::Submitted)
                | (OrderStatus::Initialized, OrderStatus::Rejected)
                | (OrderStatus::Initialized, OrderStatus::Cancelled)
                // From Submitted
                | (OrderStatus::Submitted, OrderStatus::Accepted)
                | (OrderStatus::Submitted, OrderStatus::Working)
                | (OrderStatus::Submitted, OrderStatus::Rejected)
                | (OrderStatus::Submitted, OrderStatus::Cancelled)
                // From Accepted
                | (OrderStatus::Accepted, OrderStatus::Working)
                | (OrderStatus::Accepted, OrderStatus::PartiallyFilled)
                | (OrderStatus::Accepted, OrderStatus::Filled)
                | (OrderStatus::Accepted, OrderStatus::Cancelled)
                | (OrderStatus::Accepted, OrderStatus::Expired)
                | (OrderStatus::Accepted, OrderStatus::Rejected)
                // From Working (Working -> Working is a confirmed modification)
                | (OrderStatus::Working, OrderStatus::Working)
                | (OrderStatus::Working, OrderStatus::PartiallyFilled)
                | (OrderStatus::Working, OrderStatus::Filled)
                | (OrderStatus::Working, OrderStatus::Cancelled)
                | (OrderStatus::Working, OrderStatus::Expired)
                // From PartiallyFilled
                | (OrderStatus::PartiallyFilled, OrderStatus::PartiallyFilled)
                | (OrderStatus::PartiallyFilled, OrderStatus::Filled)
                | (OrderStatus::PartiallyFilled, OrderStatus::Cancelled)
                | (OrderStatus::PartiallyFilled, OrderStatus::Expired)
        )
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is invalid.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from,
                to,
                reason: Self::transition_error_reason(from, to),
            })
        }
    }

    /// Get a human-readable reason for an invalid transition.
    #[must_use]
    pub fn transition_error_reason(from: OrderStatus, to: OrderStatus) -> String {
        match from {
            OrderStatus::Filled => format!("Order is already filled, cannot transition to {to}"),
            OrderStatus::Cancelled => format!("Order is cancelled, cannot transition to {to}"),
            OrderStatus::Rejected => format!("Order was rejected, cannot transition to {to}"),
            OrderStatus::Expired => format!("Order has expired, cannot transition to {to}"),
            _ => format!("Invalid transition from {from} to {to}"),
        }
    }

    /// Get all valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        match from {
            OrderStatus::Initialized => vec![
                OrderStatus::Submitted,
                OrderStatus::Rejected,
                OrderStatus::Cancelled,
            ],
            OrderStatus::Submitted => vec![
                OrderStatus::Accepted,
                OrderStatus::Working,
                OrderStatus::Rejected,
                OrderStatus::Cancelled,
            ],
            OrderStatus::Accepted => vec![
                OrderStatus::Working,
                OrderStatus::PartiallyFilled,
                OrderStatus::Filled,
                OrderStatus::Cancelled,
                OrderStatus::Expired,
                OrderStatus::Rejected,
            ],
            OrderStatus::Working => vec![
                OrderStatus::Working,
                OrderStatus::PartiallyFilled,
                OrderStatus::Filled,
                OrderStatus::Cancelled,
                OrderStatus::Expired,
            ],
            OrderStatus::PartiallyFilled => vec![
                OrderStatus::PartiallyFilled,
                OrderStatus::Filled,
                OrderStatus::Cancelled,
                OrderStatus::Expired,
            ],
            // Terminal states
            OrderStatus::Filled
            | OrderStatus::Cancelled
            | OrderStatus::Rejected
            | OrderStatus::Expired => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 9] = [
        OrderStatus::Initialized,
        OrderStatus::Submitted,
        OrderStatus::Accepted,
        OrderStatus::Rejected,
        OrderStatus::Working,
        OrderStatus::PartiallyFilled,
        OrderStatus::Filled,
        OrderStatus::Cancelled,
        OrderStatus::Expired,
    ];

    #[test]
    fn valid_next_states_matches_transition_table() {
        for from in ALL {
            let next = OrderStateMachine::valid_next_states(from);
            for to in ALL {
                assert_eq!(
                    OrderStateMachine::is_valid_transition(from, to),
                    next.contains(&to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn no_transitions_from_terminal_states() {
        for terminal in ALL.into_iter().filter(OrderStatus::is_terminal) {
            assert!(OrderStateMachine::valid_next_states(terminal).is_empty());
        }
    }

    #[test]
    fn working_can_be_modified_in_place() {
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::Working,
            OrderStatus::Working
        ));
    }

    #[test]
    fn submitted_may_skip_accepted() {
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::Submitted,
            OrderStatus::Working
        ));
    }

    #[test]
    fn validate_transition_returns_error_for_invalid() {
        let result =
            OrderStateMachine::validate_transition(OrderStatus::Filled, OrderStatus::Cancelled);
        let Err(err) = result else {
            panic!("expected invalid transition");
        };
        assert!(err.to_string().contains("already filled"));
    }

    #[test]
    fn validate_transition_returns_ok_for_valid() {
        let result =
            OrderStateMachine::validate_transition(OrderStatus::Initialized, OrderStatus::Submitted);
        assert!(result.is_ok());
    }
}
