//! Order State Machine Service
//!
//! Pure transition rules for the order lifecycle. Both the aggregate and the
//! execution workers consult it; neither mutates state on a rejected edge.

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::OrderStatus;

/// Order State Machine for validating transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a state transition is valid.
    ///
    /// Self-transitions and anything leaving a terminal status are rejected.
    #[must_use]
    pub const fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            (OrderStatus::Pending, OrderStatus::Executing)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Executing, OrderStatus::Completed)
                | (OrderStatus::Executing, OrderStatus::Failed)
        )
    }

    /// Validate a state transition.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::can_transition(from, to) {
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
            OrderStatus::Completed => format!("Order already completed, cannot transition to {to}"),
            OrderStatus::Failed => format!("Order already failed, cannot transition to {to}"),
            _ if from == to => format!("Order is already {to}"),
            _ => format!("Invalid transition from {from} to {to}"),
        }
    }

    /// Get all valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .into_iter()
            .filter(|to| Self::can_transition(from, *to))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    use OrderStatus::{Completed, Executing, Failed, Pending};

    #[test_case(Pending, Executing => true)]
    #[test_case(Pending, Failed => true)]
    #[test_case(Executing, Completed => true)]
    #[test_case(Executing, Failed => true)]
    #[test_case(Pending, Pending => false)]
    #[test_case(Pending, Completed => false)]
    #[test_case(Executing, Pending => false)]
    #[test_case(Executing, Executing => false)]
    #[test_case(Completed, Pending => false)]
    #[test_case(Completed, Executing => false)]
    #[test_case(Completed, Completed => false)]
    #[test_case(Completed, Failed => false)]
    #[test_case(Failed, Pending => false)]
    #[test_case(Failed, Executing => false)]
    #[test_case(Failed, Completed => false)]
    #[test_case(Failed, Failed => false)]
    fn transition_table(from: OrderStatus, to: OrderStatus) -> bool {
        OrderStateMachine::can_transition(from, to)
    }

    #[test]
    fn exactly_four_edges_are_allowed() {
        let allowed = OrderStatus::ALL
            .iter()
            .flat_map(|from| OrderStatus::ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| OrderStateMachine::can_transition(*from, *to))
            .count();
        assert_eq!(allowed, 4);
    }

    #[test]
    fn no_transitions_from_terminal_states() {
        assert!(OrderStateMachine::valid_next_states(Completed).is_empty());
        assert!(OrderStateMachine::valid_next_states(Failed).is_empty());
    }

    #[test]
    fn valid_next_states_from_pending() {
        assert_eq!(
            OrderStateMachine::valid_next_states(Pending),
            vec![Executing, Failed]
        );
    }

    #[test]
    fn validate_transition_reports_both_statuses() {
        let Err(OrderError::InvalidStateTransition { from, to, reason }) =
            OrderStateMachine::validate_transition(Completed, Executing)
        else {
            panic!("expected InvalidStateTransition");
        };
        assert_eq!(from, Completed);
        assert_eq!(to, Executing);
        assert!(reason.contains("already completed"));
    }

    #[test]
    fn validate_transition_returns_ok_for_valid() {
        assert!(OrderStateMachine::validate_transition(Pending, Executing).is_ok());
    }

    #[test]
    fn self_transition_reason() {
        let reason = OrderStateMachine::transition_error_reason(Executing, Executing);
        assert!(reason.contains("already EXECUTING"));
    }
}
