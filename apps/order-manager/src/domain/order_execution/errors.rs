//! Order execution errors.

use std::fmt;

use super::value_objects::OrderStatus;

/// Errors raised by the order aggregate and its state machine.
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
        field: &'static str,
        /// Error message.
        message: String,
    },
}

impl OrderError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            field,
            message: message.into(),
        }
    }

    /// Returns true for construction-time validation failures.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidParameters { .. })
    }
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
        }
    }
}

impl std::error::Error for OrderError {}
