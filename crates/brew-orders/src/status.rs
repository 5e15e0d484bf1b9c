//! Order status state machine.
//!
//! ```text
//!   pending ──► in_progress ──► completed (terminal)
//! ```
//!
//! Exactly one forward step is legal from each non-terminal state. Skipping,
//! going backward, re-entering the same state and leaving `completed` are all
//! rejected with [`TransitionError`].

use brew_schemas::OrderStatus;

use crate::TransitionError;

/// The single legal successor of `status`, if any.
pub fn next_status(status: OrderStatus) -> Option<OrderStatus> {
    match status {
        OrderStatus::Pending => Some(OrderStatus::InProgress),
        OrderStatus::InProgress => Some(OrderStatus::Completed),
        OrderStatus::Completed => None,
    }
}

/// Returns `true` if no further transitions are possible.
pub fn is_terminal(status: OrderStatus) -> bool {
    next_status(status).is_none()
}

/// An accepted status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl StatusChange {
    /// Completion time is written iff the change lands on `completed`.
    pub fn stamps_completion(&self) -> bool {
        self.to == OrderStatus::Completed
    }
}

/// Check `from -> to` against the state machine.
pub fn check_transition(
    from: OrderStatus,
    to: OrderStatus,
) -> Result<StatusChange, TransitionError> {
    match next_status(from) {
        Some(next) if next == to => Ok(StatusChange { from, to }),
        _ => Err(TransitionError { from, to }),
    }
}
