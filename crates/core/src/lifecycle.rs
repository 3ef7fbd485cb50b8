//! Order status lifecycle.
//!
//! ```text
//! pending -> confirmed -> processing -> shipped -> delivered -> returned
//!    |           |            |
//!    +-----------+------------+--> cancelled
//! ```
//!
//! Forward moves advance exactly one canonical step. `cancelled` and
//! `returned` are absorbing.

use serde::Serialize;
use thiserror::Error;

use crate::types::OrderStatus;

/// The canonical forward sequence shown on progress bars.
pub const CANONICAL_STEPS: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
];

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid status transition from {from} to {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Position in [`CANONICAL_STEPS`], or `None` for side states.
    #[must_use]
    pub fn step_index(self) -> Option<usize> {
        CANONICAL_STEPS.iter().position(|step| *step == self)
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned)
    }

    /// Whether the customer may still cancel the order themselves.
    #[must_use]
    pub const fn is_customer_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Statuses reachable from this one in a single transition.
    #[must_use]
    pub const fn next_statuses(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered => &[Self::Returned],
            Self::Cancelled | Self::Returned => &[],
        }
    }

    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.next_statuses().contains(&next)
    }

    /// Validate and perform a transition.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if `next` is not reachable from `self`.
    pub fn transition(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

/// One step of the order progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStep {
    pub status: OrderStatus,
    pub label: &'static str,
    pub completed: bool,
    pub active: bool,
}

/// Progress of an order along the canonical steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProgress {
    pub steps: Vec<ProgressStep>,
    /// Set when the order left the canonical path (`cancelled`/`returned`).
    pub side_state: Option<OrderStatus>,
}

/// Compute progress-bar steps for `current`.
///
/// Steps up to and including the current one are completed; the current
/// one is also active. Side states complete nothing.
#[must_use]
pub fn progress(current: OrderStatus) -> OrderProgress {
    let current_index = current.step_index();

    let steps = CANONICAL_STEPS
        .iter()
        .enumerate()
        .map(|(index, status)| ProgressStep {
            status: *status,
            label: status.label(),
            completed: current_index.is_some_and(|c| index <= c),
            active: current_index == Some(index),
        })
        .collect();

    OrderProgress {
        steps,
        side_state: current_index.is_none().then_some(current),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_shipped() {
        let progress = progress(OrderStatus::Shipped);
        let by_status = |s: OrderStatus| {
            progress
                .steps
                .iter()
                .find(|step| step.status == s)
                .copied()
                .unwrap()
        };

        for s in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
        ] {
            assert!(by_status(s).completed, "{s} should be completed");
        }
        assert!(by_status(OrderStatus::Shipped).active);
        assert!(!by_status(OrderStatus::Processing).active);

        let delivered = by_status(OrderStatus::Delivered);
        assert!(!delivered.completed);
        assert!(!delivered.active);
        assert_eq!(progress.side_state, None);
    }

    #[test]
    fn test_progress_cancelled() {
        let progress = progress(OrderStatus::Cancelled);
        assert!(progress.steps.iter().all(|s| !s.completed && !s.active));
        assert_eq!(progress.side_state, Some(OrderStatus::Cancelled));
    }

    #[test]
    fn test_forward_transitions_one_step() {
        for pair in CANONICAL_STEPS.windows(2) {
            if let [from, to] = pair {
                assert_eq!(from.transition(*to), Ok(*to));
            }
        }
    }

    #[test]
    fn test_skipping_steps_rejected() {
        let err = OrderStatus::Pending
            .transition(OrderStatus::Delivered)
            .unwrap_err();
        assert_eq!(err.from, OrderStatus::Pending);
        assert_eq!(err.to, OrderStatus::Delivered);
        assert_eq!(
            err.to_string(),
            "invalid status transition from pending to delivered"
        );
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Processing));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_side_states() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Returned));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Returned));
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        for terminal in [OrderStatus::Cancelled, OrderStatus::Returned] {
            assert!(terminal.is_terminal());
            for next in OrderStatus::ALL {
                assert!(terminal.transition(next).is_err());
            }
        }
    }

    #[test]
    fn test_customer_cancellation_window() {
        assert!(OrderStatus::Pending.is_customer_cancellable());
        assert!(OrderStatus::Confirmed.is_customer_cancellable());
        assert!(!OrderStatus::Processing.is_customer_cancellable());
    }
}
