//! Payment status state machine.
//!
//! A payment leaves `Pending` exactly once, into one of three terminal
//! states. Terminal states are absorbing: no transition out of them is valid.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Order created locally, outcome not yet known.
    Pending,

    /// Gateway confirmed the payment; subscription activated.
    Completed,

    /// Gateway reported the payment failed or was declined.
    Failed,

    /// Cancelled by the user or by the gateway (expiry included).
    Cancelled,
}

impl PaymentStatus {
    /// Returns the wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// Parses the wire/database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Completed) | (Pending, Failed) | (Pending, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Completed, Failed, Cancelled],
            Completed | Failed | Cancelled => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_reaches_every_terminal_state() {
        let pending = PaymentStatus::Pending;
        assert!(pending.can_transition_to(&PaymentStatus::Completed));
        assert!(pending.can_transition_to(&PaymentStatus::Failed));
        assert!(pending.can_transition_to(&PaymentStatus::Cancelled));
    }

    #[test]
    fn terminal_states_are_absorbing() {
        for terminal in [
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            for target in [
                PaymentStatus::Pending,
                PaymentStatus::Completed,
                PaymentStatus::Failed,
                PaymentStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(&target));
            }
        }
    }

    #[test]
    fn pending_is_not_terminal() {
        assert!(!PaymentStatus::Pending.is_terminal());
    }

    #[test]
    fn status_round_trips_through_string() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("refunded"), None);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&PaymentStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
