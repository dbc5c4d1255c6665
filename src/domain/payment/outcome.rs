//! The outcome vocabulary both reconciliation entry points feed into the
//! engine's single completion function.
//!
//! Webhooks and status polls observe the gateway through different channels,
//! but both reduce to one of these outcomes before any local state changes.

use serde::{Deserialize, Serialize};

/// The gateway's verdict on a pending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentOutcome {
    /// Payment settled successfully.
    Succeeded {
        /// Gateway transaction reference, if reported.
        reference: Option<String>,
    },

    /// Payment failed or was declined.
    Failed {
        /// Gateway result code.
        result_code: String,
        /// Raw payload for diagnostics.
        raw_payload: Option<String>,
    },

    /// Order was cancelled or expired at the gateway.
    Cancelled,
}

impl PaymentOutcome {
    /// Convenience constructor for a successful outcome.
    pub fn succeeded(reference: impl Into<String>) -> Self {
        PaymentOutcome::Succeeded {
            reference: Some(reference.into()),
        }
    }

    /// Whether this outcome represents a settled payment.
    pub fn is_success(&self) -> bool {
        matches!(self, PaymentOutcome::Succeeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_succeeded_is_success() {
        assert!(PaymentOutcome::succeeded("ref").is_success());
        assert!(!PaymentOutcome::Cancelled.is_success());
        assert!(!PaymentOutcome::Failed {
            result_code: "97".to_string(),
            raw_payload: None,
        }
        .is_success());
    }
}
