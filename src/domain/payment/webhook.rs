//! Inbound webhook notification payload.

use serde::{Deserialize, Serialize};

use super::{PaymentOutcome, RESULT_CODE_SUCCESS};
use crate::domain::foundation::OrderCode;

/// Notification body the gateway POSTs when an order settles or fails.
///
/// The transport layer hands over the raw body; this is the parsed,
/// structurally valid form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookNotification {
    /// Echo of the locally generated order code.
    pub order_code: OrderCode,

    /// Gateway result code; `"00"` means success.
    pub result_code: String,

    /// Gateway transaction reference.
    #[serde(default)]
    pub reference: Option<String>,

    /// Human-readable result description, if the gateway includes one.
    #[serde(default)]
    pub description: Option<String>,
}

impl WebhookNotification {
    /// Whether the result code signals a settled payment.
    pub fn is_success(&self) -> bool {
        self.result_code == RESULT_CODE_SUCCESS
    }

    /// Reduces this notification to the outcome vocabulary, carrying the raw
    /// body along for failure diagnostics.
    pub fn to_outcome(&self, raw_body: &[u8]) -> PaymentOutcome {
        if self.is_success() {
            PaymentOutcome::Succeeded {
                reference: self.reference.clone(),
            }
        } else {
            PaymentOutcome::Failed {
                result_code: self.result_code.clone(),
                raw_payload: Some(String::from_utf8_lossy(raw_body).into_owned()),
            }
        }
    }
}
