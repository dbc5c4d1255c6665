//! Payment domain: the Payment aggregate, its status state machine, the
//! outcome vocabulary shared by webhook and polling reconciliation, and
//! webhook payload verification.

mod aggregate;
mod outcome;
mod status;
mod webhook;
mod webhook_verifier;

pub use aggregate::Payment;
pub use outcome::PaymentOutcome;
pub use status::PaymentStatus;
pub use webhook::WebhookNotification;
pub use webhook_verifier::{sign_body, WebhookError, WebhookVerifier};

/// Result code the gateway uses to signal a successful payment.
pub const RESULT_CODE_SUCCESS: &str = "00";
