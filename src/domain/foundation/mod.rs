//! Shared domain building blocks: identifiers, timestamps, errors, and the
//! state machine trait used by status enums.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{OrderCode, PaymentId, SubscriptionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
