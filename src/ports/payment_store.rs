//! Payment persistence port.

use crate::domain::foundation::{DomainError, OrderCode, PaymentId};
use crate::domain::payment::{Payment, PaymentStatus};
use async_trait::async_trait;

/// Result of attempting to commit a terminal transition.
///
/// `AlreadyTerminal` means another writer won the race; the carried status is
/// what the store actually holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// The transition was committed.
    Applied,

    /// The stored payment had already left `Pending`.
    AlreadyTerminal(PaymentStatus),
}

/// Port for durable Payment storage.
///
/// Implementations must provide at least read-your-writes consistency and a
/// compare-and-swap `transition` so that only one writer can ever move a
/// payment out of `Pending`.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persists a newly created payment.
    async fn save(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Looks up a payment by its order code.
    async fn get_by_order_code(&self, order_code: OrderCode)
        -> Result<Option<Payment>, DomainError>;

    /// Records the gateway order reference on a pending payment.
    async fn set_gateway_order(
        &self,
        id: PaymentId,
        gateway_order_id: &str,
    ) -> Result<(), DomainError>;

    /// Commits a terminal state, but only if the stored row is still
    /// `Pending`.
    ///
    /// The given payment carries the desired terminal state and its side
    /// fields (`subscription_id`, `gateway_transaction_id`,
    /// `failure_payload`); the store writes them atomically with the status.
    async fn transition(&self, payment: &Payment) -> Result<TransitionResult, DomainError>;
}
