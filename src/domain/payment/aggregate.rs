//! Payment aggregate entity.
//!
//! One Payment represents one attempted purchase. The aggregate never gets
//! deleted; it only moves through the `PaymentStatus` state machine, and the
//! order code is the sole correlation key for gateway events.

use crate::domain::foundation::{
    DomainError, ErrorCode, OrderCode, PaymentId, StateMachine, SubscriptionId, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

use super::PaymentStatus;

/// Payment aggregate.
///
/// # Invariants
///
/// - `order_code` is globally unique and immutable once assigned
/// - `amount` and `currency` are immutable after creation
/// - status only ever moves `Pending -> {Completed, Failed, Cancelled}`
/// - `updated_at` is bumped on every status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier for this payment.
    pub id: PaymentId,

    /// User who initiated the purchase.
    pub user_id: UserId,

    /// Gateway-facing correlation key.
    pub order_code: OrderCode,

    /// Amount in minor currency units.
    pub amount: i64,

    /// ISO currency code.
    pub currency: String,

    /// Gateway order reference, set once the gateway acknowledges the order.
    pub gateway_order_id: Option<String>,

    /// Gateway transaction reference, set on settlement.
    pub gateway_transaction_id: Option<String>,

    /// Current lifecycle status.
    pub status: PaymentStatus,

    /// Subscription activated by this payment, set only on completion.
    pub subscription_id: Option<SubscriptionId>,

    /// Raw gateway payload stored when the payment fails, for diagnostics.
    pub failure_payload: Option<String>,

    /// When the payment was created.
    pub created_at: Timestamp,

    /// When the payment was last updated.
    pub updated_at: Timestamp,
}

impl Payment {
    /// Creates a new pending payment for an order about to be placed.
    pub fn create(user_id: UserId, order_code: OrderCode, amount: i64, currency: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: PaymentId::new(),
            user_id,
            order_code,
            amount,
            currency: currency.into(),
            gateway_order_id: None,
            gateway_transaction_id: None,
            status: PaymentStatus::Pending,
            subscription_id: None,
            failure_payload: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the payment has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Records the gateway's order reference after the remote call succeeds.
    pub fn attach_gateway_order(&mut self, gateway_order_id: impl Into<String>) {
        self.gateway_order_id = Some(gateway_order_id.into());
        self.updated_at = Timestamp::now();
    }

    /// Marks the payment completed and links the activated subscription.
    ///
    /// # Errors
    ///
    /// Returns error if the payment is not `Pending`.
    pub fn complete(
        &mut self,
        subscription_id: SubscriptionId,
        gateway_transaction_id: Option<String>,
    ) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Completed)?;
        self.subscription_id = Some(subscription_id);
        if gateway_transaction_id.is_some() {
            self.gateway_transaction_id = gateway_transaction_id;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the payment failed, keeping the raw gateway payload.
    ///
    /// # Errors
    ///
    /// Returns error if the payment is not `Pending`.
    pub fn fail(&mut self, raw_payload: Option<String>) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Failed)?;
        self.failure_payload = raw_payload;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the payment cancelled.
    ///
    /// # Errors
    ///
    /// Returns error if the payment is not `Pending`.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Cancelled)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    fn transition_to(&mut self, target: PaymentStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot transition payment from {} to {}", self.status, target),
            )
        })?;
        Ok(())
    }
}
