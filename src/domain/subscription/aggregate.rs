//! Subscription aggregate entity.
//!
//! A user has at most one active subscription. Subscriptions are created or
//! extended only by the subscription manager as a side effect of a payment
//! reaching `Completed`, and flipped inactive by the periodic expiry sweep.

use crate::domain::foundation::{OrderCode, SubscriptionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use super::PlanType;

/// Subscription aggregate - a user's access window to a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this subscription.
    pub id: SubscriptionId,

    /// Owning user.
    pub user_id: UserId,

    /// Plan tier this subscription grants.
    pub plan_type: PlanType,

    /// Start of the access window.
    pub start_date: Timestamp,

    /// End of the access window.
    pub end_date: Timestamp,

    /// Whether the subscription currently grants access.
    pub is_active: bool,

    /// Whether the subscription should renew automatically.
    pub auto_renew: bool,

    /// The order that last created or extended this subscription.
    ///
    /// Guards against double-extension when the same completed payment is
    /// replayed through activation.
    pub last_order_code: Option<OrderCode>,

    /// When the subscription was created.
    pub created_at: Timestamp,

    /// When the subscription was last updated.
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a fresh subscription starting now.
    pub fn create(user_id: UserId, plan_type: PlanType, order_code: OrderCode) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            user_id,
            plan_type,
            start_date: now,
            end_date: now.add_days(plan_type.duration_days()),
            is_active: true,
            auto_renew: false,
            last_order_code: Some(order_code),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this subscription has already been extended by the given order.
    pub fn extended_by(&self, order_code: OrderCode) -> bool {
        self.last_order_code == Some(order_code)
    }

    /// Extends the access window by one plan duration (renewal).
    ///
    /// Extension is anchored at the current end date so renewing early does
    /// not shorten the window.
    pub fn extend(&mut self, plan_type: PlanType, order_code: OrderCode) {
        let anchor = if self.end_date.is_after(&Timestamp::now()) {
            self.end_date
        } else {
            Timestamp::now()
        };
        self.plan_type = plan_type;
        self.end_date = anchor.add_days(plan_type.duration_days());
        self.is_active = true;
        self.last_order_code = Some(order_code);
        self.updated_at = Timestamp::now();
    }

    /// Whether the access window has passed.
    pub fn is_expired(&self) -> bool {
        self.end_date.is_before(&Timestamp::now())
    }

    /// Flips the subscription inactive. Used by the expiry sweep.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Timestamp::now();
    }
}
