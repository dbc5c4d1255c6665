//! Subscription persistence port.

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::subscription::Subscription;
use async_trait::async_trait;

/// Port for durable Subscription storage.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Inserts or updates a subscription.
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Finds the user's active subscription, if any.
    ///
    /// A user has at most one active subscription; stores enforce this.
    async fn find_active_by_user(&self, user_id: UserId)
        -> Result<Option<Subscription>, DomainError>;

    /// Flips every active subscription whose window ended before `now` to
    /// inactive, returning how many were touched.
    async fn deactivate_expired(&self, now: Timestamp) -> Result<u64, DomainError>;
}
