//! Subscription lifecycle management.
//!
//! Creates or renews subscriptions when a payment completes, and runs the
//! periodic sweep that deactivates lapsed subscriptions. The sweep never
//! touches payment rows, so it is safe to run alongside reconciliation.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{DomainError, OrderCode, Timestamp, UserId};
use crate::domain::subscription::{PlanType, Subscription};
use crate::ports::SubscriptionStore;

/// Manages subscription creation, renewal, and expiry.
pub struct SubscriptionManager {
    subscriptions: Arc<dyn SubscriptionStore>,
}

impl SubscriptionManager {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>) -> Self {
        Self { subscriptions }
    }

    /// Activates a new subscription or extends the user's active one.
    ///
    /// The plan tier is derived from the paid amount; the gateway does not
    /// echo the originally requested plan. Calling this twice with the same
    /// `order_code` returns the subscription unchanged, so replays of an
    /// already-processed payment never double-extend.
    pub async fn activate_or_renew(
        &self,
        user_id: UserId,
        paid_amount: i64,
        order_code: OrderCode,
    ) -> Result<Subscription, DomainError> {
        let plan_type = PlanType::from_paid_amount(paid_amount);

        match self.subscriptions.find_active_by_user(user_id).await? {
            Some(existing) if existing.extended_by(order_code) => {
                tracing::debug!(
                    %user_id,
                    %order_code,
                    subscription_id = %existing.id,
                    "Subscription already extended by this order, skipping"
                );
                Ok(existing)
            }
            Some(mut existing) => {
                existing.extend(plan_type, order_code);
                self.subscriptions.save(&existing).await?;
                tracing::info!(
                    %user_id,
                    %order_code,
                    subscription_id = %existing.id,
                    plan = %plan_type,
                    "Subscription renewed"
                );
                Ok(existing)
            }
            None => {
                let subscription = Subscription::create(user_id, plan_type, order_code);
                self.subscriptions.save(&subscription).await?;
                tracing::info!(
                    %user_id,
                    %order_code,
                    subscription_id = %subscription.id,
                    plan = %plan_type,
                    "Subscription created"
                );
                Ok(subscription)
            }
        }
    }

    /// Deactivates every active subscription whose window has ended.
    pub async fn deactivate_expired(&self) -> Result<u64, DomainError> {
        let count = self
            .subscriptions
            .deactivate_expired(Timestamp::now())
            .await?;
        if count > 0 {
            tracing::info!(count, "Deactivated expired subscriptions");
        }
        Ok(count)
    }
}

/// Drives the expiry sweep on a fixed interval until the task is aborted.
///
/// Sweep failures are logged and the loop continues; a transient store error
/// must not stop future sweeps.
pub async fn run_expiry_sweep(manager: Arc<SubscriptionManager>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // The first tick fires immediately; skip it so startup is quiet.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(e) = manager.deactivate_expired().await {
            tracing::error!(error = %e, "Expiry sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::InMemorySubscriptionStore;
    use crate::domain::subscription::Plan;
    use uuid::Uuid;

    fn manager() -> (SubscriptionManager, Arc<InMemorySubscriptionStore>) {
        let store = Arc::new(InMemorySubscriptionStore::new());
        (SubscriptionManager::new(store.clone()), store)
    }

    fn test_user() -> UserId {
        UserId::from_uuid(Uuid::new_v4())
    }

    #[tokio::test]
    async fn first_activation_creates_subscription() {
        let (manager, _) = manager();
        let user = test_user();

        let sub = manager
            .activate_or_renew(user, Plan::monthly().price, OrderCode::generate())
            .await
            .unwrap();

        assert_eq!(sub.user_id, user);
        assert_eq!(sub.plan_type, PlanType::Monthly);
        assert!(sub.is_active);
    }

    #[tokio::test]
    async fn second_payment_extends_not_duplicates() {
        let (manager, store) = manager();
        let user = test_user();

        let first = manager
            .activate_or_renew(user, Plan::monthly().price, OrderCode::generate())
            .await
            .unwrap();
        let second = manager
            .activate_or_renew(user, Plan::monthly().price, OrderCode::generate())
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.end_date.is_after(&first.end_date));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn replay_of_same_order_does_not_double_extend() {
        let (manager, _) = manager();
        let user = test_user();
        let order = OrderCode::generate();

        let first = manager
            .activate_or_renew(user, Plan::monthly().price, order)
            .await
            .unwrap();
        let replay = manager
            .activate_or_renew(user, Plan::monthly().price, order)
            .await
            .unwrap();

        assert_eq!(first.id, replay.id);
        assert_eq!(first.end_date, replay.end_date);
    }

    #[tokio::test]
    async fn yearly_amount_selects_yearly_plan() {
        let (manager, _) = manager();

        let sub = manager
            .activate_or_renew(test_user(), Plan::yearly().price, OrderCode::generate())
            .await
            .unwrap();

        assert_eq!(sub.plan_type, PlanType::Yearly);
        assert_eq!(
            sub.end_date.duration_since(&sub.start_date).num_days(),
            365
        );
    }

    #[tokio::test]
    async fn sweep_deactivates_only_lapsed_subscriptions() {
        let (manager, store) = manager();

        let fresh = manager
            .activate_or_renew(test_user(), Plan::monthly().price, OrderCode::generate())
            .await
            .unwrap();

        let mut lapsed = Subscription::create(test_user(), PlanType::Monthly, OrderCode::generate());
        lapsed.end_date = Timestamp::now().add_days(-1);
        store.save(&lapsed).await.unwrap();

        let count = manager.deactivate_expired().await.unwrap();

        assert_eq!(count, 1);
        let still_active = store.find_active_by_user(fresh.user_id).await.unwrap();
        assert!(still_active.is_some());
        assert!(store.find_active_by_user(lapsed.user_id).await.unwrap().is_none());
    }
}
