//! In-memory store adapters.
//!
//! Back the reconciliation engine in tests and local development. The payment
//! store reproduces the compare-and-swap semantics the Postgres adapter gets
//! from `UPDATE ... WHERE status = 'pending'`.

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, OrderCode, PaymentId, Timestamp, UserId};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::subscription::{Plan, Subscription};
use crate::ports::{PaymentStore, PlanCatalog, SubscriptionStore, TransitionResult};

/// In-memory `PaymentStore`, keyed by order code.
pub struct InMemoryPaymentStore {
    payments: RwLock<HashMap<OrderCode, Payment>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self {
            payments: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored payments in the given status. Test helper.
    pub async fn count_by_status(&self, status: PaymentStatus) -> usize {
        self.payments
            .read()
            .await
            .values()
            .filter(|p| p.status == status)
            .count()
    }
}

impl Default for InMemoryPaymentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = self.payments.write().await;
        if payments.contains_key(&payment.order_code) {
            return Err(DomainError::validation(
                "order_code",
                format!("Order code {} already exists", payment.order_code),
            ));
        }
        payments.insert(payment.order_code, payment.clone());
        Ok(())
    }

    async fn get_by_order_code(
        &self,
        order_code: OrderCode,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self.payments.read().await.get(&order_code).cloned())
    }

    async fn set_gateway_order(
        &self,
        id: PaymentId,
        gateway_order_id: &str,
    ) -> Result<(), DomainError> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .values_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DomainError::database(format!("No payment with id {}", id)))?;
        payment.attach_gateway_order(gateway_order_id);
        Ok(())
    }

    async fn transition(&self, payment: &Payment) -> Result<TransitionResult, DomainError> {
        let mut payments = self.payments.write().await;
        let stored = payments
            .get_mut(&payment.order_code)
            .ok_or_else(|| DomainError::database(format!("No payment {}", payment.order_code)))?;

        if stored.status != PaymentStatus::Pending {
            return Ok(TransitionResult::AlreadyTerminal(stored.status));
        }
        *stored = payment.clone();
        Ok(TransitionResult::Applied)
    }
}

/// In-memory `SubscriptionStore`.
pub struct InMemorySubscriptionStore {
    subscriptions: RwLock<HashMap<crate::domain::foundation::SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored subscriptions. Test helper.
    pub async fn count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

impl Default for InMemorySubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.subscriptions
            .write()
            .await
            .insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn find_active_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .find(|s| s.user_id == user_id && s.is_active)
            .cloned())
    }

    async fn deactivate_expired(&self, now: Timestamp) -> Result<u64, DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        let mut count = 0;
        for subscription in subscriptions.values_mut() {
            if subscription.is_active && subscription.end_date.is_before(&now) {
                subscription.deactivate();
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Fixed plan catalog serving the two standard tiers.
pub struct StaticPlanCatalog {
    plans: Vec<Plan>,
}

impl StaticPlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self { plans }
    }
}

/// The plan set offered when none is configured.
static DEFAULT_PLANS: Lazy<Vec<Plan>> = Lazy::new(|| vec![Plan::monthly(), Plan::yearly()]);

impl Default for StaticPlanCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_PLANS.clone())
    }
}

#[async_trait]
impl PlanCatalog for StaticPlanCatalog {
    async fn active_plans(&self) -> Result<Vec<Plan>, DomainError> {
        Ok(self.plans.clone())
    }
}
