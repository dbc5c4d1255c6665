//! Integration tests for the payment reconciliation flow.
//!
//! These tests walk complete purchase lifecycles through the public API:
//! 1. Order creation persists a pending payment and opens a checkout
//! 2. Webhook delivery and status polling both drive the payment terminal
//! 3. Completion activates or renews exactly one subscription
//! 4. Duplicate and racing observations collapse onto one recorded outcome
//!
//! Uses the in-memory stores and the mock gateway, so no external services
//! are required.

use std::sync::Arc;

use uuid::Uuid;

use sponsorbridge_payments::adapters::gateway::MockPaymentGateway;
use sponsorbridge_payments::adapters::store::{
    InMemoryPaymentStore, InMemorySubscriptionStore, StaticPlanCatalog,
};
use sponsorbridge_payments::application::{
    CreateOrderCommand, ReconciliationEngine, SubscriptionManager,
};
use sponsorbridge_payments::domain::foundation::{Timestamp, UserId};
use sponsorbridge_payments::domain::payment::{sign_body, PaymentStatus, WebhookVerifier};
use sponsorbridge_payments::domain::subscription::{Plan, PlanType};
use sponsorbridge_payments::ports::{PaymentStore, SubscriptionStore};

const SECRET: &str = "cs_integration_secret";

struct World {
    engine: Arc<ReconciliationEngine>,
    gateway: Arc<MockPaymentGateway>,
    payments: Arc<InMemoryPaymentStore>,
    subscriptions: Arc<InMemorySubscriptionStore>,
    manager: Arc<SubscriptionManager>,
}

fn world() -> World {
    let gateway = Arc::new(MockPaymentGateway::new());
    let payments = Arc::new(InMemoryPaymentStore::new());
    let subscriptions = Arc::new(InMemorySubscriptionStore::new());
    let manager = Arc::new(SubscriptionManager::new(subscriptions.clone()));
    let engine = Arc::new(ReconciliationEngine::new(
        gateway.clone(),
        payments.clone(),
        Arc::new(StaticPlanCatalog::default()),
        manager.clone(),
        WebhookVerifier::new(SECRET),
        "USD",
    ));
    World {
        engine,
        gateway,
        payments,
        subscriptions,
        manager,
    }
}

fn user() -> UserId {
    UserId::from_uuid(Uuid::new_v4())
}

fn order_command(user_id: UserId, plan_type: PlanType) -> CreateOrderCommand {
    CreateOrderCommand {
        user_id,
        plan_type,
        return_url: "https://app.test/billing/return".to_string(),
        cancel_url: "https://app.test/billing/cancel".to_string(),
        buyer_email: Some("buyer@example.com".to_string()),
    }
}

fn signed_webhook(order_code: impl std::fmt::Display, result_code: &str) -> (Vec<u8>, String) {
    let body = format!(
        r#"{{"orderCode":{},"resultCode":"{}","reference":"TXN-{}"}}"#,
        order_code, result_code, result_code
    )
    .into_bytes();
    let sig = sign_body(SECRET, &body);
    (body, sig)
}

#[tokio::test]
async fn monthly_purchase_walk() {
    let w = world();
    let buyer = user();

    // Checkout is opened and the local payment is pending.
    let checkout = w
        .engine
        .create_order(order_command(buyer, PlanType::Monthly))
        .await
        .unwrap();
    assert!(checkout.checkout_url.starts_with("https://"));

    // The gateway settles and notifies us.
    let (body, sig) = signed_webhook(checkout.order_code, "00");
    assert!(w.engine.handle_webhook(&body, Some(&sig)).await.unwrap());

    let payment = w
        .payments
        .get_by_order_code(checkout.order_code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.amount, Plan::monthly().price);

    // One active monthly subscription, running a full plan window from now.
    let sub = w
        .subscriptions
        .find_active_by_user(buyer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(Some(sub.id), payment.subscription_id);
    assert_eq!(sub.plan_type, PlanType::Monthly);
    let remaining = sub.end_date.duration_since(&Timestamp::now()).num_days();
    assert!((29..=30).contains(&remaining), "remaining {} days", remaining);
}

#[tokio::test]
async fn yearly_renewal_extends_the_same_subscription() {
    let w = world();
    let buyer = user();

    let first = w
        .engine
        .create_order(order_command(buyer, PlanType::Monthly))
        .await
        .unwrap();
    let (body, sig) = signed_webhook(first.order_code, "00");
    w.engine.handle_webhook(&body, Some(&sig)).await.unwrap();

    let original = w
        .subscriptions
        .find_active_by_user(buyer)
        .await
        .unwrap()
        .unwrap();

    // A second purchase upgrades to yearly and extends the same record.
    let second = w
        .engine
        .create_order(order_command(buyer, PlanType::Yearly))
        .await
        .unwrap();
    let (body, sig) = signed_webhook(second.order_code, "00");
    w.engine.handle_webhook(&body, Some(&sig)).await.unwrap();

    assert_eq!(w.subscriptions.count().await, 1);
    let renewed = w
        .subscriptions
        .find_active_by_user(buyer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renewed.id, original.id);
    assert_eq!(renewed.plan_type, PlanType::Yearly);
    // Anchored at the old end date: 30 + 365 days of access in total.
    assert_eq!(
        renewed.end_date.duration_since(&original.end_date).num_days(),
        365
    );
}

#[tokio::test]
async fn webhook_then_poll_does_not_double_extend() {
    let w = world();
    let buyer = user();
    let checkout = w
        .engine
        .create_order(order_command(buyer, PlanType::Monthly))
        .await
        .unwrap();

    let (body, sig) = signed_webhook(checkout.order_code, "00");
    w.engine.handle_webhook(&body, Some(&sig)).await.unwrap();

    // The same outcome observed again through the polling channel.
    w.gateway.mark_paid(checkout.order_code, "TXN-00").await;
    let summary = w.engine.verify_order(checkout.order_code).await.unwrap();

    assert_eq!(summary.status, PaymentStatus::Completed);
    assert_eq!(w.subscriptions.count().await, 1);
    let sub = w
        .subscriptions
        .find_active_by_user(buyer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.end_date.duration_since(&sub.start_date).num_days(), 30);
}

#[tokio::test]
async fn concurrent_duplicate_webhooks_activate_once() {
    let w = world();
    let buyer = user();
    let checkout = w
        .engine
        .create_order(order_command(buyer, PlanType::Monthly))
        .await
        .unwrap();
    let (body, sig) = signed_webhook(checkout.order_code, "00");

    let (a, b) = tokio::join!(
        w.engine.handle_webhook(&body, Some(&sig)),
        w.engine.handle_webhook(&body, Some(&sig)),
    );

    assert!(a.unwrap());
    assert!(b.unwrap());
    assert_eq!(w.subscriptions.count().await, 1);
    assert_eq!(w.payments.count_by_status(PaymentStatus::Completed).await, 1);
}

#[tokio::test]
async fn abandoned_checkout_is_reconciled_by_polling() {
    let w = world();
    let buyer = user();
    let checkout = w
        .engine
        .create_order(order_command(buyer, PlanType::Monthly))
        .await
        .unwrap();
    w.gateway.mark_cancelled(checkout.order_code).await;

    let summary = w.engine.verify_order(checkout.order_code).await.unwrap();

    assert_eq!(summary.status, PaymentStatus::Cancelled);
    assert!(summary.subscription_id.is_none());
    assert!(w
        .subscriptions
        .find_active_by_user(buyer)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn declined_payment_never_grants_access() {
    let w = world();
    let buyer = user();
    let checkout = w
        .engine
        .create_order(order_command(buyer, PlanType::Yearly))
        .await
        .unwrap();

    let (body, sig) = signed_webhook(checkout.order_code, "97");
    assert!(!w.engine.handle_webhook(&body, Some(&sig)).await.unwrap());

    let payment = w
        .payments
        .get_by_order_code(checkout.order_code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(payment.failure_payload.is_some());
    assert_eq!(w.subscriptions.count().await, 0);

    // A late success webhook for the same order is absorbed by the terminal
    // state, not replayed into a completion.
    let (body, sig) = signed_webhook(checkout.order_code, "00");
    assert!(!w.engine.handle_webhook(&body, Some(&sig)).await.unwrap());
    assert_eq!(w.subscriptions.count().await, 0);
}

#[tokio::test]
async fn missing_or_forged_signature_is_rejected() {
    let w = world();
    let checkout = w
        .engine
        .create_order(order_command(user(), PlanType::Monthly))
        .await
        .unwrap();
    let (body, _) = signed_webhook(checkout.order_code, "00");

    assert!(w.engine.handle_webhook(&body, None).await.is_err());
    let forged = sign_body("some-other-secret", &body);
    assert!(w.engine.handle_webhook(&body, Some(&forged)).await.is_err());

    let payment = w
        .payments
        .get_by_order_code(checkout.order_code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn buyer_cancels_their_own_pending_order() {
    let w = world();
    let buyer = user();
    let checkout = w
        .engine
        .create_order(order_command(buyer, PlanType::Monthly))
        .await
        .unwrap();

    assert!(w
        .engine
        .cancel_order(buyer, checkout.order_code)
        .await
        .unwrap());

    let summary = w.engine.verify_order(checkout.order_code).await.unwrap();
    assert_eq!(summary.status, PaymentStatus::Cancelled);

    // A success webhook arriving after the cancellation is absorbed.
    let (body, sig) = signed_webhook(checkout.order_code, "00");
    assert!(!w.engine.handle_webhook(&body, Some(&sig)).await.unwrap());
    assert_eq!(w.subscriptions.count().await, 0);
}

#[tokio::test]
async fn expiry_sweep_deactivates_lapsed_subscriptions() {
    let w = world();
    let buyer = user();
    let checkout = w
        .engine
        .create_order(order_command(buyer, PlanType::Monthly))
        .await
        .unwrap();
    let (body, sig) = signed_webhook(checkout.order_code, "00");
    w.engine.handle_webhook(&body, Some(&sig)).await.unwrap();

    // Age the subscription past its window.
    let mut sub = w
        .subscriptions
        .find_active_by_user(buyer)
        .await
        .unwrap()
        .unwrap();
    sub.end_date = Timestamp::now().add_days(-1);
    w.subscriptions.save(&sub).await.unwrap();

    let deactivated = w.manager.deactivate_expired().await.unwrap();

    assert_eq!(deactivated, 1);
    assert!(w
        .subscriptions
        .find_active_by_user(buyer)
        .await
        .unwrap()
        .is_none());

    // Idempotent: a second sweep finds nothing left to do.
    assert_eq!(w.manager.deactivate_expired().await.unwrap(), 0);
}
