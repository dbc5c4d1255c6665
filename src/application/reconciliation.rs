//! Payment order reconciliation engine.
//!
//! The engine owns the Payment state machine. Webhook delivery and active
//! status polling are two observation channels for the same gateway outcome;
//! both funnel into the single `resolve` function, which is the only code
//! path that can move a payment out of `Pending`. Duplicate and racing
//! deliveries collapse onto the recorded terminal state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode, OrderCode, SubscriptionId, UserId};
use crate::domain::payment::{Payment, PaymentOutcome, PaymentStatus, WebhookVerifier};
use crate::domain::subscription::PlanType;
use crate::ports::{
    CreateOrderRequest, GatewayOrderStatus, PaymentGateway, PaymentStore, PlanCatalog,
    TransitionResult,
};

use super::SubscriptionManager;

/// Command to open a checkout for a plan purchase.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub return_url: String,
    pub cancel_url: String,
    pub buyer_email: Option<String>,
}

/// What the caller needs to send the buyer to checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutInfo {
    pub checkout_url: String,
    pub order_code: OrderCode,
}

/// Snapshot of a payment's state, returned by `verify_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStatusSummary {
    pub order_code: OrderCode,
    pub status: PaymentStatus,
    pub subscription_id: Option<SubscriptionId>,
}

impl PaymentStatusSummary {
    fn of(payment: &Payment) -> Self {
        Self {
            order_code: payment.order_code,
            status: payment.status,
            subscription_id: payment.subscription_id,
        }
    }
}

/// Orchestrates order creation and drives payments to a terminal state
/// exactly once.
pub struct ReconciliationEngine {
    gateway: Arc<dyn PaymentGateway>,
    payments: Arc<dyn PaymentStore>,
    plans: Arc<dyn PlanCatalog>,
    subscriptions: Arc<SubscriptionManager>,
    verifier: WebhookVerifier,
    currency: String,
    /// Per-order locks guarding `resolve`. Entries are pruned once the order
    /// is terminal; recreating a pruned entry is harmless because terminal
    /// states absorb every later transition attempt.
    order_locks: Mutex<HashMap<OrderCode, Arc<Mutex<()>>>>,
}

impl ReconciliationEngine {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        payments: Arc<dyn PaymentStore>,
        plans: Arc<dyn PlanCatalog>,
        subscriptions: Arc<SubscriptionManager>,
        verifier: WebhookVerifier,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            payments,
            plans,
            subscriptions,
            verifier,
            currency: currency.into(),
            order_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a gateway order for a plan purchase.
    ///
    /// The local `Pending` payment row is written before the remote call, so
    /// a crash mid-way still leaves an order that `verify_order` can later
    /// reconcile. If the gateway call fails the payment stays `Pending`; it
    /// is never auto-failed, because the gateway may in fact have processed
    /// the order.
    pub async fn create_order(
        &self,
        cmd: CreateOrderCommand,
    ) -> Result<CheckoutInfo, DomainError> {
        let plan = self.plans.plan_for(cmd.plan_type).await?;
        let order_code = OrderCode::generate();

        let payment = Payment::create(cmd.user_id, order_code, plan.price, self.currency.clone());
        self.payments.save(&payment).await?;
        tracing::info!(
            %order_code,
            user_id = %cmd.user_id,
            plan = %cmd.plan_type,
            amount = plan.price,
            "Pending payment recorded"
        );

        let created = self
            .gateway
            .create_order(CreateOrderRequest {
                order_code,
                amount: plan.price,
                currency: self.currency.clone(),
                description: plan.description,
                buyer_email: cmd.buyer_email,
                return_url: cmd.return_url,
                cancel_url: cmd.cancel_url,
            })
            .await
            .map_err(|e| {
                tracing::error!(%order_code, error = %e, "Gateway order creation failed");
                DomainError::from(e)
            })?;

        self.payments
            .set_gateway_order(payment.id, &created.gateway_order_id)
            .await?;

        Ok(CheckoutInfo {
            checkout_url: created.checkout_url,
            order_code,
        })
    }

    /// Ingests a gateway webhook notification.
    ///
    /// Returns `Ok(true)` when the payment is (or already was) completed,
    /// `Ok(false)` when the notification recorded a failure. Integrity
    /// problems - bad checksum, malformed body, unknown order - are errors
    /// with no state change.
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<bool, DomainError> {
        let notification = self.verifier.verify(raw_body, signature).map_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook notification");
            DomainError::new(ErrorCode::InvalidWebhook, e.to_string())
        })?;
        let order_code = notification.order_code;

        let payment = self
            .payments
            .get_by_order_code(order_code)
            .await?
            .ok_or_else(|| {
                tracing::warn!(%order_code, "Webhook for unknown order code");
                DomainError::payment_not_found(order_code)
            })?;

        // Idempotency gate: a duplicate success delivery must not re-run
        // activation.
        if payment.status == PaymentStatus::Completed {
            tracing::debug!(%order_code, "Webhook replay for completed payment");
            return Ok(true);
        }

        let outcome = notification.to_outcome(raw_body);
        let resolved = self.resolve(order_code, outcome).await?;
        Ok(resolved.status == PaymentStatus::Completed)
    }

    /// Polls the gateway for an order whose webhook never arrived.
    ///
    /// Already-terminal payments are answered from the store without a
    /// gateway call. An order the gateway still reports open is left
    /// untouched.
    pub async fn verify_order(
        &self,
        order_code: OrderCode,
    ) -> Result<PaymentStatusSummary, DomainError> {
        let payment = self
            .payments
            .get_by_order_code(order_code)
            .await?
            .ok_or_else(|| DomainError::payment_not_found(order_code))?;

        if payment.is_terminal() {
            return Ok(PaymentStatusSummary::of(&payment));
        }

        // Fall back to the order code when the gateway never acknowledged the
        // order: the gateway keys orders by the code we sent it.
        let gateway_ref = payment
            .gateway_order_id
            .clone()
            .unwrap_or_else(|| order_code.to_string());

        let info = self.gateway.get_order(&gateway_ref).await.map_err(|e| {
            tracing::warn!(%order_code, error = %e, "Status poll failed");
            DomainError::from(e)
        })?;

        let outcome = match info.status {
            GatewayOrderStatus::Paid => PaymentOutcome::Succeeded {
                reference: info.reference,
            },
            GatewayOrderStatus::Cancelled | GatewayOrderStatus::Expired => PaymentOutcome::Cancelled,
            GatewayOrderStatus::Failed => PaymentOutcome::Failed {
                result_code: "FAILED".to_string(),
                raw_payload: None,
            },
            open => {
                tracing::debug!(%order_code, status = ?open, "Order still open at gateway");
                return Ok(PaymentStatusSummary::of(&payment));
            }
        };

        let resolved = self.resolve(order_code, outcome).await?;
        Ok(PaymentStatusSummary::of(&resolved))
    }

    /// Cancels an open order on behalf of its owner.
    ///
    /// Returns `false` without side effects unless the payment exists, is
    /// owned by the caller, and is still `Pending`.
    pub async fn cancel_order(
        &self,
        user_id: UserId,
        order_code: OrderCode,
    ) -> Result<bool, DomainError> {
        let payment = match self.payments.get_by_order_code(order_code).await? {
            Some(p) => p,
            None => return Ok(false),
        };

        if payment.user_id != user_id {
            tracing::warn!(%order_code, %user_id, "Cancel refused: not the owner");
            return Ok(false);
        }
        if payment.status != PaymentStatus::Pending {
            return Ok(false);
        }

        let gateway_ref = payment
            .gateway_order_id
            .clone()
            .unwrap_or_else(|| order_code.to_string());

        // A gateway that no longer knows the order cannot object to the
        // cancellation; everything else is surfaced.
        match self.gateway.cancel_order(&gateway_ref, "cancelled by buyer").await {
            Ok(()) => {}
            Err(e) if e.code == crate::ports::GatewayErrorCode::NotFound => {
                tracing::debug!(%order_code, "Order unknown to gateway, cancelling locally");
            }
            Err(e) => return Err(DomainError::from(e)),
        }

        let resolved = self.resolve(order_code, PaymentOutcome::Cancelled).await?;
        Ok(resolved.status == PaymentStatus::Cancelled)
    }

    /// The single function that moves a payment out of `Pending`.
    ///
    /// Both reconciliation entry points call this with an outcome gathered
    /// from their own channel. The per-order lock is held only around the
    /// local transition, never across gateway I/O, and the store transition
    /// is a compare-and-swap so a racing writer in another process is
    /// observed as already-terminal rather than overwritten.
    async fn resolve(
        &self,
        order_code: OrderCode,
        outcome: PaymentOutcome,
    ) -> Result<Payment, DomainError> {
        let lock = self.order_lock(order_code).await;
        let _guard = lock.lock().await;

        let mut payment = self
            .payments
            .get_by_order_code(order_code)
            .await?
            .ok_or_else(|| DomainError::payment_not_found(order_code))?;

        if payment.is_terminal() {
            tracing::debug!(%order_code, status = %payment.status, "Already terminal, outcome absorbed");
            return Ok(payment);
        }

        match outcome {
            PaymentOutcome::Succeeded { reference } => {
                let subscription = self
                    .subscriptions
                    .activate_or_renew(payment.user_id, payment.amount, order_code)
                    .await?;
                payment.complete(subscription.id, reference)?;
            }
            PaymentOutcome::Failed {
                result_code,
                raw_payload,
            } => {
                tracing::warn!(%order_code, result_code, "Gateway reported payment failure");
                payment.fail(raw_payload)?;
            }
            PaymentOutcome::Cancelled => {
                payment.cancel()?;
            }
        }

        match self.payments.transition(&payment).await? {
            TransitionResult::Applied => {
                tracing::info!(%order_code, status = %payment.status, "Payment resolved");
                self.prune_order_lock(order_code).await;
                Ok(payment)
            }
            TransitionResult::AlreadyTerminal(stored) => {
                tracing::info!(%order_code, status = %stored, "Lost resolve race, keeping stored state");
                self.prune_order_lock(order_code).await;
                self.payments
                    .get_by_order_code(order_code)
                    .await?
                    .ok_or_else(|| DomainError::payment_not_found(order_code))
            }
        }
    }

    async fn order_lock(&self, order_code: OrderCode) -> Arc<Mutex<()>> {
        let mut locks = self.order_locks.lock().await;
        locks.entry(order_code).or_default().clone()
    }

    async fn prune_order_lock(&self, order_code: OrderCode) {
        let mut locks = self.order_locks.lock().await;
        locks.remove(&order_code);
    }
}
