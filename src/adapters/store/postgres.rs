//! PostgreSQL implementations of the payment and subscription stores.
//!
//! The payment store's `transition` is the concurrency linchpin: the terminal
//! status is written with `WHERE status = 'pending'` so the database, not the
//! process, decides which writer settles a contested payment.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, OrderCode, PaymentId, SubscriptionId, Timestamp, UserId,
};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::subscription::{PlanType, Subscription};
use crate::ports::{PaymentStore, SubscriptionStore, TransitionResult};

/// PostgreSQL implementation of the PaymentStore port.
pub struct PostgresPaymentStore {
    pool: PgPool,
}

impl PostgresPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    user_id: Uuid,
    order_code: i64,
    amount: i64,
    currency: String,
    gateway_order_id: Option<String>,
    gateway_transaction_id: Option<String>,
    status: String,
    subscription_id: Option<Uuid>,
    failure_payload: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status = PaymentStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid status value: {}", row.status),
            )
        })?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            order_code: OrderCode::from_raw(row.order_code),
            amount: row.amount,
            currency: row.currency,
            gateway_order_id: row.gateway_order_id,
            gateway_transaction_id: row.gateway_transaction_id,
            status,
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            failure_payload: row.failure_payload,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, user_id, order_code, amount, currency, gateway_order_id, \
     gateway_transaction_id, status, subscription_id, failure_payload, created_at, updated_at";

fn payment_id_not_found(id: PaymentId) -> DomainError {
    DomainError::new(
        ErrorCode::PaymentNotFound,
        format!("No payment found for id {}", id),
    )
}

#[async_trait]
impl PaymentStore for PostgresPaymentStore {
    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, user_id, order_code, amount, currency, gateway_order_id,
                gateway_transaction_id, status, subscription_id, failure_payload,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.user_id.as_uuid())
        .bind(payment.order_code.as_i64())
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.gateway_order_id)
        .bind(&payment.gateway_transaction_id)
        .bind(payment.status.as_str())
        .bind(payment.subscription_id.map(|id| *id.as_uuid()))
        .bind(&payment.failure_payload)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("payments_order_code_key") {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        "A payment with this order code already exists",
                    );
                }
            }
            DomainError::database(format!("Failed to save payment: {}", e))
        })?;

        Ok(())
    }

    async fn get_by_order_code(
        &self,
        order_code: OrderCode,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE order_code = $1",
            PAYMENT_COLUMNS
        ))
        .bind(order_code.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find payment: {}", e)))?;

        row.map(Payment::try_from).transpose()
    }

    async fn set_gateway_order(
        &self,
        id: PaymentId,
        gateway_order_id: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE payments SET gateway_order_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(gateway_order_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update payment: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(payment_id_not_found(id));
        }

        Ok(())
    }

    async fn transition(&self, payment: &Payment) -> Result<TransitionResult, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $2,
                subscription_id = $3,
                gateway_transaction_id = $4,
                failure_payload = $5,
                updated_at = $6
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.status.as_str())
        .bind(payment.subscription_id.map(|id| *id.as_uuid()))
        .bind(&payment.gateway_transaction_id)
        .bind(&payment.failure_payload)
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to transition payment: {}", e)))?;

        if result.rows_affected() > 0 {
            return Ok(TransitionResult::Applied);
        }

        // Lost the race or the row is gone; report what the store holds.
        let stored = self
            .get_by_order_code(payment.order_code)
            .await?
            .ok_or_else(|| DomainError::payment_not_found(payment.order_code.to_string()))?;

        Ok(TransitionResult::AlreadyTerminal(stored.status))
    }
}

/// PostgreSQL implementation of the SubscriptionStore port.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    plan_type: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
    auto_renew: bool,
    last_order_code: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let plan_type = PlanType::from_str(&row.plan_type).map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid plan_type value: {}", e),
            )
        })?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            plan_type,
            start_date: Timestamp::from_datetime(row.start_date),
            end_date: Timestamp::from_datetime(row.end_date),
            is_active: row.is_active,
            auto_renew: row.auto_renew,
            last_order_code: row.last_order_code.map(OrderCode::from_raw),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn plan_to_string(plan_type: PlanType) -> &'static str {
    match plan_type {
        PlanType::Monthly => "monthly",
        PlanType::Yearly => "yearly",
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan_type, start_date, end_date, is_active,
                auto_renew, last_order_code, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                plan_type = EXCLUDED.plan_type,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                is_active = EXCLUDED.is_active,
                auto_renew = EXCLUDED.auto_renew,
                last_order_code = EXCLUDED.last_order_code,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_uuid())
        .bind(plan_to_string(subscription.plan_type))
        .bind(subscription.start_date.as_datetime())
        .bind(subscription.end_date.as_datetime())
        .bind(subscription.is_active)
        .bind(subscription.auto_renew)
        .bind(subscription.last_order_code.map(|c| c.as_i64()))
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save subscription: {}", e)))?;

        Ok(())
    }

    async fn find_active_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, plan_type, start_date, end_date, is_active,
                   auto_renew, last_order_code, created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1 AND is_active = TRUE
            ORDER BY end_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find subscription: {}", e)))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn deactivate_expired(&self, now: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET is_active = FALSE, updated_at = $1
            WHERE is_active = TRUE AND end_date < $1
            "#,
        )
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to deactivate subscriptions: {}", e))
        })?;

        Ok(result.rows_affected())
    }
}
