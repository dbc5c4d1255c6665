//! Scriptable mock payment gateway for tests.
//!
//! Tracks every order it creates and lets tests flip orders to paid,
//! cancelled, or failed before the engine polls. Call counters expose how
//! often the engine actually reached the gateway.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::OrderCode;
use crate::ports::{
    CreateOrderRequest, CreatedOrder, GatewayError, GatewayOrderInfo, GatewayOrderStatus,
    PaymentGateway,
};

#[derive(Debug, Clone)]
struct MockOrder {
    gateway_order_id: String,
    status: GatewayOrderStatus,
    reference: Option<String>,
}

#[derive(Default)]
struct MockState {
    orders: HashMap<OrderCode, MockOrder>,
    fail_next_create: Option<String>,
    create_calls: u32,
    get_order_calls: u32,
    cancel_calls: u32,
}

/// Mock `PaymentGateway` backed by in-memory state.
pub struct MockPaymentGateway {
    state: RwLock<MockState>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockState::default()),
        }
    }

    /// Makes the next `create_order` fail with a transient error.
    pub async fn fail_next_create(&self, message: impl Into<String>) {
        self.state.write().await.fail_next_create = Some(message.into());
    }

    /// Scripts the gateway to report the order as paid.
    pub async fn mark_paid(&self, order_code: OrderCode, reference: &str) {
        self.set_status(order_code, GatewayOrderStatus::Paid, Some(reference.to_string()))
            .await;
    }

    /// Scripts the gateway to report the order as cancelled.
    pub async fn mark_cancelled(&self, order_code: OrderCode) {
        self.set_status(order_code, GatewayOrderStatus::Cancelled, None)
            .await;
    }

    /// Scripts the gateway to report the order as failed.
    pub async fn mark_failed(&self, order_code: OrderCode) {
        self.set_status(order_code, GatewayOrderStatus::Failed, None)
            .await;
    }

    async fn set_status(
        &self,
        order_code: OrderCode,
        status: GatewayOrderStatus,
        reference: Option<String>,
    ) {
        let mut state = self.state.write().await;
        let order = state.orders.entry(order_code).or_insert_with(|| MockOrder {
            gateway_order_id: format!("gw_{}", order_code),
            status: GatewayOrderStatus::Pending,
            reference: None,
        });
        order.status = status;
        order.reference = reference;
    }

    /// How many times `create_order` was called.
    pub async fn create_calls(&self) -> u32 {
        self.state.read().await.create_calls
    }

    /// How many times `get_order` was called.
    pub async fn get_order_calls(&self) -> u32 {
        self.state.read().await.get_order_calls
    }

    /// How many times `cancel_order` was called.
    pub async fn cancel_calls(&self) -> u32 {
        self.state.read().await.cancel_calls
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, GatewayError> {
        let mut state = self.state.write().await;
        state.create_calls += 1;

        if let Some(message) = state.fail_next_create.take() {
            return Err(GatewayError::upstream(message));
        }
        if state.orders.contains_key(&request.order_code) {
            return Err(GatewayError::duplicate_order(format!(
                "Order {} already exists",
                request.order_code
            )));
        }

        let gateway_order_id = format!("gw_{}", request.order_code);
        state.orders.insert(
            request.order_code,
            MockOrder {
                gateway_order_id: gateway_order_id.clone(),
                status: GatewayOrderStatus::Pending,
                reference: None,
            },
        );

        Ok(CreatedOrder {
            checkout_url: format!("https://gateway.test/checkout/{}", request.order_code),
            gateway_order_id,
        })
    }

    async fn get_order(&self, gateway_order_id: &str) -> Result<GatewayOrderInfo, GatewayError> {
        let mut state = self.state.write().await;
        state.get_order_calls += 1;

        let order = state
            .orders
            .values()
            .find(|o| {
                o.gateway_order_id == gateway_order_id
                    || o.gateway_order_id == format!("gw_{}", gateway_order_id)
            })
            .cloned()
            .ok_or_else(|| GatewayError::not_found("order"))?;

        Ok(GatewayOrderInfo {
            gateway_order_id: order.gateway_order_id,
            status: order.status,
            reference: order.reference,
            checkout_url: None,
        })
    }

    async fn cancel_order(
        &self,
        gateway_order_id: &str,
        _reason: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        state.cancel_calls += 1;

        let order = state
            .orders
            .values_mut()
            .find(|o| {
                o.gateway_order_id == gateway_order_id
                    || o.gateway_order_id == format!("gw_{}", gateway_order_id)
            })
            .ok_or_else(|| GatewayError::not_found("order"))?;

        order.status = GatewayOrderStatus::Cancelled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(order_code: OrderCode) -> CreateOrderRequest {
        CreateOrderRequest {
            order_code,
            amount: 29_000,
            currency: "USD".to_string(),
            description: "test order".to_string(),
            buyer_email: None,
            return_url: "https://app.test/ok".to_string(),
            cancel_url: "https://app.test/no".to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_poll_round_trip() {
        let gateway = MockPaymentGateway::new();
        let code = OrderCode::generate();

        let created = gateway.create_order(request(code)).await.unwrap();
        gateway.mark_paid(code, "REF-9").await;
        let info = gateway.get_order(&created.gateway_order_id).await.unwrap();

        assert_eq!(info.status, GatewayOrderStatus::Paid);
        assert_eq!(info.reference.as_deref(), Some("REF-9"));
        assert_eq!(gateway.create_calls().await, 1);
        assert_eq!(gateway.get_order_calls().await, 1);
    }

    #[tokio::test]
    async fn duplicate_create_is_reported() {
        let gateway = MockPaymentGateway::new();
        let code = OrderCode::generate();
        gateway.create_order(request(code)).await.unwrap();

        let err = gateway.create_order(request(code)).await.unwrap_err();

        assert_eq!(err.code, crate::ports::GatewayErrorCode::DuplicateOrder);
    }

    #[tokio::test]
    async fn unknown_order_polls_as_not_found() {
        let gateway = MockPaymentGateway::new();

        let err = gateway.get_order("gw_missing").await.unwrap_err();

        assert_eq!(err.code, crate::ports::GatewayErrorCode::NotFound);
    }
}
