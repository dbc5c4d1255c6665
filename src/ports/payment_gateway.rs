//! Payment gateway port.
//!
//! Thin contract wrapping the external payment gateway: create an order, poll
//! an order's status, cancel an order. No business logic lives behind this
//! boundary; adapters only translate wire shapes and classify errors as
//! transient or permanent so the caller can decide whether to retry.

use crate::domain::foundation::OrderCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a remote order and returns the resolved checkout information.
    ///
    /// Adapters are responsible for tolerating the gateway's unstable
    /// response shapes; a successful return always carries a usable checkout
    /// URL and gateway order reference.
    async fn create_order(&self, request: CreateOrderRequest)
        -> Result<CreatedOrder, GatewayError>;

    /// Fetches the current state of an order by gateway reference.
    async fn get_order(&self, gateway_order_id: &str) -> Result<GatewayOrderInfo, GatewayError>;

    /// Cancels an open order at the gateway.
    async fn cancel_order(&self, gateway_order_id: &str, reason: &str)
        -> Result<(), GatewayError>;
}

/// Request to create a gateway order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Locally generated correlation key, echoed back in webhooks.
    pub order_code: OrderCode,

    /// Amount in minor currency units.
    pub amount: i64,

    /// ISO currency code.
    pub currency: String,

    /// Checkout description shown to the buyer.
    pub description: String,

    /// Buyer email for checkout pre-fill.
    pub buyer_email: Option<String>,

    /// Redirect after successful checkout.
    pub return_url: String,

    /// Redirect after abandoned checkout.
    pub cancel_url: String,
}

/// A gateway order that has been created and resolved to a checkout URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedOrder {
    /// URL the buyer completes payment at.
    pub checkout_url: String,

    /// Gateway's reference for the order.
    pub gateway_order_id: String,
}

/// Status vocabulary the gateway reports when polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayOrderStatus {
    /// Payment settled.
    Paid,

    /// Awaiting payment.
    Pending,

    /// Payment in flight at the gateway.
    Processing,

    /// Cancelled by buyer or gateway.
    Cancelled,

    /// Checkout window lapsed.
    Expired,

    /// Payment attempted and declined.
    Failed,

    /// Status string this client does not know.
    Unknown,
}

impl GatewayOrderStatus {
    /// Parses the gateway's status string.
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PAID" => GatewayOrderStatus::Paid,
            "PENDING" => GatewayOrderStatus::Pending,
            "PROCESSING" => GatewayOrderStatus::Processing,
            "CANCELLED" | "CANCELED" => GatewayOrderStatus::Cancelled,
            "EXPIRED" => GatewayOrderStatus::Expired,
            "FAILED" => GatewayOrderStatus::Failed,
            _ => GatewayOrderStatus::Unknown,
        }
    }

    /// Whether this status still allows the order to settle later.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            GatewayOrderStatus::Pending | GatewayOrderStatus::Processing | GatewayOrderStatus::Unknown
        )
    }
}

/// Snapshot of a gateway order returned by `get_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrderInfo {
    /// Gateway's reference for the order.
    pub gateway_order_id: String,

    /// Current order status.
    pub status: GatewayOrderStatus,

    /// Transaction reference, present once settled.
    pub reference: Option<String>,

    /// Checkout URL, when the gateway includes it.
    pub checkout_url: Option<String>,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error category.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Gateway's own error code, if reported.
    pub gateway_code: Option<String>,

    /// Whether retrying the same call may succeed.
    pub transient: bool,
}

impl GatewayError {
    /// Creates a new gateway error.
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            gateway_code: None,
            transient: code.is_transient(),
        }
    }

    /// Attaches the gateway's own error code.
    pub fn with_gateway_code(mut self, code: impl Into<String>) -> Self {
        self.gateway_code = Some(code.into());
        self
    }

    /// Network-level failure (timeout, connection refused).
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Network, message)
    }

    /// Gateway reported a server-side fault.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Upstream, message)
    }

    /// The request was rejected as invalid.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Rejected, message)
    }

    /// An order with this code already exists at the gateway.
    pub fn duplicate_order(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::DuplicateOrder, message)
    }

    /// The referenced order does not exist at the gateway.
    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }

    /// The gateway answered but the response could not be interpreted.
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::MalformedResponse, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for crate::domain::foundation::DomainError {
    fn from(err: GatewayError) -> Self {
        use crate::domain::foundation::{DomainError, ErrorCode};

        let code = match err.code {
            GatewayErrorCode::NotFound => ErrorCode::PaymentNotFound,
            _ => ErrorCode::GatewayError,
        };

        DomainError::new(code, err.message).with_detail("gateway_error", err.code.to_string())
    }
}

/// Gateway error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    Network,

    /// Gateway 5xx or equivalent.
    Upstream,

    /// Rate limit exceeded.
    RateLimited,

    /// Request rejected as invalid (4xx).
    Rejected,

    /// Order code already known to the gateway.
    DuplicateOrder,

    /// Resource not found.
    NotFound,

    /// Response arrived but could not be interpreted.
    MalformedResponse,
}

impl GatewayErrorCode {
    /// Whether errors of this category are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::Network | GatewayErrorCode::Upstream | GatewayErrorCode::RateLimited
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::Network => "network",
            GatewayErrorCode::Upstream => "upstream",
            GatewayErrorCode::RateLimited => "rate_limited",
            GatewayErrorCode::Rejected => "rejected",
            GatewayErrorCode::DuplicateOrder => "duplicate_order",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::MalformedResponse => "malformed_response",
        };
        write!(f, "{}", s)
    }
}
