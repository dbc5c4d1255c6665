//! HTTP payment gateway adapter.
//!
//! Talks to the gateway's REST API with a bounded per-request timeout and a
//! small retry budget for transient failures. The gateway's response shapes
//! have drifted across SDK versions, so field extraction probes an explicit,
//! ordered list of known aliases over the untyped response map; when the
//! checkout URL cannot be found at all, the adapter makes one fetch-by-id
//! call and finally falls back to a deterministic URL template rather than
//! failing the whole order.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::ports::{
    CreateOrderRequest, CreatedOrder, GatewayError, GatewayErrorCode, GatewayOrderInfo,
    GatewayOrderStatus, PaymentGateway,
};

/// Known aliases for the checkout URL field, probed in order.
const CHECKOUT_URL_ALIASES: &[&str] = &[
    "checkoutUrl",
    "checkout_url",
    "paymentUrl",
    "payment_url",
    "url",
];

/// Known aliases for the gateway order reference, probed in order.
const ORDER_ID_ALIASES: &[&str] = &["orderId", "order_id", "paymentLinkId", "id"];

/// Known aliases for the order status field.
const STATUS_ALIASES: &[&str] = &["status", "state", "orderStatus"];

/// Known aliases for the transaction reference field.
const REFERENCE_ALIASES: &[&str] = &["reference", "transactionId", "transaction_id", "txnRef"];

/// Gateway API configuration.
#[derive(Clone)]
pub struct GatewayConfig {
    /// API key sent on every request.
    api_key: SecretString,

    /// Base URL of the gateway REST API.
    api_base_url: String,

    /// Base URL checkout pages live under; used by the reconstruction
    /// template when the gateway omits the checkout URL.
    checkout_base_url: String,

    /// Per-request timeout.
    request_timeout: Duration,

    /// Total attempts per call, including the first.
    max_attempts: u32,

    /// Base delay between attempts; grows linearly per attempt.
    retry_delay: Duration,
}

impl GatewayConfig {
    /// Creates a configuration with default timeout and retry budget.
    pub fn new(
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        checkout_base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: api_base_url.into(),
            checkout_base_url: checkout_base_url.into(),
            request_timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_delay: Duration::from_millis(200),
        }
    }

    /// Overrides the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overrides the retry budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Builds a gateway configuration from the loaded payment settings.
    pub fn from_settings(settings: &crate::config::PaymentConfig) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            api_base_url: settings.api_base_url.clone(),
            checkout_base_url: settings.checkout_base_url.clone(),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            max_attempts: settings.max_attempts.max(1),
            retry_delay: Duration::from_millis(200),
        }
    }
}

/// `PaymentGateway` implementation over the gateway's REST API.
pub struct HttpPaymentGateway {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Deterministic checkout URL for a gateway order reference.
    ///
    /// Single reconstruction point; no call site builds this URL by hand.
    fn reconstruct_checkout_url(&self, gateway_order_id: &str) -> String {
        format!(
            "{}/web/{}",
            self.config.checkout_base_url.trim_end_matches('/'),
            gateway_order_id
        )
    }

    /// Runs `call` up to the configured attempt budget, retrying transient
    /// errors with a linearly growing delay.
    async fn with_retry<F, Fut, T>(&self, operation: &str, mut call: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.transient && attempt < self.config.max_attempts => {
                    tracing::warn!(
                        operation,
                        attempt,
                        error = %e,
                        "Transient gateway error, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sends one request and maps the HTTP outcome onto `GatewayError`.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, GatewayError> {
        let response = request
            .header("x-api-key", self.config.api_key.expose_secret())
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            return Ok(body);
        }

        let gateway_code = first_string(&body, &["code", "errorCode"]);
        let message = first_string(&body, &["desc", "message", "error"])
            .unwrap_or_else(|| format!("Gateway returned HTTP {}", status));

        let mut err = match status.as_u16() {
            404 => GatewayError::not_found("order"),
            409 => GatewayError::duplicate_order(message),
            429 => GatewayError::new(GatewayErrorCode::RateLimited, message),
            s if s >= 500 => GatewayError::upstream(message),
            _ if is_duplicate_code(gateway_code.as_deref()) => {
                GatewayError::duplicate_order(message)
            }
            _ => GatewayError::rejected(message),
        };
        if let Some(code) = gateway_code {
            err = err.with_gateway_code(code);
        }
        Err(err)
    }

    async fn fetch_order_raw(&self, reference: &str) -> Result<Value, GatewayError> {
        let url = format!(
            "{}/v2/payment-requests/{}",
            self.config.api_base_url, reference
        );
        self.with_retry("get_order", || self.send(self.http_client.get(&url)))
            .await
    }

    /// Resolves checkout URL and order reference out of a create response,
    /// falling back to a fetch-by-id and finally the URL template.
    async fn resolve_created(
        &self,
        raw: &Value,
        order_code_fallback: &str,
    ) -> Result<CreatedOrder, GatewayError> {
        let body = payload(raw);
        let gateway_order_id =
            first_string(body, ORDER_ID_ALIASES).unwrap_or_else(|| order_code_fallback.to_string());

        if let Some(checkout_url) = first_string(body, CHECKOUT_URL_ALIASES) {
            return Ok(CreatedOrder {
                checkout_url,
                gateway_order_id,
            });
        }

        // None of the known aliases matched: ask the gateway once more for
        // the order it just created.
        tracing::warn!(
            %gateway_order_id,
            "Create response carried no checkout URL, re-fetching order"
        );
        if let Ok(fetched) = self.fetch_order_raw(&gateway_order_id).await {
            let fetched_body = payload(&fetched);
            if let Some(checkout_url) = first_string(fetched_body, CHECKOUT_URL_ALIASES) {
                return Ok(CreatedOrder {
                    checkout_url,
                    gateway_order_id,
                });
            }
        }

        // Degrade gracefully: the checkout page location is deterministic.
        let checkout_url = self.reconstruct_checkout_url(&gateway_order_id);
        tracing::warn!(
            %gateway_order_id,
            %checkout_url,
            "Falling back to reconstructed checkout URL"
        );
        Ok(CreatedOrder {
            checkout_url,
            gateway_order_id,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, GatewayError> {
        let url = format!("{}/v2/payment-requests", self.config.api_base_url);
        let body = json!({
            "orderCode": request.order_code,
            "amount": request.amount,
            "currency": request.currency,
            "description": request.description,
            "buyerEmail": request.buyer_email,
            "returnUrl": request.return_url,
            "cancelUrl": request.cancel_url,
        });

        let order_code = request.order_code.to_string();
        let result = self
            .with_retry("create_order", || {
                self.send(self.http_client.post(&url).json(&body))
            })
            .await;

        let raw = match result {
            Ok(raw) => raw,
            // The order may already exist from a previous attempt that timed
            // out after reaching the gateway; recover it instead of failing.
            Err(e) if e.code == GatewayErrorCode::DuplicateOrder => {
                tracing::info!(%order_code, "Order already exists at gateway, recovering it");
                self.fetch_order_raw(&order_code).await?
            }
            Err(e) => return Err(e),
        };

        self.resolve_created(&raw, &order_code).await
    }

    async fn get_order(&self, gateway_order_id: &str) -> Result<GatewayOrderInfo, GatewayError> {
        let raw = self.fetch_order_raw(gateway_order_id).await?;
        let body = payload(&raw);

        let status = first_string(body, STATUS_ALIASES)
            .map(|s| GatewayOrderStatus::parse(&s))
            .ok_or_else(|| {
                GatewayError::malformed_response("Order response carried no status field")
            })?;

        Ok(GatewayOrderInfo {
            gateway_order_id: first_string(body, ORDER_ID_ALIASES)
                .unwrap_or_else(|| gateway_order_id.to_string()),
            status,
            reference: first_string(body, REFERENCE_ALIASES),
            checkout_url: first_string(body, CHECKOUT_URL_ALIASES),
        })
    }

    async fn cancel_order(
        &self,
        gateway_order_id: &str,
        reason: &str,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}/v2/payment-requests/{}/cancel",
            self.config.api_base_url, gateway_order_id
        );
        let body = json!({ "cancellationReason": reason });

        self.with_retry("cancel_order", || {
            self.send(self.http_client.post(&url).json(&body))
        })
        .await
        .map(|_| ())
    }
}

/// Unwraps the conventional `data` envelope, if present.
fn payload(raw: &Value) -> &Value {
    raw.get("data").unwrap_or(raw)
}

/// Returns the first alias present as a non-empty string.
///
/// Numeric values are accepted for reference-like fields because some SDK
/// versions return identifiers as numbers.
fn first_string(value: &Value, aliases: &[&str]) -> Option<String> {
    for alias in aliases {
        match value.get(alias) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn is_duplicate_code(gateway_code: Option<&str>) -> bool {
    matches!(gateway_code, Some("231") | Some("ORDER_EXISTS"))
}

fn classify_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::network(format!("Gateway request timed out: {}", e))
    } else if e.is_connect() {
        GatewayError::network(format!("Could not reach gateway: {}", e))
    } else {
        GatewayError::network(e.to_string())
    }
}
