//! Payment gateway adapters: the HTTP client used in production and a
//! scriptable mock for tests.

mod http;
mod mock;

pub use http::{GatewayConfig, HttpPaymentGateway};
pub use mock::MockPaymentGateway;
