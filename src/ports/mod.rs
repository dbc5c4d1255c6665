//! Ports - contracts between the reconciliation core and the outside world.

mod payment_gateway;
mod payment_store;
mod plan_catalog;
mod subscription_store;

pub use payment_gateway::{
    CreateOrderRequest, CreatedOrder, GatewayError, GatewayErrorCode, GatewayOrderInfo,
    GatewayOrderStatus, PaymentGateway,
};
pub use payment_store::{PaymentStore, TransitionResult};
pub use plan_catalog::PlanCatalog;
pub use subscription_store::SubscriptionStore;
