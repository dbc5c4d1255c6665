//! Application layer - the reconciliation engine and subscription manager.

mod reconciliation;
mod subscription_manager;

pub use reconciliation::{
    CheckoutInfo, CreateOrderCommand, PaymentStatusSummary, ReconciliationEngine,
};
pub use subscription_manager::{run_expiry_sweep, SubscriptionManager};
