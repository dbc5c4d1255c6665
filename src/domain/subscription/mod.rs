//! Subscription domain: plan catalog types and the Subscription aggregate.

mod aggregate;
mod plan;

pub use aggregate::Subscription;
pub use plan::{Plan, PlanType};
