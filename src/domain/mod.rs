//! Domain layer - aggregates, value objects, and domain services.

pub mod foundation;
pub mod payment;
pub mod subscription;
