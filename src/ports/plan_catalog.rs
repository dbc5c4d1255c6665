//! Read-only boundary to the plan catalog.

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::subscription::{Plan, PlanType};
use async_trait::async_trait;

/// Port exposing the active plan catalog.
#[async_trait]
pub trait PlanCatalog: Send + Sync {
    /// Returns every plan currently offered.
    async fn active_plans(&self) -> Result<Vec<Plan>, DomainError>;

    /// Looks up the catalog entry for a tier.
    async fn plan_for(&self, plan_type: PlanType) -> Result<Plan, DomainError> {
        self.active_plans()
            .await?
            .into_iter()
            .find(|p| p.plan_type == plan_type)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::PlanNotFound,
                    format!("No active plan for tier {}", plan_type),
                )
            })
    }
}
