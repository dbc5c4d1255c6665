//! Plan catalog types.
//!
//! Plans are a static, read-only catalog to this subsystem. The paid amount
//! is the plan selector during reconciliation: the gateway does not echo the
//! originally requested plan back, so the amount thresholds below are the
//! only link between a settled payment and the tier it purchased. This is a
//! latent risk if prices change while orders are in flight; kept as-is
//! because callers depend on the observable behavior.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// 30-day access.
    Monthly,

    /// 365-day access.
    Yearly,
}

impl PlanType {
    /// Subscription length granted by one payment of this plan.
    pub fn duration_days(&self) -> i64 {
        match self {
            PlanType::Monthly => 30,
            PlanType::Yearly => 365,
        }
    }

    /// Display name for this plan.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanType::Monthly => "Monthly",
            PlanType::Yearly => "Yearly",
        }
    }

    /// Derives the purchased tier from a paid amount.
    ///
    /// Any amount at or above the yearly price buys the yearly plan;
    /// everything else buys monthly.
    pub fn from_paid_amount(amount: i64) -> Self {
        if amount >= Plan::yearly().price {
            PlanType::Yearly
        } else {
            PlanType::Monthly
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for PlanType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(PlanType::Monthly),
            "yearly" | "annual" => Ok(PlanType::Yearly),
            other => Err(ValidationError::invalid_format(
                "plan_type",
                format!("Unknown plan tier: {}", other),
            )),
        }
    }
}

/// Static catalog entry for one plan tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Tier this entry prices.
    pub plan_type: PlanType,

    /// Price in minor currency units.
    pub price: i64,

    /// Checkout description shown by the gateway.
    pub description: String,
}

impl Plan {
    /// The monthly catalog entry.
    pub fn monthly() -> Self {
        Self {
            plan_type: PlanType::Monthly,
            price: 29_000,
            description: "SponsorBridge monthly subscription".to_string(),
        }
    }

    /// The yearly catalog entry.
    pub fn yearly() -> Self {
        Self {
            plan_type: PlanType::Yearly,
            price: 290_000,
            description: "SponsorBridge yearly subscription".to_string(),
        }
    }

    /// Catalog lookup by tier.
    pub fn for_type(plan_type: PlanType) -> Self {
        match plan_type {
            PlanType::Monthly => Self::monthly(),
            PlanType::Yearly => Self::yearly(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn durations_match_tier() {
        assert_eq!(PlanType::Monthly.duration_days(), 30);
        assert_eq!(PlanType::Yearly.duration_days(), 365);
    }

    #[test]
    fn parse_accepts_known_tiers() {
        assert_eq!("monthly".parse::<PlanType>().unwrap(), PlanType::Monthly);
        assert_eq!("Yearly".parse::<PlanType>().unwrap(), PlanType::Yearly);
        assert_eq!("annual".parse::<PlanType>().unwrap(), PlanType::Yearly);
    }

    #[test]
    fn parse_rejects_unknown_tier() {
        assert!("weekly".parse::<PlanType>().is_err());
    }

    #[test]
    fn exact_prices_map_to_their_tier() {
        assert_eq!(
            PlanType::from_paid_amount(Plan::monthly().price),
            PlanType::Monthly
        );
        assert_eq!(
            PlanType::from_paid_amount(Plan::yearly().price),
            PlanType::Yearly
        );
    }

    #[test]
    fn amount_below_yearly_threshold_is_monthly() {
        assert_eq!(
            PlanType::from_paid_amount(Plan::yearly().price - 1),
            PlanType::Monthly
        );
    }

    proptest! {
        // For a fixed paid amount the derived tier never varies.
        #[test]
        fn derivation_is_deterministic(amount in 0i64..1_000_000) {
            prop_assert_eq!(
                PlanType::from_paid_amount(amount),
                PlanType::from_paid_amount(amount)
            );
        }

        // Paying more never buys a lower tier.
        #[test]
        fn derivation_is_monotonic(amount in 0i64..1_000_000, extra in 0i64..1_000_000) {
            let lower = PlanType::from_paid_amount(amount);
            let higher = PlanType::from_paid_amount(amount + extra);
            prop_assert!(lower.duration_days() <= higher.duration_days());
        }
    }
}
