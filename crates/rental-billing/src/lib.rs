//! Rental Shop Billing Engine
//!
//! Subscription pricing and lifecycle rules for the multi-tenant rental-shop
//! platform. Everything here is in-process arithmetic over records the API
//! layer already fetched; only plan limit checks read live counts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         BILLING ENGINE                                  │
//! │                                                                         │
//! │  API route ─► SubscriptionManager::validate_access                      │
//! │                         │                                               │
//! │        ┌────────────────┼─────────────────┬──────────────────────┐      │
//! │        ▼                ▼                 ▼                      ▼      │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐  ┌────────────────┐ │
//! │  │   Pricing    │ │  Proration   │ │ Subscription │  │  Plan Limits   │ │
//! │  │  Calculator  │ │  Calculator  │ │  Lifecycle   │  │   Validator    │ │
//! │  └──────────────┘ └──────────────┘ └──────────────┘  └───────┬────────┘ │
//! │                                                              │          │
//! │                                              UsageRepository (ORM)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod interval;
pub mod lifecycle;
pub mod limits;
pub mod plan;
pub mod pricing;
pub mod proration;
pub mod subscriptions;

use std::sync::Arc;

pub use config::{AttentionThresholds, BillingConfig, PricingConfig, PricingConfigUpdate, SubscriptionConfig};
pub use interval::BillingInterval;
pub use lifecycle::{PlanChange, SubscriptionLifecycle};
pub use limits::{
    InMemoryUsageRepository, PlanLimitsInfo, PlanLimitsValidationResult, PlanLimitsValidator,
    UsageRepository,
};
pub use plan::{EntityType, Plan, PlanLimit, PlanLimits};
pub use pricing::{PricingBreakdown, PricingCalculator};
pub use proration::{ProrationCalculation, ProrationCalculator};
pub use subscriptions::{
    AttentionLevel, AttentionNotice, BillingPeriod, Operation, Subscription, SubscriptionManager,
    SubscriptionStatus, SubscriptionValidationResult,
};

pub use rental_common::{ApiResponse, ErrorCode, RentalError, RentalResult};

/// Billing engine: one explicitly constructed set of calculators per host
pub struct BillingEngine {
    /// Pricing calculator
    pub pricing: Arc<PricingCalculator>,
    /// Proration calculator
    pub proration: Arc<ProrationCalculator>,
    /// Subscription checks
    pub subscriptions: Arc<SubscriptionManager>,
    /// Subscription mutations
    pub lifecycle: Arc<SubscriptionLifecycle>,
}

impl BillingEngine {
    /// Create a billing engine from validated configuration
    pub fn new(config: BillingConfig) -> RentalResult<Self> {
        config.validate()?;
        let engine = Self::build(config);

        tracing::info!(
            currency = %engine.pricing.config().currency,
            grace_period_days = engine.subscriptions.config().grace_period_days,
            "billing engine initialized"
        );
        Ok(engine)
    }

    fn build(config: BillingConfig) -> Self {
        let pricing = Arc::new(PricingCalculator::new(config.pricing.clone()));
        let proration = Arc::new(ProrationCalculator::new(config.pricing.decimal_places));
        let subscriptions = Arc::new(SubscriptionManager::new(config.subscription));
        let lifecycle = Arc::new(SubscriptionLifecycle::new(
            subscriptions.clone(),
            pricing.clone(),
            proration.clone(),
        ));

        Self {
            pricing,
            proration,
            subscriptions,
            lifecycle,
        }
    }

    /// Plan limits validator over the host's usage repository
    pub fn limits(&self, repo: Arc<dyn UsageRepository>) -> PlanLimitsValidator {
        PlanLimitsValidator::new(repo)
    }
}

impl Default for BillingEngine {
    fn default() -> Self {
        Self::build(BillingConfig::default())
    }
}
