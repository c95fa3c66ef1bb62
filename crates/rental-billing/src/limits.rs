//! Plan Limits and Quota Enforcement
//!
//! Counts come from the persistence layer at call time. A check is a snapshot:
//! nothing stops a concurrent insert between the check and the caller's own
//! insert unless the caller wraps both in one transaction.

use async_trait::async_trait;
use parking_lot::RwLock;
use rental_common::{ErrorCode, RentalError, RentalResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::plan::{EntityType, Plan, PlanLimit};

/// Repository result type
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<RepositoryError> for RentalError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => RentalError::NotFound {
                code: ErrorCode::MerchantNotFound,
                id,
            },
            RepositoryError::StorageError(msg) => RentalError::Repository(msg),
        }
    }
}

/// Read access to a merchant's plan and live entity counts
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Plan of the merchant's current subscription
    async fn plan_for_merchant(&self, merchant_id: Uuid) -> RepoResult<Plan>;

    /// Number of stored entities of one type
    async fn count_entities(&self, merchant_id: Uuid, entity: EntityType) -> RepoResult<u64>;
}

/// In-memory usage repository (for testing and development)
pub struct InMemoryUsageRepository {
    plans: RwLock<HashMap<Uuid, Plan>>,
    counts: RwLock<HashMap<(Uuid, EntityType), u64>>,
}

impl InMemoryUsageRepository {
    pub fn new() -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
            counts: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_plan(&self, merchant_id: Uuid, plan: Plan) {
        self.plans.write().insert(merchant_id, plan);
    }

    pub fn set_count(&self, merchant_id: Uuid, entity: EntityType, count: u64) {
        self.counts.write().insert((merchant_id, entity), count);
    }

    /// Record one created entity
    pub fn increment(&self, merchant_id: Uuid, entity: EntityType) {
        *self.counts.write().entry((merchant_id, entity)).or_insert(0) += 1;
    }
}

impl Default for InMemoryUsageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageRepository for InMemoryUsageRepository {
    async fn plan_for_merchant(&self, merchant_id: Uuid) -> RepoResult<Plan> {
        self.plans
            .read()
            .get(&merchant_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(merchant_id.to_string()))
    }

    async fn count_entities(&self, merchant_id: Uuid, entity: EntityType) -> RepoResult<u64> {
        Ok(self
            .counts
            .read()
            .get(&(merchant_id, entity))
            .copied()
            .unwrap_or(0))
    }
}

/// Compare a live count with a plan limit
pub fn check_limit(entity: EntityType, limit: PlanLimit, current_count: u64) -> PlanLimitsValidationResult {
    let is_valid = limit.allows(current_count);
    let remaining = limit.value().map(|l| l.saturating_sub(current_count));
    let message = (!is_valid).then(|| {
        format!("{entity} limit reached: {current_count} of {limit} used")
    });

    PlanLimitsValidationResult {
        is_valid,
        entity_type: entity,
        current_count,
        limit,
        remaining,
        message,
    }
}

/// Plan limits validator
pub struct PlanLimitsValidator {
    repo: Arc<dyn UsageRepository>,
}

impl PlanLimitsValidator {
    pub fn new(repo: Arc<dyn UsageRepository>) -> Self {
        Self { repo }
    }

    /// Check whether one more entity may be created
    pub async fn validate_plan_limits(
        &self,
        merchant_id: Uuid,
        entity: EntityType,
    ) -> RentalResult<PlanLimitsValidationResult> {
        let plan = self.repo.plan_for_merchant(merchant_id).await?;
        let current = self.repo.count_entities(merchant_id, entity).await?;
        let result = check_limit(entity, plan.limit_for(entity), current);

        debug!(
            %merchant_id,
            plan_id = %plan.id,
            entity = %entity,
            current,
            limit = %result.limit,
            is_valid = result.is_valid,
            "plan limit checked"
        );
        Ok(result)
    }

    /// Guard for entity-creation call sites
    pub async fn assert_plan_limit(&self, merchant_id: Uuid, entity: EntityType) -> RentalResult<()> {
        let result = self.validate_plan_limits(merchant_id, entity).await?;
        match result.limit {
            PlanLimit::Limited(limit) if !result.is_valid => {
                warn!(%merchant_id, entity = %entity, current = result.current_count, limit, "plan limit exceeded");
                Err(RentalError::PlanLimitExceeded {
                    entity: entity.to_string(),
                    current: result.current_count,
                    limit,
                })
            }
            _ => Ok(()),
        }
    }

    /// Usage against every limit of the merchant's plan
    pub async fn get_plan_limits_info(&self, merchant_id: Uuid) -> RentalResult<PlanLimitsInfo> {
        let plan = self.repo.plan_for_merchant(merchant_id).await?;
        let mut usage = Vec::with_capacity(EntityType::ALL.len());

        for entity in EntityType::ALL {
            let current = self.repo.count_entities(merchant_id, entity).await?;
            usage.push(EntityUsage::new(entity, plan.limit_for(entity), current));
        }

        Ok(PlanLimitsInfo {
            merchant_id,
            plan_id: plan.id,
            usage,
        })
    }

    pub async fn has_feature(&self, merchant_id: Uuid, feature: &str) -> RentalResult<bool> {
        let plan = self.repo.plan_for_merchant(merchant_id).await?;
        Ok(plan.has_feature(feature))
    }
}

/// Outcome of a single limit check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimitsValidationResult {
    pub is_valid: bool,
    pub entity_type: EntityType,
    pub current_count: u64,
    pub limit: PlanLimit,
    /// None when unlimited
    pub remaining: Option<u64>,
    pub message: Option<String>,
}

/// Usage of one entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUsage {
    pub entity_type: EntityType,
    pub current_count: u64,
    pub limit: PlanLimit,
    pub is_unlimited: bool,
    pub usage_percentage: Option<f64>,
    pub is_at_limit: bool,
}

impl EntityUsage {
    fn new(entity: EntityType, limit: PlanLimit, current_count: u64) -> Self {
        let usage_percentage = match limit {
            PlanLimit::Unlimited => None,
            PlanLimit::Limited(0) => Some(100.0),
            PlanLimit::Limited(l) => Some((current_count as f64 / l as f64) * 100.0),
        };

        Self {
            entity_type: entity,
            current_count,
            limit,
            is_unlimited: limit.is_unlimited(),
            usage_percentage,
            is_at_limit: !limit.allows(current_count),
        }
    }
}

/// Plan limits summary for a merchant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimitsInfo {
    pub merchant_id: Uuid,
    pub plan_id: String,
    pub usage: Vec<EntityUsage>,
}

impl PlanLimitsInfo {
    pub fn get(&self, entity: EntityType) -> Option<&EntityUsage> {
        self.usage.iter().find(|u| u.entity_type == entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanLimits;
    use rust_decimal_macros::dec;

    fn starter() -> Plan {
        Plan::new("starter", "Starter", dec!(19))
            .with_limits(PlanLimits {
                outlets: PlanLimit::Limited(2),
                users: PlanLimit::Limited(5),
                products: PlanLimit::Unlimited,
                customers: PlanLimit::Limited(100),
                orders: PlanLimit::Limited(0),
            })
            .with_features(["reports"])
    }

    fn setup() -> (Arc<InMemoryUsageRepository>, PlanLimitsValidator, Uuid) {
        let repo = Arc::new(InMemoryUsageRepository::new());
        let merchant = Uuid::new_v4();
        repo.set_plan(merchant, starter());
        let validator = PlanLimitsValidator::new(repo.clone());
        (repo, validator, merchant)
    }

    #[test]
    fn test_check_limit() {
        assert!(check_limit(EntityType::Outlets, PlanLimit::Limited(3), 2).is_valid);
        assert!(!check_limit(EntityType::Outlets, PlanLimit::Limited(3), 3).is_valid);
        assert!(!check_limit(EntityType::Outlets, PlanLimit::Limited(0), 0).is_valid);

        let unlimited = check_limit(EntityType::Products, PlanLimit::Unlimited, 1_000_000);
        assert!(unlimited.is_valid);
        assert_eq!(unlimited.remaining, None);
    }

    #[tokio::test]
    async fn test_validate_plan_limits() {
        let (repo, validator, merchant) = setup();

        let result = validator.validate_plan_limits(merchant, EntityType::Outlets).await.unwrap();
        assert!(result.is_valid);
        assert_eq!(result.remaining, Some(2));

        repo.increment(merchant, EntityType::Outlets);
        repo.increment(merchant, EntityType::Outlets);

        let result = validator.validate_plan_limits(merchant, EntityType::Outlets).await.unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.current_count, 2);
        assert_eq!(result.remaining, Some(0));
        assert!(result.message.is_some());
    }

    #[tokio::test]
    async fn test_zero_limit_is_not_unlimited() {
        let (_repo, validator, merchant) = setup();
        let result = validator.validate_plan_limits(merchant, EntityType::Orders).await.unwrap();
        assert!(!result.is_valid);
    }

    #[tokio::test]
    async fn test_assert_plan_limit() {
        let (repo, validator, merchant) = setup();
        repo.set_count(merchant, EntityType::Users, 5);
        repo.set_count(merchant, EntityType::Products, 10_000);

        let err = validator
            .assert_plan_limit(merchant, EntityType::Users)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RentalError::PlanLimitExceeded { current: 5, limit: 5, .. }
        ));
        assert!(validator.assert_plan_limit(merchant, EntityType::Products).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_merchant() {
        let (_repo, validator, _merchant) = setup();
        let err = validator
            .validate_plan_limits(Uuid::new_v4(), EntityType::Users)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MerchantNotFound);
    }

    #[tokio::test]
    async fn test_plan_limits_info() {
        let (repo, validator, merchant) = setup();
        repo.set_count(merchant, EntityType::Customers, 25);

        let info = validator.get_plan_limits_info(merchant).await.unwrap();
        assert_eq!(info.plan_id, "starter");
        assert_eq!(info.usage.len(), EntityType::ALL.len());

        let customers = info.get(EntityType::Customers).unwrap();
        assert_eq!(customers.usage_percentage, Some(25.0));
        assert!(!customers.is_at_limit);

        let products = info.get(EntityType::Products).unwrap();
        assert!(products.is_unlimited);
        assert_eq!(products.usage_percentage, None);

        assert!(info.get(EntityType::Orders).unwrap().is_at_limit);
    }

    #[tokio::test]
    async fn test_has_feature() {
        let (_repo, validator, merchant) = setup();
        assert!(validator.has_feature(merchant, "reports").await.unwrap());
        assert!(!validator.has_feature(merchant, "api_access").await.unwrap());
    }
}
