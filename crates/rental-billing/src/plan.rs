//! Plan catalog records

use rental_common::{RentalError, RentalResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire sentinel for an unlimited quota
pub const UNLIMITED_SENTINEL: i64 = -1;

/// Subscription plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Price of one month
    pub base_price: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub trial_days: u32,
    #[serde(default)]
    pub limits: PlanLimits,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_currency() -> String {
    "USD".into()
}

fn default_true() -> bool {
    true
}

impl Plan {
    /// Create an active plan with zero allowances
    pub fn new(id: &str, name: &str, base_price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            base_price,
            currency: default_currency(),
            trial_days: 0,
            limits: PlanLimits::default(),
            features: Vec::new(),
            is_active: true,
            is_popular: false,
            sort_order: 0,
        }
    }

    /// Set resource limits
    pub fn with_limits(mut self, limits: PlanLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set trial length
    pub fn with_trial_days(mut self, days: u32) -> Self {
        self.trial_days = days;
        self
    }

    /// Set feature list
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Check if feature is included in this plan
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Quota for an entity type
    pub fn limit_for(&self, entity: EntityType) -> PlanLimit {
        self.limits.get(entity)
    }
}

/// Resources a plan caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Outlets,
    Users,
    Products,
    Customers,
    Orders,
}

impl EntityType {
    /// Every limited entity type
    pub const ALL: [EntityType; 5] = [
        EntityType::Outlets,
        EntityType::Users,
        EntityType::Products,
        EntityType::Customers,
        EntityType::Orders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outlets => "outlets",
            Self::Users => "users",
            Self::Products => "products",
            Self::Customers => "customers",
            Self::Orders => "orders",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = RentalError;

    fn from_str(s: &str) -> RentalResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outlet" | "outlets" => Ok(Self::Outlets),
            "user" | "users" => Ok(Self::Users),
            "product" | "products" => Ok(Self::Products),
            "customer" | "customers" => Ok(Self::Customers),
            "order" | "orders" => Ok(Self::Orders),
            _ => Err(RentalError::validation(format!("unknown entity type: {s}"))),
        }
    }
}

/// Quota for one entity type
///
/// Zero is a real allowance of nothing. Only `Unlimited` lifts the cap, and it
/// travels as `-1` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PlanLimit {
    Limited(u64),
    Unlimited,
}

impl PlanLimit {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Finite cap, if any
    pub fn value(&self) -> Option<u64> {
        match self {
            Self::Limited(n) => Some(*n),
            Self::Unlimited => None,
        }
    }

    /// True when `current` has not reached the cap
    pub fn allows(&self, current: u64) -> bool {
        match self {
            Self::Limited(limit) => current < *limit,
            Self::Unlimited => true,
        }
    }
}

impl Default for PlanLimit {
    fn default() -> Self {
        Self::Limited(0)
    }
}

impl TryFrom<i64> for PlanLimit {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            UNLIMITED_SENTINEL => Ok(Self::Unlimited),
            n if n >= 0 => Ok(Self::Limited(n as u64)),
            n => Err(format!("invalid plan limit {n}: use -1 for unlimited")),
        }
    }
}

impl From<PlanLimit> for i64 {
    fn from(limit: PlanLimit) -> Self {
        match limit {
            PlanLimit::Limited(n) => i64::try_from(n).unwrap_or(i64::MAX),
            PlanLimit::Unlimited => UNLIMITED_SENTINEL,
        }
    }
}

impl fmt::Display for PlanLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{n}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Per-resource limits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    #[serde(default)]
    pub outlets: PlanLimit,
    #[serde(default)]
    pub users: PlanLimit,
    #[serde(default)]
    pub products: PlanLimit,
    #[serde(default)]
    pub customers: PlanLimit,
    #[serde(default)]
    pub orders: PlanLimit,
}

impl PlanLimits {
    pub fn unlimited() -> Self {
        Self {
            outlets: PlanLimit::Unlimited,
            users: PlanLimit::Unlimited,
            products: PlanLimit::Unlimited,
            customers: PlanLimit::Unlimited,
            orders: PlanLimit::Unlimited,
        }
    }

    pub fn get(&self, entity: EntityType) -> PlanLimit {
        match entity {
            EntityType::Outlets => self.outlets,
            EntityType::Users => self.users,
            EntityType::Products => self.products,
            EntityType::Customers => self.customers,
            EntityType::Orders => self.orders,
        }
    }

    pub fn set(&mut self, entity: EntityType, limit: PlanLimit) {
        match entity {
            EntityType::Outlets => self.outlets = limit,
            EntityType::Users => self.users = limit,
            EntityType::Products => self.products = limit,
            EntityType::Customers => self.customers = limit,
            EntityType::Orders => self.orders = limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unlimited_sentinel() {
        let limits: PlanLimits = serde_json::from_str(
            r#"{"outlets": 3, "users": -1, "products": 0}"#,
        )
        .unwrap();

        assert_eq!(limits.outlets, PlanLimit::Limited(3));
        assert!(limits.users.is_unlimited());
        assert_eq!(limits.products, PlanLimit::Limited(0));
        // absent is zero allowance, not unlimited
        assert_eq!(limits.orders, PlanLimit::Limited(0));
        assert!(!limits.orders.allows(0));
    }

    #[test]
    fn test_reject_other_negative_limits() {
        let result: Result<PlanLimits, _> = serde_json::from_str(r#"{"outlets": -5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_limit_serializes_sentinel() {
        let json = serde_json::to_string(&PlanLimits::unlimited()).unwrap();
        assert!(json.contains("\"outlets\":-1"));
    }

    #[test]
    fn test_plan_features() {
        let plan = Plan::new("pro", "Pro", dec!(29.99)).with_features(["reports", "multi_outlet"]);
        assert!(plan.has_feature("reports"));
        assert!(!plan.has_feature("api_access"));
    }

    #[test]
    fn test_plan_deserialize_defaults() {
        let plan: Plan = serde_json::from_str(
            r#"{"id": "basic", "name": "Basic", "basePrice": "9.99", "limits": {"outlets": 1}}"#,
        )
        .unwrap();
        assert_eq!(plan.currency, "USD");
        assert!(plan.is_active);
        assert_eq!(plan.limit_for(EntityType::Outlets), PlanLimit::Limited(1));
    }

    #[test]
    fn test_entity_type_parse() {
        assert_eq!("Outlet".parse::<EntityType>().unwrap(), EntityType::Outlets);
        assert_eq!("customers".parse::<EntityType>().unwrap(), EntityType::Customers);
        assert!("invoices".parse::<EntityType>().is_err());
    }
}
