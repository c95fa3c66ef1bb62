//! Billing Configuration

use crate::interval::BillingInterval;
use rental_common::{RentalError, RentalResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Maximum rounding precision accepted for money amounts
pub const MAX_DECIMAL_PLACES: u32 = 10;

/// Billing configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BillingConfig {
    /// Pricing settings
    pub pricing: PricingConfig,
    /// Subscription settings
    pub subscription: SubscriptionConfig,
}

impl BillingConfig {
    /// Load from file (TOML for `.toml`, JSON otherwise)
    pub fn load(path: impl AsRef<Path>) -> RentalResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RentalError::Config(format!("{}: {e}", path.display())))?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| RentalError::Config(e.to_string()))?,
            _ => serde_json::from_str(&content)
                .map_err(|e| RentalError::Config(e.to_string()))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load from file, falling back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.as_ref().display(), error = %e, "billing config not loaded, using defaults");
                Self::default()
            }
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> RentalResult<()> {
        self.pricing.validate()?;
        self.subscription.validate()
    }
}

/// Pricing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PricingConfig {
    /// Default currency code
    pub currency: String,
    /// Rounding precision for money amounts
    pub decimal_places: u32,
    /// Discount percent per interval
    pub interval_discounts: BTreeMap<BillingInterval, Decimal>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let mut interval_discounts = BTreeMap::new();
        interval_discounts.insert(BillingInterval::Month, dec!(0));
        interval_discounts.insert(BillingInterval::Quarter, dec!(5));
        interval_discounts.insert(BillingInterval::SemiAnnual, dec!(10));
        interval_discounts.insert(BillingInterval::Year, dec!(20));

        Self {
            currency: "USD".into(),
            decimal_places: 2,
            interval_discounts,
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> RentalResult<()> {
        if self.decimal_places > MAX_DECIMAL_PLACES {
            return Err(RentalError::Config(format!(
                "decimal places {} exceeds {MAX_DECIMAL_PLACES}",
                self.decimal_places
            )));
        }
        for (interval, percent) in &self.interval_discounts {
            if *percent < Decimal::ZERO || *percent > Decimal::ONE_HUNDRED {
                return Err(RentalError::Config(format!(
                    "discount for {interval} must be within 0..=100, got {percent}"
                )));
            }
        }
        if self.currency.trim().is_empty() {
            return Err(RentalError::Config("currency must not be empty".into()));
        }
        Ok(())
    }
}

/// Partial pricing override
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfigUpdate {
    pub currency: Option<String>,
    pub decimal_places: Option<u32>,
    /// Merged key by key into the current table
    pub interval_discounts: Option<BTreeMap<BillingInterval, Decimal>>,
}

/// Subscription configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscriptionConfig {
    /// Days of access kept after expiry while payment is retried
    pub grace_period_days: u32,
    /// Urgency thresholds for expiring subscriptions
    pub attention: AttentionThresholds,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            grace_period_days: 7,
            attention: AttentionThresholds::default(),
        }
    }
}

impl SubscriptionConfig {
    pub fn validate(&self) -> RentalResult<()> {
        self.attention.validate()
    }
}

/// Days-remaining thresholds for `needs_attention`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttentionThresholds {
    pub high_days: i64,
    pub medium_days: i64,
    pub low_days: i64,
}

impl Default for AttentionThresholds {
    fn default() -> Self {
        Self {
            high_days: 3,
            medium_days: 7,
            low_days: 14,
        }
    }
}

impl AttentionThresholds {
    pub fn validate(&self) -> RentalResult<()> {
        if self.high_days < 0 || self.high_days > self.medium_days || self.medium_days > self.low_days {
            return Err(RentalError::Config(format!(
                "attention thresholds must satisfy 0 <= high <= medium <= low, got {}/{}/{}",
                self.high_days, self.medium_days, self.low_days
            )));
        }
        Ok(())
    }
}
