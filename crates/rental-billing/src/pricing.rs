//! Pricing Calculator
//!
//! Prices a plan for a billing interval. Longer intervals earn the discount
//! percent configured for them. The calculator favours a degenerate price over
//! failure: bad numeric input yields zeroed amounts. Only a multi-period
//! total that cannot be represented is refused.

use parking_lot::RwLock;
use rental_common::{RentalError, RentalResult};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{PricingConfig, PricingConfigUpdate};
use crate::interval::BillingInterval;
use crate::plan::Plan;

/// Pricing calculator
pub struct PricingCalculator {
    config: Arc<RwLock<PricingConfig>>,
}

impl PricingCalculator {
    pub fn new(config: PricingConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> PricingConfig {
        self.config.read().clone()
    }

    /// Apply a partial configuration override
    pub fn update_config(&self, update: PricingConfigUpdate) -> RentalResult<PricingConfig> {
        let mut next = self.config.read().clone();

        if let Some(currency) = update.currency {
            next.currency = currency;
        }
        if let Some(places) = update.decimal_places {
            next.decimal_places = places;
        }
        if let Some(discounts) = update.interval_discounts {
            next.interval_discounts.extend(discounts);
        }

        next.validate()
            .map_err(|e| RentalError::validation(e.to_string()))?;

        *self.config.write() = next.clone();
        debug!(currency = %next.currency, decimal_places = next.decimal_places, "pricing config updated");
        Ok(next)
    }

    /// Discount percent for an interval (0 when not configured)
    pub fn discount_for(&self, interval: BillingInterval) -> Decimal {
        self.config
            .read()
            .interval_discounts
            .get(&interval)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Final price of one period
    pub fn calculate_subscription_price(&self, plan: &Plan, interval: BillingInterval) -> Decimal {
        self.get_pricing_breakdown(plan, interval).final_price
    }

    /// Full price breakdown for one period
    pub fn get_pricing_breakdown(&self, plan: &Plan, interval: BillingInterval) -> PricingBreakdown {
        let config = self.config.read();
        let months = interval.months();
        let discount_percentage = config
            .interval_discounts
            .get(&interval)
            .copied()
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
        let places = config.decimal_places;

        if plan.base_price <= Decimal::ZERO {
            debug!(plan_id = %plan.id, %interval, "non-positive base price, zero breakdown");
            return PricingBreakdown::zero(interval, discount_percentage, &plan.currency);
        }

        let factor = Decimal::ONE - discount_percentage / Decimal::ONE_HUNDRED;
        let Some((total, discounted)) = plan
            .base_price
            .checked_mul(Decimal::from(months))
            .and_then(|total| Some((total, total.checked_mul(factor)?)))
        else {
            warn!(plan_id = %plan.id, %interval, base_price = %plan.base_price, "price overflow, zero breakdown");
            return PricingBreakdown::zero(interval, discount_percentage, &plan.currency);
        };
        let final_price = round(discounted, places);
        let total_price = round(total, places);
        let discount_amount = total_price - final_price;

        PricingBreakdown {
            base_price: round(plan.base_price, places),
            total_price,
            discount_percentage,
            discount_amount,
            final_price,
            monthly_equivalent: round(final_price / Decimal::from(months), places),
            savings_vs_monthly: discount_amount,
            billing_interval: interval,
            total_months: months,
            currency: plan.currency.clone(),
        }
    }

    /// Breakdown for every interval, shortest first
    pub fn get_all_pricing_options(&self, plan: &Plan) -> Vec<PricingBreakdown> {
        BillingInterval::ALL
            .iter()
            .map(|interval| self.get_pricing_breakdown(plan, *interval))
            .collect()
    }

    /// Price of `count` consecutive periods paid up front
    pub fn calculate_price_for_periods(
        &self,
        plan: &Plan,
        interval: BillingInterval,
        count: u32,
    ) -> RentalResult<Decimal> {
        if count == 0 {
            return Err(RentalError::validation("interval count must be a positive integer"));
        }
        self.calculate_subscription_price(plan, interval)
            .checked_mul(Decimal::from(count))
            .ok_or_else(|| RentalError::validation(format!("price of {count} periods of plan {} overflows", plan.id)))
    }

    /// Apply a percent discount; the percent is clamped to 0..=100
    pub fn calculate_discounted_price(&self, price: Decimal, discount_percent: Decimal) -> Decimal {
        let places = self.config.read().decimal_places;
        calculate_discounted_price(price, discount_percent, places)
    }

    /// Display string for an amount
    pub fn format_price(&self, amount: Decimal, currency: &str) -> String {
        let places = self.config.read().decimal_places;
        format_price(amount, currency, places)
    }
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

/// Round a money amount, midpoint away from zero
pub fn round(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Apply a percent discount; the percent is clamped to 0..=100
pub fn calculate_discounted_price(price: Decimal, discount_percent: Decimal, places: u32) -> Decimal {
    let percent = discount_percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    let kept = Decimal::ONE_HUNDRED - percent;
    let discounted = price
        .checked_mul(kept)
        .map(|scaled| scaled / Decimal::ONE_HUNDRED)
        .unwrap_or_else(|| price / Decimal::ONE_HUNDRED * kept);
    round(discounted, places)
}

/// Display string for an amount
pub fn format_price(amount: Decimal, currency: &str, places: u32) -> String {
    match currency.to_ascii_uppercase().as_str() {
        "USD" => format!("${}", fixed(amount, places)),
        "EUR" => format!("€{}", fixed(amount, places)),
        "GBP" => format!("£{}", fixed(amount, places)),
        "VND" => format!("{}₫", fixed(amount, 0)),
        code => format!("{} {}", fixed(amount, places), code),
    }
}

/// Rounded and padded to exactly `places` decimals
fn fixed(amount: Decimal, places: u32) -> Decimal {
    let mut amount = round(amount, places);
    amount.rescale(places);
    amount
}

/// Derived price of one billing period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    /// Monthly plan price
    pub base_price: Decimal,
    /// Base price times months, before discount
    pub total_price: Decimal,
    pub discount_percentage: Decimal,
    pub discount_amount: Decimal,
    pub final_price: Decimal,
    pub monthly_equivalent: Decimal,
    /// Saved compared with paying monthly for the same span
    pub savings_vs_monthly: Decimal,
    pub billing_interval: BillingInterval,
    pub total_months: u32,
    pub currency: String,
}

impl PricingBreakdown {
    fn zero(interval: BillingInterval, discount_percentage: Decimal, currency: &str) -> Self {
        Self {
            base_price: Decimal::ZERO,
            total_price: Decimal::ZERO,
            discount_percentage,
            discount_amount: Decimal::ZERO,
            final_price: Decimal::ZERO,
            monthly_equivalent: Decimal::ZERO,
            savings_vs_monthly: Decimal::ZERO,
            billing_interval: interval,
            total_months: interval.months(),
            currency: currency.into(),
        }
    }
}
