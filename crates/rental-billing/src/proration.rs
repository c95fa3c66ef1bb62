//! Proration Calculator
//!
//! Charges or credits the price difference for the part of the period left
//! after a plan change. Only upgrades are charged right away. Downgrade
//! credits are computed and reported but not settled automatically.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::plan::Plan;
use crate::pricing::{round, PricingCalculator};
use crate::subscriptions::Subscription;

const SECONDS_PER_DAY: i64 = 86_400;

/// Proration calculator
pub struct ProrationCalculator {
    decimal_places: u32,
}

impl ProrationCalculator {
    pub fn new(decimal_places: u32) -> Self {
        Self { decimal_places }
    }

    /// Prorate a price change. `change_date` defaults to now and is clamped
    /// to the current period.
    pub fn calculate_proration(
        &self,
        current: &Subscription,
        new_plan_price: Decimal,
        change_date: Option<DateTime<Utc>>,
    ) -> ProrationCalculation {
        let change_date = change_date.unwrap_or_else(Utc::now);
        let days_in_period = current.period().days();
        let days_elapsed = (change_date - current.current_period_start)
            .num_seconds()
            .div_euclid(SECONDS_PER_DAY)
            .clamp(0, days_in_period);
        let days_remaining = days_in_period - days_elapsed;

        let current_plan_price = current.amount;
        let prorated_amount = match new_plan_price.checked_sub(current_plan_price) {
            Some(delta) => round(
                prorate(delta, days_remaining, days_in_period),
                self.decimal_places,
            ),
            None => {
                warn!(subscription_id = %current.id, %current_plan_price, %new_plan_price, "price delta overflow, nothing prorated");
                Decimal::ZERO
            }
        };

        let is_upgrade = new_plan_price > current_plan_price;
        let is_downgrade = new_plan_price < current_plan_price;

        debug!(
            subscription_id = %current.id,
            %current_plan_price,
            %new_plan_price,
            days_remaining,
            days_in_period,
            %prorated_amount,
            "proration calculated"
        );

        ProrationCalculation {
            is_upgrade,
            is_downgrade,
            current_plan_price,
            new_plan_price,
            days_in_period,
            days_elapsed,
            days_remaining,
            prorated_amount,
            credit_amount: if is_downgrade { prorated_amount.abs() } else { Decimal::ZERO },
            charge_amount: if is_upgrade { prorated_amount } else { Decimal::ZERO },
            change_date,
        }
    }

    /// Whether the difference is charged immediately
    pub fn should_apply_proration(&self, current_price: Decimal, new_price: Decimal) -> bool {
        should_apply_proration(current_price, new_price)
    }

    /// Price the new plan at the subscription's interval, then prorate
    pub fn calculate_plan_change(
        &self,
        current: &Subscription,
        new_plan: &Plan,
        pricing: &PricingCalculator,
        change_date: Option<DateTime<Utc>>,
    ) -> ProrationCalculation {
        let new_price = pricing.calculate_subscription_price(new_plan, current.billing_interval);
        self.calculate_proration(current, new_price, change_date)
    }
}

impl Default for ProrationCalculator {
    fn default() -> Self {
        Self::new(2)
    }
}

/// `delta * remaining / total`; the share never exceeds `delta`, so the
/// division goes first when the product would overflow
fn prorate(delta: Decimal, remaining: i64, total: i64) -> Decimal {
    let (remaining, total) = (Decimal::from(remaining), Decimal::from(total));
    delta
        .checked_mul(remaining)
        .map(|scaled| scaled / total)
        .unwrap_or_else(|| delta / total * remaining)
}

/// Only upgrades are charged; downgrades never auto-settle
pub fn should_apply_proration(current_price: Decimal, new_price: Decimal) -> bool {
    new_price > current_price
}

/// Derived proration for a plan change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProrationCalculation {
    pub is_upgrade: bool,
    pub is_downgrade: bool,
    pub current_plan_price: Decimal,
    pub new_plan_price: Decimal,
    pub days_in_period: i64,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    /// Signed: negative for downgrades
    pub prorated_amount: Decimal,
    pub credit_amount: Decimal,
    pub charge_amount: Decimal,
    pub change_date: DateTime<Utc>,
}
