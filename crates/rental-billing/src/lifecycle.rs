//! Subscription Lifecycle
//!
//! Mutations applied to subscription records by signup, payment events,
//! renewal jobs and admin actions. Every status change goes through the
//! transition table in `subscriptions`.

use chrono::{DateTime, Duration, Utc};
use rental_common::{ErrorCode, RentalError, RentalResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::interval::BillingInterval;
use crate::plan::Plan;
use crate::pricing::PricingCalculator;
use crate::proration::{ProrationCalculation, ProrationCalculator};
use crate::subscriptions::{BillingPeriod, Subscription, SubscriptionManager, SubscriptionStatus};

/// Lifecycle operations over subscription records
pub struct SubscriptionLifecycle {
    manager: Arc<SubscriptionManager>,
    pricing: Arc<PricingCalculator>,
    proration: Arc<ProrationCalculator>,
}

impl SubscriptionLifecycle {
    pub fn new(
        manager: Arc<SubscriptionManager>,
        pricing: Arc<PricingCalculator>,
        proration: Arc<ProrationCalculator>,
    ) -> Self {
        Self {
            manager,
            pricing,
            proration,
        }
    }

    /// Start a trial at merchant signup
    pub fn start_trial(
        &self,
        merchant_id: Uuid,
        plan: &Plan,
        interval: BillingInterval,
        now: DateTime<Utc>,
    ) -> RentalResult<Subscription> {
        if plan.trial_days == 0 {
            return Err(RentalError::validation(format!("plan {} has no trial", plan.id)));
        }
        let trial_end = now + Duration::days(i64::from(plan.trial_days));
        let mut sub = self.new_record(merchant_id, plan, interval, SubscriptionStatus::Trial, now, trial_end);
        sub.trial_start = Some(now);
        sub.trial_end = Some(trial_end);

        info!(%merchant_id, plan_id = %plan.id, trial_days = plan.trial_days, "trial started");
        Ok(sub)
    }

    /// Create a paid subscription at plan purchase
    pub fn activate(
        &self,
        merchant_id: Uuid,
        plan: &Plan,
        interval: BillingInterval,
        now: DateTime<Utc>,
    ) -> RentalResult<Subscription> {
        if !plan.is_active {
            return Err(RentalError::validation(format!("plan {} is not active", plan.id)));
        }
        let period = BillingPeriod::starting_at(now, interval)?;
        let sub = self.new_record(merchant_id, plan, interval, SubscriptionStatus::Active, period.start, period.end);

        info!(%merchant_id, plan_id = %plan.id, %interval, amount = %sub.amount, "subscription activated");
        Ok(sub)
    }

    /// Trial converted to paid; a fresh period starts now
    pub fn convert_trial(&self, sub: &mut Subscription, now: DateTime<Utc>) -> RentalResult<()> {
        if sub.status != SubscriptionStatus::Trial {
            return Err(RentalError::validation(format!(
                "subscription {} is {}, not trial",
                sub.id, sub.status
            )));
        }
        let period = BillingPeriod::starting_at(now, sub.billing_interval)?;
        self.transition(sub, SubscriptionStatus::Active, now)?;
        sub.current_period_start = period.start;
        sub.current_period_end = period.end;
        sub.trial_end = Some(sub.trial_end.map_or(now, |end| end.min(now)));
        Ok(())
    }

    /// Extend by one period after a successful charge
    pub fn renew(&self, sub: &mut Subscription, now: DateTime<Utc>) -> RentalResult<BillingPeriod> {
        match sub.status {
            SubscriptionStatus::Active | SubscriptionStatus::PastDue => {}
            SubscriptionStatus::Trial => {
                return Err(RentalError::validation("trial subscriptions are converted, not renewed"));
            }
            other => return Err(state_error(sub, other)),
        }
        if sub.cancel_at_period_end {
            return Err(RentalError::Subscription {
                code: ErrorCode::SubscriptionCancelled,
                message: format!("subscription {} is set to cancel at period end", sub.id),
            });
        }

        let next = self.manager.next_billing_period(sub)?;
        self.transition(sub, SubscriptionStatus::Active, now)?;
        sub.current_period_start = next.start;
        sub.current_period_end = next.end;

        info!(subscription_id = %sub.id, period_end = %next.end, "subscription renewed");
        Ok(next)
    }

    /// Cancel now, or flag the subscription to end with its period
    pub fn cancel(
        &self,
        sub: &mut Subscription,
        at_period_end: bool,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> RentalResult<()> {
        if matches!(sub.status, SubscriptionStatus::Cancelled | SubscriptionStatus::Expired) {
            return Err(state_error(sub, sub.status));
        }

        if at_period_end {
            sub.cancel_at_period_end = true;
            sub.updated_at = now;
        } else {
            self.transition(sub, SubscriptionStatus::Cancelled, now)?;
        }
        sub.cancelled_at = Some(now);
        sub.cancel_reason = reason.map(str::to_string);

        info!(subscription_id = %sub.id, at_period_end, "subscription cancelled");
        Ok(())
    }

    /// Withdraw a pending cancellation
    pub fn reactivate(&self, sub: &mut Subscription, now: DateTime<Utc>) -> RentalResult<()> {
        if matches!(sub.status, SubscriptionStatus::Cancelled | SubscriptionStatus::Expired) {
            return Err(state_error(sub, sub.status));
        }
        if !sub.cancel_at_period_end {
            return Err(RentalError::validation(format!(
                "subscription {} has no pending cancellation",
                sub.id
            )));
        }
        sub.cancel_at_period_end = false;
        sub.cancelled_at = None;
        sub.cancel_reason = None;
        sub.updated_at = now;

        info!(subscription_id = %sub.id, "pending cancellation withdrawn");
        Ok(())
    }

    pub fn pause(&self, sub: &mut Subscription, now: DateTime<Utc>) -> RentalResult<()> {
        self.transition(sub, SubscriptionStatus::Paused, now)?;
        sub.paused_at = Some(now);
        Ok(())
    }

    /// Resume a paused subscription; the period end moves by the paused span
    pub fn resume(&self, sub: &mut Subscription, now: DateTime<Utc>) -> RentalResult<()> {
        if sub.status != SubscriptionStatus::Paused {
            return Err(RentalError::validation(format!(
                "subscription {} is {}, not paused",
                sub.id, sub.status
            )));
        }
        self.transition(sub, SubscriptionStatus::Active, now)?;
        if let Some(paused_at) = sub.paused_at.take() {
            let paused_for = now - paused_at;
            if paused_for > Duration::zero() {
                sub.current_period_end += paused_for;
            }
        }
        Ok(())
    }

    /// Payment failed
    pub fn mark_past_due(&self, sub: &mut Subscription, now: DateTime<Utc>) -> RentalResult<()> {
        self.transition(sub, SubscriptionStatus::PastDue, now)
    }

    pub fn expire(&self, sub: &mut Subscription, now: DateTime<Utc>) -> RentalResult<()> {
        self.transition(sub, SubscriptionStatus::Expired, now)
    }

    /// Apply what the passage of time implies, as a renewal job would.
    /// Returns the new status when it changed.
    pub fn apply_period_end(
        &self,
        sub: &mut Subscription,
        now: DateTime<Utc>,
    ) -> RentalResult<Option<SubscriptionStatus>> {
        if !self.manager.is_expired(sub, now) {
            return Ok(None);
        }

        let next = match sub.status {
            SubscriptionStatus::Active | SubscriptionStatus::Trial if sub.cancel_at_period_end => {
                Some(SubscriptionStatus::Cancelled)
            }
            SubscriptionStatus::Trial => Some(SubscriptionStatus::Expired),
            SubscriptionStatus::Cancelled => Some(SubscriptionStatus::Expired),
            SubscriptionStatus::Active | SubscriptionStatus::PastDue
                if self.manager.is_grace_period_exceeded(sub, now) =>
            {
                Some(SubscriptionStatus::Expired)
            }
            SubscriptionStatus::Active => Some(SubscriptionStatus::PastDue),
            _ => None,
        };

        match next {
            Some(status) => {
                self.transition(sub, status, now)?;
                if status == SubscriptionStatus::Cancelled {
                    sub.cancel_at_period_end = false;
                }
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }

    /// Move to another plan mid-cycle. Upgrades settle the prorated charge;
    /// downgrade credits are reported but left unsettled. Nothing is settled
    /// while trialing since the trial itself is unpaid.
    pub fn change_plan(
        &self,
        sub: &mut Subscription,
        new_plan: &Plan,
        now: DateTime<Utc>,
    ) -> RentalResult<PlanChange> {
        if matches!(sub.status, SubscriptionStatus::Cancelled | SubscriptionStatus::Expired) {
            return Err(state_error(sub, sub.status));
        }
        if sub.plan_id == new_plan.id {
            return Err(RentalError::validation(format!(
                "subscription {} is already on plan {}",
                sub.id, new_plan.id
            )));
        }
        if !new_plan.is_active {
            return Err(RentalError::validation(format!("plan {} is not active", new_plan.id)));
        }

        let proration = self
            .proration
            .calculate_plan_change(sub, new_plan, &self.pricing, Some(now));
        let settled_charge = if sub.status != SubscriptionStatus::Trial
            && self
                .proration
                .should_apply_proration(proration.current_plan_price, proration.new_plan_price)
        {
            proration.charge_amount
        } else {
            Decimal::ZERO
        };

        let change = PlanChange {
            subscription_id: sub.id,
            old_plan_id: sub.plan_id.clone(),
            new_plan_id: new_plan.id.clone(),
            old_amount: sub.amount,
            new_amount: proration.new_plan_price,
            settled_charge,
            unsettled_credit: proration.credit_amount,
            proration,
            effective_at: now,
        };

        sub.plan_id = new_plan.id.clone();
        sub.amount = change.new_amount;
        sub.currency = new_plan.currency.clone();
        sub.updated_at = now;

        if change.unsettled_credit > Decimal::ZERO {
            warn!(subscription_id = %sub.id, credit = %change.unsettled_credit, "downgrade credit not settled");
        }
        info!(
            subscription_id = %sub.id,
            old_plan = %change.old_plan_id,
            new_plan = %change.new_plan_id,
            settled_charge = %change.settled_charge,
            "plan changed"
        );
        Ok(change)
    }

    fn transition(
        &self,
        sub: &mut Subscription,
        next: SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> RentalResult<()> {
        sub.status.validate_transition(next)?;
        if sub.status != next {
            info!(subscription_id = %sub.id, from = %sub.status, to = %next, "subscription status changed");
        }
        sub.status = next;
        sub.updated_at = now;
        Ok(())
    }

    fn new_record(
        &self,
        merchant_id: Uuid,
        plan: &Plan,
        interval: BillingInterval,
        status: SubscriptionStatus,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            merchant_id,
            plan_id: plan.id.clone(),
            status,
            billing_interval: interval,
            amount: self.pricing.calculate_subscription_price(plan, interval),
            currency: plan.currency.clone(),
            current_period_start: start,
            current_period_end: end,
            trial_start: None,
            trial_end: None,
            cancel_at_period_end: false,
            cancelled_at: None,
            cancel_reason: None,
            paused_at: None,
            created_at: start,
            updated_at: start,
        }
    }
}

fn state_error(sub: &Subscription, status: SubscriptionStatus) -> RentalError {
    let code = match status {
        SubscriptionStatus::Cancelled => ErrorCode::SubscriptionCancelled,
        SubscriptionStatus::Expired => ErrorCode::SubscriptionExpired,
        SubscriptionStatus::Paused => ErrorCode::SubscriptionPaused,
        SubscriptionStatus::PastDue => ErrorCode::SubscriptionPastDue,
        SubscriptionStatus::Trial | SubscriptionStatus::Active => ErrorCode::InvalidStatusTransition,
    };
    RentalError::Subscription {
        code,
        message: format!("subscription {} is {}", sub.id, status),
    }
}

/// Result of a plan change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanChange {
    pub subscription_id: Uuid,
    pub old_plan_id: String,
    pub new_plan_id: String,
    pub old_amount: Decimal,
    pub new_amount: Decimal,
    /// Charged immediately (upgrades only)
    pub settled_charge: Decimal,
    /// Computed for downgrades, left to billing policy
    pub unsettled_credit: Decimal,
    pub proration: ProrationCalculation,
    pub effective_at: DateTime<Utc>,
}
