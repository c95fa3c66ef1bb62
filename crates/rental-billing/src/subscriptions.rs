//! Subscription Management
//!
//! Status and permission tables plus the read-only checks the API layer runs
//! before serving a merchant. Status changes are driven from outside (payment
//! events, renewal jobs, admin actions); see `lifecycle` for the mutations.

use chrono::{DateTime, Duration, Months, Utc};
use rental_common::{ErrorCode, RentalError, RentalResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::SubscriptionConfig;
use crate::interval::BillingInterval;

const SECONDS_PER_DAY: i64 = 86_400;

/// Subscription record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub billing_interval: BillingInterval,
    /// Price charged for the current period
    pub amount: Decimal,
    pub currency: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub paused_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Check record invariants
    pub fn validate(&self) -> RentalResult<()> {
        if self.current_period_end <= self.current_period_start {
            return Err(RentalError::validation(format!(
                "subscription {} period end must be after period start",
                self.id
            )));
        }
        if let (Some(start), Some(end)) = (self.trial_start, self.trial_end) {
            if end <= start {
                return Err(RentalError::validation(format!(
                    "subscription {} trial end must be after trial start",
                    self.id
                )));
            }
        }
        Ok(())
    }

    pub fn period(&self) -> BillingPeriod {
        BillingPeriod {
            start: self.current_period_start,
            end: self.current_period_end,
        }
    }
}

/// Subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    PastDue,
    Cancelled,
    Paused,
    Expired,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 6] = [
        SubscriptionStatus::Trial,
        SubscriptionStatus::Active,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Paused,
        SubscriptionStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Cancelled => "cancelled",
            Self::Paused => "paused",
            Self::Expired => "expired",
        }
    }

    /// Operations permitted in this status
    pub fn allowed_operations(&self) -> &'static [Operation] {
        match self {
            Self::Trial | Self::Active => &Operation::ALL,
            Self::PastDue => &[Operation::Read, Operation::Export, Operation::ManageBilling],
            Self::Paused => &[Operation::Read, Operation::ManageBilling],
            Self::Cancelled | Self::Expired => &[Operation::Read],
        }
    }

    pub fn can_perform(&self, operation: Operation) -> bool {
        self.allowed_operations().contains(&operation)
    }

    /// Statuses reachable in one step. Nothing returns to `Trial`; `Expired` is terminal.
    pub fn allowed_transitions(&self) -> &'static [SubscriptionStatus] {
        use SubscriptionStatus::*;
        match self {
            Trial => &[Active, PastDue, Cancelled, Paused, Expired],
            Active => &[PastDue, Cancelled, Paused, Expired],
            PastDue => &[Active, Cancelled, Expired],
            Paused => &[Active, Cancelled, Expired],
            Cancelled => &[Expired],
            Expired => &[],
        }
    }

    /// Same-status moves are idempotent and allowed
    pub fn can_transition_to(&self, next: SubscriptionStatus) -> bool {
        *self == next || self.allowed_transitions().contains(&next)
    }

    pub fn validate_transition(&self, next: SubscriptionStatus) -> RentalResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(RentalError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = RentalError;

    fn from_str(s: &str) -> RentalResult<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "trial" | "trialing" => Ok(Self::Trial),
            "active" => Ok(Self::Active),
            "past_due" | "pastdue" => Ok(Self::PastDue),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "paused" => Ok(Self::Paused),
            "expired" => Ok(Self::Expired),
            _ => Err(RentalError::validation(format!("unknown subscription status: {s}"))),
        }
    }
}

/// Operation a merchant attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
    Export,
    ManageBilling,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
        Operation::Export,
        Operation::ManageBilling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Export => "export",
            Self::ManageBilling => "manageBilling",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table lookup: may `status` perform `operation`
pub fn can_perform_operation(status: SubscriptionStatus, operation: Operation) -> bool {
    status.can_perform(operation)
}

/// Half-open billing period `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BillingPeriod {
    /// Calendar period of one interval starting at `start`
    pub fn starting_at(start: DateTime<Utc>, interval: BillingInterval) -> RentalResult<Self> {
        let end = start
            .checked_add_months(Months::new(interval.months()))
            .ok_or_else(|| RentalError::validation(format!("billing period from {start} overflows")))?;
        Ok(Self { start, end })
    }

    /// Whole days, rounded up, at least one
    pub fn days(&self) -> i64 {
        let seconds = (self.end - self.start).num_seconds();
        let days = seconds / SECONDS_PER_DAY + i64::from(seconds % SECONDS_PER_DAY > 0);
        days.max(1)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Urgency of a subscription needing merchant action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Why a subscription needs attention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionNotice {
    pub level: AttentionLevel,
    pub reason: String,
    pub days_remaining: i64,
}

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionValidationResult {
    pub is_valid: bool,
    pub status: SubscriptionStatus,
    pub error_code: Option<ErrorCode>,
    pub message: Option<String>,
    pub days_remaining: i64,
    pub in_grace_period: bool,
    pub grace_period_ends_at: Option<DateTime<Utc>>,
    pub allowed_operations: Vec<Operation>,
}

impl SubscriptionValidationResult {
    /// Convert a rejection into an error for `?` call sites
    pub fn into_result(self) -> RentalResult<Self> {
        match self.error_code {
            Some(code) if !self.is_valid => Err(RentalError::Subscription {
                code,
                message: self.message.unwrap_or_else(|| code.message_key().into()),
            }),
            _ => Ok(self),
        }
    }
}

/// Subscription manager
pub struct SubscriptionManager {
    config: SubscriptionConfig,
}

impl SubscriptionManager {
    pub fn new(config: SubscriptionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    pub fn grace_period(&self) -> Duration {
        Duration::days(i64::from(self.config.grace_period_days))
    }

    /// End of access before grace: trial end while trialing, else the period end
    pub fn effective_end(&self, sub: &Subscription) -> DateTime<Utc> {
        match (sub.status, sub.trial_end) {
            (SubscriptionStatus::Trial, Some(trial_end)) => trial_end,
            _ => sub.current_period_end,
        }
    }

    /// Trials end without grace
    pub fn grace_period_end(&self, sub: &Subscription) -> DateTime<Utc> {
        match sub.status {
            SubscriptionStatus::Trial => self.effective_end(sub),
            _ => self.effective_end(sub) + self.grace_period(),
        }
    }

    pub fn is_expired(&self, sub: &Subscription, now: DateTime<Utc>) -> bool {
        sub.status == SubscriptionStatus::Expired || now > self.effective_end(sub)
    }

    pub fn is_grace_period_exceeded(&self, sub: &Subscription, now: DateTime<Utc>) -> bool {
        now > self.grace_period_end(sub)
    }

    /// Expired but still inside the grace window
    pub fn is_in_grace_period(&self, sub: &Subscription, now: DateTime<Utc>) -> bool {
        sub.status != SubscriptionStatus::Expired
            && self.is_expired(sub, now)
            && !self.is_grace_period_exceeded(sub, now)
    }

    /// Signed whole days until the effective end (negative once past it)
    pub fn days_until_expiry(&self, sub: &Subscription, now: DateTime<Utc>) -> i64 {
        (self.effective_end(sub) - now)
            .num_seconds()
            .div_euclid(SECONDS_PER_DAY)
    }

    /// Decide whether the merchant keeps access
    pub fn validate_access(&self, sub: &Subscription, now: DateTime<Utc>) -> SubscriptionValidationResult {
        let days_remaining = self.days_until_expiry(sub, now);
        let expired = self.is_expired(sub, now);
        let grace_exceeded = self.is_grace_period_exceeded(sub, now);

        let rejection = match sub.status {
            SubscriptionStatus::Trial if expired => Some((
                ErrorCode::TrialExpired,
                "trial period has ended".to_string(),
            )),
            SubscriptionStatus::Trial => None,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue if grace_exceeded => Some((
                ErrorCode::GracePeriodExceeded,
                format!(
                    "subscription lapsed more than {} days ago",
                    self.config.grace_period_days
                ),
            )),
            SubscriptionStatus::Active | SubscriptionStatus::PastDue => None,
            SubscriptionStatus::Paused => Some((
                ErrorCode::SubscriptionPaused,
                "subscription is paused".to_string(),
            )),
            SubscriptionStatus::Cancelled => Some((
                ErrorCode::SubscriptionCancelled,
                "subscription has been cancelled".to_string(),
            )),
            SubscriptionStatus::Expired => Some((
                ErrorCode::SubscriptionExpired,
                "subscription has expired".to_string(),
            )),
        };

        let in_grace_period = rejection.is_none()
            && sub.status != SubscriptionStatus::Trial
            && self.is_in_grace_period(sub, now);

        match rejection {
            None => SubscriptionValidationResult {
                is_valid: true,
                status: sub.status,
                error_code: None,
                message: in_grace_period.then(|| "payment overdue, access kept during grace period".into()),
                days_remaining,
                in_grace_period,
                grace_period_ends_at: in_grace_period.then(|| self.grace_period_end(sub)),
                allowed_operations: sub.status.allowed_operations().to_vec(),
            },
            Some((code, message)) => {
                tracing::debug!(subscription_id = %sub.id, status = %sub.status, ?code, "subscription access rejected");
                SubscriptionValidationResult {
                    is_valid: false,
                    status: sub.status,
                    error_code: Some(code),
                    message: Some(message),
                    days_remaining,
                    in_grace_period: false,
                    grace_period_ends_at: None,
                    allowed_operations: vec![Operation::Read],
                }
            }
        }
    }

    /// Status table combined with access validity
    pub fn can_perform(&self, sub: &Subscription, operation: Operation, now: DateTime<Utc>) -> bool {
        self.validate_access(sub, now)
            .allowed_operations
            .contains(&operation)
    }

    /// Guard for call sites that must refuse the operation
    pub fn assert_can_perform(
        &self,
        sub: &Subscription,
        operation: Operation,
        now: DateTime<Utc>,
    ) -> RentalResult<()> {
        if self.can_perform(sub, operation, now) {
            Ok(())
        } else {
            Err(RentalError::OperationNotAllowed {
                operation: operation.to_string(),
                status: sub.status.to_string(),
            })
        }
    }

    pub fn calculate_billing_period(
        &self,
        start: DateTime<Utc>,
        interval: BillingInterval,
    ) -> RentalResult<BillingPeriod> {
        BillingPeriod::starting_at(start, interval)
    }

    /// Period that follows the current one
    pub fn next_billing_period(&self, sub: &Subscription) -> RentalResult<BillingPeriod> {
        BillingPeriod::starting_at(sub.current_period_end, sub.billing_interval)
    }

    /// Classify how urgently the merchant should act
    pub fn needs_attention(&self, sub: &Subscription, now: DateTime<Utc>) -> Option<AttentionNotice> {
        let days_remaining = self.days_until_expiry(sub, now);
        let thresholds = self.config.attention;
        let notice = |level, reason: &str| {
            Some(AttentionNotice {
                level,
                reason: reason.into(),
                days_remaining,
            })
        };

        match sub.status {
            SubscriptionStatus::Cancelled => return None,
            SubscriptionStatus::Expired => return notice(AttentionLevel::Critical, "subscription expired"),
            SubscriptionStatus::Paused => return notice(AttentionLevel::Low, "subscription paused"),
            _ => {}
        }

        if self.is_grace_period_exceeded(sub, now) {
            return notice(AttentionLevel::Critical, "grace period exceeded");
        }
        if self.is_in_grace_period(sub, now) {
            return notice(AttentionLevel::High, "in grace period");
        }
        if sub.status == SubscriptionStatus::PastDue {
            return notice(AttentionLevel::High, "payment past due");
        }

        let trial = sub.status == SubscriptionStatus::Trial;
        let by_days = if days_remaining <= thresholds.high_days {
            Some(AttentionLevel::High)
        } else if days_remaining <= thresholds.medium_days {
            Some(AttentionLevel::Medium)
        } else if days_remaining <= thresholds.low_days {
            Some(AttentionLevel::Low)
        } else {
            None
        };

        let level = if sub.cancel_at_period_end && days_remaining <= thresholds.medium_days {
            by_days.max(Some(AttentionLevel::Medium))
        } else {
            by_days
        };

        level.and_then(|level| {
            let reason = match (trial, sub.cancel_at_period_end) {
                (true, _) => "trial ending soon",
                (false, true) => "cancellation takes effect soon",
                (false, false) => "subscription expiring soon",
            };
            notice(level, reason)
        })
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new(SubscriptionConfig::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    pub(crate) fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    pub(crate) fn subscription(status: SubscriptionStatus, start: DateTime<Utc>, end: DateTime<Utc>) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            merchant_id: Uuid::new_v4(),
            plan_id: "basic".into(),
            status,
            billing_interval: BillingInterval::Month,
            amount: dec!(100),
            currency: "USD".into(),
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

    fn active_january() -> Subscription {
        subscription(SubscriptionStatus::Active, at(2024, 1, 1), at(2024, 1, 31))
    }

    #[test]
    fn test_permission_table() {
        assert!(can_perform_operation(SubscriptionStatus::Active, Operation::Create));
        assert!(can_perform_operation(SubscriptionStatus::Trial, Operation::Delete));
        assert!(can_perform_operation(SubscriptionStatus::PastDue, Operation::Read));
        assert!(!can_perform_operation(SubscriptionStatus::PastDue, Operation::Create));
        assert!(can_perform_operation(SubscriptionStatus::Paused, Operation::ManageBilling));
        for status in [SubscriptionStatus::Cancelled, SubscriptionStatus::Expired] {
            assert_eq!(status.allowed_operations(), &[Operation::Read]);
        }
    }

    #[test]
    fn test_transition_table() {
        use SubscriptionStatus::*;
        assert!(Trial.can_transition_to(Active));
        assert!(PastDue.can_transition_to(Active));
        assert!(Cancelled.can_transition_to(Expired));
        assert!(!Cancelled.can_transition_to(Active));
        assert!(Active.can_transition_to(Active));
        for status in SubscriptionStatus::ALL {
            if status != Trial {
                assert!(!status.can_transition_to(Trial), "{status} must not return to trial");
            }
        }
        assert!(Expired.allowed_transitions().is_empty());
        assert!(matches!(
            Expired.validate_transition(Active),
            Err(RentalError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("canceled".parse::<SubscriptionStatus>().unwrap(), SubscriptionStatus::Cancelled);
        assert_eq!("PAST_DUE".parse::<SubscriptionStatus>().unwrap(), SubscriptionStatus::PastDue);
        assert_eq!("trialing".parse::<SubscriptionStatus>().unwrap(), SubscriptionStatus::Trial);
        assert_eq!(serde_json::to_string(&SubscriptionStatus::PastDue).unwrap(), "\"past_due\"");
    }

    #[test]
    fn test_is_expired() {
        let manager = SubscriptionManager::default();
        let sub = active_january();
        assert!(!manager.is_expired(&sub, at(2024, 1, 31)));
        assert!(manager.is_expired(&sub, at(2024, 1, 31) + Duration::seconds(1)));
    }

    #[test]
    fn test_trial_end_drives_expiry() {
        let manager = SubscriptionManager::default();
        let mut sub = subscription(SubscriptionStatus::Trial, at(2024, 1, 1), at(2024, 2, 1));
        sub.trial_start = Some(at(2024, 1, 1));
        sub.trial_end = Some(at(2024, 1, 15));
        assert!(manager.is_expired(&sub, at(2024, 1, 16)));

        let result = manager.validate_access(&sub, at(2024, 1, 16));
        assert!(!result.is_valid);
        assert_eq!(result.error_code, Some(ErrorCode::TrialExpired));
    }

    #[test]
    fn test_grace_period() {
        let manager = SubscriptionManager::default();
        let sub = active_january();
        let grace_end = at(2024, 2, 7);

        assert!(!manager.is_grace_period_exceeded(&sub, grace_end));
        assert!(manager.is_in_grace_period(&sub, at(2024, 2, 3)));
        assert!(manager.is_grace_period_exceeded(&sub, grace_end + Duration::seconds(1)));
    }

    #[test]
    fn test_lapsed_trial_has_no_grace() {
        let manager = SubscriptionManager::default();
        let mut sub = subscription(SubscriptionStatus::Trial, at(2024, 1, 1), at(2024, 1, 15));
        sub.trial_end = Some(at(2024, 1, 15));
        let now = at(2024, 1, 17);

        assert!(!manager.is_in_grace_period(&sub, now));
        assert!(manager.is_grace_period_exceeded(&sub, now));
        assert_eq!(
            manager.validate_access(&sub, now).error_code,
            Some(ErrorCode::TrialExpired)
        );

        let notice = manager.needs_attention(&sub, now).unwrap();
        assert_eq!(notice.level, AttentionLevel::Critical);
        assert_eq!(notice.days_remaining, -2);
    }

    #[test]
    fn test_validate_access_active() {
        let manager = SubscriptionManager::default();
        let sub = active_january();

        let result = manager.validate_access(&sub, at(2024, 1, 21));
        assert!(result.is_valid);
        assert_eq!(result.days_remaining, 10);
        assert!(!result.in_grace_period);
        assert_eq!(result.allowed_operations, Operation::ALL.to_vec());
    }

    #[test]
    fn test_validate_access_in_grace() {
        let manager = SubscriptionManager::default();
        let sub = active_january();

        let result = manager.validate_access(&sub, at(2024, 2, 2));
        assert!(result.is_valid);
        assert!(result.in_grace_period);
        assert_eq!(result.grace_period_ends_at, Some(at(2024, 2, 7)));
        assert!(result.days_remaining < 0);
    }

    #[test]
    fn test_validate_access_grace_exceeded() {
        let manager = SubscriptionManager::default();
        let mut sub = active_january();
        sub.status = SubscriptionStatus::PastDue;

        let result = manager.validate_access(&sub, at(2024, 2, 10));
        assert!(!result.is_valid);
        assert_eq!(result.error_code, Some(ErrorCode::GracePeriodExceeded));
        assert_eq!(result.allowed_operations, vec![Operation::Read]);
        assert!(result.into_result().is_err());
    }

    #[test]
    fn test_past_due_keeps_read_access() {
        let manager = SubscriptionManager::default();
        let mut sub = active_january();
        sub.status = SubscriptionStatus::PastDue;
        let now = at(2024, 2, 2);

        assert!(manager.can_perform(&sub, Operation::Read, now));
        assert!(!manager.can_perform(&sub, Operation::Create, now));
        assert!(manager.assert_can_perform(&sub, Operation::Create, now).is_err());
    }

    #[test]
    fn test_validate_access_rejections() {
        let manager = SubscriptionManager::default();
        let now = at(2024, 1, 10);
        for (status, code) in [
            (SubscriptionStatus::Paused, ErrorCode::SubscriptionPaused),
            (SubscriptionStatus::Cancelled, ErrorCode::SubscriptionCancelled),
            (SubscriptionStatus::Expired, ErrorCode::SubscriptionExpired),
        ] {
            let mut sub = active_january();
            sub.status = status;
            let result = manager.validate_access(&sub, now);
            assert!(!result.is_valid);
            assert_eq!(result.error_code, Some(code));
        }
    }

    #[test]
    fn test_billing_periods() {
        let manager = SubscriptionManager::default();
        let period = manager
            .calculate_billing_period(at(2024, 1, 31), BillingInterval::Month)
            .unwrap();
        assert_eq!(period.end, at(2024, 2, 29));

        let quarter = manager
            .calculate_billing_period(at(2024, 1, 1), BillingInterval::Quarter)
            .unwrap();
        assert_eq!(quarter.end, at(2024, 4, 1));
        assert_eq!(quarter.days(), 91);

        let next = manager.next_billing_period(&active_january()).unwrap();
        assert_eq!(next.start, at(2024, 1, 31));
        assert_eq!(next.end, at(2024, 2, 29));
    }

    #[test]
    fn test_needs_attention_levels() {
        let manager = SubscriptionManager::default();
        let sub = active_january();

        assert_eq!(manager.needs_attention(&sub, at(2024, 1, 1)), None);
        assert_eq!(
            manager.needs_attention(&sub, at(2024, 1, 20)).map(|n| n.level),
            Some(AttentionLevel::Low)
        );
        assert_eq!(
            manager.needs_attention(&sub, at(2024, 1, 25)).map(|n| n.level),
            Some(AttentionLevel::Medium)
        );
        assert_eq!(
            manager.needs_attention(&sub, at(2024, 1, 29)).map(|n| n.level),
            Some(AttentionLevel::High)
        );
        assert_eq!(
            manager.needs_attention(&sub, at(2024, 2, 3)).map(|n| n.level),
            Some(AttentionLevel::High)
        );
        assert_eq!(
            manager.needs_attention(&sub, at(2024, 2, 20)).map(|n| n.level),
            Some(AttentionLevel::Critical)
        );
    }

    #[test]
    fn test_needs_attention_pending_cancellation() {
        let manager = SubscriptionManager::default();
        let mut sub = active_january();
        sub.cancel_at_period_end = true;

        let notice = manager.needs_attention(&sub, at(2024, 1, 27)).unwrap();
        assert_eq!(notice.level, AttentionLevel::Medium);
        assert_eq!(notice.reason, "cancellation takes effect soon");

        sub.status = SubscriptionStatus::Cancelled;
        assert_eq!(manager.needs_attention(&sub, at(2024, 1, 27)), None);
    }

    #[test]
    fn test_period_invariant() {
        let sub = subscription(SubscriptionStatus::Active, at(2024, 2, 1), at(2024, 1, 1));
        assert!(sub.validate().is_err());
        assert!(active_january().validate().is_ok());
    }
}
