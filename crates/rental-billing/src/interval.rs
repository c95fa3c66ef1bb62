//! Billing intervals

use rental_common::{RentalError, RentalResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription renewal cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BillingInterval {
    Month,
    Quarter,
    SemiAnnual,
    Year,
}

impl BillingInterval {
    /// All intervals, shortest first
    pub const ALL: [BillingInterval; 4] = [
        BillingInterval::Month,
        BillingInterval::Quarter,
        BillingInterval::SemiAnnual,
        BillingInterval::Year,
    ];

    /// Number of calendar months covered by one period
    pub fn months(&self) -> u32 {
        match self {
            Self::Month => 1,
            Self::Quarter => 3,
            Self::SemiAnnual => 6,
            Self::Year => 12,
        }
    }

    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::SemiAnnual => "semiAnnual",
            Self::Year => "year",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Month => "Monthly",
            Self::Quarter => "Quarterly",
            Self::SemiAnnual => "Semi-annual",
            Self::Year => "Yearly",
        }
    }
}

impl fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts every spelling the create and update payloads have used.
impl FromStr for BillingInterval {
    type Err = RentalError;

    fn from_str(s: &str) -> RentalResult<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "month" | "monthly" => Ok(Self::Month),
            "quarter" | "quarterly" => Ok(Self::Quarter),
            "semiannual" | "semiannually" | "sixmonths" | "6months" => Ok(Self::SemiAnnual),
            "year" | "yearly" | "annual" | "annually" => Ok(Self::Year),
            _ => Err(RentalError::validation(format!("unknown billing interval: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_months() {
        let months: Vec<u32> = BillingInterval::ALL.iter().map(|i| i.months()).collect();
        assert_eq!(months, vec![1, 3, 6, 12]);
    }

    #[test]
    fn test_parse_schema_spellings() {
        assert_eq!("monthly".parse::<BillingInterval>().unwrap(), BillingInterval::Month);
        assert_eq!("Quarterly".parse::<BillingInterval>().unwrap(), BillingInterval::Quarter);
        assert_eq!("semiAnnual".parse::<BillingInterval>().unwrap(), BillingInterval::SemiAnnual);
        assert_eq!("semi_annual".parse::<BillingInterval>().unwrap(), BillingInterval::SemiAnnual);
        assert_eq!("semi-annual".parse::<BillingInterval>().unwrap(), BillingInterval::SemiAnnual);
        assert_eq!("sixMonths".parse::<BillingInterval>().unwrap(), BillingInterval::SemiAnnual);
        assert_eq!("annual".parse::<BillingInterval>().unwrap(), BillingInterval::Year);
        assert_eq!(" year ".parse::<BillingInterval>().unwrap(), BillingInterval::Year);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "weekly".parse::<BillingInterval>().unwrap_err();
        assert_eq!(err.code(), rental_common::ErrorCode::ValidationError);
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&BillingInterval::SemiAnnual).unwrap();
        assert_eq!(json, "\"semiAnnual\"");
        let parsed: BillingInterval = serde_json::from_str("\"quarter\"").unwrap();
        assert_eq!(parsed, BillingInterval::Quarter);
    }
}
