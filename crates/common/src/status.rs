use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Lifecycle status of a benefit installment.
///
/// `eligible_to_apply` is a legacy synonym of `eligible` left over from an
/// earlier schema. It is accepted on deserialization and parsing, normalized
/// to [`InstallmentStatus::Eligible`], and never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    /// Predecessor not yet paid, or criterion not yet satisfied
    Locked,
    /// Criterion satisfied and predecessor paid; may be applied for
    #[serde(alias = "eligible_to_apply")]
    Eligible,
    /// Open application awaiting caseworker review
    ApplicationSubmitted,
    /// Approved by a caseworker, awaiting the disbursement transaction
    Approved,
    /// Disbursed; terminal
    Paid,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Locked => "locked",
            InstallmentStatus::Eligible => "eligible",
            InstallmentStatus::ApplicationSubmitted => "application_submitted",
            InstallmentStatus::Approved => "approved",
            InstallmentStatus::Paid => "paid",
        }
    }

    /// Terminal states permit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstallmentStatus::Paid)
    }
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InstallmentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locked" => Ok(InstallmentStatus::Locked),
            "eligible" | "eligible_to_apply" => Ok(InstallmentStatus::Eligible),
            "application_submitted" => Ok(InstallmentStatus::ApplicationSubmitted),
            "approved" => Ok(InstallmentStatus::Approved),
            "paid" => Ok(InstallmentStatus::Paid),
            other => Err(Error::Redis(format!(
                "unknown installment status in storage: {}",
                other
            ))),
        }
    }
}

/// Caseworker review outcome of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Pending,
    Approved,
    Rejected,
}

impl ReviewOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewOutcome::Pending => "pending",
            ReviewOutcome::Approved => "approved",
            ReviewOutcome::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReviewOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewOutcome::Pending),
            "approved" => Ok(ReviewOutcome::Approved),
            "rejected" => Ok(ReviewOutcome::Rejected),
            other => Err(Error::Redis(format!(
                "unknown review outcome in storage: {}",
                other
            ))),
        }
    }
}
