use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Program milestone that gates an installment.
///
/// Closed set: extend by adding variants, never by matching free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityCriterion {
    /// Pregnancy registered within 90 days of the last menstrual period
    PregnancyRegistrationWithin3Months,
    /// At least one antenatal visit recorded
    AncVisitRecorded,
    /// A birth record exists
    BirthRecorded,
}

impl EligibilityCriterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            EligibilityCriterion::PregnancyRegistrationWithin3Months => {
                "pregnancy_registration_within_3_months"
            }
            EligibilityCriterion::AncVisitRecorded => "anc_visit_recorded",
            EligibilityCriterion::BirthRecorded => "birth_recorded",
        }
    }
}

impl fmt::Display for EligibilityCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EligibilityCriterion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pregnancy_registration_within_3_months" => {
                Ok(EligibilityCriterion::PregnancyRegistrationWithin3Months)
            }
            "anc_visit_recorded" => Ok(EligibilityCriterion::AncVisitRecorded),
            "birth_recorded" => Ok(EligibilityCriterion::BirthRecorded),
            other => Err(Error::Redis(format!(
                "unknown eligibility criterion in storage: {}",
                other
            ))),
        }
    }
}

/// Actor role supplied by the upstream identity boundary. The ledger trusts
/// this completely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Beneficiary,
    Caseworker,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beneficiary" => Ok(Role::Beneficiary),
            "caseworker" => Ok(Role::Caseworker),
            other => Err(Error::validation(
                "x-actor-role",
                format!("unknown role: {}", other),
            )),
        }
    }
}
