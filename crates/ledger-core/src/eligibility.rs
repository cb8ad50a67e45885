//! Eligibility criterion evaluation and the unlock sweep.

use chrono::NaiveDate;
use vandana_common::{EligibilityCriterion, InstallmentStatus};

use crate::schedule::slot;

/// Registration counts as timely within this many days of the last
/// menstrual period
pub const REGISTRATION_WINDOW_DAYS: i64 = 90;

/// Read-only program facts accumulated for a beneficiary from external
/// record sources. The ledger never mutates the underlying records; it only
/// evaluates criteria against this snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramFacts {
    /// Last menstrual period date from the pregnancy registration record
    pub lmp_date: Option<NaiveDate>,

    /// Date the pregnancy was registered with the program
    pub registration_date: Option<NaiveDate>,

    /// Number of antenatal visits on record
    pub anc_visit_count: u32,

    /// Date of birth from the birth record, when one exists
    pub birth_date: Option<NaiveDate>,
}

/// Evaluate one criterion against the facts. Pure and idempotent; a
/// satisfied criterion stays satisfied as facts only accumulate.
pub fn criterion_satisfied(criterion: EligibilityCriterion, facts: &ProgramFacts) -> bool {
    match criterion {
        EligibilityCriterion::PregnancyRegistrationWithin3Months => {
            match (facts.lmp_date, facts.registration_date) {
                (Some(lmp), Some(registered)) => {
                    let days = (registered - lmp).num_days();
                    (0..=REGISTRATION_WINDOW_DAYS).contains(&days)
                }
                _ => false,
            }
        }
        EligibilityCriterion::AncVisitRecorded => facts.anc_visit_count > 0,
        EligibilityCriterion::BirthRecorded => facts.birth_date.is_some(),
    }
}

/// Gating-relevant view of one stored installment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentSnapshot {
    pub ordinal: u8,
    pub status: InstallmentStatus,
}

/// Ordinals whose installments should move `locked → eligible` given the
/// current statuses and facts.
///
/// Installment N unlocks only when its own criterion is satisfied AND
/// installment N−1 is `paid` (N == 1 is exempt). A satisfied later-stage
/// criterion never bypasses the gate: the unlock is simply withheld until
/// the predecessor is paid, and re-attempted on every subsequent sweep.
/// Installments already at `eligible` or later are left untouched, so
/// running the sweep twice produces no further changes.
pub fn unlock_sweep(installments: &[InstallmentSnapshot], facts: &ProgramFacts) -> Vec<u8> {
    let mut unlocked = Vec::new();

    for snapshot in installments {
        if snapshot.status != InstallmentStatus::Locked {
            continue;
        }

        let Some(slot) = slot(snapshot.ordinal) else {
            continue;
        };

        let predecessor_paid = snapshot.ordinal == 1
            || installments
                .iter()
                .any(|s| s.ordinal == snapshot.ordinal - 1 && s.status == InstallmentStatus::Paid);

        if predecessor_paid && criterion_satisfied(slot.criterion, facts) {
            unlocked.push(snapshot.ordinal);
        }
    }

    unlocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshots(statuses: [InstallmentStatus; 3]) -> Vec<InstallmentSnapshot> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, &status)| InstallmentSnapshot {
                ordinal: i as u8 + 1,
                status,
            })
            .collect()
    }

    #[test]
    fn test_registration_within_window_satisfied() {
        // Registration 60 days after LMP
        let facts = ProgramFacts {
            lmp_date: Some(date(2024, 1, 10)),
            registration_date: Some(date(2024, 3, 10)),
            ..Default::default()
        };
        assert!(criterion_satisfied(
            EligibilityCriterion::PregnancyRegistrationWithin3Months,
            &facts
        ));
    }

    #[test]
    fn test_registration_outside_window_not_satisfied() {
        let facts = ProgramFacts {
            lmp_date: Some(date(2024, 1, 1)),
            registration_date: Some(date(2024, 5, 1)),
            ..Default::default()
        };
        assert!(!criterion_satisfied(
            EligibilityCriterion::PregnancyRegistrationWithin3Months,
            &facts
        ));
    }

    #[test]
    fn test_registration_before_lmp_not_satisfied() {
        let facts = ProgramFacts {
            lmp_date: Some(date(2024, 3, 1)),
            registration_date: Some(date(2024, 2, 1)),
            ..Default::default()
        };
        assert!(!criterion_satisfied(
            EligibilityCriterion::PregnancyRegistrationWithin3Months,
            &facts
        ));
    }

    #[test]
    fn test_registration_without_lmp_not_satisfied() {
        let facts = ProgramFacts {
            registration_date: Some(date(2024, 2, 1)),
            ..Default::default()
        };
        assert!(!criterion_satisfied(
            EligibilityCriterion::PregnancyRegistrationWithin3Months,
            &facts
        ));
    }

    #[test]
    fn test_first_installment_unlocks_on_timely_registration() {
        use InstallmentStatus::*;
        let facts = ProgramFacts {
            lmp_date: Some(date(2024, 1, 10)),
            registration_date: Some(date(2024, 3, 10)),
            ..Default::default()
        };
        let installments = snapshots([Locked, Locked, Locked]);
        assert_eq!(unlock_sweep(&installments, &facts), vec![1]);
    }

    #[test]
    fn test_birth_before_anc_leaves_middle_installment_locked() {
        use InstallmentStatus::*;
        // Installment 1 paid, then a birth is recorded before any ANC visit.
        // Installment 3's criterion is satisfied but its predecessor is not
        // paid; installment 2's criterion is not satisfied. Nothing unlocks.
        let facts = ProgramFacts {
            lmp_date: Some(date(2024, 1, 10)),
            registration_date: Some(date(2024, 2, 1)),
            anc_visit_count: 0,
            birth_date: Some(date(2024, 10, 1)),
        };
        let installments = snapshots([Paid, Locked, Locked]);
        assert_eq!(unlock_sweep(&installments, &facts), Vec::<u8>::new());
    }

    #[test]
    fn test_successor_unlocks_once_predecessor_paid() {
        use InstallmentStatus::*;
        let facts = ProgramFacts {
            lmp_date: Some(date(2024, 1, 10)),
            registration_date: Some(date(2024, 2, 1)),
            anc_visit_count: 1,
            birth_date: None,
        };
        let installments = snapshots([Paid, Locked, Locked]);
        assert_eq!(unlock_sweep(&installments, &facts), vec![2]);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        use InstallmentStatus::*;
        let facts = ProgramFacts {
            lmp_date: Some(date(2024, 1, 10)),
            registration_date: Some(date(2024, 2, 1)),
            ..Default::default()
        };
        let installments = snapshots([Eligible, Locked, Locked]);
        // Installment 1 is already eligible; re-evaluating its satisfied
        // criterion changes nothing.
        assert_eq!(unlock_sweep(&installments, &facts), Vec::<u8>::new());
    }

    #[test]
    fn test_sweep_never_touches_later_states() {
        use InstallmentStatus::*;
        let facts = ProgramFacts {
            lmp_date: Some(date(2024, 1, 10)),
            registration_date: Some(date(2024, 2, 1)),
            anc_visit_count: 2,
            birth_date: Some(date(2024, 10, 1)),
        };
        let installments = snapshots([Paid, ApplicationSubmitted, Locked]);
        // Installment 2 has an open application; installment 3 stays locked
        // behind it even though its criterion is satisfied.
        assert_eq!(unlock_sweep(&installments, &facts), Vec::<u8>::new());
    }
}
