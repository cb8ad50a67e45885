//! The fixed disbursement schedule.

use vandana_common::EligibilityCriterion;

/// One fixed position in the disbursement schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentSlot {
    /// Position in the sequence (1-based, immutable)
    pub ordinal: u8,

    /// Disbursement amount in currency minor units (paise)
    pub amount_paise: u64,

    /// Program milestone that must be satisfied before this slot unlocks
    pub criterion: EligibilityCriterion,
}

/// Number of installments owed to every beneficiary
pub const INSTALLMENT_COUNT: u8 = 3;

/// The program schedule. Ordinal positions are fixed by the program rules;
/// disbursement order must follow registration, antenatal care, birth.
pub const SCHEDULE: [InstallmentSlot; INSTALLMENT_COUNT as usize] = [
    InstallmentSlot {
        ordinal: 1,
        amount_paise: 100_000,
        criterion: EligibilityCriterion::PregnancyRegistrationWithin3Months,
    },
    InstallmentSlot {
        ordinal: 2,
        amount_paise: 200_000,
        criterion: EligibilityCriterion::AncVisitRecorded,
    },
    InstallmentSlot {
        ordinal: 3,
        amount_paise: 200_000,
        criterion: EligibilityCriterion::BirthRecorded,
    },
];

/// Look up a schedule slot by ordinal. Returns `None` for ordinals outside
/// the schedule.
pub fn slot(ordinal: u8) -> Option<&'static InstallmentSlot> {
    SCHEDULE.iter().find(|s| s.ordinal == ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_is_contiguous_from_one() {
        for (i, slot) in SCHEDULE.iter().enumerate() {
            assert_eq!(slot.ordinal, i as u8 + 1);
        }
    }

    #[test]
    fn test_slot_lookup() {
        assert_eq!(slot(1).unwrap().amount_paise, 100_000);
        assert_eq!(
            slot(3).unwrap().criterion,
            EligibilityCriterion::BirthRecorded
        );
        assert!(slot(0).is_none());
        assert!(slot(4).is_none());
    }
}
