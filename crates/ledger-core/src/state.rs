//! Installment status state machine.

use vandana_common::{Error, InstallmentStatus, Result};

/// Statuses reachable in one step from `from`.
///
/// The lifecycle is linear (`locked → eligible → application_submitted →
/// approved → paid`) with a single loop-back: a rejected application
/// returns the installment to `eligible`. `paid` is terminal.
pub fn allowed_transitions(from: InstallmentStatus) -> &'static [InstallmentStatus] {
    use InstallmentStatus::*;
    match from {
        Locked => &[Eligible],
        Eligible => &[ApplicationSubmitted],
        ApplicationSubmitted => &[Approved, Eligible],
        Approved => &[Paid],
        Paid => &[],
    }
}

/// Validates a single status transition
pub fn validate_transition(from: InstallmentStatus, to: InstallmentStatus) -> Result<()> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(Error::State(format!(
            "installment cannot move from {} to {}",
            from, to
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InstallmentStatus::*;

    #[test]
    fn test_linear_progression_allowed() {
        assert!(validate_transition(Locked, Eligible).is_ok());
        assert!(validate_transition(Eligible, ApplicationSubmitted).is_ok());
        assert!(validate_transition(ApplicationSubmitted, Approved).is_ok());
        assert!(validate_transition(Approved, Paid).is_ok());
    }

    #[test]
    fn test_rejection_returns_to_eligible() {
        assert!(validate_transition(ApplicationSubmitted, Eligible).is_ok());
    }

    #[test]
    fn test_no_skipping() {
        assert!(validate_transition(Locked, ApplicationSubmitted).is_err());
        assert!(validate_transition(Locked, Paid).is_err());
        assert!(validate_transition(Eligible, Paid).is_err());
        assert!(validate_transition(ApplicationSubmitted, Paid).is_err());
    }

    #[test]
    fn test_paid_is_terminal() {
        assert!(allowed_transitions(Paid).is_empty());
        assert!(validate_transition(Paid, Eligible).is_err());
        assert!(validate_transition(Paid, Locked).is_err());
        assert!(validate_transition(Paid, Approved).is_err());
    }

    #[test]
    fn test_no_downgrade() {
        assert!(validate_transition(Approved, Eligible).is_err());
        assert!(validate_transition(Eligible, Locked).is_err());
    }
}
