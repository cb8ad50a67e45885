//! Core ledger logic for the maternity benefit installment program.
//!
//! Everything in this crate is pure: the disbursement schedule, the
//! installment status state machine, the eligibility criterion evaluator,
//! and bank detail validation. Storage and transport live in
//! `benefit-service`.

pub mod eligibility;
pub mod schedule;
pub mod state;
pub mod validation;

pub use eligibility::{criterion_satisfied, unlock_sweep, InstallmentSnapshot, ProgramFacts};
pub use schedule::{slot, InstallmentSlot, INSTALLMENT_COUNT, SCHEDULE};
pub use state::{allowed_transitions, validate_transition};
pub use validation::{is_valid_ifsc, validate_bank_details, BankDetailsForm};
