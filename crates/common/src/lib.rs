pub mod criterion;
pub mod error;
pub mod payment;
pub mod status;

pub use criterion::{EligibilityCriterion, Role};
pub use error::{Error, Result};
pub use payment::{MaskedPaymentDetails, PaymentDetails};
pub use status::{InstallmentStatus, ReviewOutcome};
