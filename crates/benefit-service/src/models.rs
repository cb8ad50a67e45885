//! Data models for the Benefit Service

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use vandana_common::{
    EligibilityCriterion, InstallmentStatus, MaskedPaymentDetails, PaymentDetails, ReviewOutcome,
};

/// A beneficiary enrolled in the maternity benefit program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beneficiary {
    /// Unique beneficiary identifier
    pub beneficiary_id: String,

    pub name: String,

    pub phone: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,

    /// When the beneficiary was enrolled
    pub created_at: DateTime<Utc>,

    /// Bank details captured at the first installment application
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentDetails>,
}

/// One installment of a beneficiary's three-slot ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    /// Position in the schedule (1, 2 or 3; immutable)
    pub ordinal: u8,

    /// Amount in currency minor units
    pub amount_paise: u64,

    /// Program milestone gating this installment
    pub criterion: EligibilityCriterion,

    /// Current lifecycle status
    pub status: InstallmentStatus,

    /// When the installment became eligible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible_at: Option<DateTime<Utc>>,

    /// When the installment was paid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,

    /// Disbursement transaction reference, set at payment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl Installment {
    /// Create a locked installment for a schedule slot
    pub fn new_locked(slot: &ledger_core::InstallmentSlot) -> Self {
        Self {
            ordinal: slot.ordinal,
            amount_paise: slot.amount_paise,
            criterion: slot.criterion,
            status: InstallmentStatus::Locked,
            eligible_at: None,
            paid_at: None,
            transaction_id: None,
        }
    }
}

/// A beneficiary's application for an eligible installment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub beneficiary_id: String,

    pub ordinal: u8,

    pub submitted_at: DateTime<Utc>,

    /// Caseworker review outcome; applications are immutable once resolved
    pub outcome: ReviewOutcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Request to enroll a beneficiary
#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    /// Identity from the upstream account system; generated when absent
    #[serde(default)]
    pub beneficiary_id: Option<String>,

    pub name: String,

    pub phone: String,

    #[serde(default)]
    pub village: Option<String>,

    /// Registration facts already on record at enrollment, evaluated
    /// immediately for the first installment
    #[serde(default)]
    pub lmp_date: Option<NaiveDate>,

    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
}

/// Response from enrolling a beneficiary
#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub beneficiary_id: String,

    pub installments: Vec<Installment>,
}

/// Program event ingested from an external record source
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ProgramEvent {
    /// Pregnancy registration record created
    Registration {
        lmp_date: NaiveDate,
        registration_date: NaiveDate,
    },
    /// Antenatal visit record created
    AncVisit { visit_date: NaiveDate },
    /// Birth record created
    Birth { birth_date: NaiveDate },
}

/// Request to ingest a program event
#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    pub beneficiary_id: String,

    #[serde(flatten)]
    pub event: ProgramEvent,
}

/// Response from event ingestion
#[derive(Debug, Serialize)]
pub struct RecordEventResponse {
    /// Ordinals unlocked by this event (may be empty)
    pub unlocked: Vec<u8>,
}

/// Beneficiary request to apply for an eligible installment. Bank fields
/// are required on the first installment only.
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub ordinal: u8,

    #[serde(default)]
    pub account_holder: Option<String>,

    #[serde(default)]
    pub account_number: Option<String>,

    #[serde(default)]
    pub confirm_account_number: Option<String>,

    #[serde(default)]
    pub ifsc_code: Option<String>,

    #[serde(default)]
    pub bank_name: Option<String>,
}

/// Response from a successful application
#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    pub ordinal: u8,

    pub status: InstallmentStatus,

    pub submitted_at: DateTime<Utc>,
}

/// Beneficiary-facing ledger summary
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub beneficiary_id: String,

    pub installments: Vec<Installment>,

    /// Sum of amounts for installments that have reached `eligible` or later
    pub total_eligible_paise: u64,

    /// Sum of amounts for paid installments
    pub total_paid_paise: u64,

    /// Stored bank details, account number masked to its last 4 digits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<MaskedPaymentDetails>,
}

/// One pending application joined with beneficiary contact info, for
/// caseworker review
#[derive(Debug, Serialize)]
pub struct PendingApplication {
    pub beneficiary_id: String,

    pub beneficiary_name: String,

    pub phone: String,

    pub ordinal: u8,

    pub amount_paise: u64,

    pub submitted_at: DateTime<Utc>,

    /// Full stored payment details (caseworkers disburse to this account)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentDetails>,
}

/// Caseworker request to reject an application
#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub review_notes: Option<String>,
}

/// Caseworker request to record the disbursement transaction
#[derive(Debug, Deserialize)]
pub struct MarkPaidRequest {
    pub transaction_id: String,
}

/// Confirmation of a caseworker action
#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    pub beneficiary_id: String,

    pub ordinal: u8,

    pub status: InstallmentStatus,
}

/// Service-level counters
#[derive(Debug, Serialize)]
pub struct LedgerStats {
    pub beneficiaries: usize,

    pub pending_applications: usize,
}

/// Webhook payload sent on a status transition
#[derive(Debug, Serialize)]
pub struct NotificationPayload {
    pub beneficiary_id: String,

    pub ordinal: u8,

    /// Transition kind, e.g. "application_submitted", "payment_completed"
    pub event: &'static str,

    pub status: InstallmentStatus,
}
