//! The benefit installment ledger
//!
//! Every installment state change flows through this component; callers
//! never mutate storage fields directly. Transitions are applied with a
//! compare-and-set so concurrent mutations cannot both win, and the
//! eligibility unlock sweep re-runs after every event ingestion and every
//! completed payment.

use chrono::Utc;
use ledger_core::{criterion_satisfied, slot, unlock_sweep, InstallmentSnapshot, ProgramFacts};
use tracing::info;
use uuid::Uuid;
use vandana_common::{Error, InstallmentStatus, Result, ReviewOutcome};

use crate::models::{
    Application, ApplyRequest, ApplyResponse, Beneficiary, ConfirmationResponse, EnrollRequest,
    EnrollResponse, Installment, LedgerStats, NotificationPayload, PendingApplication,
    ProgramEvent, RecordEventRequest, RecordEventResponse, SummaryResponse,
};
use crate::notifier::Notifier;
use crate::storage::Storage;

pub struct Ledger {
    storage: Storage,
    notifier: Notifier,
}

impl Ledger {
    pub fn new(storage: Storage, notifier: Notifier) -> Self {
        Self { storage, notifier }
    }

    /// Enroll a beneficiary and create their three-slot ledger. The first
    /// installment starts eligible when its criterion is already satisfied
    /// by the facts supplied at enrollment; everything else starts locked.
    pub async fn enroll(&mut self, request: EnrollRequest) -> Result<EnrollResponse> {
        if request.name.trim().is_empty() {
            return Err(Error::validation("name", "is required"));
        }
        if request.phone.trim().is_empty() {
            return Err(Error::validation("phone", "is required"));
        }

        let beneficiary_id = request
            .beneficiary_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let facts = ProgramFacts {
            lmp_date: request.lmp_date,
            registration_date: request.registration_date,
            ..Default::default()
        };

        let now = Utc::now();
        let mut installments: Vec<Installment> = ledger_core::SCHEDULE
            .iter()
            .map(Installment::new_locked)
            .collect();

        if criterion_satisfied(installments[0].criterion, &facts) {
            installments[0].status = InstallmentStatus::Eligible;
            installments[0].eligible_at = Some(now);
        }

        let beneficiary = Beneficiary {
            beneficiary_id: beneficiary_id.clone(),
            name: request.name.trim().to_string(),
            phone: request.phone.trim().to_string(),
            village: request.village,
            created_at: now,
            payment_details: None,
        };

        let created = self
            .storage
            .create_beneficiary(&beneficiary, &installments, &facts)
            .await?;

        if !created {
            return Err(Error::Conflict(format!(
                "beneficiary {} is already enrolled",
                beneficiary_id
            )));
        }

        info!("Enrolled beneficiary {}", beneficiary_id);

        Ok(EnrollResponse {
            beneficiary_id,
            installments,
        })
    }

    /// Ledger summary for a beneficiary. NotFound here means "not enrolled
    /// yet", which clients treat as benign.
    pub async fn get_summary(&mut self, beneficiary_id: &str) -> Result<SummaryResponse> {
        let beneficiary = self
            .storage
            .get_beneficiary(beneficiary_id)
            .await?
            .ok_or_else(|| Error::not_found("beneficiary"))?;

        let installments = self.storage.get_installments(beneficiary_id).await?;

        let total_eligible_paise = installments
            .iter()
            .filter(|i| i.status != InstallmentStatus::Locked)
            .map(|i| i.amount_paise)
            .sum();

        let total_paid_paise = installments
            .iter()
            .filter(|i| i.status == InstallmentStatus::Paid)
            .map(|i| i.amount_paise)
            .sum();

        Ok(SummaryResponse {
            beneficiary_id: beneficiary_id.to_string(),
            installments,
            total_eligible_paise,
            total_paid_paise,
            payment_details: beneficiary.payment_details.map(|d| d.masked()),
        })
    }

    /// Apply for an eligible installment. Bank details are captured on the
    /// first application and persisted only when the transition succeeds.
    pub async fn apply(
        &mut self,
        beneficiary_id: &str,
        request: ApplyRequest,
    ) -> Result<ApplyResponse> {
        let beneficiary = self
            .storage
            .get_beneficiary(beneficiary_id)
            .await?
            .ok_or_else(|| Error::not_found("beneficiary"))?;

        let installment = self
            .storage
            .get_installment(beneficiary_id, request.ordinal)
            .await?
            .ok_or_else(|| Error::not_found("installment"))?;

        if installment.status != InstallmentStatus::Eligible {
            return Err(Error::State(format!(
                "installment {} is {}, not eligible to apply",
                request.ordinal, installment.status
            )));
        }

        // Bank details are required only while none are on record, which by
        // the ordinal gate can only be the first installment's application.
        let payment_details = if beneficiary.payment_details.is_none() {
            let form = ledger_core::BankDetailsForm {
                account_holder: request.account_holder,
                account_number: request.account_number,
                confirm_account_number: request.confirm_account_number,
                ifsc_code: request.ifsc_code,
                bank_name: request.bank_name,
            };
            Some(ledger_core::validate_bank_details(&form)?)
        } else {
            None
        };

        let submitted_at = Utc::now();

        let won = self
            .storage
            .try_transition(
                beneficiary_id,
                request.ordinal,
                InstallmentStatus::Eligible,
                InstallmentStatus::ApplicationSubmitted,
            )
            .await?;

        if !won {
            return Err(Error::Conflict(format!(
                "installment {} was updated concurrently; refresh and retry",
                request.ordinal
            )));
        }

        if let Some(details) = &payment_details {
            self.storage
                .save_payment_details(beneficiary_id, details)
                .await?;
        }

        let application = Application {
            beneficiary_id: beneficiary_id.to_string(),
            ordinal: request.ordinal,
            submitted_at,
            outcome: ReviewOutcome::Pending,
            review_notes: None,
            resolved_at: None,
        };
        self.storage.put_application(&application).await?;

        info!(
            "Application submitted: {}/{}",
            beneficiary_id, request.ordinal
        );

        self.notifier
            .notify(&NotificationPayload {
                beneficiary_id: beneficiary_id.to_string(),
                ordinal: request.ordinal,
                event: "application_submitted",
                status: InstallmentStatus::ApplicationSubmitted,
            })
            .await;

        Ok(ApplyResponse {
            ordinal: request.ordinal,
            status: InstallmentStatus::ApplicationSubmitted,
            submitted_at,
        })
    }

    /// All pending applications joined with beneficiary contact info,
    /// oldest submission first.
    pub async fn list_pending(&mut self) -> Result<Vec<PendingApplication>> {
        let refs = self.storage.pending_application_refs().await?;

        let mut pending = Vec::with_capacity(refs.len());
        for (beneficiary_id, ordinal) in refs {
            let Some(application) = self.storage.get_application(&beneficiary_id, ordinal).await?
            else {
                continue;
            };
            let Some(beneficiary) = self.storage.get_beneficiary(&beneficiary_id).await? else {
                continue;
            };

            pending.push(PendingApplication {
                beneficiary_id,
                beneficiary_name: beneficiary.name,
                phone: beneficiary.phone,
                ordinal,
                amount_paise: slot(ordinal).map(|s| s.amount_paise).unwrap_or(0),
                submitted_at: application.submitted_at,
                payment_details: beneficiary.payment_details,
            });
        }

        Ok(pending)
    }

    /// Approve a submitted application. The installment moves to `approved`
    /// and waits for the disbursement transaction to be recorded.
    pub async fn approve(
        &mut self,
        beneficiary_id: &str,
        ordinal: u8,
    ) -> Result<ConfirmationResponse> {
        let installment = self.require_installment(beneficiary_id, ordinal).await?;

        if installment.status != InstallmentStatus::ApplicationSubmitted {
            return Err(Error::State(format!(
                "installment {} is {}, not awaiting review",
                ordinal, installment.status
            )));
        }

        let won = self
            .storage
            .try_transition(
                beneficiary_id,
                ordinal,
                InstallmentStatus::ApplicationSubmitted,
                InstallmentStatus::Approved,
            )
            .await?;

        if !won {
            return Err(Error::Conflict(format!(
                "application {}/{} was reviewed concurrently",
                beneficiary_id, ordinal
            )));
        }

        self.storage
            .resolve_application(
                beneficiary_id,
                ordinal,
                ReviewOutcome::Approved,
                None,
                Utc::now(),
            )
            .await?;

        self.notifier
            .notify(&NotificationPayload {
                beneficiary_id: beneficiary_id.to_string(),
                ordinal,
                event: "application_approved",
                status: InstallmentStatus::Approved,
            })
            .await;

        Ok(ConfirmationResponse {
            beneficiary_id: beneficiary_id.to_string(),
            ordinal,
            status: InstallmentStatus::Approved,
        })
    }

    /// Reject a submitted application. The installment returns to
    /// `eligible`; the resolved application keeps the review notes.
    pub async fn reject(
        &mut self,
        beneficiary_id: &str,
        ordinal: u8,
        review_notes: Option<String>,
    ) -> Result<ConfirmationResponse> {
        let installment = self.require_installment(beneficiary_id, ordinal).await?;

        if installment.status != InstallmentStatus::ApplicationSubmitted {
            return Err(Error::State(format!(
                "installment {} is {}, not awaiting review",
                ordinal, installment.status
            )));
        }

        let won = self
            .storage
            .try_transition(
                beneficiary_id,
                ordinal,
                InstallmentStatus::ApplicationSubmitted,
                InstallmentStatus::Eligible,
            )
            .await?;

        if !won {
            return Err(Error::Conflict(format!(
                "application {}/{} was reviewed concurrently",
                beneficiary_id, ordinal
            )));
        }

        self.storage
            .resolve_application(
                beneficiary_id,
                ordinal,
                ReviewOutcome::Rejected,
                review_notes.as_deref(),
                Utc::now(),
            )
            .await?;

        self.notifier
            .notify(&NotificationPayload {
                beneficiary_id: beneficiary_id.to_string(),
                ordinal,
                event: "application_rejected",
                status: InstallmentStatus::Eligible,
            })
            .await;

        Ok(ConfirmationResponse {
            beneficiary_id: beneficiary_id.to_string(),
            ordinal,
            status: InstallmentStatus::Eligible,
        })
    }

    /// Record the disbursement transaction for an approved installment.
    /// Paying installment N may unlock installment N+1, so the sweep runs
    /// afterwards.
    pub async fn mark_paid(
        &mut self,
        beneficiary_id: &str,
        ordinal: u8,
        transaction_id: &str,
    ) -> Result<ConfirmationResponse> {
        if transaction_id.trim().is_empty() {
            return Err(Error::validation("transaction_id", "must not be blank"));
        }

        let installment = self.require_installment(beneficiary_id, ordinal).await?;

        if installment.status != InstallmentStatus::Approved {
            return Err(Error::State(format!(
                "installment {} is {}, not approved for payment",
                ordinal, installment.status
            )));
        }

        let won = self
            .storage
            .try_transition(
                beneficiary_id,
                ordinal,
                InstallmentStatus::Approved,
                InstallmentStatus::Paid,
            )
            .await?;

        if !won {
            return Err(Error::Conflict(format!(
                "installment {}/{} was updated concurrently",
                beneficiary_id, ordinal
            )));
        }

        self.storage
            .stamp_paid(beneficiary_id, ordinal, Utc::now(), transaction_id.trim())
            .await?;

        info!(
            "Installment paid: {}/{} txn {}",
            beneficiary_id, ordinal, transaction_id
        );

        self.notifier
            .notify(&NotificationPayload {
                beneficiary_id: beneficiary_id.to_string(),
                ordinal,
                event: "payment_completed",
                status: InstallmentStatus::Paid,
            })
            .await;

        self.run_unlock_sweep(beneficiary_id).await?;

        Ok(ConfirmationResponse {
            beneficiary_id: beneficiary_id.to_string(),
            ordinal,
            status: InstallmentStatus::Paid,
        })
    }

    /// Ingest a program event from an external record source and
    /// re-evaluate eligibility. Re-delivering an event is harmless: facts
    /// only accumulate and the sweep is idempotent.
    pub async fn record_event(
        &mut self,
        request: RecordEventRequest,
    ) -> Result<RecordEventResponse> {
        let beneficiary_id = request.beneficiary_id;

        self.storage
            .get_beneficiary(&beneficiary_id)
            .await?
            .ok_or_else(|| Error::not_found("beneficiary"))?;

        let mut facts = self.storage.get_facts(&beneficiary_id).await?;

        match request.event {
            ProgramEvent::Registration {
                lmp_date,
                registration_date,
            } => {
                facts.lmp_date = Some(lmp_date);
                facts.registration_date = Some(registration_date);
            }
            ProgramEvent::AncVisit { visit_date: _ } => {
                facts.anc_visit_count += 1;
            }
            ProgramEvent::Birth { birth_date } => {
                facts.birth_date = Some(birth_date);
            }
        }

        self.storage.write_facts(&beneficiary_id, &facts).await?;

        let unlocked = self.run_unlock_sweep(&beneficiary_id).await?;

        Ok(RecordEventResponse { unlocked })
    }

    /// Service-level counters
    pub async fn stats(&mut self) -> Result<LedgerStats> {
        let (beneficiaries, pending_applications) = self.storage.counts().await?;
        Ok(LedgerStats {
            beneficiaries,
            pending_applications,
        })
    }

    /// Verify the storage connection
    pub async fn health_check(&mut self) -> Result<()> {
        self.storage.health_check().await
    }

    async fn require_installment(
        &mut self,
        beneficiary_id: &str,
        ordinal: u8,
    ) -> Result<Installment> {
        self.storage
            .get_beneficiary(beneficiary_id)
            .await?
            .ok_or_else(|| Error::not_found("beneficiary"))?;

        self.storage
            .get_installment(beneficiary_id, ordinal)
            .await?
            .ok_or_else(|| Error::not_found("installment"))
    }

    /// Move every unlockable installment to `eligible`. Each unlock is a
    /// compare-and-set, so a concurrent sweep cannot double-apply one.
    async fn run_unlock_sweep(&mut self, beneficiary_id: &str) -> Result<Vec<u8>> {
        let facts = self.storage.get_facts(beneficiary_id).await?;
        let installments = self.storage.get_installments(beneficiary_id).await?;

        let snapshots: Vec<InstallmentSnapshot> = installments
            .iter()
            .map(|i| InstallmentSnapshot {
                ordinal: i.ordinal,
                status: i.status,
            })
            .collect();

        let mut unlocked = Vec::new();
        for ordinal in unlock_sweep(&snapshots, &facts) {
            let won = self
                .storage
                .try_transition(
                    beneficiary_id,
                    ordinal,
                    InstallmentStatus::Locked,
                    InstallmentStatus::Eligible,
                )
                .await?;

            if won {
                self.storage
                    .stamp_eligible_at(beneficiary_id, ordinal, Utc::now())
                    .await?;

                info!("Installment unlocked: {}/{}", beneficiary_id, ordinal);

                self.notifier
                    .notify(&NotificationPayload {
                        beneficiary_id: beneficiary_id.to_string(),
                        ordinal,
                        event: "installment_unlocked",
                        status: InstallmentStatus::Eligible,
                    })
                    .await;

                unlocked.push(ordinal);
            }
        }

        Ok(unlocked)
    }
}
