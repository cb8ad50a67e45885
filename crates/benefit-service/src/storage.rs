//! Redis storage for the benefit installment ledger
//!
//! Data model:
//! - beneficiary:{id} → Hash with contact and bank detail fields
//! - beneficiary:{id}:facts → Hash with accumulated program facts
//! - beneficiary:{id}:installment:{n} → Hash per schedule slot
//! - beneficiary:{id}:application:{n} → Hash per application
//! - beneficiaries:all → Set of beneficiary ids
//! - applications:pending → Sorted set (score=submitted epoch, member=id:n)
//!
//! Status transitions go through a compare-and-set script: the status field
//! is swapped only when its current value matches the expected prior
//! status, so two concurrent writers cannot both win the same transition.

use chrono::{DateTime, NaiveDate, Utc};
use ledger_core::ProgramFacts;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use tracing::{debug, info};
use vandana_common::{Error, InstallmentStatus, PaymentDetails, Result, ReviewOutcome};

use crate::models::{Application, Beneficiary, Installment};

/// Compare-and-set on the installment status field. The legacy
/// `eligible_to_apply` value is normalized before comparison so rows written
/// by the previous schema still transition correctly.
const TRANSITION_LUA: &str = r#"
local current = redis.call('HGET', KEYS[1], 'status')
if current == 'eligible_to_apply' then
    current = 'eligible'
end
if current == ARGV[1] then
    redis.call('HSET', KEYS[1], 'status', ARGV[2])
    return 1
end
return 0
"#;

/// Storage backend for the ledger
pub struct Storage {
    conn: ConnectionManager,
    transition_script: Script,
}

fn redis_err(e: redis::RedisError) -> Error {
    Error::Redis(e.to_string())
}

fn beneficiary_key(beneficiary_id: &str) -> String {
    format!("beneficiary:{}", beneficiary_id)
}

fn facts_key(beneficiary_id: &str) -> String {
    format!("beneficiary:{}:facts", beneficiary_id)
}

fn installment_key(beneficiary_id: &str, ordinal: u8) -> String {
    format!("beneficiary:{}:installment:{}", beneficiary_id, ordinal)
}

fn application_key(beneficiary_id: &str, ordinal: u8) -> String {
    format!("beneficiary:{}:application:{}", beneficiary_id, ordinal)
}

impl Storage {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(redis_err)?;

        let conn = ConnectionManager::new(client).await.map_err(redis_err)?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self {
            conn,
            transition_script: Script::new(TRANSITION_LUA),
        })
    }

    /// Create a beneficiary with their installment ledger and initial facts.
    /// Returns Ok(false) without writing if the beneficiary already exists.
    pub async fn create_beneficiary(
        &mut self,
        beneficiary: &Beneficiary,
        installments: &[Installment],
        facts: &ProgramFacts,
    ) -> Result<bool> {
        let key = beneficiary_key(&beneficiary.beneficiary_id);

        let exists: bool = self.conn.exists(&key).await.map_err(redis_err)?;
        if exists {
            debug!(
                "Beneficiary {} already exists, skipping",
                beneficiary.beneficiary_id
            );
            return Ok(false);
        }

        self.conn
            .hset_multiple::<_, _, _, ()>(
                &key,
                &[
                    ("beneficiary_id", beneficiary.beneficiary_id.as_str()),
                    ("name", &beneficiary.name),
                    ("phone", &beneficiary.phone),
                    ("village", beneficiary.village.as_deref().unwrap_or("")),
                    ("created_at", &beneficiary.created_at.to_rfc3339()),
                ],
            )
            .await
            .map_err(redis_err)?;

        for installment in installments {
            self.write_installment(&beneficiary.beneficiary_id, installment)
                .await?;
        }

        self.write_facts(&beneficiary.beneficiary_id, facts).await?;

        self.conn
            .sadd::<_, _, ()>("beneficiaries:all", &beneficiary.beneficiary_id)
            .await
            .map_err(redis_err)?;

        info!("Enrolled beneficiary: {}", beneficiary.beneficiary_id);

        Ok(true)
    }

    /// Get a beneficiary by id
    pub async fn get_beneficiary(&mut self, beneficiary_id: &str) -> Result<Option<Beneficiary>> {
        let key = beneficiary_key(beneficiary_id);

        let fields: Vec<(String, String)> = self.conn.hgetall(&key).await.map_err(redis_err)?;
        if fields.is_empty() {
            return Ok(None);
        }

        let map: HashMap<_, _> = fields.into_iter().collect();

        let payment_details = match (
            non_empty(&map, "account_holder"),
            non_empty(&map, "account_number"),
            non_empty(&map, "ifsc_code"),
            non_empty(&map, "bank_name"),
        ) {
            (Some(account_holder), Some(account_number), Some(ifsc_code), Some(bank_name)) => {
                Some(PaymentDetails {
                    account_holder,
                    account_number,
                    ifsc_code,
                    bank_name,
                })
            }
            _ => None,
        };

        Ok(Some(Beneficiary {
            beneficiary_id: beneficiary_id.to_string(),
            name: map.get("name").cloned().unwrap_or_default(),
            phone: map.get("phone").cloned().unwrap_or_default(),
            village: non_empty(&map, "village"),
            created_at: parse_datetime(&map, "created_at").unwrap_or_else(Utc::now),
            payment_details,
        }))
    }

    /// Persist bank details captured at the first installment application
    pub async fn save_payment_details(
        &mut self,
        beneficiary_id: &str,
        details: &PaymentDetails,
    ) -> Result<()> {
        let key = beneficiary_key(beneficiary_id);

        self.conn
            .hset_multiple::<_, _, _, ()>(
                &key,
                &[
                    ("account_holder", details.account_holder.as_str()),
                    ("account_number", &details.account_number),
                    ("ifsc_code", &details.ifsc_code),
                    ("bank_name", &details.bank_name),
                ],
            )
            .await
            .map_err(redis_err)?;

        debug!("Saved payment details for beneficiary: {}", beneficiary_id);
        Ok(())
    }

    /// Write a full installment record
    pub async fn write_installment(
        &mut self,
        beneficiary_id: &str,
        installment: &Installment,
    ) -> Result<()> {
        let key = installment_key(beneficiary_id, installment.ordinal);

        self.conn
            .hset_multiple::<_, _, _, ()>(
                &key,
                &[
                    ("ordinal", installment.ordinal.to_string()),
                    ("amount_paise", installment.amount_paise.to_string()),
                    ("criterion", installment.criterion.to_string()),
                    ("status", installment.status.to_string()),
                    (
                        "eligible_at",
                        installment
                            .eligible_at
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_default(),
                    ),
                    (
                        "paid_at",
                        installment
                            .paid_at
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_default(),
                    ),
                    (
                        "transaction_id",
                        installment.transaction_id.clone().unwrap_or_default(),
                    ),
                ],
            )
            .await
            .map_err(redis_err)?;

        Ok(())
    }

    /// Get one installment
    pub async fn get_installment(
        &mut self,
        beneficiary_id: &str,
        ordinal: u8,
    ) -> Result<Option<Installment>> {
        let key = installment_key(beneficiary_id, ordinal);

        let fields: Vec<(String, String)> = self.conn.hgetall(&key).await.map_err(redis_err)?;
        if fields.is_empty() {
            return Ok(None);
        }

        let map: HashMap<_, _> = fields.into_iter().collect();

        let status: InstallmentStatus = map
            .get("status")
            .ok_or_else(|| Error::Redis(format!("installment {} missing status", key)))?
            .parse()?;

        let criterion = map
            .get("criterion")
            .ok_or_else(|| Error::Redis(format!("installment {} missing criterion", key)))?
            .parse()?;

        Ok(Some(Installment {
            ordinal,
            amount_paise: map
                .get("amount_paise")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            criterion,
            status,
            eligible_at: parse_datetime(&map, "eligible_at"),
            paid_at: parse_datetime(&map, "paid_at"),
            transaction_id: non_empty(&map, "transaction_id"),
        }))
    }

    /// Get all installments for a beneficiary, ordered by ordinal
    pub async fn get_installments(&mut self, beneficiary_id: &str) -> Result<Vec<Installment>> {
        let mut installments = Vec::new();
        for ordinal in 1..=ledger_core::INSTALLMENT_COUNT {
            if let Some(installment) = self.get_installment(beneficiary_id, ordinal).await? {
                installments.push(installment);
            }
        }
        Ok(installments)
    }

    /// Conditionally transition an installment's status. Returns Ok(true)
    /// when the swap happened, Ok(false) when the current status no longer
    /// matched `from` (another writer got there first, or the caller's read
    /// was stale).
    pub async fn try_transition(
        &mut self,
        beneficiary_id: &str,
        ordinal: u8,
        from: InstallmentStatus,
        to: InstallmentStatus,
    ) -> Result<bool> {
        let key = installment_key(beneficiary_id, ordinal);

        let swapped: i64 = self
            .transition_script
            .key(&key)
            .arg(from.as_str())
            .arg(to.as_str())
            .invoke_async(&mut self.conn)
            .await
            .map_err(redis_err)?;

        if swapped == 1 {
            debug!(
                "Installment {}/{} transitioned {} -> {}",
                beneficiary_id, ordinal, from, to
            );
        }

        Ok(swapped == 1)
    }

    /// Stamp the eligibility timestamp after a successful unlock
    pub async fn stamp_eligible_at(
        &mut self,
        beneficiary_id: &str,
        ordinal: u8,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let key = installment_key(beneficiary_id, ordinal);
        self.conn
            .hset::<_, _, _, ()>(&key, "eligible_at", at.to_rfc3339())
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    /// Stamp the payment timestamp and transaction reference after a
    /// successful paid transition
    pub async fn stamp_paid(
        &mut self,
        beneficiary_id: &str,
        ordinal: u8,
        at: DateTime<Utc>,
        transaction_id: &str,
    ) -> Result<()> {
        let key = installment_key(beneficiary_id, ordinal);
        self.conn
            .hset_multiple::<_, _, _, ()>(
                &key,
                &[
                    ("paid_at", at.to_rfc3339()),
                    ("transaction_id", transaction_id.to_string()),
                ],
            )
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    /// Read the accumulated program facts for a beneficiary
    pub async fn get_facts(&mut self, beneficiary_id: &str) -> Result<ProgramFacts> {
        let key = facts_key(beneficiary_id);

        let fields: Vec<(String, String)> = self.conn.hgetall(&key).await.map_err(redis_err)?;
        let map: HashMap<_, _> = fields.into_iter().collect();

        Ok(ProgramFacts {
            lmp_date: parse_date(&map, "lmp_date"),
            registration_date: parse_date(&map, "registration_date"),
            anc_visit_count: map
                .get("anc_visit_count")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            birth_date: parse_date(&map, "birth_date"),
        })
    }

    /// Write the full facts snapshot
    pub async fn write_facts(&mut self, beneficiary_id: &str, facts: &ProgramFacts) -> Result<()> {
        let key = facts_key(beneficiary_id);

        self.conn
            .hset_multiple::<_, _, _, ()>(
                &key,
                &[
                    (
                        "lmp_date",
                        facts.lmp_date.map(|d| d.to_string()).unwrap_or_default(),
                    ),
                    (
                        "registration_date",
                        facts
                            .registration_date
                            .map(|d| d.to_string())
                            .unwrap_or_default(),
                    ),
                    ("anc_visit_count", facts.anc_visit_count.to_string()),
                    (
                        "birth_date",
                        facts.birth_date.map(|d| d.to_string()).unwrap_or_default(),
                    ),
                ],
            )
            .await
            .map_err(redis_err)?;

        Ok(())
    }

    /// Write an application record; pending applications join the review
    /// queue ordered by submission time.
    pub async fn put_application(&mut self, application: &Application) -> Result<()> {
        let key = application_key(&application.beneficiary_id, application.ordinal);

        self.conn
            .hset_multiple::<_, _, _, ()>(
                &key,
                &[
                    ("beneficiary_id", application.beneficiary_id.clone()),
                    ("ordinal", application.ordinal.to_string()),
                    ("submitted_at", application.submitted_at.to_rfc3339()),
                    ("outcome", application.outcome.to_string()),
                    (
                        "review_notes",
                        application.review_notes.clone().unwrap_or_default(),
                    ),
                    (
                        "resolved_at",
                        application
                            .resolved_at
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_default(),
                    ),
                ],
            )
            .await
            .map_err(redis_err)?;

        if application.outcome == ReviewOutcome::Pending {
            let member = format!("{}:{}", application.beneficiary_id, application.ordinal);
            self.conn
                .zadd::<_, _, _, ()>(
                    "applications:pending",
                    member,
                    application.submitted_at.timestamp(),
                )
                .await
                .map_err(redis_err)?;
        }

        Ok(())
    }

    /// Get an application by beneficiary and ordinal
    pub async fn get_application(
        &mut self,
        beneficiary_id: &str,
        ordinal: u8,
    ) -> Result<Option<Application>> {
        let key = application_key(beneficiary_id, ordinal);

        let fields: Vec<(String, String)> = self.conn.hgetall(&key).await.map_err(redis_err)?;
        if fields.is_empty() {
            return Ok(None);
        }

        let map: HashMap<_, _> = fields.into_iter().collect();

        let outcome: ReviewOutcome = map
            .get("outcome")
            .ok_or_else(|| Error::Redis(format!("application {} missing outcome", key)))?
            .parse()?;

        Ok(Some(Application {
            beneficiary_id: beneficiary_id.to_string(),
            ordinal,
            submitted_at: parse_datetime(&map, "submitted_at").unwrap_or_else(Utc::now),
            outcome,
            review_notes: non_empty(&map, "review_notes"),
            resolved_at: parse_datetime(&map, "resolved_at"),
        }))
    }

    /// Resolve an application and remove it from the pending queue
    pub async fn resolve_application(
        &mut self,
        beneficiary_id: &str,
        ordinal: u8,
        outcome: ReviewOutcome,
        review_notes: Option<&str>,
        resolved_at: DateTime<Utc>,
    ) -> Result<()> {
        let key = application_key(beneficiary_id, ordinal);

        self.conn
            .hset_multiple::<_, _, _, ()>(
                &key,
                &[
                    ("outcome", outcome.to_string()),
                    ("review_notes", review_notes.unwrap_or("").to_string()),
                    ("resolved_at", resolved_at.to_rfc3339()),
                ],
            )
            .await
            .map_err(redis_err)?;

        let member = format!("{}:{}", beneficiary_id, ordinal);
        self.conn
            .zrem::<_, _, ()>("applications:pending", member)
            .await
            .map_err(redis_err)?;

        info!(
            "Application {}/{} resolved: {}",
            beneficiary_id, ordinal, outcome
        );
        Ok(())
    }

    /// Pending application references, oldest submission first
    pub async fn pending_application_refs(&mut self) -> Result<Vec<(String, u8)>> {
        let members: Vec<String> = self
            .conn
            .zrange("applications:pending", 0, -1)
            .await
            .map_err(redis_err)?;

        let mut refs = Vec::with_capacity(members.len());
        for member in members {
            let Some((beneficiary_id, ordinal)) = member.rsplit_once(':') else {
                return Err(Error::Redis(format!(
                    "malformed pending application member: {}",
                    member
                )));
            };
            let ordinal: u8 = ordinal.parse().map_err(|_| {
                Error::Redis(format!("malformed pending application member: {}", member))
            })?;
            refs.push((beneficiary_id.to_string(), ordinal));
        }

        Ok(refs)
    }

    /// Service-level counters
    pub async fn counts(&mut self) -> Result<(usize, usize)> {
        let beneficiaries: usize = self
            .conn
            .scard("beneficiaries:all")
            .await
            .map_err(redis_err)?;
        let pending: usize = self
            .conn
            .zcard("applications:pending")
            .await
            .map_err(redis_err)?;
        Ok((beneficiaries, pending))
    }

    /// Health check - verify Redis connection
    pub async fn health_check(&mut self) -> Result<()> {
        let _: String = redis::cmd("PING")
            .query_async(&mut self.conn)
            .await
            .map_err(redis_err)?;
        Ok(())
    }
}

fn non_empty(map: &HashMap<String, String>, field: &str) -> Option<String> {
    map.get(field).filter(|s| !s.is_empty()).cloned()
}

fn parse_datetime(map: &HashMap<String, String>, field: &str) -> Option<DateTime<Utc>> {
    map.get(field)
        .filter(|s| !s.is_empty())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_date(map: &HashMap<String, String>, field: &str) -> Option<NaiveDate> {
    map.get(field)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}
