use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{
    ChangeOrigin, EnrollmentChange, EnrollmentHistoryEntry, EnrollmentRecord, Household, UserId,
};
use super::repository::EnrollmentStore;
use super::schedule::{needs_renewal, renew_now_enabled, EnrollmentStatus};
use crate::workflows::address::AddressRecord;
use crate::workflows::catalog::{AssistanceProgram, ProgramCatalog, ProgramId};
use crate::workflows::eligibility::{eligible_program_ids, eligible_programs, is_eligible};
use crate::workflows::storage::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("user {0} has no household on file")]
    MissingHousehold(UserId),
    #[error("user {0} has no eligibility address on file")]
    MissingAddress(UserId),
    #[error("program {0} is not in the catalog")]
    UnknownProgram(ProgramId),
    #[error("user is not eligible for {program}")]
    NotEligible { program: String },
    #[error("user has already applied to {program}")]
    AlreadyApplied { program: String },
    #[error("user has not applied to {program}")]
    NotApplied { program: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Which eligible programs get a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyMode {
    /// Programs with auto-apply enabled.
    AutoApply,
    /// Only the listed programs, at the user's request.
    Explicit(BTreeSet<ProgramId>),
    /// Programs the user held before a renewal, plus auto-apply programs.
    Reapply(BTreeSet<ProgramId>),
}

impl ApplyMode {
    fn origin_for(&self, program: &AssistanceProgram) -> Option<ChangeOrigin> {
        match self {
            ApplyMode::AutoApply if program.enable_autoapply => Some(ChangeOrigin::AutoApply),
            ApplyMode::Explicit(ids) if ids.contains(&program.id) => Some(ChangeOrigin::User),
            ApplyMode::Reapply(ids) if ids.contains(&program.id) => Some(ChangeOrigin::Renewal),
            ApplyMode::Reapply(_) if program.enable_autoapply => Some(ChangeOrigin::AutoApply),
            _ => None,
        }
    }
}

/// Household and eligibility address an evaluation runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityContext {
    pub household: Household,
    pub address: AddressRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub removed: Vec<ProgramId>,
    /// Friendly names of enrolled programs that were left in place.
    pub protected: Vec<String>,
}

impl ReconcileReport {
    pub fn message(&self) -> Option<String> {
        if self.protected.is_empty() {
            return None;
        }
        Some(format!(
            "You are currently enrolled in {}. These enrollments were not changed.",
            self.protected.join(", ")
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalOutcome {
    pub renewal_eligible: Vec<String>,
    pub renewal_ineligible: Vec<String>,
    pub applied: Vec<ProgramId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramListing {
    pub program_id: ProgramId,
    pub friendly_name: String,
    /// `None` for eligible programs the user has not applied to.
    pub status: Option<EnrollmentStatus>,
    pub applied_at: Option<DateTime<Utc>>,
    pub enrolled_at: Option<DateTime<Utc>>,
    pub renewal_interval_years: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardView {
    pub user_id: UserId,
    pub needs_renewal: bool,
    pub renew_now_enabled: bool,
    pub programs: Vec<ProgramListing>,
}

/// Creates, removes and renews a user's enrollment records from evaluator
/// output. Enrolled records are never deleted.
pub struct EnrollmentLifecycle<S> {
    store: Arc<S>,
}

impl<S> Clone for EnrollmentLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> EnrollmentLifecycle<S>
where
    S: EnrollmentStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn eligibility_context(&self, user_id: UserId) -> Result<EligibilityContext, EnrollmentError> {
        let household = self
            .store
            .household(user_id)?
            .ok_or(EnrollmentError::MissingHousehold(user_id))?;
        let link = self
            .store
            .user_link(user_id)?
            .ok_or(EnrollmentError::MissingAddress(user_id))?;
        let address = self.store.fetch_address(link.eligibility_address_id)?;
        Ok(EligibilityContext { household, address })
    }

    /// Create records for eligible programs the user does not hold, filtered
    /// by `mode`. Returns the programs that received a new record.
    pub fn apply_or_autoapply(
        &self,
        user_id: UserId,
        eligible: &[&AssistanceProgram],
        current: &[EnrollmentRecord],
        mode: &ApplyMode,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgramId>, EnrollmentError> {
        let held: BTreeSet<ProgramId> = current.iter().map(|record| record.program_id).collect();
        let mut created = Vec::new();

        for program in eligible {
            if held.contains(&program.id) {
                continue;
            }
            let Some(origin) = mode.origin_for(program) else {
                continue;
            };

            match self
                .store
                .create_enrollment(EnrollmentRecord::applied(user_id, program.id, now))
            {
                Ok(()) => {}
                Err(RepositoryError::Conflict) => {
                    debug!(user_id = user_id.0, program = %program.program_name, "record already held");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }

            self.record_change(user_id, program.id, EnrollmentChange::Applied, origin, now)?;
            debug!(
                user_id = user_id.0,
                program = %program.program_name,
                origin = ?origin,
                "enrollment record created"
            );
            created.push(program.id);
        }

        Ok(created)
    }

    /// Delete records for programs outside `eligible`. Enrolled records are
    /// reported in [`ReconcileReport::protected`] and left untouched.
    pub fn reconcile_ineligible(
        &self,
        user_id: UserId,
        eligible: &BTreeSet<ProgramId>,
        current: &[EnrollmentRecord],
        catalog: &ProgramCatalog,
        origin: ChangeOrigin,
        now: DateTime<Utc>,
    ) -> Result<ReconcileReport, EnrollmentError> {
        let mut report = ReconcileReport::default();

        for record in current {
            if eligible.contains(&record.program_id) {
                continue;
            }
            let name = catalog.friendly_name(record.program_id);

            if record.is_enrolled {
                info!(user_id = user_id.0, program = %name, "enrolled record kept despite ineligibility");
                report.protected.push(name);
                continue;
            }

            match self.store.delete_enrollment(user_id, record.program_id) {
                Ok(_) => {
                    self.record_change(
                        user_id,
                        record.program_id,
                        EnrollmentChange::Removed,
                        origin,
                        now,
                    )?;
                    report.removed.push(record.program_id);
                }
                Err(RepositoryError::Protected) => {
                    info!(user_id = user_id.0, program = %name, "enrolled record kept despite ineligibility");
                    report.protected.push(name);
                }
                Err(RepositoryError::NotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }

        Ok(report)
    }

    /// Reset every renewable record, re-evaluate against current data and
    /// re-create records for programs that are still eligible.
    pub fn renew(&self, user_id: UserId, now: DateTime<Utc>) -> Result<RenewalOutcome, EnrollmentError> {
        let catalog = self.store.catalog()?;
        let context = self.eligibility_context(user_id)?;
        let (renewable, retained): (Vec<EnrollmentRecord>, Vec<EnrollmentRecord>) = self
            .store
            .enrollments(user_id)?
            .into_iter()
            .partition(|record| {
                catalog
                    .assistance_program(record.program_id)
                    .is_some_and(|program| !program.is_lifetime())
            });

        // Renewal is the one sanctioned way an enrolled record leaves storage:
        // it lapses, then goes, in a single store call.
        let renewable_ids: Vec<ProgramId> = renewable.iter().map(|record| record.program_id).collect();
        for record in self.store.lapse_enrollments(user_id, &renewable_ids)? {
            if record.is_enrolled {
                self.record_change(
                    user_id,
                    record.program_id,
                    EnrollmentChange::Lapsed,
                    ChangeOrigin::Renewal,
                    now,
                )?;
            }
            self.record_change(
                user_id,
                record.program_id,
                EnrollmentChange::Removed,
                ChangeOrigin::Renewal,
                now,
            )?;
        }

        let eligible = eligible_programs(
            context.household.income_as_fraction_of_ami,
            &context.address,
            &catalog,
        );
        let eligible_ids: BTreeSet<ProgramId> = eligible.iter().map(|program| program.id).collect();

        let mut outcome = RenewalOutcome::default();
        let mut prior = BTreeSet::new();
        for record in &renewable {
            prior.insert(record.program_id);
            let name = catalog.friendly_name(record.program_id);
            if eligible_ids.contains(&record.program_id) {
                outcome.renewal_eligible.push(name);
            } else {
                outcome.renewal_ineligible.push(name);
            }
        }
        outcome.renewal_eligible.sort();
        outcome.renewal_ineligible.sort();

        outcome.applied =
            self.apply_or_autoapply(user_id, &eligible, &retained, &ApplyMode::Reapply(prior), now)?;

        info!(
            user_id = user_id.0,
            renewed = outcome.renewal_eligible.len(),
            dropped = outcome.renewal_ineligible.len(),
            "renewal processed"
        );
        Ok(outcome)
    }

    /// Evaluate the user against the current catalog and create records per
    /// `mode`.
    pub fn apply_eligible(
        &self,
        user_id: UserId,
        mode: &ApplyMode,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgramId>, EnrollmentError> {
        let catalog = self.store.catalog()?;
        let context = self.eligibility_context(user_id)?;
        let eligible = eligible_programs(
            context.household.income_as_fraction_of_ami,
            &context.address,
            &catalog,
        );
        let current = self.store.enrollments(user_id)?;
        self.apply_or_autoapply(user_id, &eligible, &current, mode, now)
    }

    /// Explicit "apply now" for one program.
    pub fn apply_to_program(
        &self,
        user_id: UserId,
        program_id: ProgramId,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let catalog = self.store.catalog()?;
        let program = catalog
            .assistance_program(program_id)
            .ok_or(EnrollmentError::UnknownProgram(program_id))?;
        let context = self.eligibility_context(user_id)?;

        if !is_eligible(
            program,
            context.household.income_as_fraction_of_ami,
            &context.address,
        ) {
            return Err(EnrollmentError::NotEligible {
                program: program.friendly_name.clone(),
            });
        }

        let current = self.store.enrollments(user_id)?;
        if current.iter().any(|record| record.program_id == program_id) {
            return Err(EnrollmentError::AlreadyApplied {
                program: program.friendly_name.clone(),
            });
        }

        let mode = ApplyMode::Explicit(BTreeSet::from([program_id]));
        let created = self.apply_or_autoapply(user_id, &[program], &current, &mode, now)?;
        if created.is_empty() {
            return Err(EnrollmentError::AlreadyApplied {
                program: program.friendly_name.clone(),
            });
        }
        Ok(EnrollmentRecord::applied(user_id, program_id, now))
    }

    /// Administrator confirmation that the user is enrolled.
    pub fn mark_enrolled(
        &self,
        user_id: UserId,
        program_id: ProgramId,
        at: DateTime<Utc>,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let mut record = self
            .store
            .enrollments(user_id)?
            .into_iter()
            .find(|record| record.program_id == program_id)
            .ok_or_else(|| EnrollmentError::NotApplied {
                program: self
                    .store
                    .catalog()
                    .map(|catalog| catalog.friendly_name(program_id))
                    .unwrap_or_else(|_| format!("program #{program_id}")),
            })?;

        if record.is_enrolled {
            return Ok(record);
        }

        record.is_enrolled = true;
        record.enrolled_at = Some(at);
        self.store.update_enrollment(record.clone())?;
        self.record_change(
            user_id,
            program_id,
            EnrollmentChange::Enrolled,
            ChangeOrigin::Admin,
            at,
        )?;
        info!(user_id = user_id.0, program_id = program_id.0, "enrollment confirmed");
        Ok(record)
    }

    /// Remove records the user no longer qualifies for after an edit to their
    /// own data.
    pub fn reconcile_user(
        &self,
        user_id: UserId,
        origin: ChangeOrigin,
        now: DateTime<Utc>,
    ) -> Result<ReconcileReport, EnrollmentError> {
        let context = self.eligibility_context(user_id)?;
        let income = context.household.income_as_fraction_of_ami;
        self.reconcile_against(user_id, income, &context.address, origin, now)
    }

    /// Apply the protection rules to a proposed household income before it is
    /// stored.
    pub fn reconcile_with_income_override(
        &self,
        user_id: UserId,
        income_fraction: Decimal,
        now: DateTime<Utc>,
    ) -> Result<ReconcileReport, EnrollmentError> {
        let context = self.eligibility_context(user_id)?;
        self.reconcile_against(
            user_id,
            Some(income_fraction),
            &context.address,
            ChangeOrigin::User,
            now,
        )
    }

    fn reconcile_against(
        &self,
        user_id: UserId,
        income_fraction: Option<Decimal>,
        address: &AddressRecord,
        origin: ChangeOrigin,
        now: DateTime<Utc>,
    ) -> Result<ReconcileReport, EnrollmentError> {
        let catalog = self.store.catalog()?;
        let eligible = eligible_program_ids(income_fraction, address, &catalog);
        let current = self.store.enrollments(user_id)?;
        self.reconcile_ineligible(user_id, &eligible, &current, &catalog, origin, now)
    }

    /// Held records for active programs followed by eligible programs the
    /// user has not applied to.
    pub fn dashboard(&self, user_id: UserId, now: DateTime<Utc>) -> Result<DashboardView, EnrollmentError> {
        let catalog = self.store.catalog()?;
        let profile = self.store.user(user_id)?;
        let needs = needs_renewal(profile.last_completed_at, &catalog, now);
        let current = self.store.enrollments(user_id)?;

        let mut programs: Vec<ProgramListing> = current
            .iter()
            .filter_map(|record| {
                let program = catalog
                    .assistance_program(record.program_id)
                    .filter(|program| program.is_active)?;
                Some(ProgramListing {
                    program_id: program.id,
                    friendly_name: program.friendly_name.clone(),
                    status: Some(EnrollmentStatus::of(record, program, needs)),
                    applied_at: Some(record.applied_at),
                    enrolled_at: record.enrolled_at,
                    renewal_interval_years: program.renewal_interval_years,
                })
            })
            .collect();

        let held: BTreeSet<ProgramId> = current.iter().map(|record| record.program_id).collect();
        match self.eligibility_context(user_id) {
            Ok(context) => {
                for program in eligible_programs(
                    context.household.income_as_fraction_of_ami,
                    &context.address,
                    &catalog,
                ) {
                    if held.contains(&program.id) {
                        continue;
                    }
                    programs.push(ProgramListing {
                        program_id: program.id,
                        friendly_name: program.friendly_name.clone(),
                        status: None,
                        applied_at: None,
                        enrolled_at: None,
                        renewal_interval_years: program.renewal_interval_years,
                    });
                }
            }
            Err(EnrollmentError::MissingHousehold(_) | EnrollmentError::MissingAddress(_)) => {}
            Err(err) => return Err(err),
        }

        Ok(DashboardView {
            user_id,
            needs_renewal: needs,
            renew_now_enabled: renew_now_enabled(profile.last_completed_at, &catalog, now),
            programs,
        })
    }

    fn record_change(
        &self,
        user_id: UserId,
        program_id: ProgramId,
        change: EnrollmentChange,
        origin: ChangeOrigin,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.store.append_history(EnrollmentHistoryEntry {
            user_id,
            program_id,
            change,
            origin,
            at,
        })
    }
}
