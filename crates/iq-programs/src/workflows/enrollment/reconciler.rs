use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{
    ChangeOrigin, EnrollmentChange, EnrollmentHistoryEntry, EnrollmentRecord, UserId,
};
use super::lifecycle::EnrollmentError;
use super::repository::EnrollmentStore;
use crate::workflows::address::AddressRecord;
use crate::workflows::catalog::{AssistanceProgram, ProgramId};
use crate::workflows::eligibility::is_eligible;
use crate::workflows::storage::RepositoryError;

/// What the reconciler knows about one user for one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSnapshot {
    pub user_id: UserId,
    pub income_fraction: Option<Decimal>,
    pub address: Option<AddressRecord>,
    pub enrollment: Option<EnrollmentRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedUsers {
    pub to_apply: Vec<UserId>,
    pub to_remove: Vec<UserId>,
    pub to_ignore: Vec<UserId>,
    /// Users with no computed income or no eligibility address.
    pub skipped: Vec<UserId>,
    /// Users whose stored state could not be read.
    #[serde(default)]
    pub failed: Vec<UserId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCounts {
    pub applied: usize,
    pub removed: usize,
    pub ignored: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Decide, without touching storage, how a program edit affects each user.
pub fn compute_affected(program: &AssistanceProgram, snapshots: &[UserSnapshot]) -> AffectedUsers {
    let mut affected = AffectedUsers::default();

    for snapshot in snapshots {
        let (Some(income), Some(address)) = (snapshot.income_fraction, &snapshot.address) else {
            affected.skipped.push(snapshot.user_id);
            continue;
        };
        let eligible = is_eligible(program, Some(income), address);

        match &snapshot.enrollment {
            Some(record) if record.is_enrolled => affected.to_ignore.push(snapshot.user_id),
            Some(_) if !eligible => affected.to_remove.push(snapshot.user_id),
            Some(_) => {}
            None if eligible && program.enable_autoapply => {
                affected.to_apply.push(snapshot.user_id)
            }
            None => {}
        }
    }

    affected
}

/// Bulk reconciliation after an administrator edits a program. Users are
/// processed one at a time; a failure for one user is logged and does not
/// stop the rest.
pub struct ProgramReconciler<S> {
    store: Arc<S>,
}

impl<S> ProgramReconciler<S>
where
    S: EnrollmentStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn preview(
        &self,
        program_id: ProgramId,
        users: &[UserId],
    ) -> Result<AffectedUsers, EnrollmentError> {
        let program = self.program(program_id)?;
        Ok(self.affected(&program, users))
    }

    pub fn apply(
        &self,
        program: &AssistanceProgram,
        affected: &AffectedUsers,
        origin: ChangeOrigin,
        now: DateTime<Utc>,
    ) -> UpdateCounts {
        let mut counts = UpdateCounts {
            ignored: affected.to_ignore.len(),
            skipped: affected.skipped.len(),
            failed: affected.failed.len(),
            ..UpdateCounts::default()
        };

        for user_id in &affected.to_apply {
            let record = EnrollmentRecord::applied(*user_id, program.id, now);
            match self.store.create_enrollment(record).and_then(|()| {
                self.history(*user_id, program.id, EnrollmentChange::Applied, origin, now)
            }) {
                Ok(()) => counts.applied += 1,
                Err(RepositoryError::Conflict) => {
                    debug!(user_id = user_id.0, program = %program.program_name, "record already held")
                }
                Err(err) => {
                    warn!(user_id = user_id.0, program = %program.program_name, error = %err, "auto-apply failed");
                    counts.failed += 1;
                }
            }
        }

        for user_id in &affected.to_remove {
            match self.store.delete_enrollment(*user_id, program.id).and_then(|_| {
                self.history(*user_id, program.id, EnrollmentChange::Removed, origin, now)
            }) {
                Ok(()) => counts.removed += 1,
                Err(RepositoryError::Protected) => {
                    info!(user_id = user_id.0, program = %program.program_name, "enrolled record kept despite ineligibility");
                    counts.ignored += 1;
                }
                Err(RepositoryError::NotFound) => {}
                Err(err) => {
                    warn!(user_id = user_id.0, program = %program.program_name, error = %err, "record removal failed");
                    counts.failed += 1;
                }
            }
        }

        counts
    }

    /// Preview and apply in one call. `admin_mode` attributes the changes to
    /// an administrator rather than the system.
    pub fn update_users_for_program(
        &self,
        program_id: ProgramId,
        users: &[UserId],
        admin_mode: bool,
        now: DateTime<Utc>,
    ) -> Result<UpdateCounts, EnrollmentError> {
        let program = self.program(program_id)?;
        let affected = self.affected(&program, users);
        let origin = if admin_mode {
            ChangeOrigin::Admin
        } else {
            ChangeOrigin::System
        };
        let counts = self.apply(&program, &affected, origin, now);

        info!(
            program = %program.program_name,
            applied = counts.applied,
            removed = counts.removed,
            ignored = counts.ignored,
            skipped = counts.skipped,
            failed = counts.failed,
            "program reconciliation finished"
        );
        Ok(counts)
    }

    fn program(&self, program_id: ProgramId) -> Result<AssistanceProgram, EnrollmentError> {
        self.store
            .catalog()?
            .assistance_program(program_id)
            .cloned()
            .ok_or(EnrollmentError::UnknownProgram(program_id))
    }

    /// Snapshot every user and sort them. A user whose state cannot be read
    /// lands in `failed`, not `skipped`.
    fn affected(&self, program: &AssistanceProgram, users: &[UserId]) -> AffectedUsers {
        let mut snapshots = Vec::with_capacity(users.len());
        let mut unreadable = Vec::new();
        for user_id in users {
            match self.snapshot(*user_id, program.id) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => {
                    warn!(user_id = user_id.0, error = %err, "user snapshot unavailable");
                    unreadable.push(*user_id);
                }
            }
        }

        let mut affected = compute_affected(program, &snapshots);
        affected.failed = unreadable;
        affected
    }

    fn snapshot(&self, user_id: UserId, program_id: ProgramId) -> Result<UserSnapshot, RepositoryError> {
        let income_fraction = self
            .store
            .household(user_id)?
            .and_then(|household| household.income_as_fraction_of_ami);
        let address = match self.store.user_link(user_id)? {
            Some(link) => Some(self.store.fetch_address(link.eligibility_address_id)?),
            None => None,
        };
        let enrollment = self
            .store
            .enrollments(user_id)?
            .into_iter()
            .find(|record| record.program_id == program_id);

        Ok(UserSnapshot {
            user_id,
            income_fraction,
            address,
            enrollment,
        })
    }

    fn history(
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
