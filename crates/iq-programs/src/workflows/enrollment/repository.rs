use super::domain::{
    EligibilitySelection, EnrollmentHistoryEntry, EnrollmentRecord, Household, UserId,
    UserProfile,
};
use crate::workflows::address::AddressRepository;
use crate::workflows::catalog::{CatalogRepository, ProgramId};
use crate::workflows::storage::RepositoryError;

/// Applicant-owned data: profile, household and eligibility selections.
pub trait ApplicantRepository: Send + Sync {
    fn user(&self, user_id: UserId) -> Result<UserProfile, RepositoryError>;
    fn save_user(&self, profile: UserProfile) -> Result<(), RepositoryError>;
    fn user_ids(&self) -> Result<Vec<UserId>, RepositoryError>;
    fn household(&self, user_id: UserId) -> Result<Option<Household>, RepositoryError>;
    fn save_household(&self, household: Household) -> Result<(), RepositoryError>;
    fn eligibility_selections(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EligibilitySelection>, RepositoryError>;
    fn save_eligibility_selection(
        &self,
        selection: EligibilitySelection,
    ) -> Result<(), RepositoryError>;
}

/// Per-user enrollment records. Each call is atomic for that user.
pub trait EnrollmentRepository: Send + Sync {
    fn enrollments(&self, user_id: UserId) -> Result<Vec<EnrollmentRecord>, RepositoryError>;
    /// Fails with [`RepositoryError::Conflict`] when the user already holds
    /// the program.
    fn create_enrollment(&self, record: EnrollmentRecord) -> Result<(), RepositoryError>;
    fn update_enrollment(&self, record: EnrollmentRecord) -> Result<(), RepositoryError>;
    /// Fails with [`RepositoryError::Protected`] for enrolled records.
    fn delete_enrollment(
        &self,
        user_id: UserId,
        program_id: ProgramId,
    ) -> Result<EnrollmentRecord, RepositoryError>;
    /// Renewal reset: removes the listed records, enrolled or not, in one
    /// atomic step. This is the only path that may remove an enrolled record.
    /// Programs the user does not hold are ignored.
    fn lapse_enrollments(
        &self,
        user_id: UserId,
        programs: &[ProgramId],
    ) -> Result<Vec<EnrollmentRecord>, RepositoryError>;
    fn append_history(&self, entry: EnrollmentHistoryEntry) -> Result<(), RepositoryError>;
    fn history(&self, user_id: UserId) -> Result<Vec<EnrollmentHistoryEntry>, RepositoryError>;
}

/// Everything the enrollment engine reads or writes.
pub trait EnrollmentStore:
    ApplicantRepository + EnrollmentRepository + AddressRepository + CatalogRepository
{
}

impl<T> EnrollmentStore for T where
    T: ApplicantRepository + EnrollmentRepository + AddressRepository + CatalogRepository
{
}
