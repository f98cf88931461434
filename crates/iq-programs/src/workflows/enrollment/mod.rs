//! Applicant data, enrollment records and the operations that move them:
//! auto-apply, reconciliation, renewal, finalization and bulk updates after a
//! catalog edit.

mod documents;
pub mod domain;
mod finalize;
mod lifecycle;
mod reconciler;
pub mod repository;
mod schedule;

#[cfg(test)]
mod tests;

pub use documents::{DocumentError, DocumentStore, UploadedDocument};
pub use domain::{
    ChangeOrigin, DocumentRef, EligibilitySelection, EnrollmentChange, EnrollmentHistoryEntry,
    EnrollmentRecord, Household, HousingTenure, UserId, UserProfile,
};
pub use finalize::{
    ApplicationFinalizer, FinalizeError, FinalizeOutcome, NavigationTarget, Notifier,
    NotifierError, RenewalSummary,
};
pub use lifecycle::{
    ApplyMode, DashboardView, EligibilityContext, EnrollmentError, EnrollmentLifecycle,
    ProgramListing, ReconcileReport, RenewalOutcome,
};
pub use reconciler::{compute_affected, AffectedUsers, ProgramReconciler, UpdateCounts, UserSnapshot};
pub use repository::{ApplicantRepository, EnrollmentRepository, EnrollmentStore};
pub use schedule::{needs_renewal, renew_now_enabled, EnrollmentStatus};
