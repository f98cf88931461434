use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use tracing::info;

use super::address::{
    AddressId, AddressInput, AddressRecord, AddressResolutionPipeline, AddressTagger,
    AddressWorkflow, PostalValidator, ResolutionOutcome, ServiceAreaResolver, UserAddressLink,
};
use super::catalog::{
    AssistanceProgram, CatalogService, CatalogServiceError, EligibilityProgramId,
    ProgramId,
};
use super::enrollment::{
    AffectedUsers, ApplicationFinalizer, ChangeOrigin, DashboardView, DocumentError, DocumentStore,
    EligibilitySelection, EnrollmentError, EnrollmentLifecycle, EnrollmentRecord, EnrollmentStore,
    FinalizeError, FinalizeOutcome, Notifier, ProgramReconciler, ReconcileReport, UpdateCounts,
    UploadedDocument, UserId,
};
use super::storage::RepositoryError;

/// External collaborators the service calls into.
pub struct Collaborators<N> {
    pub tagger: Arc<dyn AddressTagger>,
    pub validator: Arc<dyn PostalValidator>,
    pub service_area: ServiceAreaResolver,
    pub documents: Arc<dyn DocumentStore>,
    pub notifier: Arc<N>,
}

/// Facade over address resolution, catalog administration and enrollment,
/// sharing a single store.
pub struct BenefitsService<S, N> {
    store: Arc<S>,
    addresses: AddressResolutionPipeline<S>,
    catalog: CatalogService<S>,
    lifecycle: EnrollmentLifecycle<S>,
    finalizer: ApplicationFinalizer<S, N>,
    reconciler: ProgramReconciler<S>,
    documents: Arc<dyn DocumentStore>,
}

impl<S, N> BenefitsService<S, N>
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, collaborators: Collaborators<N>) -> Self {
        Self {
            addresses: AddressResolutionPipeline::new(
                Arc::clone(&store),
                collaborators.tagger,
                collaborators.validator,
                collaborators.service_area,
            ),
            catalog: CatalogService::new(Arc::clone(&store)),
            lifecycle: EnrollmentLifecycle::new(Arc::clone(&store)),
            finalizer: ApplicationFinalizer::new(Arc::clone(&store), collaborators.notifier),
            reconciler: ProgramReconciler::new(Arc::clone(&store)),
            documents: collaborators.documents,
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn resolve_address(&self, input: AddressInput) -> Result<ResolutionOutcome, ServiceError> {
        Ok(self.addresses.resolve(input)?)
    }

    pub fn resume_address(&self, workflow: AddressWorkflow) -> Result<ResolutionOutcome, ServiceError> {
        Ok(self.addresses.resume(workflow)?)
    }

    pub fn recheck_address(&self, address_id: AddressId) -> Result<AddressRecord, ServiceError> {
        Ok(self.addresses.recheck(address_id)?)
    }

    pub fn link_user_address(
        &self,
        user_id: UserId,
        eligibility: AddressId,
        mailing: Option<AddressId>,
    ) -> Result<UserAddressLink, ServiceError> {
        Ok(self
            .addresses
            .link_user_address(user_id, eligibility, mailing)?)
    }

    /// Store the optional proof document and record the selection with its
    /// reference.
    pub fn record_eligibility_selection(
        &self,
        user_id: UserId,
        program_id: EligibilityProgramId,
        document: Option<UploadedDocument>,
    ) -> Result<EligibilitySelection, ServiceError> {
        let catalog = self.store.catalog()?;
        if catalog.eligibility_program(program_id).is_none() {
            return Err(ServiceError::UnknownEligibilityProgram(program_id));
        }

        let document = document
            .map(|document| self.documents.store(user_id, document))
            .transpose()?;
        let selection = EligibilitySelection {
            user_id,
            program_id,
            document,
        };
        self.store.save_eligibility_selection(selection.clone())?;
        Ok(selection)
    }

    pub fn finalize(
        &self,
        user_id: UserId,
        renewal_mode: bool,
        update_user: bool,
    ) -> Result<FinalizeOutcome, ServiceError> {
        Ok(self
            .finalizer
            .finalize_application(user_id, renewal_mode, update_user)?)
    }

    pub fn dashboard(&self, user_id: UserId, now: DateTime<Utc>) -> Result<DashboardView, ServiceError> {
        Ok(self.lifecycle.dashboard(user_id, now)?)
    }

    pub fn apply_to_program(
        &self,
        user_id: UserId,
        program_id: ProgramId,
    ) -> Result<EnrollmentRecord, ServiceError> {
        Ok(self
            .lifecycle
            .apply_to_program(user_id, program_id, Utc::now())?)
    }

    pub fn mark_enrolled(
        &self,
        user_id: UserId,
        program_id: ProgramId,
    ) -> Result<EnrollmentRecord, ServiceError> {
        Ok(self
            .lifecycle
            .mark_enrolled(user_id, program_id, Utc::now())?)
    }

    pub fn reconcile_user(&self, user_id: UserId) -> Result<ReconcileReport, ServiceError> {
        Ok(self
            .lifecycle
            .reconcile_user(user_id, ChangeOrigin::User, Utc::now())?)
    }

    pub fn preview_program_change(&self, program_id: ProgramId) -> Result<AffectedUsers, ServiceError> {
        let users = self.store.user_ids()?;
        Ok(self.reconciler.preview(program_id, &users)?)
    }

    pub fn reconcile_program(
        &self,
        program_id: ProgramId,
        admin_mode: bool,
    ) -> Result<UpdateCounts, ServiceError> {
        let users = self.store.user_ids()?;
        Ok(self
            .reconciler
            .update_users_for_program(program_id, &users, admin_mode, Utc::now())?)
    }

    /// Save a catalog edit and bring every user's records in line with it.
    pub fn update_program(
        &self,
        program: AssistanceProgram,
    ) -> Result<(AssistanceProgram, UpdateCounts), ServiceError> {
        let saved = self.catalog.save_program(program)?;
        let counts = self.reconcile_program(saved.id, true)?;
        info!(program = %saved.program_name, applied = counts.applied, removed = counts.removed, "program edit applied");
        Ok((saved, counts))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("eligibility program {0} is not in the catalog")]
    UnknownEligibilityProgram(EligibilityProgramId),
    #[error(transparent)]
    Catalog(#[from] CatalogServiceError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    Finalize(#[from] FinalizeError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// HTTP status a handler should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::UnknownEligibilityProgram(_) => StatusCode::NOT_FOUND,
            ServiceError::Catalog(CatalogServiceError::Invalid(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::Catalog(CatalogServiceError::Repository(err))
            | ServiceError::Repository(err) => repository_status(err),
            ServiceError::Enrollment(err)
            | ServiceError::Finalize(FinalizeError::Enrollment(err)) => enrollment_status(err),
            ServiceError::Finalize(FinalizeError::NoEligibilitySelections(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::Finalize(FinalizeError::Repository(err)) => repository_status(err),
            ServiceError::Document(DocumentError::Rejected(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Document(DocumentError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict | RepositoryError::Protected => StatusCode::CONFLICT,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn enrollment_status(err: &EnrollmentError) -> StatusCode {
    match err {
        EnrollmentError::MissingHousehold(_)
        | EnrollmentError::MissingAddress(_)
        | EnrollmentError::NotEligible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EnrollmentError::AlreadyApplied { .. } => StatusCode::CONFLICT,
        EnrollmentError::UnknownProgram(_) | EnrollmentError::NotApplied { .. } => {
            StatusCode::NOT_FOUND
        }
        EnrollmentError::Repository(err) => repository_status(err),
    }
}
