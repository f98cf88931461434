//! Program reference data: income-proof eligibility programs and the
//! assistance programs users enroll in.

pub mod domain;
mod importer;
pub mod repository;
mod validation;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::info;

pub use domain::{
    AddressRequirement, AssistanceProgram, EligibilityProgram, EligibilityProgramId,
    ProgramCatalog, ProgramId, REQUIREMENT_ATTRIBUTES,
};
pub use importer::{CatalogImportError, CatalogImporter};
pub use repository::CatalogRepository;
pub use validation::{validate_eligibility_program, validate_program, CatalogError};

use crate::workflows::storage::RepositoryError;

/// Administrative entry point for catalog edits. Every write is validated
/// before it reaches storage.
pub struct CatalogService<C> {
    repository: Arc<C>,
}

impl<C> CatalogService<C>
where
    C: CatalogRepository + 'static,
{
    pub fn new(repository: Arc<C>) -> Self {
        Self { repository }
    }

    pub fn catalog(&self) -> Result<ProgramCatalog, CatalogServiceError> {
        Ok(self.repository.catalog()?)
    }

    /// Create or replace an assistance program row.
    pub fn save_program(
        &self,
        program: AssistanceProgram,
    ) -> Result<AssistanceProgram, CatalogServiceError> {
        validate_program(&program)?;
        self.repository.save_assistance_program(program.clone())?;
        info!(program = %program.program_name, id = program.id.0, "assistance program saved");
        Ok(program)
    }

    pub fn save_eligibility_program(
        &self,
        program: EligibilityProgram,
    ) -> Result<EligibilityProgram, CatalogServiceError> {
        validate_eligibility_program(&program)?;
        self.repository.save_eligibility_program(program.clone())?;
        Ok(program)
    }

    /// Validate and store every program from an import, stopping at the first
    /// storage failure.
    pub fn seed(&self, programs: Vec<AssistanceProgram>) -> Result<usize, CatalogServiceError> {
        let count = programs.len();
        for program in programs {
            self.save_program(program)?;
        }
        Ok(count)
    }
}

/// Error raised by catalog administration.
#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    #[error(transparent)]
    Invalid(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
