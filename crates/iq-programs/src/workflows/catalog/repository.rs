use super::domain::{AssistanceProgram, EligibilityProgram, ProgramCatalog};
use crate::workflows::storage::RepositoryError;

/// Storage abstraction over the program reference tables.
pub trait CatalogRepository: Send + Sync {
    /// Current catalog contents. Callers load this once per evaluation.
    fn catalog(&self) -> Result<ProgramCatalog, RepositoryError>;
    fn save_assistance_program(&self, program: AssistanceProgram) -> Result<(), RepositoryError>;
    fn save_eligibility_program(&self, program: EligibilityProgram) -> Result<(), RepositoryError>;
}
