use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Mutex;

use rust_decimal::Decimal;

use crate::workflows::catalog::{
    AddressRequirement, AssistanceProgram, CatalogRepository, EligibilityProgram, ProgramCatalog,
    ProgramId,
};
use crate::workflows::storage::RepositoryError;

pub(super) fn decimal(raw: &str) -> Decimal {
    Decimal::from_str(raw).expect("valid decimal literal")
}

pub(super) fn program(id: u32, threshold: &str) -> AssistanceProgram {
    AssistanceProgram {
        id: ProgramId(id),
        program_name: format!("program_{id}"),
        friendly_name: format!("Program {id}"),
        ami_threshold: decimal(threshold),
        is_active: true,
        enable_autoapply: true,
        requirements: BTreeSet::from([AddressRequirement::InServiceArea]),
        renewal_interval_years: Some(1),
    }
}

#[derive(Default)]
pub(super) struct MemoryCatalog {
    catalog: Mutex<ProgramCatalog>,
}

impl MemoryCatalog {
    pub(super) fn snapshot(&self) -> ProgramCatalog {
        self.catalog.lock().expect("catalog mutex poisoned").clone()
    }
}

impl CatalogRepository for MemoryCatalog {
    fn catalog(&self) -> Result<ProgramCatalog, RepositoryError> {
        Ok(self.snapshot())
    }

    fn save_assistance_program(&self, program: AssistanceProgram) -> Result<(), RepositoryError> {
        self.catalog
            .lock()
            .expect("catalog mutex poisoned")
            .upsert_assistance(program);
        Ok(())
    }

    fn save_eligibility_program(&self, program: EligibilityProgram) -> Result<(), RepositoryError> {
        self.catalog
            .lock()
            .expect("catalog mutex poisoned")
            .upsert_eligibility(program);
        Ok(())
    }
}

pub(super) struct UnavailableCatalog;

impl CatalogRepository for UnavailableCatalog {
    fn catalog(&self) -> Result<ProgramCatalog, RepositoryError> {
        Err(RepositoryError::Unavailable("catalog offline".to_string()))
    }

    fn save_assistance_program(&self, _program: AssistanceProgram) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("catalog offline".to_string()))
    }

    fn save_eligibility_program(&self, _program: EligibilityProgram) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("catalog offline".to_string()))
    }
}
