use rust_decimal::Decimal;

use super::domain::{AssistanceProgram, EligibilityProgram};

/// Catalog edits that would leave the reference data unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("program '{program}' declares no address requirements")]
    NoAddressRequirements { program: String },
    #[error("program '{program}' has AMI threshold {threshold} outside (0, 1]")]
    InvalidAmiThreshold { program: String, threshold: Decimal },
    #[error("program '{program}' has a zero-year renewal interval")]
    ZeroRenewalInterval { program: String },
    #[error("program name must not be blank")]
    BlankName,
}

fn threshold_in_range(threshold: Decimal) -> bool {
    threshold > Decimal::ZERO && threshold <= Decimal::ONE
}

/// Reject assistance program rows that evaluation cannot handle safely,
/// including rows with no address requirement.
pub fn validate_program(program: &AssistanceProgram) -> Result<(), CatalogError> {
    if program.program_name.trim().is_empty() {
        return Err(CatalogError::BlankName);
    }

    if program.requirements.is_empty() {
        return Err(CatalogError::NoAddressRequirements {
            program: program.program_name.clone(),
        });
    }

    if !threshold_in_range(program.ami_threshold) {
        return Err(CatalogError::InvalidAmiThreshold {
            program: program.program_name.clone(),
            threshold: program.ami_threshold,
        });
    }

    if program.renewal_interval_years == Some(0) {
        return Err(CatalogError::ZeroRenewalInterval {
            program: program.program_name.clone(),
        });
    }

    Ok(())
}

pub fn validate_eligibility_program(program: &EligibilityProgram) -> Result<(), CatalogError> {
    if program.program_name.trim().is_empty() {
        return Err(CatalogError::BlankName);
    }

    if !threshold_in_range(program.ami_threshold) {
        return Err(CatalogError::InvalidAmiThreshold {
            program: program.program_name.clone(),
            threshold: program.ami_threshold,
        });
    }

    Ok(())
}
