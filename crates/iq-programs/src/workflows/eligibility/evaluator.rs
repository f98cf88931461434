use std::collections::BTreeSet;

use rust_decimal::Decimal;
use tracing::warn;

use crate::workflows::address::AddressRecord;
use crate::workflows::catalog::{AssistanceProgram, ProgramCatalog, ProgramId};
use crate::workflows::enrollment::EligibilitySelection;

/// Whether a household at `income_fraction` of AMI living at `address`
/// qualifies for `program`. Unknown income never qualifies.
pub fn is_eligible(
    program: &AssistanceProgram,
    income_fraction: Option<Decimal>,
    address: &AddressRecord,
) -> bool {
    let Some(income_fraction) = income_fraction else {
        return false;
    };

    if !program.is_active || program.ami_threshold < income_fraction {
        return false;
    }

    if program.requirements.is_empty() {
        warn!(
            program = %program.program_name,
            "skipping program without address requirements"
        );
        return false;
    }

    program.address_qualifies(address)
}

/// Assistance programs the household qualifies for, ordered by catalog id.
pub fn eligible_programs<'c>(
    income_fraction: Option<Decimal>,
    address: &AddressRecord,
    catalog: &'c ProgramCatalog,
) -> Vec<&'c AssistanceProgram> {
    catalog
        .assistance_programs()
        .filter(|program| is_eligible(program, income_fraction, address))
        .collect()
}

pub fn eligible_program_ids(
    income_fraction: Option<Decimal>,
    address: &AddressRecord,
    catalog: &ProgramCatalog,
) -> BTreeSet<ProgramId> {
    eligible_programs(income_fraction, address, catalog)
        .into_iter()
        .map(|program| program.id)
        .collect()
}

/// Lowest AMI threshold across the user's eligibility selections. Selections
/// pointing at programs missing from the catalog are ignored.
pub fn lowest_ami_threshold(
    selections: &[EligibilitySelection],
    catalog: &ProgramCatalog,
) -> Option<Decimal> {
    selections
        .iter()
        .filter_map(|selection| {
            let program = catalog.eligibility_program(selection.program_id);
            if program.is_none() {
                warn!(
                    user_id = selection.user_id.0,
                    program_id = selection.program_id.0,
                    "eligibility selection references unknown program"
                );
            }
            program.map(|program| program.ami_threshold)
        })
        .min()
}
