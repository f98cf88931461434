use std::collections::BTreeSet;

use super::common::*;
use crate::workflows::catalog::{
    validate_eligibility_program, validate_program, CatalogError, EligibilityProgram,
    EligibilityProgramId,
};

#[test]
fn program_without_requirements_is_rejected() {
    let mut program = program(1, "0.6");
    program.requirements = BTreeSet::new();

    assert_eq!(
        validate_program(&program),
        Err(CatalogError::NoAddressRequirements {
            program: "program_1".to_string()
        })
    );
}

#[test]
fn threshold_must_fall_in_unit_interval() {
    for raw in ["0", "-0.1", "1.01"] {
        let mut program = program(2, "0.5");
        program.ami_threshold = decimal(raw);
        assert!(
            matches!(
                validate_program(&program),
                Err(CatalogError::InvalidAmiThreshold { .. })
            ),
            "threshold {raw} should be rejected"
        );
    }

    let mut full = program(3, "1");
    full.renewal_interval_years = None;
    assert_eq!(validate_program(&full), Ok(()));
}

#[test]
fn zero_year_renewal_interval_is_rejected() {
    let mut program = program(4, "0.3");
    program.renewal_interval_years = Some(0);

    assert!(matches!(
        validate_program(&program),
        Err(CatalogError::ZeroRenewalInterval { .. })
    ));
}

#[test]
fn blank_names_are_rejected_before_other_checks() {
    let mut program = program(5, "3");
    program.program_name = "  ".to_string();
    assert_eq!(validate_program(&program), Err(CatalogError::BlankName));

    let eligibility = EligibilityProgram {
        id: EligibilityProgramId(1),
        program_name: String::new(),
        friendly_name: "SNAP".to_string(),
        ami_threshold: decimal("0.3"),
        is_active: true,
    };
    assert_eq!(
        validate_eligibility_program(&eligibility),
        Err(CatalogError::BlankName)
    );
}
