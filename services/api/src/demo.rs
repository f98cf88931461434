use crate::infra::{build_service, local_config, load_assistance_programs};
use chrono::Utc;
use clap::Args;
use iq_programs::error::AppError;
use iq_programs::workflows::address::{AddressInput, ResolutionOutcome};
use iq_programs::workflows::catalog::{
    AssistanceProgram, CatalogRepository, EligibilityProgramId, ProgramCatalog, ProgramId,
};
use iq_programs::workflows::enrollment::{
    ApplicantRepository, DashboardView, FinalizeOutcome, Household, HousingTenure,
    UploadedDocument, UserId, UserProfile,
};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Assistance program catalog CSV. Defaults to the built-in programs.
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Skip the administrator catalog edit portion of the demo.
    #[arg(long)]
    pub(crate) skip_admin: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CatalogCheckArgs {
    /// Catalog CSV export to validate
    pub(crate) path: PathBuf,
}

pub(crate) fn run_catalog_check(args: CatalogCheckArgs) -> Result<(), AppError> {
    let programs = load_assistance_programs(Some(&args.path))?;
    println!(
        "{} assistance programs in {}",
        programs.len(),
        args.path.display()
    );
    for program in &programs {
        println!("- {}", describe_program(program));
    }
    Ok(())
}

fn describe_program(program: &AssistanceProgram) -> String {
    let requirements = if program.requirements.is_empty() {
        "no address requirements".to_string()
    } else {
        program
            .requirements
            .iter()
            .map(|requirement| format!("{requirement:?}"))
            .collect::<Vec<_>>()
            .join(" + ")
    };
    let renewal = match program.renewal_interval_years {
        Some(years) => format!("renews every {years}y"),
        None => "lifetime".to_string(),
    };
    format!(
        "#{} {} | AMI <= {} | {} | {}{}{}",
        program.id,
        program.friendly_name,
        program.ami_threshold,
        requirements,
        renewal,
        if program.enable_autoapply { " | autoapply" } else { "" },
        if program.is_active { "" } else { " | inactive" },
    )
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        catalog,
        skip_admin,
    } = args;

    let mut config = local_config();
    config.catalog.path = catalog;
    let wiring = build_service(&config)?;
    let (service, store) = (wiring.service, wiring.store);

    println!("Income-qualified enrollment demo");
    let user = UserId(1);
    let mut profile = UserProfile::new(user, "applicant@example.org");
    profile.phone = Some("9705550100".to_string());
    if let Err(err) = store.save_user(profile).and_then(|_| {
        store.save_household(Household {
            user_id: user,
            tenure: HousingTenure::Rent,
            duration_at_address: "1 to 3 Years".to_string(),
            household_size: 3,
            income_as_fraction_of_ami: None,
            income_verified: false,
        })
    }) {
        println!("  Applicant could not be stored: {}", err);
        return Ok(());
    }

    println!("\nAddress resolution");
    let unknown = AddressInput {
        address1: "1 Nowhere St".to_string(),
        city: "Fort Collins".to_string(),
        state: "CO".to_string(),
        zip_code: "80521".to_string(),
        ..AddressInput::default()
    };
    match service.resolve_address(unknown) {
        Ok(ResolutionOutcome::NeedsCorrection(prompt)) => {
            println!("- 1 Nowhere St -> needs correction: {}", prompt.guidance)
        }
        Ok(ResolutionOutcome::Resolved(resolved)) => {
            println!("- 1 Nowhere St -> unexpectedly resolved to #{}", resolved.record.id.0)
        }
        Err(err) => println!("- 1 Nowhere St -> lookup failed: {}", err),
    }

    let entered = AddressInput {
        address1: "300 Laporte Ave".to_string(),
        address2: "Apt 2".to_string(),
        city: "Fort Collins".to_string(),
        state: "CO".to_string(),
        zip_code: "80521".to_string(),
    };
    let resolved = match service.resolve_address(entered) {
        Ok(ResolutionOutcome::Resolved(resolved)) => resolved,
        Ok(ResolutionOutcome::NeedsCorrection(prompt)) => {
            println!("- 300 Laporte Ave Apt 2 -> needs correction: {}", prompt.guidance);
            return Ok(());
        }
        Err(err) => {
            println!("  Address resolution unavailable: {}", err);
            return Ok(());
        }
    };
    let record = &resolved.record;
    println!(
        "- 300 Laporte Ave Apt 2 -> #{} {}, {} {} {} (pass {:?}, matches input: {})",
        record.id.0,
        record.address1,
        record.address2,
        record.city,
        record.zip_code,
        resolved.resolved_on,
        resolved.matches_input
    );
    println!(
        "  In service area: {} | City covered: {} | Broadband: {}",
        record.is_in_service_area, record.is_city_covered, record.has_broadband_service
    );

    if let Err(err) = service.link_user_address(user, record.id, None) {
        println!("  Address link failed: {}", err);
        return Ok(());
    }

    println!("\nApplication");
    let selections = [
        (
            EligibilityProgramId(2),
            Some(UploadedDocument {
                file_name: "medicaid-letter.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: b"%PDF-1.4 demo".to_vec(),
            }),
        ),
        (EligibilityProgramId(1), None),
    ];
    for (program_id, document) in selections {
        match service.record_eligibility_selection(user, program_id, document) {
            Ok(selection) => println!(
                "- Selected eligibility program #{} (document: {})",
                selection.program_id,
                selection
                    .document
                    .map(|document| document.0)
                    .unwrap_or_else(|| "none".to_string())
            ),
            Err(err) => println!("- Selection #{} rejected: {}", program_id, err),
        }
    }

    let finalized = match service.finalize(user, false, true) {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("  Finalize failed: {}", err);
            return Ok(());
        }
    };
    let catalog = match store.catalog() {
        Ok(catalog) => catalog,
        Err(err) => {
            println!("  Catalog unavailable: {}", err);
            return Ok(());
        }
    };
    render_finalize(&finalized, &catalog);
    let sent = wiring.notifier.sent();
    println!("  Welcome notifications: {}", sent.join(", "));

    match service.mark_enrolled(user, ProgramId(1)) {
        Ok(record) => println!(
            "- Administrator confirmed enrollment in {}",
            catalog.friendly_name(record.program_id)
        ),
        Err(err) => println!("- Enrollment confirmation failed: {}", err),
    }
    match service.dashboard(user, Utc::now()) {
        Ok(dashboard) => render_dashboard(&dashboard),
        Err(err) => println!("  Dashboard unavailable: {}", err),
    }

    if !skip_admin {
        println!("\nCatalog edit");
        let spin = catalog
            .assistance_programs()
            .find(|program| program.renewal_interval_years == Some(2))
            .cloned();
        if let Some(mut program) = spin {
            match service.preview_program_change(program.id) {
                Ok(affected) => println!(
                    "- Preview for {}: apply {:?} | remove {:?} | keep {:?}",
                    program.friendly_name,
                    affected.to_apply,
                    affected.to_remove,
                    affected.to_ignore
                ),
                Err(err) => println!("- Preview failed: {}", err),
            }

            program.ami_threshold = Decimal::new(25, 2);
            match service.update_program(program) {
                Ok((saved, counts)) => println!(
                    "- {} threshold lowered to {}: applied {} | removed {} | ignored {} | skipped {} | failed {}",
                    saved.friendly_name,
                    saved.ami_threshold,
                    counts.applied,
                    counts.removed,
                    counts.ignored,
                    counts.skipped,
                    counts.failed
                ),
                Err(err) => println!("- Program edit rejected: {}", err),
            }
        }
    }

    println!("\nRenewal");
    match service.finalize(user, true, true) {
        Ok(outcome) => render_finalize(&outcome, &catalog),
        Err(err) => println!("  Renewal failed: {}", err),
    }

    Ok(())
}

fn render_finalize(outcome: &FinalizeOutcome, catalog: &ProgramCatalog) {
    println!(
        "- Finalized at {} of AMI -> {:?}",
        outcome.income_as_fraction_of_ami, outcome.target
    );
    let applied = outcome
        .applied
        .iter()
        .map(|id| catalog.friendly_name(*id))
        .collect::<Vec<_>>();
    if applied.is_empty() {
        println!("  Applied to: nothing new");
    } else {
        println!("  Applied to: {}", applied.join(", "));
    }
    if let Some(renewal) = &outcome.renewal {
        println!(
            "  Renewed: {} | still eligible: {} | no longer eligible: {}",
            renewal.app_renewed,
            list_or_none(&renewal.renewal_eligible),
            list_or_none(&renewal.renewal_ineligible)
        );
    }
}

fn render_dashboard(dashboard: &DashboardView) {
    println!(
        "  Dashboard: needs renewal {} | renew now {}",
        dashboard.needs_renewal, dashboard.renew_now_enabled
    );
    for listing in &dashboard.programs {
        let status = listing
            .status
            .map(|status| format!("{status:?}"))
            .unwrap_or_else(|| "Eligible".to_string());
        println!("    - {}: {}", listing.friendly_name, status);
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}
