use std::sync::Arc;

use super::common::*;
use crate::workflows::catalog::{CatalogService, CatalogServiceError, ProgramId};
use crate::workflows::storage::RepositoryError;

#[test]
fn save_program_validates_before_storing() {
    let repository = Arc::new(MemoryCatalog::default());
    let service = CatalogService::new(repository.clone());

    let mut invalid = program(1, "0.6");
    invalid.requirements.clear();
    assert!(matches!(
        service.save_program(invalid),
        Err(CatalogServiceError::Invalid(_))
    ));
    assert!(repository.snapshot().assistance_program(ProgramId(1)).is_none());

    service
        .save_program(program(1, "0.6"))
        .expect("valid program saves");
    assert_eq!(
        repository.snapshot().friendly_name(ProgramId(1)),
        "Program 1"
    );
}

#[test]
fn seed_counts_programs_and_exposes_shortest_interval() {
    let repository = Arc::new(MemoryCatalog::default());
    let service = CatalogService::new(repository);

    let mut lifetime = program(2, "0.3");
    lifetime.renewal_interval_years = None;
    let mut biennial = program(3, "0.3");
    biennial.renewal_interval_years = Some(2);
    let mut inactive = program(4, "0.3");
    inactive.renewal_interval_years = Some(1);
    inactive.is_active = false;

    let count = service
        .seed(vec![lifetime, biennial, inactive])
        .expect("seed succeeds");
    assert_eq!(count, 3);

    let catalog = service.catalog().expect("catalog loads");
    assert_eq!(catalog.shortest_renewal_interval(), Some(2));
    assert_eq!(catalog.program_name(ProgramId(99)), "program #99");
}

#[test]
fn repository_failures_propagate() {
    let service = CatalogService::new(Arc::new(UnavailableCatalog));

    match service.catalog() {
        Err(CatalogServiceError::Repository(RepositoryError::Unavailable(reason))) => {
            assert_eq!(reason, "catalog offline")
        }
        other => panic!("expected unavailable repository, got {other:?}"),
    }
}
