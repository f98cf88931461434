use std::sync::Arc;

use super::catalog_store;
use crate::workflows::catalog::ProgramId;
use crate::workflows::enrollment::{
    ApplicantRepository, ApplicationFinalizer, EnrollmentError, FinalizeError, Household,
    HousingTenure, NavigationTarget, UserId, UserProfile,
};
use crate::workflows::storage::InMemoryStore;
use crate::workflows::tests::common::*;

fn finalizer(
    store: &Arc<InMemoryStore>,
    notifier: &Arc<RecordingNotifier>,
) -> ApplicationFinalizer<InMemoryStore, RecordingNotifier> {
    ApplicationFinalizer::new(Arc::clone(store), Arc::clone(notifier))
}

#[test]
fn income_comes_from_lowest_selected_threshold() {
    let store = catalog_store();
    let home = store_address(&store, "123 Main St", in_area(false));
    let user = seed_user(&store, 1, &home, None);
    select(&store, user, 2);
    select(&store, user, 1);
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = finalizer(&store, &notifier)
        .finalize_application_at(user, false, true, at(2024, 4, 2))
        .expect("finalize succeeds");

    assert_eq!(outcome.target, NavigationTarget::Broadcast);
    assert_eq!(outcome.income_as_fraction_of_ami, decimal("0.3"));
    assert_eq!(outcome.applied, vec![ProgramId(1), ProgramId(2), ProgramId(4)]);
    assert!(outcome.renewal.is_none());

    let household = store.household(user).expect("household loads").expect("household exists");
    assert_eq!(household.income_as_fraction_of_ami, Some(decimal("0.3")));
    assert!(household.income_verified);
    let profile = store.user(user).expect("profile loads");
    assert_eq!(profile.last_completed_at, Some(at(2024, 4, 2)));
    assert_eq!(
        notifier.sent(),
        vec!["email:user1@example.org".to_string(), "sms:9705550001".to_string()]
    );
}

#[test]
fn without_user_update_no_welcome_is_sent() {
    let store = catalog_store();
    let home = store_address(&store, "123 Main St", in_area(false));
    let user = seed_user(&store, 1, &home, None);
    select(&store, user, 3);
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = finalizer(&store, &notifier)
        .finalize_application_at(user, false, false, at(2024, 4, 2))
        .expect("finalize succeeds");

    assert_eq!(outcome.income_as_fraction_of_ami, decimal("0.6"));
    assert_eq!(outcome.applied, vec![ProgramId(1)]);
    assert!(notifier.sent().is_empty());
    assert_eq!(store.user(user).expect("profile loads").last_completed_at, None);
}

#[test]
fn missing_selections_are_rejected() {
    let store = catalog_store();
    let home = store_address(&store, "123 Main St", in_area(false));
    let user = seed_user(&store, 1, &home, Some("0.3"));
    let notifier = Arc::new(RecordingNotifier::default());

    match finalizer(&store, &notifier).finalize_application_at(user, false, true, at(2024, 4, 2)) {
        Err(FinalizeError::NoEligibilitySelections(UserId(1))) => {}
        other => panic!("expected missing selections, got {other:?}"),
    }
    assert!(held_programs(&store, user).is_empty());
}

#[test]
fn missing_address_link_leaves_application_untouched() {
    let store = catalog_store();
    let user = UserId(5);
    store
        .save_user(UserProfile::new(user, "user5@example.org"))
        .expect("user saves");
    let household = Household {
        user_id: user,
        tenure: HousingTenure::Own,
        duration_at_address: "Less than 1 Year".to_string(),
        household_size: 1,
        income_as_fraction_of_ami: None,
        income_verified: true,
    };
    store.save_household(household.clone()).expect("household saves");
    select(&store, user, 1);
    let notifier = Arc::new(RecordingNotifier::default());

    for renewal_mode in [false, true] {
        match finalizer(&store, &notifier).finalize_application_at(
            user,
            renewal_mode,
            true,
            at(2024, 4, 2),
        ) {
            Err(FinalizeError::Enrollment(EnrollmentError::MissingAddress(UserId(5)))) => {}
            other => panic!("expected missing address, got {other:?}"),
        }
    }

    assert_eq!(
        store.household(user).expect("household loads"),
        Some(household)
    );
    let profile = store.user(user).expect("profile loads");
    assert_eq!(profile.last_completed_at, None);
    assert!(!profile.renewal_mode);
    assert!(notifier.sent().is_empty());
}

#[test]
fn notification_failures_do_not_fail_finalization() {
    let store = catalog_store();
    let home = store_address(&store, "123 Main St", in_area(false));
    let user = seed_user(&store, 1, &home, None);
    select(&store, user, 1);
    let notifier = Arc::new(RecordingNotifier::failing());

    let outcome = finalizer(&store, &notifier)
        .finalize_application_at(user, false, true, at(2024, 4, 2))
        .expect("finalize succeeds");

    assert_eq!(outcome.target, NavigationTarget::Broadcast);
    assert_eq!(notifier.sent().len(), 2);
}

#[test]
fn blank_phone_skips_sms() {
    let store = catalog_store();
    let home = store_address(&store, "123 Main St", in_area(false));
    let user = seed_user(&store, 1, &home, None);
    let mut profile = store.user(user).expect("profile loads");
    profile.phone = Some("  ".to_string());
    store.save_user(profile).expect("profile saves");
    select(&store, user, 1);
    let notifier = Arc::new(RecordingNotifier::default());

    finalizer(&store, &notifier)
        .finalize_application_at(user, false, true, at(2024, 4, 2))
        .expect("finalize succeeds");

    assert_eq!(notifier.sent(), vec!["email:user1@example.org".to_string()]);
}

#[test]
fn renewal_mode_renews_and_returns_to_dashboard() {
    let store = catalog_store();
    let home = store_address(&store, "123 Main St", in_area(false));
    let user = seed_user(&store, 1, &home, Some("0.3"));
    let mut profile = store.user(user).expect("profile loads");
    profile.last_completed_at = Some(at(2023, 4, 1));
    profile
        .last_renewal_action
        .insert("household".to_string(), "completed".to_string());
    store.save_user(profile).expect("profile saves");
    hold(&store, user, 1, true);
    hold(&store, user, 4, false);
    select(&store, user, 2);
    let notifier = Arc::new(RecordingNotifier::default());

    let outcome = finalizer(&store, &notifier)
        .finalize_application_at(user, true, true, at(2024, 4, 2))
        .expect("renewal succeeds");

    assert_eq!(outcome.target, NavigationTarget::Dashboard);
    assert_eq!(outcome.income_as_fraction_of_ami, decimal("0.5"));
    let renewal = outcome.renewal.expect("renewal summary present");
    assert!(renewal.app_renewed);
    assert_eq!(renewal.renewal_eligible, vec!["Grocery Rebate".to_string()]);
    assert_eq!(renewal.renewal_ineligible, vec!["SPIN".to_string()]);
    assert_eq!(held_programs(&store, user), vec![1]);

    let profile = store.user(user).expect("profile loads");
    assert!(profile.renewal_mode);
    assert!(profile.last_renewal_action.is_empty());
    assert_eq!(profile.last_completed_at, Some(at(2024, 4, 2)));
    let household = store.household(user).expect("household loads").expect("household exists");
    assert!(!household.income_verified);
    assert!(notifier.sent().is_empty());
}
