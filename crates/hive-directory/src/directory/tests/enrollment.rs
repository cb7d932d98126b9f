use super::common::*;

use crate::directory::domain::{NewOrganization, NewUser};
use crate::directory::enrollment::{ensure_membership, EnrollmentOutcome};
use crate::directory::repository::DirectoryRepository;
use crate::directory::service::DirectoryError;

fn pending_user(service: &MemoryService, username: &str, email: &str) {
    let mut new_user = NewUser::new(username, email);
    new_user.is_active = false;
    service.create_user(new_user).expect("user created");
}

#[test]
fn every_created_user_has_exactly_one_membership() {
    let (service, repository) = build_service();
    let user = service
        .create_user(NewUser::new("newbie", "newbie@example.org"))
        .expect("created");

    let first = membership(&service, "newbie");
    assert_eq!(first.organization_id, None);
    assert!(first.is_listed);
    assert!(!first.receives_minigroup_digest);

    let again = ensure_membership(repository.as_ref(), &user).expect("idempotent");
    assert_eq!(again.id, first.id);

    let duplicate = service.create_user(NewUser::new("newbie", "other@example.org"));
    assert!(matches!(duplicate, Err(DirectoryError::Repository(_))));
    assert_eq!(membership(&service, "newbie").id, first.id);
}

#[test]
fn activation_assigns_the_single_matching_organization() {
    let (service, _) = build_service();
    let wnyc = service.register_organization(wnyc()).expect("registered");
    pending_user(&service, "rookie", "rookie@WNYC.org");

    let (user, outcome) = service.activate_user("rookie").expect("activated");

    assert!(user.is_active);
    assert_eq!(outcome, EnrollmentOutcome::Assigned(wnyc.id));
    assert_eq!(membership(&service, "rookie").organization_id, Some(wnyc.id));
    assert!(viewer(&service, "rookie").is_privileged());
}

#[test]
fn activation_without_matching_organization_leaves_membership_unassigned() {
    let (service, _) = build_service();
    service.register_organization(wnyc()).expect("registered");
    pending_user(&service, "walker", "walker@x.com");

    let (_, outcome) = service.activate_user("walker").expect("activated");

    assert_eq!(outcome, EnrollmentOutcome::NoMatchingOrganization);
    assert_eq!(membership(&service, "walker").organization_id, None);
}

#[test]
fn activation_with_ambiguous_domain_assigns_nothing() {
    let (service, _) = build_service();
    for slug in ["x-east", "x-west"] {
        service
            .register_organization(
                NewOrganization::new(format!("X {slug}"), slug, "https://x.com/")
                    .with_email_domain("x.com"),
            )
            .expect("registered");
    }
    pending_user(&service, "a", "a@x.com");

    let (_, outcome) = service.activate_user("a").expect("activated");

    assert_eq!(outcome, EnrollmentOutcome::Ambiguous(2));
    assert_eq!(membership(&service, "a").organization_id, None);
}

#[test]
fn inactive_organizations_do_not_count_as_domain_matches() {
    let (service, _) = build_service();
    let active = service
        .register_organization(
            NewOrganization::new("X Active", "x-active", "https://x.com/")
                .with_email_domain("x.com"),
        )
        .expect("registered");
    let mut archived = NewOrganization::new("X Archived", "x-archived", "https://x.com/")
        .with_email_domain("x.com");
    archived.is_active = false;
    service.register_organization(archived).expect("registered");
    pending_user(&service, "a", "a@x.com");

    let (_, outcome) = service.activate_user("a").expect("activated");

    assert_eq!(outcome, EnrollmentOutcome::Assigned(active.id));
}

#[test]
fn activation_never_overrides_an_existing_assignment() {
    let (service, _) = build_service();
    service.register_organization(wnyc()).expect("registered");
    let hive = service.register_organization(hivenyc()).expect("registered");
    pending_user(&service, "rookie", "rookie@wnyc.org");
    service
        .assign_organization("rookie", "hivenyc")
        .expect("assigned");

    let (_, outcome) = service.activate_user("rookie").expect("activated");

    assert_eq!(outcome, EnrollmentOutcome::AlreadyAssigned);
    assert_eq!(membership(&service, "rookie").organization_id, Some(hive.id));
}

#[test]
fn activation_skips_addresses_without_a_domain() {
    let (service, _) = build_service();
    service.register_organization(wnyc()).expect("registered");
    pending_user(&service, "nodomain", "nodomain@");

    let (user, outcome) = service.activate_user("nodomain").expect("activated");

    assert!(user.is_active);
    assert_eq!(outcome, EnrollmentOutcome::MalformedEmail);
    assert_eq!(membership(&service, "nodomain").organization_id, None);
}

#[test]
fn activating_unknown_user_is_not_found() {
    let (service, repository) = build_service();
    let result = service.activate_user("ghost");
    assert!(matches!(result, Err(DirectoryError::NotFound(_))));
    assert!(repository
        .user_by_username("ghost")
        .expect("lookup")
        .is_none());
}
