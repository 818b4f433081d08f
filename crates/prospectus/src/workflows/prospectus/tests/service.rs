use std::sync::Arc;

use super::common::*;
use serde_json::json;

use crate::narration::NarrationSource;
use crate::personalisation::ModuleId;
use crate::workflows::prospectus::repository::RepositoryError;
use crate::workflows::prospectus::{ProspectusId, ProspectusService, ProspectusServiceError};

fn ids(values: &[&str]) -> Vec<ModuleId> {
    values.iter().map(|value| ModuleId::from(*value)).collect()
}

#[test]
fn submit_stores_record_and_resolves_visibility() {
    let (service, repository) = build_service();

    let view = service.submit("clc", &submission()).expect("submission accepted");

    assert!(view.prospectus_id.as_str().starts_with("byron-ada-"));
    assert_eq!(view.revision, 1);
    assert_eq!(view.child_name, "Ada");
    assert_eq!(view.entry_point, "sixth_form");
    assert_eq!(
        view.tour,
        ids(&[
            "welcome",
            "why_clc",
            "academic_excellence",
            "sixth_form",
            "career_pathway",
            "boarding_life",
            "pastoral_care",
            "sport",
            "music",
            "clubs_enrichment",
            "scholarships",
            "how_to_apply",
            "next_steps",
            "visit_us",
            "location",
        ])
    );
    assert!(!view.visible.contains("day_girl_experience"));
    assert!(!view.visible.contains("ib_programme"));
    assert!(view.failed.is_empty());
    assert!(view.suggested_house.is_none());

    let stored = repository
        .records
        .lock()
        .expect("repository mutex poisoned")
        .get(&view.prospectus_id)
        .cloned()
        .expect("record stored");
    assert_eq!(stored.school_id.as_str(), "clc");
}

#[test]
fn submit_rejects_unknown_schools() {
    let (service, _) = build_service();
    assert!(matches!(
        service.submit("hogwarts", &submission()),
        Err(ProspectusServiceError::UnknownSchool(school)) if school == "hogwarts"
    ));
}

#[test]
fn invalid_submissions_are_not_stored() {
    let (service, repository) = build_service();

    let result = service.submit("clc", &json!({ "child": {}, "entry": {} }));

    match result {
        Err(ProspectusServiceError::Validation(errors)) => assert_eq!(errors.len(), 2),
        other => panic!("expected validation errors, got {other:?}"),
    }
    assert!(repository
        .records
        .lock()
        .expect("repository mutex poisoned")
        .is_empty());
}

#[test]
fn resubmission_replaces_profile_and_bumps_revision() {
    let (service, _) = build_service();
    let first = service.submit("clc", &submission()).expect("accepted");

    let mut changed = submission();
    changed["practical"]["accommodation_type"] = json!("day");
    let second = service
        .resubmit("clc", &first.prospectus_id, &changed)
        .expect("resubmission accepted");

    assert_eq!(second.prospectus_id, first.prospectus_id);
    assert_eq!(second.revision, 2);
    assert!(second.visible.contains("day_girl_experience"));
    assert!(!second.visible.contains("boarding_life"));

    let reloaded = service
        .view("clc", &first.prospectus_id)
        .expect("record still readable");
    assert_eq!(reloaded, second);
}

#[test]
fn resubmitting_an_unknown_prospectus_is_not_found() {
    let (service, _) = build_service();
    let missing = ProspectusId("nobody-000000".to_string());

    assert!(matches!(
        service.resubmit("clc", &missing, &submission()),
        Err(ProspectusServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[test]
fn prospectuses_are_scoped_to_their_school() {
    let (service, _) = build_service();
    let view = service.submit("clc", &submission()).expect("accepted");

    assert!(matches!(
        service.view("brighton-college", &view.prospectus_id),
        Err(ProspectusServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[test]
fn sections_report_visibility_for_a_family() {
    let (service, _) = build_service();
    let view = service.submit("clc", &submission()).expect("accepted");

    let music = service
        .section("clc", "music", Some(&view.prospectus_id))
        .expect("music exists");
    assert_eq!(music.visible, Some(true));
    assert_eq!(music.follow_up, ids(&["clubs_enrichment"]));

    let drama = service
        .section("clc", "drama_dance", Some(&view.prospectus_id))
        .expect("drama exists");
    assert_eq!(drama.visible, Some(false));

    let anonymous = service.section("clc", "music", None).expect("music exists");
    assert_eq!(anonymous.visible, None);
    assert_eq!(anonymous.follow_up.len(), 3);

    assert!(matches!(
        service.section("clc", "quidditch", None),
        Err(ProspectusServiceError::UnknownSection { .. })
    ));
}

#[test]
fn sections_are_listed_in_default_order() {
    let (service, _) = build_service();
    let sections = service.sections("clc").expect("clc exists");

    assert_eq!(sections.len(), 22);
    assert_eq!(sections[0].id.as_str(), "welcome");
    assert_eq!(sections[21].id.as_str(), "next_steps");
    assert!(sections
        .windows(2)
        .all(|pair| pair[0].default_order <= pair[1].default_order));
}

#[test]
fn lookup_matches_free_text_questions() {
    let (service, _) = build_service();

    let section = service
        .lookup_section("clc", "Can we book an open day?")
        .expect("a section matches");
    assert_eq!(section.id.as_str(), "visit_us");

    assert!(matches!(
        service.lookup_section("clc", "quantum"),
        Err(ProspectusServiceError::NoMatchingSection(_))
    ));
}

#[test]
fn strathallan_prospectuses_suggest_an_eligible_house() {
    let (service, _) = build_service();
    let view = service
        .submit("strathallan", &submission())
        .expect("accepted");

    let house = view.suggested_house.expect("a house is suggested");
    assert_eq!(house.house_type.as_deref(), Some("Senior Girls"));

    let again = service
        .view("strathallan", &view.prospectus_id)
        .expect("readable");
    assert_eq!(again.suggested_house.map(|house| house.name), Some(house.name));
}

#[test]
fn repository_failures_surface_as_errors() {
    let service = ProspectusService::new(
        catalog(),
        Arc::new(UnavailableRepository),
        echo_narration(),
    );

    assert!(matches!(
        service.submit("clc", &submission()),
        Err(ProspectusServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}

#[tokio::test]
async fn narration_is_personalised_for_stored_families() {
    let (service, _) = build_service();
    let view = service.submit("clc", &submission()).expect("accepted");

    let narration = service
        .narrate("clc", "music", Some(&view.prospectus_id))
        .await
        .expect("music exists");
    assert_eq!(narration.source, NarrationSource::Generated);
    assert_eq!(narration.text, "Ada meets Music");

    let anonymous = service
        .narrate("clc", "music", None)
        .await
        .expect("music exists");
    assert_eq!(anonymous.text, "your child meets Music");
}

#[tokio::test]
async fn narration_falls_back_when_the_narrator_fails() {
    let repository = Arc::new(MemoryRepository::default());
    let service = ProspectusService::new(catalog(), repository, offline_narration());

    let narration = service
        .narrate("brighton-college", "spaces", None)
        .await
        .expect("spaces exists");

    assert_eq!(narration.source, NarrationSource::Fallback);
    assert_eq!(
        narration.text,
        "Information about Our Spaces at Brighton College. Please see the prospectus for full details."
    );
}
