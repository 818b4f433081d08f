use super::common::*;
use chrono::NaiveDate;
use serde_json::json;

use crate::personalisation::{
    validate_profile, AccommodationType, EntryPoint, FamilyLocation, Gender,
    QualificationPreference, ValidationError, ValidationErrorKind,
};

fn fields(errors: &[ValidationError]) -> Vec<&str> {
    errors.iter().map(|error| error.field.as_str()).collect()
}

#[test]
fn normalises_a_complete_submission() {
    let profile = validate_profile(&raw_submission()).expect("submission is valid");

    assert_eq!(profile.child.first_name, "Ada");
    assert_eq!(profile.child.gender, Gender::Female);
    assert_eq!(
        profile.child.date_of_birth,
        NaiveDate::from_ymd_opt(2013, 5, 4)
    );
    assert_eq!(profile.entry.point.as_str(), "year7");
    assert_eq!(profile.entry.year.as_deref(), Some("September 2026"));
    assert_eq!(profile.interests.academic.len(), 2);
    assert!(profile.interests.sports.contains("hockey"));
    assert_eq!(profile.interests.creative.len(), 1);
    assert_eq!(
        profile.practical.accommodation_type,
        AccommodationType::Boarding
    );
    assert_eq!(profile.practical.family_location, Some(FamilyLocation::Uk));
    assert!(profile.practical.scholarship_interest);
    assert!(!profile.practical.bursary_interest);
    assert!(profile.futures.is_none());
    assert_eq!(profile.parents.len(), 1);
    assert_eq!(profile.family_name(), Some("Byron"));
}

#[test]
fn collects_every_error_in_one_pass() {
    let raw = json!({
        "child": { "gender": "dragon" },
        "entry": {},
        "practical": { "accommodation_type": "caravan" },
        "parents": [{ "first_name": "Jo", "surname": "Smith", "email": "not-an-email" }]
    });

    let errors = validate_profile(&raw).expect_err("submission is invalid");
    let fields = fields(&errors);

    assert!(fields.contains(&"child.first_name"));
    assert!(fields.contains(&"child.gender"));
    assert!(fields.contains(&"entry.point"));
    assert!(fields.contains(&"practical.accommodation_type"));
    assert!(fields.contains(&"parents[0].email"));

    let gender = errors
        .iter()
        .find(|error| error.field == "child.gender")
        .expect("gender error present");
    assert_eq!(
        gender.kind,
        ValidationErrorKind::NotAllowed {
            value: "dragon".to_string(),
            allowed: Gender::VARIANTS,
        }
    );
}

#[test]
fn rejects_non_object_payloads() {
    let errors = validate_profile(&json!(["not", "a", "form"])).expect_err("invalid root");
    assert_eq!(fields(&errors), vec!["$"]);
}

#[test]
fn rejects_more_than_two_parents() {
    let mut raw = raw_submission();
    let parent = json!({ "first_name": "A", "surname": "B", "email": "a@b.org" });
    raw["parents"] = json!([parent.clone(), parent.clone(), parent]);

    let errors = validate_profile(&raw).expect_err("too many parents");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "parents");
    assert_eq!(errors[0].kind, ValidationErrorKind::TooMany { max: 2 });
}

#[test]
fn accepts_legacy_parent_keys() {
    let mut raw = raw_submission();
    let object = raw.as_object_mut().expect("object");
    object.remove("parents");
    object.insert(
        "parent".to_string(),
        json!({ "first_name": "Ann", "surname": "Byron", "email": "ann@example.com" }),
    );
    object.insert(
        "second_parent".to_string(),
        json!({ "first_name": "George", "surname": "Byron", "email": "george@example.com" }),
    );

    let profile = validate_profile(&raw).expect("legacy keys accepted");
    assert_eq!(profile.parents.len(), 2);
    assert_eq!(profile.parents[1].first_name, "George");
}

#[test]
fn reports_bad_list_items_by_index() {
    let mut raw = raw_submission();
    raw["interests"]["sports"] = json!(["hockey", 7]);

    let errors = validate_profile(&raw).expect_err("numeric tag");
    assert_eq!(fields(&errors), vec!["interests.sports[1]"]);
}

#[test]
fn reports_sections_of_the_wrong_shape() {
    let mut raw = raw_submission();
    raw["interests"] = json!("music");

    let errors = validate_profile(&raw).expect_err("interests must be an object");
    assert_eq!(fields(&errors), vec!["interests"]);
    assert_eq!(
        errors[0].kind,
        ValidationErrorKind::WrongType { expected: "object" }
    );
}

#[test]
fn rejects_malformed_dates() {
    let mut raw = raw_submission();
    raw["child"]["date_of_birth"] = json!("04/05/2013");

    let errors = validate_profile(&raw).expect_err("bad date");
    assert_eq!(
        errors[0].kind,
        ValidationErrorKind::InvalidDate {
            value: "04/05/2013".to_string()
        }
    );
}

#[test]
fn futures_follow_the_entry_point() {
    let mut raw = raw_submission();
    raw["futures"] = json!({
        "career_areas": ["medicine_health", "law"],
        "qualification_preference": "IB"
    });

    let younger = validate_profile(&raw).expect("valid");
    assert!(younger.futures.is_none());

    raw["entry"]["point"] = json!("Sixth Form");
    let sixth_former = validate_profile(&raw).expect("valid");
    let futures = sixth_former.futures.expect("futures kept for sixth form");
    assert_eq!(futures.primary_career(), Some("medicine_health"));
    assert_eq!(futures.qualification_preference, QualificationPreference::Ib);

    let minimal = validate_profile(&json!({
        "child": { "first_name": "Bea" },
        "entry": { "point": "lower_sixth" }
    }))
    .expect("valid");
    assert_eq!(minimal.futures.map(|f| f.career_areas.len()), Some(0));
}

#[test]
fn minimal_submission_uses_defaults() {
    let profile = validate_profile(&json!({
        "child": { "first_name": "Cal" },
        "entry": { "point": "third-form" }
    }))
    .expect("valid");

    assert_eq!(profile.child.gender, Gender::Unspecified);
    assert_eq!(
        profile.practical.accommodation_type,
        AccommodationType::Unsure
    );
    assert!(profile.practical.family_location.is_none());
    assert!(profile.interests.is_empty());
    assert!(profile.parents.is_empty());
    assert_eq!(profile.entry.point.year_group(), Some(9));
}

#[test]
fn entry_points_map_to_year_groups() {
    assert_eq!(EntryPoint::new("Year 7").as_str(), "year7");
    assert_eq!(EntryPoint::new("year_9").year_group(), Some(9));
    assert_eq!(EntryPoint::new("Reception").year_group(), Some(0));
    assert_eq!(EntryPoint::new("16+").as_str(), "16_plus");
    assert_eq!(EntryPoint::new("16+").year_group(), Some(12));
    assert_eq!(EntryPoint::new("13+").as_str(), "13_plus");
    assert_eq!(EntryPoint::new("13+").year_group(), Some(9));
    assert_eq!(EntryPoint::new("11 +").as_str(), "11_plus");
    assert_eq!(EntryPoint::new("11+").year_group(), Some(7));
    assert_eq!(EntryPoint::new("13").year_group(), Some(9));
    assert_eq!(EntryPoint::new("+++").as_str(), "");
    assert_eq!(EntryPoint::new("upper_sixth").year_group(), Some(13));
    assert_eq!(EntryPoint::new("senior").year_group(), None);
    assert_eq!(EntryPoint::new("year42").year_group(), None);
    assert!(EntryPoint::new("sixth form").is_sixth_form());
    assert!(!EntryPoint::new("fifth_form").is_sixth_form());
}

#[test]
fn entry_point_that_normalises_to_nothing_is_missing() {
    for point in ["+++", "\u{2014}", "!?"] {
        let errors = validate_profile(&json!({
            "child": { "first_name": "Ada" },
            "entry": { "point": point }
        }))
        .expect_err("unusable entry point is rejected");

        assert_eq!(fields(&errors), vec!["entry.point"]);
        assert_eq!(errors[0].kind, ValidationErrorKind::Missing);
    }
}
