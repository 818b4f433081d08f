use std::collections::BTreeSet;

use super::common::*;

use crate::personalisation::{
    resolve_visibility, tour_sequence, AccommodationType, Field, ModuleId, Predicate,
    PredicateError, Rule, RuleSet,
};

#[test]
fn every_module_is_either_visible_or_hidden() {
    let registry = small_registry();
    let rules = RuleSet::new()
        .with("sport", Predicate::non_empty(Field::InterestsSports))
        .with("music", Predicate::contains(Field::InterestsCreative, "music"));
    let family = profile("Ada", "year7");

    let result = resolve_visibility(&family, &rules, &registry);

    for id in registry.module_ids() {
        assert!(
            result.visible.contains(id) ^ result.hidden.contains(id),
            "{id} must be in exactly one partition"
        );
    }
    assert_eq!(result.visible.len() + result.hidden.len(), registry.len());
    assert_eq!(
        result.hidden,
        ids(&["music", "sport"]).into_iter().collect::<BTreeSet<_>>()
    );
    assert!(result.failed.is_empty());
}

#[test]
fn minimal_clc_profile_tours_canonical_modules_first() {
    let clc = school("clc");
    let result = clc.resolve(&profile("Ada", "year7"));

    assert_eq!(
        result.tour,
        ids(&[
            "welcome",
            "why_clc",
            "academic_excellence",
            "boarding_life",
            "pastoral_care",
            "clubs_enrichment",
            "how_to_apply",
            "next_steps",
            "lower_college",
            "day_girl_experience",
            "visit_us",
            "location",
        ])
    );
    assert_eq!(
        result.display_order,
        ids(&[
            "welcome",
            "why_clc",
            "academic_excellence",
            "lower_college",
            "boarding_life",
            "day_girl_experience",
            "pastoral_care",
            "clubs_enrichment",
            "how_to_apply",
            "visit_us",
            "location",
            "next_steps",
        ])
    );
}

#[test]
fn failing_rules_hide_their_module_and_are_reported() {
    let registry = small_registry();
    let rules = RuleSet::new()
        .with(
            "boarding",
            Predicate::in_range(Field::EntryYearGroup, Some(9), None),
        )
        .with(
            "sport",
            Rule::custom("sport-panics", |_| -> Result<bool, PredicateError> {
                panic!("rule bug")
            }),
        );
    let family = profile("Ada", "senior");

    let result = resolve_visibility(&family, &rules, &registry);

    let failed: BTreeSet<ModuleId> = ids(&["boarding", "sport"]).into_iter().collect();
    assert_eq!(result.failed, failed);
    assert!(failed.is_subset(&result.hidden));
    assert!(result.is_visible("music"));
    assert!(result.is_visible("welcome"));
}

#[test]
fn complementary_rules_are_mutually_exclusive() {
    let clc = school("clc");

    for (accommodation, shown, hidden) in [
        (AccommodationType::Day, "day_girl_experience", "boarding_life"),
        (AccommodationType::Boarding, "boarding_life", "day_girl_experience"),
    ] {
        let mut family = profile("Ada", "year9");
        family.practical.accommodation_type = accommodation;

        let result = clc.resolve(&family);
        assert!(result.is_visible(shown), "{accommodation:?} shows {shown}");
        assert!(!result.is_visible(hidden), "{accommodation:?} hides {hidden}");
    }
}

#[test]
fn empty_visibility_falls_back_to_mandatory_modules() {
    let registry = small_registry();
    let tour = tour_sequence(&registry, &BTreeSet::new());
    assert_eq!(tour, ids(&["welcome", "apply"]));
}

#[test]
fn tour_appends_visible_modules_outside_the_canonical_route() {
    let registry = small_registry();
    let visible: BTreeSet<ModuleId> = ids(&["boarding", "sport", "apply"]).into_iter().collect();

    assert_eq!(
        tour_sequence(&registry, &visible),
        ids(&["apply", "sport", "boarding"])
    );
}

#[test]
fn resolution_is_deterministic() {
    let clc = school("clc");
    let mut family = profile("Ada", "sixth_form");
    family.interests.creative.insert("art".to_string());
    family.practical.scholarship_interest = true;

    let first = clc.resolve(&family);
    for _ in 0..5 {
        assert_eq!(clc.resolve(&family), first);
    }
}
