use std::sync::Arc;

use serde_json::{json, Value};

use crate::personalisation::{
    FamilyProfile, ModuleId, ModuleMeta, SchoolCatalog, SchoolConfig, SectionRegistry,
};

pub(super) fn catalog() -> SchoolCatalog {
    SchoolCatalog::builtin().expect("built-in schools load")
}

pub(super) fn school(id: &str) -> Arc<SchoolConfig> {
    catalog().get(id).expect("school is built in")
}

pub(super) fn profile(first_name: &str, entry_point: &str) -> FamilyProfile {
    FamilyProfile::minimal(first_name, entry_point)
}

pub(super) fn ids(values: &[&str]) -> Vec<ModuleId> {
    values.iter().map(|value| ModuleId::from(*value)).collect()
}

pub(super) fn meta(id: &str, order: u32) -> ModuleMeta {
    ModuleMeta {
        id: ModuleId::from(id),
        title: id.replace('_', " "),
        narration_intro: format!("All about {id}"),
        default_order: order,
        follow_up: Vec::new(),
        mandatory: false,
        keywords: Vec::new(),
        content: None,
    }
}

pub(super) fn mandatory(id: &str, order: u32) -> ModuleMeta {
    ModuleMeta {
        mandatory: true,
        ..meta(id, order)
    }
}

/// welcome (mandatory) / sport / music / boarding / apply (mandatory), touring welcome, music, apply.
pub(super) fn small_registry() -> SectionRegistry {
    SectionRegistry::new(
        vec![
            mandatory("welcome", 10),
            meta("sport", 20),
            meta("music", 30),
            meta("boarding", 40),
            mandatory("apply", 50),
        ],
        ids(&["welcome", "music", "apply"]),
    )
    .expect("registry is consistent")
}

pub(super) fn raw_submission() -> Value {
    json!({
        "child": {
            "first_name": " Ada ",
            "surname": "Lovelace",
            "gender": "Girl",
            "date_of_birth": "2013-05-04",
            "current_school": "St Mary's"
        },
        "entry": { "point": "Year 7", "year": "September 2026" },
        "interests": {
            "academic": ["sciences", "mathematics", "sciences"],
            "sports": "hockey",
            "creative": ["music", ""],
            "other": []
        },
        "practical": {
            "accommodation_type": "Full Boarding",
            "family_location": "uk",
            "scholarship_interest": ["yes"],
            "scholarship_types": ["academic", "music"],
            "bursary_interest": "no"
        },
        "parents": [
            {
                "title": "Dr",
                "first_name": "Annabella",
                "surname": "Byron",
                "email": "annabella@example.com",
                "relationship": "mother"
            }
        ]
    })
}
