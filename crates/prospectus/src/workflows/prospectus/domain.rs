use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::narration::NarrationSource;
use crate::personalisation::{
    FamilyProfile, HouseOption, ModuleContent, ModuleId, ModuleMeta, SchoolId,
};

/// Identifier wrapper for stored prospectuses, e.g. `byron-ada-000042`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProspectusId(pub String);

impl ProspectusId {
    pub(crate) fn for_family(profile: &FamilyProfile, sequence: u64) -> Self {
        let surname = profile
            .family_name()
            .map(slug)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "family".to_string());
        let child = Some(slug(&profile.child.first_name))
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "child".to_string());

        Self(format!("{surname}-{child}-{sequence:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProspectusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn slug(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Stored submission. Only a full re-submission replaces it, bumping `revision`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProspectusRecord {
    pub prospectus_id: ProspectusId,
    pub school_id: SchoolId,
    pub profile: FamilyProfile,
    pub submitted_at: DateTime<Utc>,
    pub revision: u32,
}

/// What a family's personalised prospectus contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProspectusView {
    pub prospectus_id: ProspectusId,
    pub school_id: SchoolId,
    pub child_name: String,
    pub entry_point: String,
    pub revision: u32,
    pub submitted_at: DateTime<Utc>,
    pub visible: BTreeSet<ModuleId>,
    pub display_order: Vec<ModuleId>,
    pub tour: Vec<ModuleId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub failed: BTreeSet<ModuleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_house: Option<HouseOption>,
}

/// One module as exposed over the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionView {
    pub id: ModuleId,
    pub title: String,
    pub narration_intro: String,
    pub default_order: u32,
    pub mandatory: bool,
    pub content: ModuleContent,
    pub follow_up: Vec<ModuleId>,
    /// Set when the section was requested on behalf of a stored prospectus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

impl SectionView {
    pub(crate) fn from_meta(meta: &ModuleMeta, content: ModuleContent) -> Self {
        Self {
            id: meta.id.clone(),
            title: meta.title.clone(),
            narration_intro: meta.narration_intro.clone(),
            default_order: meta.default_order,
            mandatory: meta.mandatory,
            content,
            follow_up: meta.follow_up.clone(),
            visible: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationView {
    pub section_id: ModuleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prospectus_id: Option<ProspectusId>,
    pub text: String,
    pub source: NarrationSource,
}
