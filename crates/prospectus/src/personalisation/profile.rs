use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Normalised record of one family's enquiry-form answers.
///
/// Built once per submission by [`validate_profile`](super::validate_profile) and treated as an
/// immutable value afterwards; a re-submission produces a new profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyProfile {
    pub child: ChildDetails,
    pub entry: EntryDetails,
    pub interests: Interests,
    pub practical: PracticalPreferences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub futures: Option<Futures>,
    #[serde(default)]
    pub parents: Vec<ParentContact>,
}

impl FamilyProfile {
    /// Smallest valid profile: a first name and an entry point, everything else unset.
    pub fn minimal(first_name: impl Into<String>, entry_point: impl AsRef<str>) -> Self {
        let entry = EntryDetails {
            point: EntryPoint::new(entry_point.as_ref()),
            year: None,
        };
        let futures = entry.point.is_sixth_form().then(Futures::default);

        Self {
            child: ChildDetails {
                first_name: first_name.into(),
                surname: None,
                gender: Gender::Unspecified,
                date_of_birth: None,
                current_school: None,
                current_year: None,
            },
            entry,
            interests: Interests::default(),
            practical: PracticalPreferences::default(),
            futures,
            parents: Vec::new(),
        }
    }

    /// Surname used for salutations and identifiers: first parent, then the child.
    pub fn family_name(&self) -> Option<&str> {
        self.parents
            .first()
            .map(|parent| parent.surname.as_str())
            .filter(|surname| !surname.is_empty())
            .or(self.child.surname.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildDetails {
    pub first_name: String,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub current_school: Option<String>,
    #[serde(default)]
    pub current_year: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[serde(alias = "boy")]
    Male,
    #[serde(alias = "girl")]
    Female,
    #[default]
    #[serde(alias = "neutral", alias = "prefer_not_to_say")]
    Unspecified,
}

impl Gender {
    pub const VARIANTS: &'static [&'static str] = &["male", "female", "unspecified"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unspecified => "unspecified",
        }
    }

    pub const fn pronouns(self) -> Pronouns {
        match self {
            Gender::Male => Pronouns {
                subject: "he",
                object: "him",
                possessive: "his",
                child: "son",
            },
            Gender::Female => Pronouns {
                subject: "she",
                object: "her",
                possessive: "her",
                child: "daughter",
            },
            Gender::Unspecified => Pronouns {
                subject: "they",
                object: "them",
                possessive: "their",
                child: "child",
            },
        }
    }
}

/// Pronoun set used when personalising narration copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pronouns {
    pub subject: &'static str,
    pub object: &'static str,
    pub possessive: &'static str,
    pub child: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDetails {
    pub point: EntryPoint,
    #[serde(default)]
    pub year: Option<String>,
}

/// School-defined entry point, stored in a normalised spelling (`year7`, `sixth_form`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EntryPoint(String);

impl EntryPoint {
    pub fn new(raw: &str) -> Self {
        let mut spelled = String::with_capacity(raw.len());
        for ch in raw.trim().to_ascii_lowercase().chars() {
            match ch {
                '+' if spelled
                    .trim_end_matches('_')
                    .ends_with(|last: char| last.is_ascii_digit()) =>
                {
                    spelled.push_str("_plus")
                }
                ' ' | '-' | '_' => spelled.push('_'),
                ch if ch.is_ascii_alphanumeric() => spelled.push(ch),
                _ => {}
            }
        }
        let lowered = spelled
            .split('_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        let normalised = match lowered.strip_prefix("year_") {
            Some(rest) if rest.chars().all(|ch| ch.is_ascii_digit()) && !rest.is_empty() => {
                format!("year{rest}")
            }
            _ => lowered,
        };

        Self(normalised)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// National curriculum year group for the entry point, when it maps to one.
    pub fn year_group(&self) -> Option<u8> {
        match self.0.as_str() {
            "reception" => Some(0),
            "first_form" => Some(7),
            "second_form" => Some(8),
            "third_form" => Some(9),
            "fourth_form" => Some(10),
            "fifth_form" => Some(11),
            "11_plus" | "11" => Some(7),
            "13_plus" | "13" => Some(9),
            "sixth_form" | "lower_sixth" | "16_plus" | "16" => Some(12),
            "upper_sixth" => Some(13),
            other => other
                .strip_prefix("year")
                .and_then(|digits| digits.parse::<u8>().ok())
                .filter(|year| *year <= 13),
        }
    }

    pub fn is_sixth_form(&self) -> bool {
        self.year_group().is_some_and(|year| year >= 12)
    }
}

impl From<String> for EntryPoint {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<EntryPoint> for String {
    fn from(value: EntryPoint) -> Self {
        value.0
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interest tags grouped by area. Absent interest is an empty set, never a missing field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interests {
    #[serde(default)]
    pub academic: BTreeSet<String>,
    #[serde(default)]
    pub sports: BTreeSet<String>,
    #[serde(default)]
    pub creative: BTreeSet<String>,
    #[serde(default)]
    pub other: BTreeSet<String>,
}

impl Interests {
    /// Union of every interest area, in sorted order without duplicates.
    pub fn all(&self) -> BTreeSet<&str> {
        self.academic
            .iter()
            .chain(&self.sports)
            .chain(&self.creative)
            .chain(&self.other)
            .map(String::as_str)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.academic.is_empty()
            && self.sports.is_empty()
            && self.creative.is_empty()
            && self.other.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticalPreferences {
    #[serde(default)]
    pub accommodation_type: AccommodationType,
    #[serde(default)]
    pub family_location: Option<FamilyLocation>,
    #[serde(default)]
    pub scholarship_interest: bool,
    #[serde(default)]
    pub scholarship_types: BTreeSet<String>,
    #[serde(default)]
    pub bursary_interest: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccommodationType {
    #[serde(alias = "day_pupil")]
    Day,
    #[serde(alias = "full_boarding", alias = "weekly_boarding")]
    Boarding,
    #[serde(alias = "flexi_boarding")]
    Flexi,
    #[default]
    Unsure,
}

impl AccommodationType {
    pub const VARIANTS: &'static [&'static str] = &["day", "boarding", "flexi", "unsure"];

    pub const fn as_str(self) -> &'static str {
        match self {
            AccommodationType::Day => "day",
            AccommodationType::Boarding => "boarding",
            AccommodationType::Flexi => "flexi",
            AccommodationType::Unsure => "unsure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyLocation {
    Local,
    Uk,
    International,
}

impl FamilyLocation {
    pub const VARIANTS: &'static [&'static str] = &["local", "uk", "international"];

    pub const fn as_str(self) -> &'static str {
        match self {
            FamilyLocation::Local => "local",
            FamilyLocation::Uk => "uk",
            FamilyLocation::International => "international",
        }
    }
}

/// Career and qualification aspirations, captured only for sixth-form entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Futures {
    #[serde(default)]
    pub career_areas: Vec<String>,
    #[serde(default)]
    pub qualification_preference: QualificationPreference,
    #[serde(default)]
    pub university_aspiration: Option<String>,
}

impl Futures {
    pub fn primary_career(&self) -> Option<&str> {
        self.career_areas.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationPreference {
    #[serde(alias = "a_levels")]
    ALevel,
    Ib,
    #[default]
    Undecided,
}

impl QualificationPreference {
    pub const VARIANTS: &'static [&'static str] = &["a_level", "ib", "undecided"];

    pub const fn as_str(self) -> &'static str {
        match self {
            QualificationPreference::ALevel => "a_level",
            QualificationPreference::Ib => "ib",
            QualificationPreference::Undecided => "undecided",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentContact {
    #[serde(default)]
    pub title: Option<String>,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    #[serde(default)]
    pub relationship: Option<String>,
}
