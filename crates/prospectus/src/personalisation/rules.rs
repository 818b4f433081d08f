use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::profile::FamilyProfile;
use super::registry::ModuleId;

/// Profile field a predicate can inspect, addressed by its dotted path in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "child.gender")]
    ChildGender,
    #[serde(rename = "child.current_school")]
    ChildCurrentSchool,
    #[serde(rename = "entry.point")]
    EntryPoint,
    #[serde(rename = "entry.year_group")]
    EntryYearGroup,
    #[serde(rename = "entry.year")]
    EntryYear,
    #[serde(rename = "interests.academic")]
    InterestsAcademic,
    #[serde(rename = "interests.sports")]
    InterestsSports,
    #[serde(rename = "interests.creative")]
    InterestsCreative,
    #[serde(rename = "interests.other")]
    InterestsOther,
    #[serde(rename = "interests.any")]
    InterestsAny,
    #[serde(rename = "practical.accommodation_type")]
    AccommodationType,
    #[serde(rename = "practical.family_location")]
    FamilyLocation,
    #[serde(rename = "practical.scholarship_interest")]
    ScholarshipInterest,
    #[serde(rename = "practical.scholarship_types")]
    ScholarshipTypes,
    #[serde(rename = "practical.bursary_interest")]
    BursaryInterest,
    #[serde(rename = "futures.career_areas")]
    CareerAreas,
    #[serde(rename = "futures.primary_career")]
    PrimaryCareer,
    #[serde(rename = "futures.qualification_preference")]
    QualificationPreference,
    #[serde(rename = "futures.university_aspiration")]
    UniversityAspiration,
}

impl Field {
    pub const fn path(self) -> &'static str {
        match self {
            Field::ChildGender => "child.gender",
            Field::ChildCurrentSchool => "child.current_school",
            Field::EntryPoint => "entry.point",
            Field::EntryYearGroup => "entry.year_group",
            Field::EntryYear => "entry.year",
            Field::InterestsAcademic => "interests.academic",
            Field::InterestsSports => "interests.sports",
            Field::InterestsCreative => "interests.creative",
            Field::InterestsOther => "interests.other",
            Field::InterestsAny => "interests.any",
            Field::AccommodationType => "practical.accommodation_type",
            Field::FamilyLocation => "practical.family_location",
            Field::ScholarshipInterest => "practical.scholarship_interest",
            Field::ScholarshipTypes => "practical.scholarship_types",
            Field::BursaryInterest => "practical.bursary_interest",
            Field::CareerAreas => "futures.career_areas",
            Field::PrimaryCareer => "futures.primary_career",
            Field::QualificationPreference => "futures.qualification_preference",
            Field::UniversityAspiration => "futures.university_aspiration",
        }
    }

    pub const fn kind(self) -> FieldKind {
        match self {
            Field::ChildGender
            | Field::ChildCurrentSchool
            | Field::EntryPoint
            | Field::EntryYear
            | Field::AccommodationType
            | Field::FamilyLocation
            | Field::PrimaryCareer
            | Field::QualificationPreference
            | Field::UniversityAspiration => FieldKind::Text,
            Field::EntryYearGroup => FieldKind::Number,
            Field::ScholarshipInterest | Field::BursaryInterest => FieldKind::Flag,
            Field::InterestsAcademic
            | Field::InterestsSports
            | Field::InterestsCreative
            | Field::InterestsOther
            | Field::InterestsAny
            | Field::ScholarshipTypes
            | Field::CareerAreas => FieldKind::Tags,
        }
    }

    /// Read the field from a profile. Optional data that is absent yields [`FieldValue::Missing`].
    pub fn read(self, profile: &FamilyProfile) -> FieldValue<'_> {
        let futures = profile.futures.as_ref();
        match self {
            Field::ChildGender => FieldValue::Text(profile.child.gender.as_str()),
            Field::ChildCurrentSchool => text_or_missing(profile.child.current_school.as_deref()),
            Field::EntryPoint => FieldValue::Text(profile.entry.point.as_str()),
            Field::EntryYearGroup => profile
                .entry
                .point
                .year_group()
                .map_or(FieldValue::Missing, FieldValue::Number),
            Field::EntryYear => text_or_missing(profile.entry.year.as_deref()),
            Field::InterestsAcademic => tags(&profile.interests.academic),
            Field::InterestsSports => tags(&profile.interests.sports),
            Field::InterestsCreative => tags(&profile.interests.creative),
            Field::InterestsOther => tags(&profile.interests.other),
            Field::InterestsAny => FieldValue::Tags(profile.interests.all().into_iter().collect()),
            Field::AccommodationType => {
                FieldValue::Text(profile.practical.accommodation_type.as_str())
            }
            Field::FamilyLocation => profile
                .practical
                .family_location
                .map_or(FieldValue::Missing, |location| {
                    FieldValue::Text(location.as_str())
                }),
            Field::ScholarshipInterest => FieldValue::Flag(profile.practical.scholarship_interest),
            Field::ScholarshipTypes => tags(&profile.practical.scholarship_types),
            Field::BursaryInterest => FieldValue::Flag(profile.practical.bursary_interest),
            Field::CareerAreas => futures.map_or(FieldValue::Missing, |futures| {
                tags(&futures.career_areas)
            }),
            Field::PrimaryCareer => text_or_missing(futures.and_then(|f| f.primary_career())),
            Field::QualificationPreference => futures.map_or(FieldValue::Missing, |futures| {
                FieldValue::Text(futures.qualification_preference.as_str())
            }),
            Field::UniversityAspiration => {
                text_or_missing(futures.and_then(|f| f.university_aspiration.as_deref()))
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

fn text_or_missing(value: Option<&str>) -> FieldValue<'_> {
    value.map_or(FieldValue::Missing, FieldValue::Text)
}

fn tags<'a, I>(values: I) -> FieldValue<'a>
where
    I: IntoIterator<Item = &'a String>,
{
    FieldValue::Tags(values.into_iter().map(String::as_str).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Flag,
    Number,
    Tags,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldKind::Text => "text",
            FieldKind::Flag => "flag",
            FieldKind::Number => "number",
            FieldKind::Tags => "tags",
        };
        f.write_str(label)
    }
}

/// Borrowed view of a profile field used during predicate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Missing,
    Text(&'a str),
    Flag(bool),
    Number(u8),
    Tags(Vec<&'a str>),
}

/// Declarative visibility condition over a [`FamilyProfile`].
///
/// Predicates are data: per-school rule tables are written as JSON and deserialised into this
/// type. Evaluation never mutates the profile and depends on nothing but its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Equals {
        field: Field,
        value: String,
    },
    OneOf {
        field: Field,
        values: Vec<String>,
    },
    Contains {
        field: Field,
        value: String,
    },
    ContainsAny {
        field: Field,
        values: Vec<String>,
    },
    NonEmpty {
        field: Field,
    },
    IsTrue {
        field: Field,
    },
    Present {
        field: Field,
    },
    InRange {
        field: Field,
        #[serde(default)]
        min: Option<u8>,
        #[serde(default)]
        max: Option<u8>,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn equals(field: Field, value: impl Into<String>) -> Self {
        Predicate::Equals {
            field,
            value: value.into(),
        }
    }

    pub fn one_of<I, S>(field: Field, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::OneOf {
            field,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(field: Field, value: impl Into<String>) -> Self {
        Predicate::Contains {
            field,
            value: value.into(),
        }
    }

    pub fn non_empty(field: Field) -> Self {
        Predicate::NonEmpty { field }
    }

    pub fn is_true(field: Field) -> Self {
        Predicate::IsTrue { field }
    }

    pub fn in_range(field: Field, min: Option<u8>, max: Option<u8>) -> Self {
        Predicate::InRange { field, min, max }
    }

    pub fn negate(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    pub fn evaluate(&self, profile: &FamilyProfile) -> Result<bool, PredicateError> {
        match self {
            Predicate::Equals { field, value } => {
                matches_literal(*field, &field.read(profile), value)
            }
            Predicate::OneOf { field, values } => {
                let current = field.read(profile);
                for value in values {
                    if matches_literal(*field, &current, value)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Contains { field, value } => match field.read(profile) {
                FieldValue::Missing => Ok(false),
                FieldValue::Tags(tags) => Ok(tags.contains(&value.as_str())),
                other => Err(mismatch(*field, FieldKind::Tags, &other)),
            },
            Predicate::ContainsAny { field, values } => match field.read(profile) {
                FieldValue::Missing => Ok(false),
                FieldValue::Tags(tags) => Ok(values.iter().any(|value| tags.contains(&value.as_str()))),
                other => Err(mismatch(*field, FieldKind::Tags, &other)),
            },
            Predicate::NonEmpty { field } => match field.read(profile) {
                FieldValue::Missing => Ok(false),
                FieldValue::Tags(tags) => Ok(!tags.is_empty()),
                FieldValue::Text(text) => Ok(!text.is_empty()),
                other => Err(mismatch(*field, FieldKind::Tags, &other)),
            },
            Predicate::IsTrue { field } => match field.read(profile) {
                FieldValue::Missing => Ok(false),
                FieldValue::Flag(flag) => Ok(flag),
                other => Err(mismatch(*field, FieldKind::Flag, &other)),
            },
            Predicate::Present { field } => Ok(field.read(profile) != FieldValue::Missing),
            Predicate::InRange { field, min, max } => match field.read(profile) {
                FieldValue::Number(number) => Ok(min.map_or(true, |min| number >= min)
                    && max.map_or(true, |max| number <= max)),
                FieldValue::Missing => Err(PredicateError::Unresolved { field: *field }),
                other => Err(mismatch(*field, FieldKind::Number, &other)),
            },
            Predicate::All(predicates) => {
                for predicate in predicates {
                    if !predicate.evaluate(profile)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any(predicates) => {
                for predicate in predicates {
                    if predicate.evaluate(profile)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(inner) => inner.evaluate(profile).map(|result| !result),
        }
    }

    /// Check operator/field compatibility and literal shapes without a profile.
    pub fn type_check(&self) -> Result<(), PredicateError> {
        match self {
            Predicate::Equals { field, value } => check_literal(*field, value),
            Predicate::OneOf { field, values } => {
                if values.is_empty() {
                    return Err(PredicateError::EmptyOperands { field: *field });
                }
                values.iter().try_for_each(|value| check_literal(*field, value))
            }
            Predicate::Contains { field, .. } => expect_kind(*field, &[FieldKind::Tags]),
            Predicate::ContainsAny { field, values } => {
                if values.is_empty() {
                    return Err(PredicateError::EmptyOperands { field: *field });
                }
                expect_kind(*field, &[FieldKind::Tags])
            }
            Predicate::NonEmpty { field } => {
                expect_kind(*field, &[FieldKind::Tags, FieldKind::Text])
            }
            Predicate::IsTrue { field } => expect_kind(*field, &[FieldKind::Flag]),
            Predicate::Present { .. } => Ok(()),
            Predicate::InRange { field, min, max } => {
                expect_kind(*field, &[FieldKind::Number])?;
                match (min, max) {
                    (Some(min), Some(max)) if min > max => Err(PredicateError::InvalidLiteral {
                        field: *field,
                        value: format!("{min}..={max}"),
                    }),
                    _ => Ok(()),
                }
            }
            Predicate::All(predicates) | Predicate::Any(predicates) => {
                predicates.iter().try_for_each(Predicate::type_check)
            }
            Predicate::Not(inner) => inner.type_check(),
        }
    }
}

fn matches_literal(
    field: Field,
    current: &FieldValue<'_>,
    literal: &str,
) -> Result<bool, PredicateError> {
    match current {
        FieldValue::Missing => Ok(false),
        FieldValue::Text(text) => Ok(*text == literal),
        FieldValue::Flag(flag) => parse_flag(field, literal).map(|expected| expected == *flag),
        FieldValue::Number(number) => parse_number(field, literal).map(|expected| expected == *number),
        other => Err(mismatch(field, FieldKind::Text, other)),
    }
}

fn check_literal(field: Field, literal: &str) -> Result<(), PredicateError> {
    match field.kind() {
        FieldKind::Text => Ok(()),
        FieldKind::Flag => parse_flag(field, literal).map(|_| ()),
        FieldKind::Number => parse_number(field, literal).map(|_| ()),
        FieldKind::Tags => Err(PredicateError::TypeMismatch {
            field,
            expected: FieldKind::Text,
            found: FieldKind::Tags,
        }),
    }
}

fn expect_kind(field: Field, accepted: &[FieldKind]) -> Result<(), PredicateError> {
    let found = field.kind();
    if accepted.contains(&found) {
        Ok(())
    } else {
        Err(PredicateError::TypeMismatch {
            field,
            expected: accepted[0],
            found,
        })
    }
}

fn parse_flag(field: Field, literal: &str) -> Result<bool, PredicateError> {
    match literal {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(PredicateError::InvalidLiteral {
            field,
            value: literal.to_string(),
        }),
    }
}

fn parse_number(field: Field, literal: &str) -> Result<u8, PredicateError> {
    literal
        .parse::<u8>()
        .map_err(|_| PredicateError::InvalidLiteral {
            field,
            value: literal.to_string(),
        })
}

fn mismatch(field: Field, expected: FieldKind, found: &FieldValue<'_>) -> PredicateError {
    let found = match found {
        FieldValue::Text(_) | FieldValue::Missing => FieldKind::Text,
        FieldValue::Flag(_) => FieldKind::Flag,
        FieldValue::Number(_) => FieldKind::Number,
        FieldValue::Tags(_) => FieldKind::Tags,
    };
    PredicateError::TypeMismatch {
        field,
        expected,
        found,
    }
}

/// Failure while evaluating or checking a rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredicateError {
    #[error("{field} is {found}, expected {expected}")]
    TypeMismatch {
        field: Field,
        expected: FieldKind,
        found: FieldKind,
    },
    #[error("{field} has no value to compare")]
    Unresolved { field: Field },
    #[error("'{value}' is not a valid literal for {field}")]
    InvalidLiteral { field: Field, value: String },
    #[error("{field} needs at least one value to compare against")]
    EmptyOperands { field: Field },
    #[error("rule '{rule}' failed: {message}")]
    Custom {
        rule: String,
        field: Option<String>,
        message: String,
    },
    #[error("rule '{rule}' panicked: {message}")]
    Panicked { rule: String, message: String },
}

impl PredicateError {
    /// Dotted path of the profile field the failure relates to, when known.
    pub fn field_path(&self) -> Option<&str> {
        match self {
            PredicateError::TypeMismatch { field, .. }
            | PredicateError::Unresolved { field }
            | PredicateError::InvalidLiteral { field, .. }
            | PredicateError::EmptyOperands { field } => Some(field.path()),
            PredicateError::Custom { field, .. } => field.as_deref(),
            PredicateError::Panicked { .. } => None,
        }
    }
}

pub type PredicateFn = dyn Fn(&FamilyProfile) -> Result<bool, PredicateError> + Send + Sync;

/// Visibility rule for one module.
#[derive(Clone)]
pub enum Rule {
    When(Predicate),
    Custom { name: String, check: Arc<PredicateFn> },
}

impl Rule {
    pub fn custom<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&FamilyProfile) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        Rule::Custom {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn evaluate(&self, profile: &FamilyProfile) -> Result<bool, PredicateError> {
        match self {
            Rule::When(predicate) => predicate.evaluate(profile),
            Rule::Custom { name, check } => catch_unwind(AssertUnwindSafe(|| check(profile)))
                .unwrap_or_else(|payload| {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|message| message.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    Err(PredicateError::Panicked {
                        rule: name.clone(),
                        message,
                    })
                }),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::When(predicate) => f.debug_tuple("When").field(predicate).finish(),
            Rule::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
        }
    }
}

impl From<Predicate> for Rule {
    fn from(value: Predicate) -> Self {
        Rule::When(value)
    }
}

/// Per-school table of module visibility rules. Modules without a rule are always visible.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "BTreeMap<ModuleId, Predicate>")]
pub struct RuleSet {
    rules: BTreeMap<ModuleId, Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: impl Into<ModuleId>, rule: impl Into<Rule>) -> &mut Self {
        self.rules.insert(module.into(), rule.into());
        self
    }

    pub fn with(mut self, module: impl Into<ModuleId>, rule: impl Into<Rule>) -> Self {
        self.insert(module, rule);
        self
    }

    pub fn get(&self, module: &str) -> Option<&Rule> {
        self.rules.get(module)
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.rules.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &Rule)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<BTreeMap<ModuleId, Predicate>> for RuleSet {
    fn from(value: BTreeMap<ModuleId, Predicate>) -> Self {
        Self {
            rules: value
                .into_iter()
                .map(|(module, predicate)| (module, Rule::When(predicate)))
                .collect(),
        }
    }
}
