use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::profile::{
    AccommodationType, ChildDetails, EntryDetails, EntryPoint, FamilyLocation, FamilyProfile,
    Futures, Gender, Interests, ParentContact, PracticalPreferences, QualificationPreference,
};

const MAX_PARENTS: usize = 2;

/// Field-level problem found while turning a raw form submission into a [`FamilyProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{field}: {kind}")]
pub struct ValidationError {
    pub field: String,
    #[serde(flatten)]
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    fn new(field: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationErrorKind {
    #[error("this field is required")]
    Missing,
    #[error("expected {expected}")]
    WrongType { expected: &'static str },
    #[error("'{value}' is not one of: {}", .allowed.join(", "))]
    NotAllowed {
        value: String,
        allowed: &'static [&'static str],
    },
    #[error("at most {max} entries are accepted")]
    TooMany { max: usize },
    #[error("'{value}' is not a valid email address")]
    InvalidEmail { value: String },
    #[error("'{value}' is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate { value: String },
}

/// Validate an untyped enquiry-form submission.
///
/// Every problem is collected so the form layer can flag all offending fields at once.
pub fn validate_profile(raw: &Value) -> Result<FamilyProfile, Vec<ValidationError>> {
    let Some(root) = raw.as_object() else {
        return Err(vec![ValidationError::new(
            "$",
            ValidationErrorKind::WrongType { expected: "object" },
        )]);
    };

    let mut form = FormReader::default();
    let top = Section::root(root);

    let child = form.section(&top, "child");
    let first_name = form.required_text(&child, "first_name");
    let child = ChildDetails {
        first_name: String::new(),
        surname: form.text(&child, "surname"),
        gender: form
            .choice::<Gender>(&child, "gender", Gender::VARIANTS)
            .unwrap_or_default(),
        date_of_birth: form.date(&child, "date_of_birth"),
        current_school: form.text(&child, "current_school"),
        current_year: form.text(&child, "current_year"),
    };

    let entry = form.section(&top, "entry");
    let point = form.entry_point(&entry, "point");
    let entry_year = form.text(&entry, "year");

    let interests = form.section(&top, "interests");
    let interests = Interests {
        academic: form.tags(&interests, "academic"),
        sports: form.tags(&interests, "sports"),
        creative: form.tags(&interests, "creative"),
        other: form.tags(&interests, "other"),
    };

    let practical = form.section(&top, "practical");
    let practical = PracticalPreferences {
        accommodation_type: form
            .choice::<AccommodationType>(
                &practical,
                "accommodation_type",
                AccommodationType::VARIANTS,
            )
            .unwrap_or_default(),
        family_location: form.choice::<FamilyLocation>(
            &practical,
            "family_location",
            FamilyLocation::VARIANTS,
        ),
        scholarship_interest: form.flag(&practical, "scholarship_interest"),
        scholarship_types: form.tags(&practical, "scholarship_types"),
        bursary_interest: form.flag(&practical, "bursary_interest"),
    };

    let futures_section = form.section(&top, "futures");
    let futures = Futures {
        career_areas: form.list(&futures_section, "career_areas"),
        qualification_preference: form
            .choice::<QualificationPreference>(
                &futures_section,
                "qualification_preference",
                QualificationPreference::VARIANTS,
            )
            .unwrap_or_default(),
        university_aspiration: form.text(&futures_section, "university_aspiration"),
    };

    let parents = form.parents(&top);

    let (Some(first_name), Some(point)) = (first_name, point) else {
        return Err(form.errors);
    };
    if !form.errors.is_empty() {
        return Err(form.errors);
    }

    let futures = point.is_sixth_form().then_some(futures);

    Ok(FamilyProfile {
        child: ChildDetails { first_name, ..child },
        entry: EntryDetails {
            point,
            year: entry_year,
        },
        interests,
        practical,
        futures,
        parents,
    })
}

/// A nested object of the submission together with its dotted path.
struct Section<'a> {
    path: String,
    fields: Option<&'a Map<String, Value>>,
}

impl<'a> Section<'a> {
    fn root(fields: &'a Map<String, Value>) -> Self {
        Self {
            path: String::new(),
            fields: Some(fields),
        }
    }

    fn field_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields
            .and_then(|fields| fields.get(key))
            .filter(|value| !value.is_null())
    }
}

#[derive(Default)]
struct FormReader {
    errors: Vec<ValidationError>,
}

impl FormReader {
    fn reject(&mut self, field: String, kind: ValidationErrorKind) {
        self.errors.push(ValidationError::new(field, kind));
    }

    fn section<'a>(&mut self, parent: &Section<'a>, key: &str) -> Section<'a> {
        let path = parent.field_path(key);
        let fields = match parent.get(key) {
            None => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                self.reject(path.clone(), ValidationErrorKind::WrongType { expected: "object" });
                None
            }
        };
        Section { path, fields }
    }

    fn text(&mut self, section: &Section<'_>, key: &str) -> Option<String> {
        match section.get(key)? {
            Value::String(raw) => {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(number) => Some(number.to_string()),
            _ => {
                self.reject(
                    section.field_path(key),
                    ValidationErrorKind::WrongType { expected: "string" },
                );
                None
            }
        }
    }

    fn required_text(&mut self, section: &Section<'_>, key: &str) -> Option<String> {
        let before = self.errors.len();
        let value = self.text(section, key);
        if value.is_none() && self.errors.len() == before {
            self.reject(section.field_path(key), ValidationErrorKind::Missing);
        }
        value
    }

    /// Required entry point; a value with nothing left after normalising counts as missing.
    fn entry_point(&mut self, section: &Section<'_>, key: &str) -> Option<EntryPoint> {
        let point = EntryPoint::new(&self.required_text(section, key)?);
        if point.as_str().is_empty() {
            self.reject(section.field_path(key), ValidationErrorKind::Missing);
            return None;
        }
        Some(point)
    }

    fn choice<T: DeserializeOwned>(
        &mut self,
        section: &Section<'_>,
        key: &str,
        allowed: &'static [&'static str],
    ) -> Option<T> {
        let raw = self.text(section, key)?;
        let normalised = raw.to_ascii_lowercase().replace([' ', '-'], "_");
        match serde_json::from_value::<T>(Value::String(normalised)) {
            Ok(value) => Some(value),
            Err(_) => {
                self.reject(
                    section.field_path(key),
                    ValidationErrorKind::NotAllowed {
                        value: raw,
                        allowed,
                    },
                );
                None
            }
        }
    }

    /// Checkbox-style flag: booleans, "yes"/"no" strings, or a checkbox group containing "yes".
    fn flag(&mut self, section: &Section<'_>, key: &str) -> bool {
        match section.get(key) {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_i64().is_some_and(|value| value != 0),
            Some(Value::String(raw)) => is_affirmative(raw),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .any(is_affirmative),
            Some(_) => {
                self.reject(
                    section.field_path(key),
                    ValidationErrorKind::WrongType { expected: "boolean" },
                );
                false
            }
        }
    }

    fn list(&mut self, section: &Section<'_>, key: &str) -> Vec<String> {
        let items: Vec<&Value> = match section.get(key) {
            None => return Vec::new(),
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single @ Value::String(_)) => vec![single],
            Some(_) => {
                self.reject(
                    section.field_path(key),
                    ValidationErrorKind::WrongType {
                        expected: "list of strings",
                    },
                );
                return Vec::new();
            }
        };

        let mut seen = BTreeSet::new();
        let mut values = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                Value::String(raw) => {
                    let tag = raw.trim();
                    if !tag.is_empty() && seen.insert(tag.to_string()) {
                        values.push(tag.to_string());
                    }
                }
                Value::Null => {}
                _ => self.reject(
                    format!("{}[{index}]", section.field_path(key)),
                    ValidationErrorKind::WrongType { expected: "string" },
                ),
            }
        }
        values
    }

    fn tags(&mut self, section: &Section<'_>, key: &str) -> BTreeSet<String> {
        self.list(section, key).into_iter().collect()
    }

    fn date(&mut self, section: &Section<'_>, key: &str) -> Option<NaiveDate> {
        let raw = self.text(section, key)?;
        match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.reject(
                    section.field_path(key),
                    ValidationErrorKind::InvalidDate { value: raw },
                );
                None
            }
        }
    }

    fn parents(&mut self, top: &Section<'_>) -> Vec<ParentContact> {
        let raw: Vec<(String, &Value)> = match top.get("parents") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| (format!("parents[{index}]"), item))
                .collect(),
            Some(_) => {
                self.reject(
                    "parents".to_string(),
                    ValidationErrorKind::WrongType { expected: "list" },
                );
                return Vec::new();
            }
            // Older form variants submit `parent` and `second_parent` objects.
            None => ["parent", "second_parent"]
                .into_iter()
                .filter_map(|key| top.get(key).map(|value| (key.to_string(), value)))
                .collect(),
        };

        if raw.len() > MAX_PARENTS {
            self.reject(
                "parents".to_string(),
                ValidationErrorKind::TooMany { max: MAX_PARENTS },
            );
            return Vec::new();
        }

        raw.into_iter()
            .filter_map(|(path, value)| self.parent(path, value))
            .collect()
    }

    fn parent(&mut self, path: String, value: &Value) -> Option<ParentContact> {
        let Value::Object(fields) = value else {
            self.reject(path, ValidationErrorKind::WrongType { expected: "object" });
            return None;
        };

        let section = Section {
            path,
            fields: Some(fields),
        };
        let first_name = self.required_text(&section, "first_name");
        let surname = self.required_text(&section, "surname");
        let email = self.required_text(&section, "email");

        if let Some(email) = &email {
            if !looks_like_email(email) {
                self.reject(
                    section.field_path("email"),
                    ValidationErrorKind::InvalidEmail {
                        value: email.clone(),
                    },
                );
                return None;
            }
        }

        Some(ParentContact {
            title: self.text(&section, "title"),
            first_name: first_name?,
            surname: surname?,
            email: email?,
            relationship: self.text(&section, "relationship"),
        })
    }
}

fn is_affirmative(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "on" | "1"
    )
}

fn looks_like_email(raw: &str) -> bool {
    match raw.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}
