//! Profile-driven module visibility: the pure core of the prospectus engine.
//!
//! A [`FamilyProfile`] is validated once per submission, then resolved against a school's
//! [`RuleSet`] and [`SectionRegistry`] into a [`VisibilityResult`]. Nothing here performs I/O
//! or keeps state between calls.

mod cosmetic;
mod profile;
mod registry;
mod resolver;
mod rules;
mod school;
mod validation;

pub use cosmetic::{eligible_houses, seed_for, seeded_suggestion, suggest_house, HouseOption};
pub use profile::{
    AccommodationType, ChildDetails, EntryDetails, EntryPoint, FamilyLocation, FamilyProfile,
    Futures, Gender, Interests, ParentContact, PracticalPreferences, Pronouns,
    QualificationPreference,
};
pub use registry::{
    ModuleContent, ModuleId, ModuleMeta, RegistryError, SectionRegistry, Stat,
};
pub use resolver::{resolve_visibility, tour_sequence, VisibilityResult};
pub use rules::{
    Field, FieldKind, FieldValue, Predicate, PredicateError, PredicateFn, Rule, RuleSet,
};
pub use school::{SchoolCatalog, SchoolConfig, SchoolConfigError, SchoolId, SchoolSummary};
pub use validation::{validate_profile, ValidationError, ValidationErrorKind};

#[cfg(test)]
mod tests;
