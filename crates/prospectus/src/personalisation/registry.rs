use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a prospectus module (`sixth_form`, `boarding_life`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-facing spelling of the id: `drama_dance` becomes `drama dance`.
    pub fn humanised(&self) -> String {
        self.0.replace('_', " ")
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ModuleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Static metadata describing one prospectus module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMeta {
    pub id: ModuleId,
    pub title: String,
    #[serde(default, alias = "intro")]
    pub narration_intro: String,
    pub default_order: u32,
    #[serde(default)]
    pub follow_up: Vec<ModuleId>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ModuleContent>,
}

/// Display content for a module, as handed to the presentation layer and the narrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleContent {
    pub title: String,
    #[serde(default)]
    pub paragraphs: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub stats: Vec<Stat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub number: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("module '{0}' is registered more than once")]
    DuplicateModule(ModuleId),
    #[error("tour references unknown module '{0}'")]
    UnknownTourModule(ModuleId),
    #[error("module '{0}' appears more than once in the tour")]
    DuplicateTourEntry(ModuleId),
    #[error("module '{module}' suggests unknown follow-up '{follow_up}'")]
    UnknownFollowUp { module: ModuleId, follow_up: ModuleId },
    #[error("registry has no mandatory module, so a tour could end up empty")]
    NoMandatoryModules,
}

/// Every module a school offers plus its canonical tour order.
#[derive(Debug, Clone)]
pub struct SectionRegistry {
    modules: BTreeMap<ModuleId, ModuleMeta>,
    tour: Vec<ModuleId>,
}

impl SectionRegistry {
    pub fn new(modules: Vec<ModuleMeta>, tour: Vec<ModuleId>) -> Result<Self, RegistryError> {
        let mut by_id = BTreeMap::new();
        for meta in modules {
            if by_id.contains_key(&meta.id) {
                return Err(RegistryError::DuplicateModule(meta.id));
            }
            by_id.insert(meta.id.clone(), meta);
        }

        let mut seen = BTreeSet::new();
        for id in &tour {
            if !by_id.contains_key(id) {
                return Err(RegistryError::UnknownTourModule(id.clone()));
            }
            if !seen.insert(id) {
                return Err(RegistryError::DuplicateTourEntry(id.clone()));
            }
        }

        for meta in by_id.values() {
            if let Some(missing) = meta.follow_up.iter().find(|id| !by_id.contains_key(*id)) {
                return Err(RegistryError::UnknownFollowUp {
                    module: meta.id.clone(),
                    follow_up: missing.clone(),
                });
            }
        }

        if !by_id.values().any(|meta| meta.mandatory) {
            return Err(RegistryError::NoMandatoryModules);
        }

        Ok(Self {
            modules: by_id,
            tour,
        })
    }

    pub fn module_meta(&self, id: &str) -> Option<&ModuleMeta> {
        self.modules.get(id)
    }

    /// Configured content for a module, or a title-plus-intro card when none is configured.
    pub fn module_content(&self, id: &str) -> Option<ModuleContent> {
        let meta = self.modules.get(id)?;
        Some(meta.content.clone().unwrap_or_else(|| ModuleContent {
            title: meta.title.clone(),
            paragraphs: if meta.narration_intro.is_empty() {
                Vec::new()
            } else {
                vec![meta.narration_intro.clone()]
            },
            highlights: Vec::new(),
            stats: Vec::new(),
        }))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn canonical_tour(&self) -> &[ModuleId] {
        &self.tour
    }

    /// All modules sorted by `(default_order, id)`.
    pub fn by_default_order(&self) -> Vec<&ModuleMeta> {
        let mut modules: Vec<&ModuleMeta> = self.modules.values().collect();
        modules.sort_by(|a, b| (a.default_order, &a.id).cmp(&(b.default_order, &b.id)));
        modules
    }

    /// Mandatory modules: canonical tour order first, then default order.
    pub fn mandatory_modules(&self) -> Vec<ModuleId> {
        let mut ordered: Vec<ModuleId> = self
            .tour
            .iter()
            .filter(|id| self.modules.get(*id).is_some_and(|meta| meta.mandatory))
            .cloned()
            .collect();

        for meta in self.by_default_order() {
            if meta.mandatory && !ordered.contains(&meta.id) {
                ordered.push(meta.id.clone());
            }
        }
        ordered
    }

    /// Best module for a free-text question such as "tell me about the rugby teams".
    ///
    /// Matching is case-insensitive on whole words of the configured keywords and the humanised
    /// module id; the longest match wins and ties go to the module that comes first in default
    /// order.
    pub fn section_for_query(&self, query: &str) -> Option<&ModuleMeta> {
        let query = query.to_lowercase();
        if query.trim().is_empty() {
            return None;
        }

        let mut best: Option<(usize, &ModuleMeta)> = None;
        for meta in self.by_default_order() {
            let longest = meta
                .keywords
                .iter()
                .map(|keyword| keyword.to_lowercase())
                .chain(std::iter::once(meta.id.humanised()))
                .filter(|keyword| contains_phrase(&query, keyword))
                .map(|keyword| keyword.len())
                .max();

            if let Some(length) = longest {
                if best.map_or(true, |(current, _)| length > current) {
                    best = Some((length, meta));
                }
            }
        }
        best.map(|(_, meta)| meta)
    }

    /// Suggested next topics for `id`, restricted to modules the family can see.
    pub fn follow_up_for(&self, id: &str, visible: &BTreeSet<ModuleId>) -> Vec<ModuleId> {
        self.modules
            .get(id)
            .map(|meta| {
                meta.follow_up
                    .iter()
                    .filter(|candidate| visible.contains(*candidate))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// True when `phrase` occurs in `text` with no letter or digit directly on either side.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    text.match_indices(phrase).any(|(start, matched)| {
        let before = text[..start].chars().next_back();
        let after = text[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
