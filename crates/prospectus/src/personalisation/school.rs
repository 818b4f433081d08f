use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::cosmetic::HouseOption;
use super::profile::FamilyProfile;
use super::registry::{ModuleId, ModuleMeta, RegistryError, SectionRegistry};
use super::resolver::{resolve_visibility, VisibilityResult};
use super::rules::{PredicateError, Rule, RuleSet};

const BUILTIN_SCHOOLS: &[&str] = &[
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/schools/clc.json")),
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/schools/brighton-college.json")),
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/schools/strathallan.json")),
];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchoolId(String);

impl SchoolId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchoolId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchoolConfigError {
    #[error("school configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unable to read school configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("school '{school}': {source}")]
    Registry {
        school: SchoolId,
        #[source]
        source: RegistryError,
    },
    #[error("school '{school}' has a rule for '{module}', which is not in its section registry")]
    RegistryGap { school: SchoolId, module: ModuleId },
    #[error("school '{school}' marks '{module}' mandatory but also gates it with a rule")]
    MandatoryModuleGated { school: SchoolId, module: ModuleId },
    #[error("school '{school}' rule for '{module}' is invalid: {source}")]
    InvalidRule {
        school: SchoolId,
        module: ModuleId,
        #[source]
        source: PredicateError,
    },
    #[error("school '{0}' is configured more than once")]
    DuplicateSchool(SchoolId),
}

/// On-disk shape of a school document.
#[derive(Debug, Deserialize)]
struct SchoolDocument {
    id: SchoolId,
    name: String,
    #[serde(default)]
    short_name: Option<String>,
    modules: Vec<ModuleMeta>,
    tour: Vec<ModuleId>,
    #[serde(default)]
    rules: RuleSet,
    #[serde(default)]
    houses: Vec<HouseOption>,
}

/// Registry, rules and cosmetic options for one school, checked for consistency at load.
#[derive(Debug, Clone)]
pub struct SchoolConfig {
    id: SchoolId,
    name: String,
    short_name: String,
    registry: SectionRegistry,
    rules: RuleSet,
    houses: Vec<HouseOption>,
}

impl SchoolConfig {
    pub fn new(
        id: SchoolId,
        name: impl Into<String>,
        registry: SectionRegistry,
        rules: RuleSet,
        houses: Vec<HouseOption>,
    ) -> Result<Self, SchoolConfigError> {
        let name = name.into();
        let config = Self {
            short_name: name.clone(),
            id,
            name,
            registry,
            rules,
            houses,
        };
        config.check()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, SchoolConfigError> {
        let document: SchoolDocument = serde_json::from_str(raw)?;
        let registry = SectionRegistry::new(document.modules, document.tour).map_err(|source| {
            SchoolConfigError::Registry {
                school: document.id.clone(),
                source,
            }
        })?;

        let config = Self {
            short_name: document.short_name.unwrap_or_else(|| document.name.clone()),
            id: document.id,
            name: document.name,
            registry,
            rules: document.rules,
            houses: document.houses,
        };
        config.check()?;
        Ok(config)
    }

    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = short_name.into();
        self
    }

    fn check(&self) -> Result<(), SchoolConfigError> {
        for (module, rule) in self.rules.iter() {
            let Some(meta) = self.registry.module_meta(module.as_str()) else {
                return Err(SchoolConfigError::RegistryGap {
                    school: self.id.clone(),
                    module: module.clone(),
                });
            };
            if meta.mandatory {
                return Err(SchoolConfigError::MandatoryModuleGated {
                    school: self.id.clone(),
                    module: module.clone(),
                });
            }
            if let Rule::When(predicate) = rule {
                predicate
                    .type_check()
                    .map_err(|source| SchoolConfigError::InvalidRule {
                        school: self.id.clone(),
                        module: module.clone(),
                        source,
                    })?;
            }
        }
        Ok(())
    }

    pub fn id(&self) -> &SchoolId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn houses(&self) -> &[HouseOption] {
        &self.houses
    }

    pub fn resolve(&self, profile: &FamilyProfile) -> VisibilityResult {
        resolve_visibility(profile, &self.rules, &self.registry)
    }

    pub fn summary(&self) -> SchoolSummary {
        SchoolSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            short_name: self.short_name.clone(),
            modules: self.registry.len(),
            tour: self.registry.canonical_tour().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolSummary {
    pub id: SchoolId,
    pub name: String,
    pub short_name: String,
    pub modules: usize,
    pub tour: Vec<ModuleId>,
}

/// Every school the service can personalise for.
#[derive(Debug, Clone, Default)]
pub struct SchoolCatalog {
    schools: BTreeMap<SchoolId, Arc<SchoolConfig>>,
}

impl SchoolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schools shipped with the crate.
    pub fn builtin() -> Result<Self, SchoolConfigError> {
        let mut catalog = Self::new();
        for raw in BUILTIN_SCHOOLS {
            catalog.insert(SchoolConfig::from_json(raw)?)?;
        }
        Ok(catalog)
    }

    /// Load every `*.json` document in `dir`, in file-name order.
    pub fn load_dir(dir: &Path) -> Result<Self, SchoolConfigError> {
        let io_error = |source: std::io::Error| SchoolConfigError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut catalog = Self::new();
        for path in paths {
            let raw = fs::read_to_string(&path).map_err(|source| SchoolConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let school = SchoolConfig::from_json(&raw)?;
            info!(school = %school.id(), path = %path.display(), "loaded school configuration");
            catalog.insert(school)?;
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, school: SchoolConfig) -> Result<(), SchoolConfigError> {
        if self.schools.contains_key(school.id()) {
            return Err(SchoolConfigError::DuplicateSchool(school.id().clone()));
        }
        self.schools.insert(school.id().clone(), Arc::new(school));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<SchoolConfig>> {
        self.schools.get(&SchoolId::from(id)).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SchoolId> {
        self.schools.keys()
    }

    pub fn schools(&self) -> impl Iterator<Item = &Arc<SchoolConfig>> {
        self.schools.values()
    }

    pub fn len(&self) -> usize {
        self.schools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schools.is_empty()
    }
}
