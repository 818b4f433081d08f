use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::profile::FamilyProfile;
use super::registry::{ModuleId, SectionRegistry};
use super::rules::RuleSet;

/// Outcome of resolving one profile against one school's rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityResult {
    pub visible: BTreeSet<ModuleId>,
    pub hidden: BTreeSet<ModuleId>,
    /// Modules hidden because their rule could not be evaluated.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub failed: BTreeSet<ModuleId>,
    pub display_order: Vec<ModuleId>,
    pub tour: Vec<ModuleId>,
}

impl VisibilityResult {
    pub fn is_visible(&self, id: &str) -> bool {
        self.visible.contains(id)
    }
}

/// Partition every registered module into visible and hidden for `profile`.
///
/// A module without a rule is visible. A rule that fails to evaluate hides its module and is
/// reported through `failed`.
pub fn resolve_visibility(
    profile: &FamilyProfile,
    rules: &RuleSet,
    registry: &SectionRegistry,
) -> VisibilityResult {
    let mut visible = BTreeSet::new();
    let mut hidden = BTreeSet::new();
    let mut failed = BTreeSet::new();

    for id in registry.module_ids() {
        let shown = match rules.get(id.as_str()) {
            None => true,
            Some(rule) => match rule.evaluate(profile) {
                Ok(result) => result,
                Err(err) => {
                    warn!(
                        module = %id,
                        field = err.field_path().unwrap_or("-"),
                        error = %err,
                        "visibility rule failed; hiding module"
                    );
                    failed.insert(id.clone());
                    false
                }
            },
        };

        if shown {
            visible.insert(id.clone());
        } else {
            hidden.insert(id.clone());
        }
    }

    let display_order = registry
        .by_default_order()
        .into_iter()
        .filter(|meta| visible.contains(&meta.id))
        .map(|meta| meta.id.clone())
        .collect();
    let tour = tour_sequence(registry, &visible);

    debug!(
        visible = visible.len(),
        hidden = hidden.len(),
        failed = failed.len(),
        "resolved module visibility"
    );

    VisibilityResult {
        visible,
        hidden,
        failed,
        display_order,
        tour,
    }
}

/// Order visible modules for the guided tour.
///
/// Canonical tour entries come first, then any other visible module in default order. The
/// mandatory modules stand in when nothing else is visible so the tour is never empty.
pub fn tour_sequence(registry: &SectionRegistry, visible: &BTreeSet<ModuleId>) -> Vec<ModuleId> {
    let mut tour: Vec<ModuleId> = registry
        .canonical_tour()
        .iter()
        .filter(|id| visible.contains(*id))
        .cloned()
        .collect();

    for meta in registry.by_default_order() {
        if visible.contains(&meta.id) && !tour.contains(&meta.id) {
            tour.push(meta.id.clone());
        }
    }

    if tour.is_empty() {
        return registry.mandatory_modules();
    }
    tour
}
