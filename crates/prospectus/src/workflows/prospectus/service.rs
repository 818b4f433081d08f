use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use super::domain::{NarrationView, ProspectusId, ProspectusRecord, ProspectusView, SectionView};
use super::repository::{ProspectusRepository, RepositoryError};
use crate::narration::{FamilyContext, NarrationRequest, NarrationService};
use crate::personalisation::{
    seed_for, seeded_suggestion, validate_profile, FamilyProfile, ModuleMeta, SchoolCatalog,
    SchoolConfig, SchoolSummary, ValidationError,
};

/// Service composing the school catalog, prospectus storage and narration.
pub struct ProspectusService<R> {
    catalog: Arc<SchoolCatalog>,
    repository: Arc<R>,
    narration: NarrationService,
}

static PROSPECTUS_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_prospectus_id(profile: &FamilyProfile) -> ProspectusId {
    let sequence = PROSPECTUS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ProspectusId::for_family(profile, sequence)
}

impl<R> ProspectusService<R>
where
    R: ProspectusRepository + 'static,
{
    pub fn new(catalog: Arc<SchoolCatalog>, repository: Arc<R>, narration: NarrationService) -> Self {
        Self {
            catalog,
            repository,
            narration,
        }
    }

    pub fn catalog(&self) -> &SchoolCatalog {
        &self.catalog
    }

    pub fn schools(&self) -> Vec<SchoolSummary> {
        self.catalog.schools().map(|school| school.summary()).collect()
    }

    /// Validate a raw enquiry form, store it and return the personalised view.
    pub fn submit(
        &self,
        school_id: &str,
        raw: &Value,
    ) -> Result<ProspectusView, ProspectusServiceError> {
        let school = self.school(school_id)?;
        let profile = validate_profile(raw).map_err(ProspectusServiceError::Validation)?;

        let record = ProspectusRecord {
            prospectus_id: next_prospectus_id(&profile),
            school_id: school.id().clone(),
            profile,
            submitted_at: Utc::now(),
            revision: 1,
        };

        let stored = self.repository.insert(record)?;
        info!(
            prospectus_id = %stored.prospectus_id,
            school = %stored.school_id,
            "prospectus submitted"
        );
        Ok(render(&school, &stored))
    }

    /// Replace the stored profile with a fresh submission of the whole form.
    pub fn resubmit(
        &self,
        school_id: &str,
        prospectus_id: &ProspectusId,
        raw: &Value,
    ) -> Result<ProspectusView, ProspectusServiceError> {
        let school = self.school(school_id)?;
        let current = self.record(&school, prospectus_id)?;
        let profile = validate_profile(raw).map_err(ProspectusServiceError::Validation)?;

        let record = ProspectusRecord {
            profile,
            submitted_at: Utc::now(),
            revision: current.revision + 1,
            ..current
        };
        self.repository.replace(record.clone())?;

        info!(
            prospectus_id = %record.prospectus_id,
            revision = record.revision,
            "prospectus resubmitted"
        );
        Ok(render(&school, &record))
    }

    pub fn view(
        &self,
        school_id: &str,
        prospectus_id: &ProspectusId,
    ) -> Result<ProspectusView, ProspectusServiceError> {
        let school = self.school(school_id)?;
        let record = self.record(&school, prospectus_id)?;
        Ok(render(&school, &record))
    }

    /// Every section the school offers, in default order.
    pub fn sections(&self, school_id: &str) -> Result<Vec<SectionView>, ProspectusServiceError> {
        let school = self.school(school_id)?;
        Ok(school
            .registry()
            .by_default_order()
            .into_iter()
            .map(|meta| section_view(&school, meta))
            .collect())
    }

    /// One section; with a prospectus id the view also says whether that family sees it.
    pub fn section(
        &self,
        school_id: &str,
        section_id: &str,
        prospectus_id: Option<&ProspectusId>,
    ) -> Result<SectionView, ProspectusServiceError> {
        let school = self.school(school_id)?;
        let meta = school.registry().module_meta(section_id).ok_or_else(|| {
            ProspectusServiceError::UnknownSection {
                school: school_id.to_string(),
                section: section_id.to_string(),
            }
        })?;
        let mut view = section_view(&school, meta);

        if let Some(prospectus_id) = prospectus_id {
            let record = self.record(&school, prospectus_id)?;
            let visibility = school.resolve(&record.profile);
            view.visible = Some(visibility.visible.contains(&meta.id));
            view.follow_up = school
                .registry()
                .follow_up_for(section_id, &visibility.visible);
        }
        Ok(view)
    }

    /// Section best matching a free-text question.
    pub fn lookup_section(
        &self,
        school_id: &str,
        query: &str,
    ) -> Result<SectionView, ProspectusServiceError> {
        let school = self.school(school_id)?;
        let meta = school
            .registry()
            .section_for_query(query)
            .ok_or_else(|| ProspectusServiceError::NoMatchingSection(query.to_string()))?;
        Ok(section_view(&school, meta))
    }

    /// Narrate a section, personalised when a prospectus id is supplied.
    pub async fn narrate(
        &self,
        school_id: &str,
        section_id: &str,
        prospectus_id: Option<&ProspectusId>,
    ) -> Result<NarrationView, ProspectusServiceError> {
        let school = self.school(school_id)?;
        let meta = school.registry().module_meta(section_id).ok_or_else(|| {
            ProspectusServiceError::UnknownSection {
                school: school_id.to_string(),
                section: section_id.to_string(),
            }
        })?;

        let context = match prospectus_id {
            Some(id) => FamilyContext::from_profile(&self.record(&school, id)?.profile),
            None => FamilyContext::anonymous(),
        };
        let request = NarrationRequest {
            school_name: school.name().to_string(),
            module_id: meta.id.clone(),
            content: school
                .registry()
                .module_content(section_id)
                .unwrap_or_default(),
            context,
        };

        let narration = self.narration.narrate(&request).await;
        Ok(NarrationView {
            section_id: meta.id.clone(),
            prospectus_id: prospectus_id.cloned(),
            text: narration.text,
            source: narration.source,
        })
    }

    fn school(&self, school_id: &str) -> Result<Arc<SchoolConfig>, ProspectusServiceError> {
        self.catalog
            .get(school_id)
            .ok_or_else(|| ProspectusServiceError::UnknownSchool(school_id.to_string()))
    }

    /// Fetch a record, treating one stored for a different school as absent.
    fn record(
        &self,
        school: &SchoolConfig,
        prospectus_id: &ProspectusId,
    ) -> Result<ProspectusRecord, ProspectusServiceError> {
        let record = self
            .repository
            .fetch(prospectus_id)?
            .filter(|record| &record.school_id == school.id())
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }
}

fn render(school: &SchoolConfig, record: &ProspectusRecord) -> ProspectusView {
    let visibility = school.resolve(&record.profile);
    let suggested_house = seeded_suggestion(
        school.houses(),
        &record.profile,
        seed_for(record.prospectus_id.as_str()),
    )
    .cloned();

    ProspectusView {
        prospectus_id: record.prospectus_id.clone(),
        school_id: record.school_id.clone(),
        child_name: record.profile.child.first_name.clone(),
        entry_point: record.profile.entry.point.to_string(),
        revision: record.revision,
        submitted_at: record.submitted_at,
        visible: visibility.visible,
        display_order: visibility.display_order,
        tour: visibility.tour,
        failed: visibility.failed,
        suggested_house,
    }
}

fn section_view(school: &SchoolConfig, meta: &ModuleMeta) -> SectionView {
    let content = school
        .registry()
        .module_content(meta.id.as_str())
        .unwrap_or_default();
    SectionView::from_meta(meta, content)
}

/// Error raised by the prospectus service.
#[derive(Debug, thiserror::Error)]
pub enum ProspectusServiceError {
    #[error("unknown school '{0}'")]
    UnknownSchool(String),
    #[error("school '{school}' has no section '{section}'")]
    UnknownSection { school: String, section: String },
    #[error("no section matches '{0}'")]
    NoMatchingSection(String),
    #[error("submission has {} invalid field(s)", .0.len())]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
