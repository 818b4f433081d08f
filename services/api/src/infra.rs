use metrics_exporter_prometheus::PrometheusHandle;
use prospectus::personalisation::{SchoolCatalog, SchoolConfigError};
use prospectus::workflows::prospectus::{
    ProspectusId, ProspectusRecord, ProspectusRepository, RepositoryError,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Built-in schools unless a configuration directory is given.
pub(crate) fn load_catalog(dir: Option<&Path>) -> Result<SchoolCatalog, SchoolConfigError> {
    let catalog = match dir {
        Some(dir) => SchoolCatalog::load_dir(dir)?,
        None => SchoolCatalog::builtin()?,
    };
    info!(schools = catalog.len(), "school catalog loaded");
    Ok(catalog)
}

/// Process-local prospectus store; submissions are lost on restart.
#[derive(Default, Clone)]
pub(crate) struct InMemoryProspectusRepository {
    records: Arc<Mutex<HashMap<ProspectusId, ProspectusRecord>>>,
}

impl InMemoryProspectusRepository {
    fn guard(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ProspectusId, ProspectusRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("prospectus store poisoned".to_string()))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.guard().map(|records| records.len()).unwrap_or(0)
    }
}

impl ProspectusRepository for InMemoryProspectusRepository {
    fn insert(&self, record: ProspectusRecord) -> Result<ProspectusRecord, RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(&record.prospectus_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.prospectus_id.clone(), record.clone());
        Ok(record)
    }

    fn replace(&self, record: ProspectusRecord) -> Result<(), RepositoryError> {
        let mut guard = self.guard()?;
        match guard.get_mut(&record.prospectus_id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ProspectusId) -> Result<Option<ProspectusRecord>, RepositoryError> {
        Ok(self.guard()?.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prospectus::personalisation::FamilyProfile;

    fn record(id: &str, revision: u32) -> ProspectusRecord {
        ProspectusRecord {
            prospectus_id: ProspectusId(id.to_string()),
            school_id: "clc".into(),
            profile: FamilyProfile::minimal("Ada", "year9"),
            submitted_at: Utc::now(),
            revision,
        }
    }

    #[test]
    fn insert_rejects_duplicates() {
        let repository = InMemoryProspectusRepository::default();
        repository.insert(record("lovelace-ada-000001", 1)).expect("first insert");

        assert!(matches!(
            repository.insert(record("lovelace-ada-000001", 1)),
            Err(RepositoryError::Conflict)
        ));
        assert_eq!(repository.len(), 1);
    }

    #[test]
    fn replace_requires_existing_record() {
        let repository = InMemoryProspectusRepository::default();
        assert!(matches!(
            repository.replace(record("lovelace-ada-000002", 2)),
            Err(RepositoryError::NotFound)
        ));

        repository.insert(record("lovelace-ada-000002", 1)).expect("insert");
        repository.replace(record("lovelace-ada-000002", 2)).expect("replace");
        let stored = repository
            .fetch(&ProspectusId("lovelace-ada-000002".to_string()))
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.revision, 2);
    }

    #[test]
    fn builtin_catalog_loads_without_directory() {
        let catalog = load_catalog(None).expect("built-in schools load");
        assert_eq!(catalog.len(), 3);
    }
}
