use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::{json, Value};

use crate::narration::{FnNarrator, NarrationError, NarrationRequest, NarrationService};
use crate::personalisation::SchoolCatalog;
use crate::workflows::prospectus::domain::{ProspectusId, ProspectusRecord};
use crate::workflows::prospectus::repository::{ProspectusRepository, RepositoryError};
use crate::workflows::prospectus::ProspectusService;

pub(super) fn catalog() -> Arc<SchoolCatalog> {
    Arc::new(SchoolCatalog::builtin().expect("built-in schools load"))
}

pub(super) fn echo_narration() -> NarrationService {
    let narrator = FnNarrator::new(|request: &NarrationRequest| {
        Ok(format!(
            "{} meets {}",
            request.context.child_name, request.content.title
        ))
    });
    NarrationService::new(Arc::new(narrator), Duration::from_secs(1))
}

pub(super) fn offline_narration() -> NarrationService {
    let narrator = FnNarrator::new(|_: &NarrationRequest| {
        Err(NarrationError::Unavailable("offline".to_string()))
    });
    NarrationService::new(Arc::new(narrator), Duration::from_secs(1))
}

pub(super) fn build_service() -> (ProspectusService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = ProspectusService::new(catalog(), repository.clone(), echo_narration());
    (service, repository)
}

pub(super) fn submission() -> Value {
    json!({
        "child": { "first_name": "Ada", "gender": "female" },
        "entry": { "point": "sixth_form" },
        "interests": {
            "sports": ["hockey"],
            "creative": ["music"]
        },
        "practical": {
            "accommodation_type": "boarding",
            "scholarship_interest": true
        },
        "futures": {
            "career_areas": ["medicine_health"],
            "qualification_preference": "a_level"
        },
        "parents": [
            { "first_name": "Annabella", "surname": "Byron", "email": "annabella@example.com" }
        ]
    })
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ProspectusId, ProspectusRecord>>>,
}

impl ProspectusRepository for MemoryRepository {
    fn insert(&self, record: ProspectusRecord) -> Result<ProspectusRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.prospectus_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.prospectus_id.clone(), record.clone());
        Ok(record)
    }

    fn replace(&self, record: ProspectusRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(&record.prospectus_id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ProspectusId) -> Result<Option<ProspectusRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone, Copy)]
pub(super) struct UnavailableRepository;

impl ProspectusRepository for UnavailableRepository {
    fn insert(&self, _record: ProspectusRecord) -> Result<ProspectusRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace(&self, _record: ProspectusRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ProspectusId) -> Result<Option<ProspectusRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone, Copy)]
pub(super) struct ConflictRepository;

impl ProspectusRepository for ConflictRepository {
    fn insert(&self, _record: ProspectusRecord) -> Result<ProspectusRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn replace(&self, _record: ProspectusRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn fetch(&self, _id: &ProspectusId) -> Result<Option<ProspectusRecord>, RepositoryError> {
        Ok(None)
    }
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body collected");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
