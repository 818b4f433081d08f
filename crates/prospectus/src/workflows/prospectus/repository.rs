use super::domain::{ProspectusId, ProspectusRecord};

/// Storage abstraction so the service can be exercised without a database.
pub trait ProspectusRepository: Send + Sync {
    fn insert(&self, record: ProspectusRecord) -> Result<ProspectusRecord, RepositoryError>;
    /// Overwrite an existing record; `NotFound` when nothing is stored under its id.
    fn replace(&self, record: ProspectusRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ProspectusId) -> Result<Option<ProspectusRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
