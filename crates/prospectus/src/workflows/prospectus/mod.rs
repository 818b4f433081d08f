//! Prospectus submission workflow: store a family's enquiry, resolve its personalised
//! prospectus and serve sections and narration over HTTP.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{NarrationView, ProspectusId, ProspectusRecord, ProspectusView, SectionView};
pub use repository::{ProspectusRepository, RepositoryError};
pub use router::prospectus_router;
pub use service::{ProspectusService, ProspectusServiceError};
