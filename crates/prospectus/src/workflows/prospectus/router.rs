use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::ProspectusId;
use super::repository::{ProspectusRepository, RepositoryError};
use super::service::{ProspectusService, ProspectusServiceError};

/// Router builder exposing prospectus submission, sections and narration.
pub fn prospectus_router<R>(service: Arc<ProspectusService<R>>) -> Router
where
    R: ProspectusRepository + 'static,
{
    Router::new()
        .route("/api/v1/schools", get(schools_handler::<R>))
        .route(
            "/api/v1/schools/:school_id/prospectuses",
            post(submit_handler::<R>),
        )
        .route(
            "/api/v1/schools/:school_id/prospectuses/:prospectus_id",
            get(view_handler::<R>).put(resubmit_handler::<R>),
        )
        .route(
            "/api/v1/schools/:school_id/sections",
            get(sections_handler::<R>),
        )
        .route(
            "/api/v1/schools/:school_id/sections/:section_id",
            get(section_handler::<R>),
        )
        .route(
            "/api/v1/schools/:school_id/section-lookup",
            get(lookup_handler::<R>),
        )
        .route(
            "/api/v1/schools/:school_id/narrations",
            post(narrate_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SectionQuery {
    pub(crate) prospectus_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LookupQuery {
    pub(crate) query: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NarrationBody {
    pub(crate) section_id: String,
    #[serde(default)]
    pub(crate) prospectus_id: Option<String>,
}

pub(crate) async fn schools_handler<R>(State(service): State<Arc<ProspectusService<R>>>) -> Response
where
    R: ProspectusRepository + 'static,
{
    (StatusCode::OK, axum::Json(service.schools())).into_response()
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<ProspectusService<R>>>,
    Path(school_id): Path<String>,
    axum::Json(raw): axum::Json<Value>,
) -> Response
where
    R: ProspectusRepository + 'static,
{
    match service.submit(&school_id, &raw) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn view_handler<R>(
    State(service): State<Arc<ProspectusService<R>>>,
    Path((school_id, prospectus_id)): Path<(String, String)>,
) -> Response
where
    R: ProspectusRepository + 'static,
{
    match service.view(&school_id, &ProspectusId(prospectus_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resubmit_handler<R>(
    State(service): State<Arc<ProspectusService<R>>>,
    Path((school_id, prospectus_id)): Path<(String, String)>,
    axum::Json(raw): axum::Json<Value>,
) -> Response
where
    R: ProspectusRepository + 'static,
{
    match service.resubmit(&school_id, &ProspectusId(prospectus_id), &raw) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn sections_handler<R>(
    State(service): State<Arc<ProspectusService<R>>>,
    Path(school_id): Path<String>,
) -> Response
where
    R: ProspectusRepository + 'static,
{
    match service.sections(&school_id) {
        Ok(sections) => (StatusCode::OK, axum::Json(sections)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn section_handler<R>(
    State(service): State<Arc<ProspectusService<R>>>,
    Path((school_id, section_id)): Path<(String, String)>,
    Query(query): Query<SectionQuery>,
) -> Response
where
    R: ProspectusRepository + 'static,
{
    let prospectus_id = query.prospectus_id.map(ProspectusId);
    match service.section(&school_id, &section_id, prospectus_id.as_ref()) {
        Ok(section) => (StatusCode::OK, axum::Json(section)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn lookup_handler<R>(
    State(service): State<Arc<ProspectusService<R>>>,
    Path(school_id): Path<String>,
    Query(lookup): Query<LookupQuery>,
) -> Response
where
    R: ProspectusRepository + 'static,
{
    match service.lookup_section(&school_id, &lookup.query) {
        Ok(section) => (StatusCode::OK, axum::Json(section)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn narrate_handler<R>(
    State(service): State<Arc<ProspectusService<R>>>,
    Path(school_id): Path<String>,
    axum::Json(body): axum::Json<NarrationBody>,
) -> Response
where
    R: ProspectusRepository + 'static,
{
    let prospectus_id = body.prospectus_id.map(ProspectusId);
    match service
        .narrate(&school_id, &body.section_id, prospectus_id.as_ref())
        .await
    {
        Ok(narration) => (StatusCode::OK, axum::Json(narration)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: ProspectusServiceError) -> Response {
    let (status, payload) = match &error {
        ProspectusServiceError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "error": error.to_string(),
                "fields": errors,
            }),
        ),
        ProspectusServiceError::UnknownSchool(_)
        | ProspectusServiceError::UnknownSection { .. }
        | ProspectusServiceError::NoMatchingSection(_)
        | ProspectusServiceError::Repository(RepositoryError::NotFound) => (
            StatusCode::NOT_FOUND,
            json!({ "error": error.to_string() }),
        ),
        ProspectusServiceError::Repository(RepositoryError::Conflict) => (
            StatusCode::CONFLICT,
            json!({ "error": "prospectus already exists" }),
        ),
        ProspectusServiceError::Repository(RepositoryError::Unavailable(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": error.to_string() }),
        ),
    };
    (status, axum::Json(payload)).into_response()
}
