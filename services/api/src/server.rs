use crate::cli::ServeArgs;
use crate::infra::{load_catalog, AppState, InMemoryProspectusRepository};
use crate::narrator::narration_service;
use crate::routes::with_prospectus_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use prospectus::config::AppConfig;
use prospectus::error::AppError;
use prospectus::telemetry;
use prospectus::workflows::prospectus::ProspectusService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(dir) = args.schools_dir.take() {
        config.catalog.schools_dir = Some(dir);
    }

    telemetry::init(&config.telemetry)?;

    let catalog = Arc::new(load_catalog(config.catalog.schools_dir.as_deref())?);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryProspectusRepository::default());
    let prospectus_service = Arc::new(ProspectusService::new(
        catalog.clone(),
        repository,
        narration_service(&config.narration),
    ));

    let app = with_prospectus_routes(prospectus_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        schools = catalog.len(),
        "personalised prospectus service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
