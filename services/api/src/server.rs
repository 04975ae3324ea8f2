use crate::cli::ServeArgs;
use crate::infra::{seed_organization, AppState, InMemoryMomentLog, InMemorySnapshotLog};
use crate::routes::with_check_in_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use talent_ledger::config::AppConfig;
use talent_ledger::error::AppError;
use talent_ledger::telemetry;
use talent_ledger::workflows::check_ins::{CheckInError, CheckInService, InMemoryPerformanceStore};
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryPerformanceStore::default());
    if args.seed_demo {
        seed_organization(&store, Utc::now().date_naive()).map_err(CheckInError::from)?;
        info!("demo organisation loaded");
    }

    let check_in_service = Arc::new(CheckInService::new(
        store,
        Arc::new(InMemoryMomentLog::default()),
        Arc::new(InMemorySnapshotLog::default()),
        config.finalization.clone(),
    ));

    let app = with_check_in_routes(check_in_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        record_snapshots = config.finalization.record_snapshots,
        "check-in service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
