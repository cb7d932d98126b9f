use crate::cli::ServeArgs;
use crate::infra::{build_directory_service, AppState};
use crate::routes::with_directory_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hive_directory::config::AppConfig;
use hive_directory::error::AppError;
use hive_directory::telemetry;
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
    if let Some(fixtures) = args.fixtures.take() {
        config.directory.fixtures = Some(fixtures);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory_service =
        build_directory_service(&config.directory, config.directory.fixtures.as_deref())?;

    let app = with_directory_routes(directory_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "hive directory ready");

    axum::serve(listener, app).await?;
    Ok(())
}
