use hive_directory::config::DirectoryConfig;
use hive_directory::directory::{DirectoryFixture, DirectoryService, InMemoryDirectoryRepository};
use hive_directory::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type MemoryDirectoryService = DirectoryService<InMemoryDirectoryRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Build the in-process directory, seeding it from `fixtures` when given.
pub(crate) fn build_directory_service(
    config: &DirectoryConfig,
    fixtures: Option<&Path>,
) -> Result<Arc<MemoryDirectoryService>, AppError> {
    let repository = Arc::new(InMemoryDirectoryRepository::new());
    let service = DirectoryService::new(repository, config.clone());

    if let Some(path) = fixtures {
        let fixture = DirectoryFixture::from_path(path)?;
        let summary = service.seed(fixture)?;
        info!(
            path = %path.display(),
            organizations = summary.organizations,
            users = summary.users,
            "loaded directory fixtures"
        );
    }

    Ok(Arc::new(service))
}
