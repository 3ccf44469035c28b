use std::sync::Arc;

use satellite_core::backfill::BackfillCache;
use satellite_core::catalog::PluginCatalog;
use satellite_core::error::PluginLoadError;
use satellite_core::registry::{RegistryCell, ResourceRegistry, TaskRegistry};
use satellite_core::remote::{HumanTaskSystem, ResourceDb};
use satellite_core::runtime::LocalTaskRuntime;

use crate::config::SatelliteConfig;

/// The process-wide registries. Discovery runs on the first
/// [`load`](Self::load); later calls return the same instances.
#[derive(Default)]
pub struct Registries {
    resources: RegistryCell<ResourceRegistry>,
    tasks: RegistryCell<TaskRegistry>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(
        &self,
        config: &SatelliteConfig,
        catalog: &PluginCatalog,
        resource_db: Arc<dyn ResourceDb>,
    ) -> Result<(Arc<ResourceRegistry>, Arc<TaskRegistry>), PluginLoadError> {
        let resources = self
            .resources
            .get_or_try_init(|| {
                ResourceRegistry::discover(
                    &config.resource_definition_scan_dirs,
                    catalog,
                    &config.task_config_dir,
                    resource_db,
                )
            })
            .await?;
        let tasks = self
            .tasks
            .get_or_try_init(|| TaskRegistry::discover(&config.task_definition_scan_dirs, catalog))
            .await?;
        Ok((resources, tasks))
    }
}

/// Shared application state available to all handlers via axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    pub resources: Arc<ResourceRegistry>,
    pub runtime: Arc<LocalTaskRuntime>,
    pub backfill: Arc<BackfillCache>,
    /// Handed to resource handlers that open a backfill stream.
    pub resource_db: Arc<dyn ResourceDb>,
}

impl AppState {
    pub fn new(
        config: &SatelliteConfig,
        resources: Arc<ResourceRegistry>,
        tasks: Arc<TaskRegistry>,
        resource_db: Arc<dyn ResourceDb>,
        hts: Arc<dyn HumanTaskSystem>,
    ) -> Self {
        let runtime = LocalTaskRuntime::new(config.runtime_settings(), hts, tasks);
        Self {
            resources,
            runtime: Arc::new(runtime),
            backfill: Arc::new(BackfillCache::new(config.backfill_ttl())),
            resource_db,
        }
    }
}
