//! Resource and task registries built by plugin discovery.
//!
//! Both registries are built once at startup and are read-only afterwards,
//! so they are shared as `Arc`s without locking. [`RegistryCell`] enforces the
//! build-once rule.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::OnceCell;

use crate::catalog::{scan_modules, Capability, Factory, PluginCatalog, PluginModule};
use crate::error::{CoreError, CoreResult, PluginLoadError};
use crate::handler::{ResourceDefinitionInfo, ResourceHandler, TaskHandler};
use crate::remote::ResourceDb;

// ---------------------------------------------------------------------------
// RegistryCell
// ---------------------------------------------------------------------------

/// Holds the single instance of a registry.
///
/// The first successful [`get_or_try_init`](Self::get_or_try_init) runs
/// discovery; every later call returns the same `Arc` without rescanning,
/// whatever arguments its initializer would have used. A failed build leaves
/// the cell empty.
pub struct RegistryCell<T> {
    cell: OnceCell<Arc<T>>,
}

impl<T> RegistryCell<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<T>, PluginLoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, PluginLoadError>>,
    {
        self.cell
            .get_or_try_init(|| async move { init().await.map(Arc::new) })
            .await
            .cloned()
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }
}

impl<T> Default for RegistryCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn load_modules(
    dirs: &[PathBuf],
    catalog: &PluginCatalog,
) -> Result<Vec<PluginModule>, PluginLoadError> {
    catalog.check_hierarchy()?;
    let modules = scan_modules(dirs);
    for module in &modules {
        module.check_dependencies(catalog)?;
    }
    Ok(modules)
}

// ---------------------------------------------------------------------------
// ResourceRegistry
// ---------------------------------------------------------------------------

/// Resource handlers keyed by `"{module}.{symbol}"`, plus the tag index.
pub struct ResourceRegistry {
    handlers: IndexMap<String, Arc<dyn ResourceHandler>>,
    definitions: IndexMap<String, ResourceDefinitionInfo>,
    tags: IndexMap<String, Vec<String>>,
}

impl ResourceRegistry {
    /// Scan `dirs`, instantiate every concrete resource plugin the modules
    /// list, and initialize each before registering it.
    pub async fn discover(
        dirs: &[PathBuf],
        catalog: &PluginCatalog,
        config_dir: &Path,
        db: Arc<dyn ResourceDb>,
    ) -> Result<Self, PluginLoadError> {
        let modules = load_modules(dirs, catalog)?;
        let mut registry = Self::new();

        for module in &modules {
            for symbol in &module.plugins {
                let Some(entry) = catalog.get(symbol) else {
                    continue;
                };
                let key = module.qualified(symbol);
                let ctor = match entry.factory {
                    Factory::Resource(ctor) => ctor,
                    Factory::AbstractResource => {
                        tracing::debug!(%key, "Ignoring abstract resource definition");
                        continue;
                    }
                    Factory::Task(_) | Factory::AbstractTask => continue,
                };

                let mut handler = ctor();
                handler
                    .initialize(config_dir, Arc::clone(&db))
                    .await
                    .map_err(|e| PluginLoadError::Initialization {
                        key: key.clone(),
                        source: Box::new(e),
                    })?;
                registry.insert(key, Arc::from(handler))?;
            }
        }

        tracing::info!(
            handlers = registry.handlers.len(),
            tags = registry.tags.len(),
            "Resource registry built"
        );
        Ok(registry)
    }

    pub fn new() -> Self {
        Self {
            handlers: IndexMap::new(),
            definitions: IndexMap::new(),
            tags: IndexMap::new(),
        }
    }

    /// Register an already-initialized handler under `key`.
    pub fn insert(
        &mut self,
        key: String,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<(), PluginLoadError> {
        if self.handlers.contains_key(&key) {
            tracing::error!(%key, "Duplicate resource definition");
            return Err(PluginLoadError::DuplicateKey {
                registry: "resource",
                key,
            });
        }
        for tag in handler.tags() {
            self.tags.entry(tag).or_default().push(key.clone());
        }
        self.definitions
            .insert(key.clone(), ResourceDefinitionInfo::of(handler.as_ref()));
        tracing::info!(%key, "Loaded resource definition");
        self.handlers.insert(key, handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> CoreResult<&Arc<dyn ResourceHandler>> {
        self.handlers.get(name).ok_or_else(|| CoreError::NotFound {
            entity: "Resource definition",
            id: name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> &IndexMap<String, ResourceDefinitionInfo> {
        &self.definitions
    }

    /// Tag to handler names, each list in registration order.
    pub fn tags(&self) -> &IndexMap<String, Vec<String>> {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// TaskRegistry
// ---------------------------------------------------------------------------

/// Task handlers keyed by their declared task definition id.
pub struct TaskRegistry {
    tasks: IndexMap<String, Arc<dyn TaskHandler>>,
}

impl TaskRegistry {
    /// Scan `dirs` and instantiate every concrete task plugin the modules
    /// list, including all transitive specializations of listed bases.
    pub async fn discover(
        dirs: &[PathBuf],
        catalog: &PluginCatalog,
    ) -> Result<Self, PluginLoadError> {
        let modules = load_modules(dirs, catalog)?;
        let mut registry = Self::new();
        let mut visited = std::collections::HashSet::new();

        for module in &modules {
            for symbol in &module.plugins {
                let Some(entry) = catalog.get(symbol) else {
                    continue;
                };
                if entry.factory.capability() != Capability::Task {
                    continue;
                }
                let candidates = std::iter::once(entry).chain(catalog.descendants(symbol));
                for candidate in candidates {
                    if !visited.insert(candidate.symbol.clone()) {
                        continue;
                    }
                    match candidate.factory {
                        Factory::Task(ctor) => registry.insert(Arc::from(ctor()))?,
                        Factory::AbstractTask => {
                            tracing::debug!(
                                symbol = %candidate.symbol,
                                "Ignoring abstract task definition"
                            );
                        }
                        Factory::Resource(_) | Factory::AbstractResource => {}
                    }
                }
            }
        }

        tracing::info!(tasks = registry.tasks.len(), "Task registry built");
        Ok(registry)
    }

    pub fn new() -> Self {
        Self {
            tasks: IndexMap::new(),
        }
    }

    /// Register a handler under its own task definition id.
    pub fn insert(&mut self, handler: Arc<dyn TaskHandler>) -> Result<(), PluginLoadError> {
        let key = handler.task_definition_id().to_string();
        if self.tasks.contains_key(&key) {
            tracing::error!(%key, "Duplicate task definition");
            return Err(PluginLoadError::DuplicateKey {
                registry: "task",
                key,
            });
        }
        tracing::info!(%key, "Loaded task definition");
        self.tasks.insert(key, handler);
        Ok(())
    }

    pub fn get(&self, task_definition_id: &str) -> CoreResult<&Arc<dyn TaskHandler>> {
        self.tasks
            .get(task_definition_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "Task definition",
                id: task_definition_id.to_string(),
            })
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
