//! Plugin manifest: the compiled-in catalog of constructible plugins and the
//! YAML module descriptors that select which of them a deployment loads.
//!
//! A descriptor file is the unit of loading (a "module"). It names catalog
//! symbols it provides and symbols it requires:
//!
//! ```yaml
//! module: demo
//! plugins:
//!   - DemoResource
//!   - DemoTask
//! requires:
//!   - HumanTask
//! ```
//!
//! A symbol a module names but the catalog lacks is a missing dependency and
//! aborts discovery. Unreadable or malformed descriptors are logged and
//! skipped.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::PluginLoadError;
use crate::handler::{ResourceHandler, TaskHandler};

/// Descriptor file extensions picked up by a directory scan.
const DESCRIPTOR_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

pub type ResourceConstructor = fn() -> Box<dyn ResourceHandler>;
pub type TaskConstructor = fn() -> Box<dyn TaskHandler>;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Which capability trait an entry provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Resource,
    Task,
}

/// How an entry is built. Abstract entries exist only to be extended.
#[derive(Clone, Copy)]
pub enum Factory {
    Resource(ResourceConstructor),
    Task(TaskConstructor),
    AbstractResource,
    AbstractTask,
}

impl Factory {
    pub fn capability(&self) -> Capability {
        match self {
            Factory::Resource(_) | Factory::AbstractResource => Capability::Resource,
            Factory::Task(_) | Factory::AbstractTask => Capability::Task,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, Factory::AbstractResource | Factory::AbstractTask)
    }
}

/// One constructible (or abstract) plugin type.
pub struct CatalogEntry {
    pub symbol: String,
    pub parent: Option<String>,
    pub factory: Factory,
}

impl CatalogEntry {
    pub fn resource(symbol: &str, ctor: ResourceConstructor) -> Self {
        Self::with_factory(symbol, Factory::Resource(ctor))
    }

    pub fn task(symbol: &str, ctor: TaskConstructor) -> Self {
        Self::with_factory(symbol, Factory::Task(ctor))
    }

    pub fn abstract_resource(symbol: &str) -> Self {
        Self::with_factory(symbol, Factory::AbstractResource)
    }

    pub fn abstract_task(symbol: &str) -> Self {
        Self::with_factory(symbol, Factory::AbstractTask)
    }

    /// Declare `parent` as the base this entry specializes.
    pub fn extends(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    fn with_factory(symbol: &str, factory: Factory) -> Self {
        Self {
            symbol: symbol.to_string(),
            parent: None,
            factory,
        }
    }
}

/// Registration table of every plugin type compiled into the binary.
#[derive(Default)]
pub struct PluginCatalog {
    entries: IndexMap<String, CatalogEntry>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A later entry with the same symbol replaces the earlier.
    pub fn register(&mut self, entry: CatalogEntry) -> &mut Self {
        self.entries.insert(entry.symbol.clone(), entry);
        self
    }

    pub fn with(mut self, entry: CatalogEntry) -> Self {
        self.register(entry);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<&CatalogEntry> {
        self.entries.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that every declared parent exists and has the same capability.
    pub fn check_hierarchy(&self) -> Result<(), PluginLoadError> {
        for entry in self.entries.values() {
            let Some(parent) = entry.parent.as_deref() else {
                continue;
            };
            match self.entries.get(parent) {
                Some(base) if base.factory.capability() == entry.factory.capability() => {}
                _ => {
                    return Err(PluginLoadError::UnknownParent {
                        symbol: entry.symbol.clone(),
                        parent: parent.to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Every entry that extends `symbol`, directly or through intermediate
    /// bases, in catalog order.
    pub fn descendants(&self, symbol: &str) -> Vec<&CatalogEntry> {
        let mut found: Vec<&CatalogEntry> = Vec::new();
        let mut frontier = vec![symbol];
        let mut seen: HashSet<&str> = HashSet::from([symbol]);
        while let Some(base) = frontier.pop() {
            for entry in self.entries.values() {
                if entry.parent.as_deref() == Some(base) && seen.insert(entry.symbol.as_str()) {
                    found.push(entry);
                    frontier.push(entry.symbol.as_str());
                }
            }
        }
        found.sort_by_key(|e| self.entries.get_index_of(&e.symbol));
        found
    }
}

// ---------------------------------------------------------------------------
// Module descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DescriptorFile {
    #[serde(default)]
    module: Option<String>,
    #[serde(default)]
    plugins: Vec<String>,
    #[serde(default)]
    requires: Vec<String>,
}

/// A successfully parsed descriptor file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginModule {
    pub name: String,
    pub path: PathBuf,
    pub plugins: Vec<String>,
    pub requires: Vec<String>,
}

impl PluginModule {
    /// Confirm every symbol this module names is in the catalog.
    pub fn check_dependencies(&self, catalog: &PluginCatalog) -> Result<(), PluginLoadError> {
        let missing = self
            .requires
            .iter()
            .chain(&self.plugins)
            .find(|symbol| !catalog.contains(symbol));
        match missing {
            Some(symbol) => {
                tracing::error!(
                    module = %self.name,
                    %symbol,
                    "Module load failed: missing dependency"
                );
                Err(PluginLoadError::MissingDependency {
                    module: self.name.clone(),
                    symbol: symbol.clone(),
                })
            }
            None => Ok(()),
        }
    }

    /// Registry key for one of this module's symbols.
    pub fn qualified(&self, symbol: &str) -> String {
        format!("{}.{}", self.name, symbol)
    }
}

/// Scan `dirs` in order for descriptor files and parse them.
///
/// Files are visited recursively in path order; a file reachable from two
/// scan roots is loaded once.
pub fn scan_modules(dirs: &[PathBuf]) -> Vec<PluginModule> {
    let mut seen = HashSet::new();
    let mut modules = Vec::new();
    for dir in dirs {
        for path in descriptor_files(dir) {
            let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            if !seen.insert(canonical) {
                continue;
            }
            if let Some(module) = load_descriptor(&path) {
                modules.push(module);
            }
        }
    }
    modules
}

fn load_descriptor(path: &Path) -> Option<PluginModule> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Skipping unreadable plugin descriptor"
            );
            return None;
        }
    };
    let file: DescriptorFile = match serde_yaml::from_str(&raw) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Skipping malformed plugin descriptor"
            );
            return None;
        }
    };
    let name = file.module.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    tracing::debug!(module = %name, path = %path.display(), "Imported plugin descriptor");
    Some(PluginModule {
        name,
        path: path.to_path_buf(),
        plugins: file.plugins,
        requires: file.requires,
    })
}

fn descriptor_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                dir = %dir.display(),
                error = %e,
                "Skipping unreadable plugin directory"
            );
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(descriptor_files(&path));
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| DESCRIPTOR_EXTENSIONS.contains(&ext))
        {
            files.push(path);
        }
    }
    files
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
