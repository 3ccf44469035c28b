//! Built-in plugins and the catalog that makes them discoverable.
//!
//! Catalog symbols:
//!
//! ```text
//! DemoResource                      resource
//! DemoTask                          task  demoTask
//! HumanTask (abstract)
//!   GroupApprovalTask               task  groupApprovalTask
//! HttpCallTask (abstract)
//!   ExecuteHttpCall                 task  executeHttpCall
//! ```

pub mod approval;
pub mod context;
pub mod demo;
pub mod http_call;

use satellite_core::catalog::{CatalogEntry, PluginCatalog};

pub use approval::GroupApprovalTask;
pub use demo::{DemoResource, DemoTask};
pub use http_call::ExecuteHttpCall;

pub const HUMAN_TASK_BASE: &str = "HumanTask";
pub const HTTP_CALL_BASE: &str = "HttpCallTask";

/// Every plugin compiled into the satellite.
pub fn builtin_catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with(CatalogEntry::resource("DemoResource", DemoResource::boxed))
        .with(CatalogEntry::task("DemoTask", DemoTask::boxed))
        .with(CatalogEntry::abstract_task(HUMAN_TASK_BASE))
        .with(
            CatalogEntry::task("GroupApprovalTask", GroupApprovalTask::boxed)
                .extends(HUMAN_TASK_BASE),
        )
        .with(CatalogEntry::abstract_task(HTTP_CALL_BASE))
        .with(
            CatalogEntry::task("ExecuteHttpCall", ExecuteHttpCall::boxed).extends(HTTP_CALL_BASE),
        )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
