//! Capability traits a plugin implements.
//!
//! [`ResourceHandler`] plans changes and reads state for one resource type.
//! [`TaskHandler`] executes, polls and validates one kind of workflow step.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreResult;
use crate::process::{Process, StatusUpdate};
use crate::remote::{HumanTaskSystem, ResourceDb};
use crate::resource::{EdgeDefinition, MetricsDefinition, Plan, Resource, ResourceChange, Tool};
use crate::types::Context;

/// Lazy, possibly infinite sequence of pre-existing resources.
pub type BackfillStream = BoxStream<'static, Resource>;

// ---------------------------------------------------------------------------
// ResourceHandler
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Called once after construction, before the handler is registered.
    async fn initialize(&mut self, config_dir: &Path, db: Arc<dyn ResourceDb>) -> CoreResult<()>;

    /// Propose how `change` should be realized. Invalid input yields
    /// [`CoreError::Plan`](crate::CoreError::Plan).
    async fn plan_change(&self, change: ResourceChange) -> CoreResult<Plan>;

    async fn read_external_current_state(&self, resource: &Resource) -> CoreResult<Context>;

    async fn tools(&self, resource: &Resource) -> CoreResult<Vec<Tool>>;

    fn tags(&self) -> Vec<String>;

    /// `None` means backfill is not supported. The stream is created once per
    /// process and drained page by page.
    async fn backfill_resources(&self, _db: Arc<dyn ResourceDb>) -> Option<BackfillStream> {
        None
    }

    async fn metrics(&self, _resource: &Resource) -> CoreResult<Vec<MetricsDefinition>> {
        Ok(Vec::new())
    }

    fn simple_name(&self) -> &str {
        ""
    }

    fn short_description(&self) -> &str {
        ""
    }

    fn config_schema(&self) -> Value {
        Value::Object(Context::new())
    }

    fn ui_schema(&self) -> Value {
        Value::Object(Context::new())
    }

    fn documentation_link(&self) -> &str {
        ""
    }

    fn author(&self) -> &str {
        ""
    }

    fn chat_link(&self) -> &str {
        ""
    }

    fn required_parent_edge_types(&self) -> Option<EdgeDefinition> {
        None
    }

    fn required_child_edge_types(&self) -> Option<Vec<EdgeDefinition>> {
        None
    }
}

/// Serialized view of a resource handler, as listed by the definitions
/// endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinitionInfo {
    pub simple_name: String,
    pub short_description: String,
    pub config_schema: Value,
    pub ui_schema: Value,
    pub author: String,
    pub chat_link: String,
    pub documentation_link: String,
    pub required_parent_edge_types: Option<EdgeDefinition>,
    pub required_child_edge_types: Option<Vec<EdgeDefinition>>,
}

impl ResourceDefinitionInfo {
    pub fn of(handler: &dyn ResourceHandler) -> Self {
        Self {
            simple_name: handler.simple_name().to_string(),
            short_description: handler.short_description().to_string(),
            config_schema: handler.config_schema(),
            ui_schema: handler.ui_schema(),
            author: handler.author().to_string(),
            chat_link: handler.chat_link().to_string(),
            documentation_link: handler.documentation_link().to_string(),
            required_parent_edge_types: handler.required_parent_edge_types(),
            required_child_edge_types: handler.required_child_edge_types(),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskHandler
// ---------------------------------------------------------------------------

/// Services a task handler may use while running.
pub trait TaskRuntime: Send + Sync {
    fn human_task_system(&self) -> &dyn HumanTaskSystem;

    /// Development mode: side-effecting tasks may short-circuit.
    fn is_dev(&self) -> bool;

    fn config_dir(&self) -> &Path;

    fn tmp_dir(&self) -> &Path;
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Registry key; referenced by `Task::task_definition_id`.
    fn task_definition_id(&self) -> &str;

    async fn start_execution(
        &self,
        runtime: &dyn TaskRuntime,
        task_id: &str,
        process: &Process,
        process_context: &Context,
        task_context: Option<&Context>,
    ) -> CoreResult<StatusUpdate>;

    /// Polled by the orchestrator until it reports an exit status.
    async fn check_status(
        &self,
        runtime: &dyn TaskRuntime,
        task_id: &str,
        process: &Process,
        process_context: &Context,
        task_context: Option<&Context>,
    ) -> CoreResult<StatusUpdate>;

    /// Fails with [`CoreError::Validation`](crate::CoreError::Validation) when
    /// required context keys are missing or malformed.
    async fn validate(
        &self,
        task_id: &str,
        process: &Process,
        process_context: &Context,
        task_context: Option<&Context>,
    ) -> CoreResult<()>;
}
