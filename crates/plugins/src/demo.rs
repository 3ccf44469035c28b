//! Demo resource and task, used to exercise a satellite end to end.
//!
//! A demo change runs `approval` (group approval) and then `demoTask`, which
//! opens a verifiable human task and closes it on the first poll.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use satellite_core::error::CoreResult;
use satellite_core::handler::{ResourceHandler, TaskHandler, TaskRuntime};
use satellite_core::process::{
    Process, Status, StatusUpdate, Task, FAIL_PROCESS_TASK, SUCCEED_PROCESS_TASK,
};
use satellite_core::remote::{HumanTaskType, NewHumanTask, ResourceDb};
use satellite_core::resource::{Plan, Resource, ResourceChange, Tool};
use satellite_core::types::Context;

use crate::approval;

pub const DEMO_TEAM: &str = "DemoTeam";
pub const DEMO_TASK_ID: &str = "demoTask";
pub const APPROVAL_STEP: &str = "approval";

// ---------------------------------------------------------------------------
// DemoResource
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct DemoResource;

impl DemoResource {
    pub fn boxed() -> Box<dyn ResourceHandler> {
        Box::new(Self)
    }

    fn resource_id(resource: &Resource, name: &str) -> String {
        format!(
            "prn:demo_slate:{}:aws_{}::{}",
            resource.environment, resource.region, name
        )
    }

    fn process_for(resource: &Resource) -> Process {
        let mut process = Process::default();
        process.process_context.insert(
            APPROVAL_STEP.to_string(),
            json!({
                (approval::ASSIGNEE_USER): resource.owner,
                (approval::ASSIGNEE_GROUP): DEMO_TEAM,
                (approval::DESCRIPTION): format!("Approve demo resource {}", resource.id),
                (approval::SUMMARY): "Demo resource approval",
            }),
        );
        process
            .process_context
            .insert(DEMO_TASK_ID.to_string(), json!({ "value": "val1" }));

        process.all_tasks.insert(
            APPROVAL_STEP.to_string(),
            Task::with_exits(
                APPROVAL_STEP,
                approval::TASK_DEFINITION_ID,
                &[DEMO_TASK_ID],
                &[FAIL_PROCESS_TASK],
                &[FAIL_PROCESS_TASK],
            ),
        );
        process.all_tasks.insert(
            DEMO_TASK_ID.to_string(),
            Task::with_exits(
                DEMO_TASK_ID,
                DEMO_TASK_ID,
                &[SUCCEED_PROCESS_TASK],
                &[FAIL_PROCESS_TASK],
                &[FAIL_PROCESS_TASK],
            ),
        );
        process.start_task_id = Some(APPROVAL_STEP.to_string());
        process
    }
}

#[async_trait]
impl ResourceHandler for DemoResource {
    async fn initialize(&mut self, config_dir: &Path, _db: Arc<dyn ResourceDb>) -> CoreResult<()> {
        tracing::debug!(config_dir = %config_dir.display(), "Demo resource initialized");
        Ok(())
    }

    async fn plan_change(&self, change: ResourceChange) -> CoreResult<Plan> {
        let name = change.require_desired_str("name")?.to_string();
        let proposed = change.proposed_resource_object;
        let id = Self::resource_id(&proposed, &name);
        let process = Self::process_for(&proposed);
        tracing::debug!(resource = %id, requester = %change.requester, "Planned demo change");
        Ok(Plan::new(proposed)
            .with_process(process)
            .with_updated_resource_id(id))
    }

    async fn read_external_current_state(&self, resource: &Resource) -> CoreResult<Context> {
        Ok(resource.desired_state.clone())
    }

    async fn tools(&self, _resource: &Resource) -> CoreResult<Vec<Tool>> {
        Ok(Vec::new())
    }

    fn tags(&self) -> Vec<String> {
        vec![DEMO_TEAM.to_string()]
    }

    fn simple_name(&self) -> &str {
        "DemoResource"
    }

    fn short_description(&self) -> &str {
        "Simple resource definition to test Slate satellites"
    }

    fn config_schema(&self) -> Value {
        json!({
            "type": "object",
            "title": "DemoResource",
            "properties": {
                "name": {
                    "type": "string",
                    "title": "Name",
                    "minLength": 1,
                    "maxLength": 130
                }
            },
            "required": ["name"]
        })
    }

    fn author(&self) -> &str {
        DEMO_TEAM
    }
}

// ---------------------------------------------------------------------------
// DemoTask
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct DemoTask;

impl DemoTask {
    pub fn boxed() -> Box<dyn TaskHandler> {
        Box::new(Self)
    }
}

#[async_trait]
impl TaskHandler for DemoTask {
    fn task_definition_id(&self) -> &str {
        DEMO_TASK_ID
    }

    async fn start_execution(
        &self,
        runtime: &dyn TaskRuntime,
        task_id: &str,
        process: &Process,
        _process_context: &Context,
        _task_context: Option<&Context>,
    ) -> CoreResult<StatusUpdate> {
        runtime
            .human_task_system()
            .create(NewHumanTask {
                task_id: task_id.to_string(),
                process_id: process.process_id().to_string(),
                execution_id: process.execution_id().to_string(),
                summary: "Demo verifiable task".to_string(),
                description: "Simple verifiable task".to_string(),
                assignee_group_name: DEMO_TEAM.to_string(),
                assignee_user: None,
                additional_data: None,
                task_type: HumanTaskType::Verifyable,
            })
            .await?;
        tracing::info!(process = %process.process_id(), task = %task_id, "Demo task started");
        Ok(StatusUpdate::new(Status::Running))
    }

    async fn check_status(
        &self,
        runtime: &dyn TaskRuntime,
        task_id: &str,
        process: &Process,
        _process_context: &Context,
        _task_context: Option<&Context>,
    ) -> CoreResult<StatusUpdate> {
        runtime
            .human_task_system()
            .update_status(process.process_id(), task_id, Status::Succeeded, None)
            .await?;
        tracing::info!(process = %process.process_id(), task = %task_id, "Demo task completed");
        Ok(StatusUpdate::new(Status::Succeeded))
    }

    async fn validate(
        &self,
        _task_id: &str,
        _process: &Process,
        _process_context: &Context,
        _task_context: Option<&Context>,
    ) -> CoreResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
