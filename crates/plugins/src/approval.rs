//! Group approval: a human task that blocks the workflow until a member of the
//! approving group signs off in the human task system.

use async_trait::async_trait;
use serde_json::Value;

use satellite_core::error::{CoreResult, ValidationError};
use satellite_core::handler::{TaskHandler, TaskRuntime};
use satellite_core::process::{Process, Status, StatusUpdate};
use satellite_core::remote::{HumanTaskType, NewHumanTask};
use satellite_core::types::Context;

use crate::context::{optional_str, require, require_str};

pub const TASK_DEFINITION_ID: &str = "groupApprovalTask";

/// Task context keys.
pub const ASSIGNEE_USER: &str = "assigneeUser";
pub const ASSIGNEE_GROUP: &str = "approvalGroup";
pub const SUMMARY: &str = "summary";
pub const DESCRIPTION: &str = "description";
pub const ADDITIONAL_DATA: &str = "diff";

#[derive(Debug, Default)]
pub struct GroupApprovalTask;

impl GroupApprovalTask {
    pub fn boxed() -> Box<dyn TaskHandler> {
        Box::new(Self)
    }
}

#[async_trait]
impl TaskHandler for GroupApprovalTask {
    fn task_definition_id(&self) -> &str {
        TASK_DEFINITION_ID
    }

    async fn start_execution(
        &self,
        runtime: &dyn TaskRuntime,
        task_id: &str,
        process: &Process,
        _process_context: &Context,
        task_context: Option<&Context>,
    ) -> CoreResult<StatusUpdate> {
        let Some(group) = optional_str(task_context, ASSIGNEE_GROUP) else {
            return Ok(StatusUpdate::failed(
                "Invalid approval task as it's missing required approvalGroup",
            ));
        };

        let task = NewHumanTask {
            task_id: task_id.to_string(),
            process_id: process.process_id().to_string(),
            execution_id: process.execution_id().to_string(),
            summary: require_str(task_context, SUMMARY)?.to_string(),
            description: require_str(task_context, DESCRIPTION)?.to_string(),
            assignee_group_name: group.to_string(),
            assignee_user: optional_str(task_context, ASSIGNEE_USER).map(str::to_string),
            additional_data: Some(
                optional_str(task_context, ADDITIONAL_DATA)
                    .unwrap_or_default()
                    .to_string(),
            ),
            task_type: HumanTaskType::Approval,
        };
        runtime.human_task_system().create(task).await?;
        tracing::info!(task = %task_id, %group, "Approval requested");
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
        let task = runtime
            .human_task_system()
            .get_task(process.process_id(), task_id)
            .await?;
        let mut update = StatusUpdate::new(task.task_status);
        if let Some(comment) = task.comment {
            update = update.with_std_out(comment);
        }
        Ok(update)
    }

    async fn validate(
        &self,
        _task_id: &str,
        _process: &Process,
        _process_context: &Context,
        task_context: Option<&Context>,
    ) -> CoreResult<()> {
        if !matches!(require(task_context, ASSIGNEE_GROUP)?, Value::String(_)) {
            return Err(ValidationError::new("Approval group must be a string").into());
        }
        require(task_context, DESCRIPTION)?;
        require(task_context, SUMMARY)?;
        Ok(())
    }
}
