//! Collaborator contracts: the remote resource database and the human task
//! system, both owned by the orchestrator.
//!
//! Implementations live in `satellite-rpc`. Tests substitute in-memory ones.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteCallError;
use crate::process::Status;
use crate::resource::Resource;

/// Read access to resources known to the orchestrator.
#[async_trait]
pub trait ResourceDb: Send + Sync {
    async fn get_resource_by_id(&self, id: &str) -> Result<Resource, RemoteCallError>;

    /// Fetch several resources, failing on the first error.
    async fn get_resources_by_id(&self, ids: &[String]) -> Result<Vec<Resource>, RemoteCallError> {
        let mut resources = Vec::with_capacity(ids.len());
        for id in ids {
            resources.push(self.get_resource_by_id(id).await?);
        }
        Ok(resources)
    }
}

/// Kind of work a human task asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HumanTaskType {
    Approval,
    NonVerifiable,
    Verifyable,
}

/// A task assigned to a person or group in the human task system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanTask {
    pub task_id: String,
    pub process_id: String,
    pub execution_id: String,
    pub assignee_group_name: String,
    #[serde(default)]
    pub assignee_user: Option<String>,
    pub task_type: HumanTaskType,
    #[serde(default = "default_task_status")]
    pub task_status: Status,
    pub summary: String,
    pub description: String,
    #[serde(default)]
    pub additional_data: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Opaque to the satellite; passed through as the orchestrator sent it.
    #[serde(default)]
    pub create_time: Option<Value>,
    #[serde(default)]
    pub update_time: Option<Value>,
}

fn default_task_status() -> Status {
    Status::NotStarted
}

/// Fields needed to open a new human task.
#[derive(Debug, Clone)]
pub struct NewHumanTask {
    pub task_id: String,
    pub process_id: String,
    pub execution_id: String,
    pub summary: String,
    pub description: String,
    pub assignee_group_name: String,
    pub assignee_user: Option<String>,
    pub additional_data: Option<String>,
    pub task_type: HumanTaskType,
}

impl From<NewHumanTask> for HumanTask {
    /// New tasks are opened already running.
    fn from(new: NewHumanTask) -> Self {
        Self {
            task_id: new.task_id,
            process_id: new.process_id,
            execution_id: new.execution_id,
            assignee_group_name: new.assignee_group_name,
            assignee_user: new.assignee_user,
            task_type: new.task_type,
            task_status: Status::Running,
            summary: new.summary,
            description: new.description,
            additional_data: new.additional_data,
            comment: None,
            create_time: None,
            update_time: None,
        }
    }
}

/// Client for the orchestrator's human task system.
#[async_trait]
pub trait HumanTaskSystem: Send + Sync {
    async fn create(&self, task: NewHumanTask) -> Result<HumanTask, RemoteCallError>;

    async fn get_task(&self, process_id: &str, task_id: &str) -> Result<HumanTask, RemoteCallError>;

    async fn update_status(
        &self,
        process_id: &str,
        task_id: &str,
        status: Status,
        comment: Option<&str>,
    ) -> Result<(), RemoteCallError>;
}
