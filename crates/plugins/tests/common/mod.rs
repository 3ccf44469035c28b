//! Shared fixtures: an in-memory human task system and a runtime around it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use satellite_core::error::RemoteCallError;
use satellite_core::handler::TaskRuntime;
use satellite_core::process::Status;
use satellite_core::remote::{HumanTask, HumanTaskSystem, NewHumanTask};

/// Human tasks keyed by `(process_id, task_id)`.
#[derive(Default)]
pub struct MemoryHts {
    tasks: RwLock<HashMap<(String, String), HumanTask>>,
}

impl MemoryHts {
    pub async fn task(&self, process_id: &str, task_id: &str) -> Option<HumanTask> {
        self.tasks
            .read()
            .await
            .get(&(process_id.to_string(), task_id.to_string()))
            .cloned()
    }

    /// Simulate a person resolving a task.
    pub async fn resolve(&self, process_id: &str, task_id: &str, status: Status) {
        self.update_status(process_id, task_id, status, Some("done"))
            .await
            .unwrap();
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }
}

fn not_found(process_id: &str, task_id: &str) -> RemoteCallError {
    RemoteCallError {
        operation: format!("get human task {process_id}:{task_id}"),
        status: Some(404),
        message: String::new(),
    }
}

#[async_trait]
impl HumanTaskSystem for MemoryHts {
    async fn create(&self, task: NewHumanTask) -> Result<HumanTask, RemoteCallError> {
        let task = HumanTask::from(task);
        self.tasks.write().await.insert(
            (task.process_id.clone(), task.task_id.clone()),
            task.clone(),
        );
        Ok(task)
    }

    async fn get_task(
        &self,
        process_id: &str,
        task_id: &str,
    ) -> Result<HumanTask, RemoteCallError> {
        self.task(process_id, task_id)
            .await
            .ok_or_else(|| not_found(process_id, task_id))
    }

    async fn update_status(
        &self,
        process_id: &str,
        task_id: &str,
        status: Status,
        comment: Option<&str>,
    ) -> Result<(), RemoteCallError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&(process_id.to_string(), task_id.to_string()))
            .ok_or_else(|| not_found(process_id, task_id))?;
        task.task_status = status;
        task.comment = comment.map(str::to_string);
        Ok(())
    }
}

/// Runtime for calling handlers directly.
pub struct TestRuntime {
    pub hts: Arc<MemoryHts>,
    pub dev: bool,
    dir: PathBuf,
}

impl TestRuntime {
    pub fn new(dev: bool) -> Self {
        Self {
            hts: Arc::new(MemoryHts::default()),
            dev,
            dir: std::env::temp_dir(),
        }
    }
}

impl TaskRuntime for TestRuntime {
    fn human_task_system(&self) -> &dyn HumanTaskSystem {
        self.hts.as_ref()
    }

    fn is_dev(&self) -> bool {
        self.dev
    }

    fn config_dir(&self) -> &Path {
        &self.dir
    }

    fn tmp_dir(&self) -> &Path {
        &self.dir
    }
}

/// Turn a `json!` object literal into a context map.
pub fn ctx(value: serde_json::Value) -> satellite_core::types::Context {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
