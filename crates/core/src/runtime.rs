//! Task runtime dispatch.
//!
//! Routes a `(taskDefinitionId, taskInstanceId)` pair plus caller-supplied
//! process state onto the registered [`TaskHandler`]. No retries and no status
//! interpretation happen here: the handler's result or error is returned as is.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CoreResult;
use crate::handler::{TaskHandler, TaskRuntime};
use crate::process::{Process, StatusUpdate};
use crate::registry::TaskRegistry;
use crate::remote::HumanTaskSystem;

/// Settings handed to every task handler invocation.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub development: bool,
    pub config_dir: PathBuf,
    pub tmp_dir: PathBuf,
}

/// In-process [`TaskRuntime`] backed by the task registry.
pub struct LocalTaskRuntime {
    settings: RuntimeSettings,
    hts: Arc<dyn HumanTaskSystem>,
    tasks: Arc<TaskRegistry>,
}

impl LocalTaskRuntime {
    pub fn new(
        settings: RuntimeSettings,
        hts: Arc<dyn HumanTaskSystem>,
        tasks: Arc<TaskRegistry>,
    ) -> Self {
        Self {
            settings,
            hts,
            tasks,
        }
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    fn handler(&self, task_definition_id: &str) -> CoreResult<&Arc<dyn TaskHandler>> {
        self.tasks.get(task_definition_id)
    }

    pub async fn start_execution(
        &self,
        task_definition_id: &str,
        instance_id: &str,
        process: &Process,
    ) -> CoreResult<StatusUpdate> {
        let handler = self.handler(task_definition_id)?;
        let task_context = process.task_context(instance_id)?;
        tracing::info!(
            task = %task_definition_id,
            instance = %instance_id,
            process = %process.process_id(),
            "Starting task execution"
        );
        handler
            .start_execution(
                self,
                instance_id,
                process,
                &process.process_context,
                task_context,
            )
            .await
    }

    pub async fn check_status(
        &self,
        task_definition_id: &str,
        instance_id: &str,
        process: &Process,
    ) -> CoreResult<StatusUpdate> {
        let handler = self.handler(task_definition_id)?;
        let task_context = process.task_context(instance_id)?;
        tracing::debug!(
            task = %task_definition_id,
            instance = %instance_id,
            process = %process.process_id(),
            "Checking task status"
        );
        handler
            .check_status(
                self,
                instance_id,
                process,
                &process.process_context,
                task_context,
            )
            .await
    }

    pub async fn validate(
        &self,
        task_definition_id: &str,
        instance_id: &str,
        process: &Process,
    ) -> CoreResult<()> {
        let handler = self.handler(task_definition_id)?;
        let task_context = process.task_context(instance_id)?;
        handler
            .validate(instance_id, process, &process.process_context, task_context)
            .await
    }
}

impl TaskRuntime for LocalTaskRuntime {
    fn human_task_system(&self) -> &dyn HumanTaskSystem {
        self.hts.as_ref()
    }

    fn is_dev(&self) -> bool {
        self.settings.development
    }

    fn config_dir(&self) -> &Path {
        &self.settings.config_dir
    }

    fn tmp_dir(&self) -> &Path {
        &self.settings.tmp_dir
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::error::{CoreError, RemoteCallError, ValidationError};
    use crate::process::Status;
    use crate::remote::{HumanTask, NewHumanTask};
    use crate::types::Context;

    struct NoHts;

    #[async_trait]
    impl HumanTaskSystem for NoHts {
        async fn create(&self, _task: NewHumanTask) -> Result<HumanTask, RemoteCallError> {
            unimplemented!()
        }

        async fn get_task(&self, _p: &str, _t: &str) -> Result<HumanTask, RemoteCallError> {
            unimplemented!()
        }

        async fn update_status(
            &self,
            _p: &str,
            _t: &str,
            _s: Status,
            _c: Option<&str>,
        ) -> Result<(), RemoteCallError> {
            unimplemented!()
        }
    }

    /// Reports what it was handed so tests can inspect the routing.
    struct Probe;

    #[async_trait]
    impl TaskHandler for Probe {
        fn task_definition_id(&self) -> &str {
            "probe"
        }

        async fn start_execution(
            &self,
            runtime: &dyn TaskRuntime,
            task_id: &str,
            _process: &Process,
            process_context: &Context,
            task_context: Option<&Context>,
        ) -> CoreResult<StatusUpdate> {
            let seen = match task_context {
                Some(ctx) => format!("{task_id}:{}", Value::Object(ctx.clone())),
                None => format!("{task_id}:none"),
            };
            Ok(StatusUpdate::new(Status::Running)
                .with_std_out(seen)
                .with_std_err(format!(
                    "keys={} dev={}",
                    process_context.len(),
                    runtime.is_dev()
                )))
        }

        async fn check_status(
            &self,
            _runtime: &dyn TaskRuntime,
            _task_id: &str,
            _process: &Process,
            _process_context: &Context,
            _task_context: Option<&Context>,
        ) -> CoreResult<StatusUpdate> {
            Err(CoreError::handler("remote went away"))
        }

        async fn validate(
            &self,
            _task_id: &str,
            _process: &Process,
            _process_context: &Context,
            task_context: Option<&Context>,
        ) -> CoreResult<()> {
            match task_context.and_then(|c| c.get("required")) {
                Some(_) => Ok(()),
                None => Err(ValidationError::new("required is missing").into()),
            }
        }
    }

    fn runtime() -> LocalTaskRuntime {
        let mut tasks = TaskRegistry::new();
        tasks.insert(Arc::new(Probe)).unwrap();
        LocalTaskRuntime::new(
            RuntimeSettings {
                development: true,
                config_dir: PathBuf::from("/tmp/taskconfig"),
                tmp_dir: PathBuf::from("/tmp/tasktmp"),
            },
            Arc::new(NoHts),
            Arc::new(tasks),
        )
    }

    fn process(context: Value) -> Process {
        let mut process = Process::new("p-1");
        if let Value::Object(map) = context {
            process.process_context = map;
        }
        process
    }

    #[tokio::test]
    async fn passes_task_sub_context() {
        let rt = runtime();
        let process = process(json!({ "step": { "a": 1 }, "shared": true }));

        let update = rt.start_execution("probe", "step", &process).await.unwrap();
        assert_eq!(update.status, Status::Running);
        assert_eq!(update.std_out.as_deref(), Some(r#"step:{"a":1}"#));
        assert_eq!(update.std_err.as_deref(), Some("keys=2 dev=true"));
    }

    #[tokio::test]
    async fn absent_sub_context_is_none() {
        let rt = runtime();
        let update = rt
            .start_execution("probe", "other", &process(json!({})))
            .await
            .unwrap();
        assert_eq!(update.std_out.as_deref(), Some("other:none"));
    }

    #[tokio::test]
    async fn unknown_task_definition_is_not_found() {
        let rt = runtime();
        assert_matches!(
            rt.start_execution("missing", "x", &process(json!({}))).await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn handler_errors_pass_through() {
        let rt = runtime();
        let proc = process(json!({}));
        assert_matches!(
            rt.check_status("probe", "x", &proc).await,
            Err(CoreError::Handler(msg)) if msg == "remote went away"
        );
        assert_matches!(
            rt.validate("probe", "x", &proc).await,
            Err(CoreError::Validation(_))
        );
        assert!(rt
            .validate("probe", "x", &process(json!({ "x": { "required": 1 } })))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn malformed_sub_context_is_a_validation_error() {
        let rt = runtime();
        assert_matches!(
            rt.validate("probe", "x", &process(json!({ "x": "not a map" }))).await,
            Err(CoreError::Validation(_))
        );
    }
}
