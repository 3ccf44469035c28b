//! Shared fixtures: stub plugins, in-memory collaborators and request helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Method, Request};
use axum::response::Response;
use axum::Router;
use futures::stream;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::RwLock;
use tower::ServiceExt;

use satellite_api::config::SatelliteConfig;
use satellite_api::router::build_app_router;
use satellite_api::state::{AppState, Registries};
use satellite_core::catalog::{CatalogEntry, PluginCatalog};
use satellite_core::error::{CoreError, CoreResult, PlanError, RemoteCallError, ValidationError};
use satellite_core::handler::{BackfillStream, ResourceHandler, TaskHandler, TaskRuntime};
use satellite_core::process::{Process, Status, StatusUpdate, Task, SUCCEED_PROCESS_TASK};
use satellite_core::remote::{HumanTask, HumanTaskSystem, NewHumanTask, ResourceDb};
use satellite_core::resource::{MetricsDefinition, Plan, Resource, ResourceChange, Tool};
use satellite_core::types::Context;

pub const NUMBERS: &str = "test.Numbers";
pub const BROKEN: &str = "test.Broken";
pub const DEMO: &str = "demo.DemoResource";

/// Items in the `Numbers` backfill stream.
pub const NUMBERS_BACKFILL_LEN: usize = 3;

// ---------------------------------------------------------------------------
// Stub plugins
// ---------------------------------------------------------------------------

pub fn resource(id: &str, class: &str, desired: Value) -> Resource {
    serde_json::from_value(json!({
        "id": id,
        "resourceDefinitionClass": class,
        "desiredState": desired,
        "environment": "dev",
        "project": "slate",
        "owner": "alice",
        "region": "us-west-2",
    }))
    .unwrap()
}

/// Plans a single-task process, publishes tools and metrics, and backfills a
/// short fixed stream. A desired `mode: orphan` adds a half-wired task that
/// nothing routes to.
struct Numbers;

impl Numbers {
    fn boxed() -> Box<dyn ResourceHandler> {
        Box::new(Self)
    }
}

#[async_trait]
impl ResourceHandler for Numbers {
    async fn initialize(&mut self, _config_dir: &Path, _db: Arc<dyn ResourceDb>) -> CoreResult<()> {
        Ok(())
    }

    async fn plan_change(&self, change: ResourceChange) -> CoreResult<Plan> {
        let mut process = Process::new("numbers-process");
        process.add_task(Task::with_exits(
            "count",
            "echoTask",
            &[SUCCEED_PROCESS_TASK],
            &[SUCCEED_PROCESS_TASK],
            &[SUCCEED_PROCESS_TASK],
        ))?;
        if change.proposed_resource_object.desired_str("mode") == Some("orphan") {
            process.add_task(
                Task::new("unused", "echoTask").on(Status::Succeeded, &[SUCCEED_PROCESS_TASK]),
            )?;
        }
        process.start_task_id = Some("count".into());
        Ok(Plan::new(change.proposed_resource_object).with_process(process))
    }

    async fn read_external_current_state(&self, resource: &Resource) -> CoreResult<Context> {
        let mut state = resource.desired_state.clone();
        state.insert("observed".into(), Value::Bool(true));
        Ok(state)
    }

    async fn tools(&self, resource: &Resource) -> CoreResult<Vec<Tool>> {
        Ok(vec![Tool {
            label: Some("Console".into()),
            url: Some(format!("https://console.example/{}", resource.id)),
            description: None,
            embed: false,
        }])
    }

    async fn metrics(&self, _resource: &Resource) -> CoreResult<Vec<MetricsDefinition>> {
        Ok(vec![MetricsDefinition {
            metric_label: "requests".into(),
            query: "sum(rate(requests[5m]))".into(),
            warn_threshold: 100.0,
            severe_threshold: 500.0,
        }])
    }

    async fn backfill_resources(&self, _db: Arc<dyn ResourceDb>) -> Option<BackfillStream> {
        let items: Vec<Resource> = (0..NUMBERS_BACKFILL_LEN)
            .map(|i| resource(&format!("n-{i}"), NUMBERS, json!({ "n": i })))
            .collect();
        Some(Box::pin(stream::iter(items)))
    }

    fn tags(&self) -> Vec<String> {
        vec!["Infra".into(), "Shared".into()]
    }

    fn simple_name(&self) -> &str {
        "Numbers"
    }
}

/// Fails every operation that can fail. A desired `mode: dangling` plans a
/// process whose graph points at a missing task.
struct Broken;

impl Broken {
    fn boxed() -> Box<dyn ResourceHandler> {
        Box::new(Self)
    }
}

#[async_trait]
impl ResourceHandler for Broken {
    async fn initialize(&mut self, _config_dir: &Path, _db: Arc<dyn ResourceDb>) -> CoreResult<()> {
        Ok(())
    }

    async fn plan_change(&self, change: ResourceChange) -> CoreResult<Plan> {
        if change.proposed_resource_object.desired_str("mode") == Some("dangling") {
            let mut process = Process::new("broken-process");
            process.add_task(Task::new("first", "echoTask").on(Status::Succeeded, &["nowhere"]))?;
            process.start_task_id = Some("first".into());
            return Ok(Plan::new(change.proposed_resource_object).with_process(process));
        }
        Err(PlanError::new("Quota exceeded for project slate").into())
    }

    async fn read_external_current_state(&self, _resource: &Resource) -> CoreResult<Context> {
        Err(CoreError::handler("Cloud API unavailable"))
    }

    async fn tools(&self, _resource: &Resource) -> CoreResult<Vec<Tool>> {
        Ok(Vec::new())
    }

    fn tags(&self) -> Vec<String> {
        vec!["Shared".into()]
    }
}

/// Starts unless its task context says `error` or `explode` (panics).
struct EchoTask;

impl EchoTask {
    fn boxed() -> Box<dyn TaskHandler> {
        Box::new(Self)
    }
}

#[async_trait]
impl TaskHandler for EchoTask {
    fn task_definition_id(&self) -> &str {
        "echoTask"
    }

    async fn start_execution(
        &self,
        _runtime: &dyn TaskRuntime,
        _task_id: &str,
        _process: &Process,
        _process_context: &Context,
        task_context: Option<&Context>,
    ) -> CoreResult<StatusUpdate> {
        match task_context.and_then(|c| c.get("status")).and_then(Value::as_str) {
            Some("explode") => panic!("echo task exploded"),
            Some("error") => Err(CoreError::handler("Echo backend unreachable")),
            Some(_) | None => Ok(StatusUpdate::new(Status::Running).with_std_out("started")),
        }
    }

    async fn check_status(
        &self,
        _runtime: &dyn TaskRuntime,
        _task_id: &str,
        _process: &Process,
        _process_context: &Context,
        _task_context: Option<&Context>,
    ) -> CoreResult<StatusUpdate> {
        Ok(StatusUpdate::new(Status::Succeeded))
    }

    async fn validate(
        &self,
        _task_id: &str,
        _process: &Process,
        _process_context: &Context,
        task_context: Option<&Context>,
    ) -> CoreResult<()> {
        match task_context.and_then(|c| c.get("status")) {
            Some(_) => Ok(()),
            None => Err(ValidationError::new("Missing status").into()),
        }
    }
}

pub fn test_catalog() -> PluginCatalog {
    satellite_plugins::builtin_catalog()
        .with(CatalogEntry::resource("Numbers", Numbers::boxed))
        .with(CatalogEntry::resource("Broken", Broken::boxed))
        .with(CatalogEntry::task("EchoTask", EchoTask::boxed))
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

pub struct EmptyDb;

#[async_trait]
impl ResourceDb for EmptyDb {
    async fn get_resource_by_id(&self, id: &str) -> Result<Resource, RemoteCallError> {
        Err(RemoteCallError {
            operation: format!("find resource {id}"),
            status: Some(404),
            message: String::new(),
        })
    }
}

/// Human tasks keyed by `(process_id, task_id)`.
#[derive(Default)]
pub struct MemoryHts {
    tasks: RwLock<HashMap<(String, String), HumanTask>>,
}

impl MemoryHts {
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
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
        self.tasks
            .read()
            .await
            .get(&(process_id.to_string(), task_id.to_string()))
            .cloned()
            .ok_or_else(|| RemoteCallError {
                operation: format!("get human task {process_id}:{task_id}"),
                status: Some(404),
                message: String::new(),
            })
    }

    async fn update_status(
        &self,
        _process_id: &str,
        _task_id: &str,
        _status: Status,
        _comment: Option<&str>,
    ) -> Result<(), RemoteCallError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// A router over the stub and built-in plugins. Keep it alive for the
/// duration of the test: it owns the descriptor directory.
pub struct TestApp {
    pub router: Router,
    pub hts: Arc<MemoryHts>,
    _plugins: TempDir,
}

pub fn write_descriptors(dir: &Path) {
    fs::write(
        dir.join("demo.yaml"),
        "module: demo\nplugins: [DemoResource, DemoTask]\nrequires: [GroupApprovalTask]\n",
    )
    .unwrap();
    fs::write(dir.join("tasks.yaml"), "plugins: [HumanTask, HttpCallTask]\n").unwrap();
    fs::write(
        dir.join("test.yaml"),
        "module: test\nplugins: [Numbers, Broken, EchoTask]\n",
    )
    .unwrap();
}

pub fn test_config(plugins: &Path) -> SatelliteConfig {
    SatelliteConfig::from_yaml(&format!(
        "enableDevelopment: false\n\
         resourceDefinitionScanDirs: [{dir}]\n\
         taskDefinitionScanDirs: [{dir}]\n",
        dir = plugins.display()
    ))
    .unwrap()
}

/// Build the full application router the way `main.rs` does, with in-memory
/// collaborators.
pub async fn build_test_app() -> TestApp {
    let plugins = TempDir::new().unwrap();
    write_descriptors(plugins.path());
    let config = test_config(plugins.path());

    let resource_db: Arc<dyn ResourceDb> = Arc::new(EmptyDb);
    let hts = Arc::new(MemoryHts::default());
    let (resources, tasks) = Registries::new()
        .load(&config, &test_catalog(), Arc::clone(&resource_db))
        .await
        .unwrap();

    let state = AppState::new(&config, resources, tasks, resource_db, hts.clone());
    TestApp {
        router: build_app_router(state),
        hts,
        _plugins: plugins,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &TestApp, uri: &str) -> Response {
    send(app, Method::GET, uri, Body::empty()).await
}

pub async fn post_json(app: &TestApp, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, Body::from(body.to_string())).await
}

async fn send(app: &TestApp, method: Method, uri: &str, body: Body) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
