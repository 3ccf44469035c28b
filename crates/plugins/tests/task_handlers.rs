//! Built-in task handlers called directly against fake collaborators.

mod common;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use satellite_core::handler::TaskHandler;
use satellite_core::process::{ContextPatch, Process, Status};
use satellite_core::remote::HumanTaskType;
use satellite_core::types::Context;
use satellite_core::CoreError;
use satellite_plugins::{DemoTask, ExecuteHttpCall, GroupApprovalTask};

use common::{ctx, TestRuntime};

fn process() -> Process {
    let mut process = Process::new("p-1");
    process.execution_id = Some("e-1".into());
    process
}

// ---------------------------------------------------------------------------
// Group approval
// ---------------------------------------------------------------------------

fn approval_context() -> Context {
    ctx(json!({
        "approvalGroup": "infra",
        "assigneeUser": "bob",
        "summary": "Approve topic",
        "description": "New topic in prod",
        "diff": "+ topic",
    }))
}

#[tokio::test]
async fn approval_opens_task_and_reports_its_status() {
    let rt = TestRuntime::new(false);
    let task_ctx = approval_context();
    let process = process();

    let started = GroupApprovalTask
        .start_execution(&rt, "approval", &process, &Context::new(), Some(&task_ctx))
        .await
        .unwrap();
    assert_eq!(started.status, Status::Running);

    let opened = rt.hts.task("p-1", "approval").await.unwrap();
    assert_eq!(opened.task_type, HumanTaskType::Approval);
    assert_eq!(opened.assignee_group_name, "infra");
    assert_eq!(opened.assignee_user.as_deref(), Some("bob"));
    assert_eq!(opened.additional_data.as_deref(), Some("+ topic"));
    assert_eq!(opened.execution_id, "e-1");

    let polled = GroupApprovalTask
        .check_status(&rt, "approval", &process, &Context::new(), Some(&task_ctx))
        .await
        .unwrap();
    assert_eq!(polled.status, Status::Running);

    rt.hts.resolve("p-1", "approval", Status::Cancelled).await;
    let polled = GroupApprovalTask
        .check_status(&rt, "approval", &process, &Context::new(), Some(&task_ctx))
        .await
        .unwrap();
    assert_eq!(polled.status, Status::Cancelled);
}

#[tokio::test]
async fn approval_without_group_fails_without_opening_a_task() {
    let rt = TestRuntime::new(false);
    let update = GroupApprovalTask
        .start_execution(&rt, "approval", &process(), &Context::new(), None)
        .await
        .unwrap();
    assert_eq!(update.status, Status::Failed);
    assert!(update.std_err.unwrap().contains("approvalGroup"));
    assert_eq!(rt.hts.len().await, 0);
}

#[tokio::test]
async fn approval_check_for_unknown_task_is_a_remote_error() {
    let rt = TestRuntime::new(false);
    assert_matches!(
        GroupApprovalTask
            .check_status(&rt, "approval", &process(), &Context::new(), None)
            .await,
        Err(CoreError::Remote(e)) if e.status == Some(404)
    );
}

#[tokio::test]
async fn approval_validation() {
    let validate = |value: serde_json::Value| async move {
        let c = ctx(value);
        let result = GroupApprovalTask
            .validate("approval", &process(), &Context::new(), Some(&c))
            .await;
        result
    };

    assert!(validate(serde_json::Value::Object(approval_context())).await.is_ok());
    assert_matches!(
        validate(json!({ "summary": "s", "description": "d" })).await,
        Err(CoreError::Validation(e)) if e.0 == "Missing approvalGroup"
    );
    assert_matches!(
        validate(json!({
            "approvalGroup": { "name": "x" },
            "summary": "s",
            "description": "d",
        }))
        .await,
        Err(CoreError::Validation(e)) if e.0 == "Approval group must be a string"
    );
    assert_matches!(
        validate(json!({ "approvalGroup": "infra", "summary": "s" })).await,
        Err(CoreError::Validation(e)) if e.0 == "Missing description"
    );
    assert_matches!(
        validate(json!({ "approvalGroup": "infra", "description": "d" })).await,
        Err(CoreError::Validation(e)) if e.0 == "Missing summary"
    );
}

// ---------------------------------------------------------------------------
// Demo task
// ---------------------------------------------------------------------------

#[tokio::test]
async fn demo_task_opens_then_closes_verifiable_task() {
    let rt = TestRuntime::new(true);
    let process = process();

    let started = DemoTask
        .start_execution(&rt, "demoTask", &process, &Context::new(), None)
        .await
        .unwrap();
    assert_eq!(started.status, Status::Running);
    let opened = rt.hts.task("p-1", "demoTask").await.unwrap();
    assert_eq!(opened.task_type, HumanTaskType::Verifyable);
    assert_eq!(opened.task_status, Status::Running);

    let done = DemoTask
        .check_status(&rt, "demoTask", &process, &Context::new(), None)
        .await
        .unwrap();
    assert_eq!(done.status, Status::Succeeded);
    assert_eq!(
        rt.hts.task("p-1", "demoTask").await.unwrap().task_status,
        Status::Succeeded
    );
}

// ---------------------------------------------------------------------------
// HTTP call
// ---------------------------------------------------------------------------

async fn run_http(task_ctx: Context) -> satellite_core::process::StatusUpdate {
    let rt = TestRuntime::new(false);
    let update = ExecuteHttpCall::default()
        .start_execution(&rt, "call", &process(), &Context::new(), Some(&task_ctx))
        .await
        .unwrap();
    update
}

#[tokio::test]
async fn http_call_default_success_codes() {
    let server = MockServer::start().await;
    for (route, code) in [
        ("/ok", 200),
        ("/created", 201),
        ("/empty", 204),
        ("/accepted", 202),
        ("/missing", 404),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(code))
            .mount(&server)
            .await;
    }

    for route in ["/ok", "/created", "/empty"] {
        let url = format!("{}{route}", server.uri());
        let update = run_http(ctx(json!({ "method": "GET", "url": url }))).await;
        assert_eq!(update.status, Status::Succeeded, "{route}");
    }

    let url = format!("{}/accepted", server.uri());
    let update = run_http(ctx(json!({ "method": "GET", "url": url }))).await;
    assert_eq!(update.status, Status::Failed);
    assert_eq!(update.std_err.as_deref(), Some("Failed:202 Accepted"));

    let url = format!("{}/missing", server.uri());
    let update = run_http(ctx(json!({ "method": "GET", "url": url }))).await;
    assert_eq!(update.status, Status::Failed);
    assert_eq!(update.std_err.as_deref(), Some("Failed:404 Not Found"));
}

#[tokio::test]
async fn http_call_posts_data_and_records_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics"))
        .and(body_json(json!({ "name": "alpha" })))
        .respond_with(ResponseTemplate::new(202).set_body_string("queued"))
        .expect(1)
        .mount(&server)
        .await;

    let update = run_http(ctx(json!({
        "method": "post",
        "url": format!("{}/topics", server.uri()),
        "data": { "name": "alpha" },
        "successCodes": [202],
    })))
    .await;

    assert_eq!(update.status, Status::Succeeded);
    assert_eq!(
        update.process_context_update,
        vec![ContextPatch::add("/call/result", json!("queued"))]
    );

    let mut context = ctx(json!({ "call": { "method": "post" } }));
    update.process_context_update[0].apply(&mut context).unwrap();
    assert_eq!(context["call"]["result"], "queued");
}

#[tokio::test]
async fn http_call_unsupported_method_fails() {
    let update = run_http(ctx(json!({ "method": "PATCH", "url": "https://x" }))).await;
    assert_eq!(update.status, Status::Failed);
    assert_eq!(update.std_err.as_deref(), Some("Unsupported method:PATCH"));
}

#[tokio::test]
async fn http_call_short_circuits_in_development() {
    let rt = TestRuntime::new(true);
    let task_ctx = ctx(json!({ "method": "GET", "url": "http://127.0.0.1:9/unreachable" }));
    let update = ExecuteHttpCall::default()
        .start_execution(&rt, "call", &process(), &Context::new(), Some(&task_ctx))
        .await
        .unwrap();
    assert_eq!(update.status, Status::Succeeded);
}
