//! A task that performs one outbound HTTP request.
//!
//! Task context:
//!
//! | key            | meaning                                              |
//! |----------------|------------------------------------------------------|
//! | `method`       | `GET`, `POST`, `PUT` or `DELETE`                     |
//! | `url`          | target URL                                           |
//! | `data`         | optional JSON body                                   |
//! | `successCodes` | optional list of status codes, default 200, 201, 204 |
//! | `useSSL`       | optional; when true the URL must be `https://`       |
//!
//! On success the response body is added to the process context under
//! `/{taskId}/result`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use satellite_core::error::{CoreResult, ValidationError};
use satellite_core::handler::{TaskHandler, TaskRuntime};
use satellite_core::process::{ContextPatch, Process, Status, StatusUpdate};
use satellite_core::types::Context;

use crate::context::{require, require_str};

pub const TASK_DEFINITION_ID: &str = "executeHttpCall";

pub const METHOD: &str = "method";
pub const URL: &str = "url";
pub const DATA: &str = "data";
pub const SUCCESS_CODES: &str = "successCodes";
pub const USE_SSL: &str = "useSSL";
pub const RESULT: &str = "result";

pub const DEFAULT_SUCCESS_CODES: [u16; 3] = [200, 201, 204];

/// Parse a method name, case-insensitively. `None` for anything unsupported.
pub fn parse_method(name: &str) -> Option<Method> {
    match name.to_ascii_uppercase().as_str() {
        "GET" => Some(Method::GET),
        "POST" => Some(Method::POST),
        "PUT" => Some(Method::PUT),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

/// Declared success codes, or the defaults when none are declared.
pub fn success_codes(ctx: Option<&Context>) -> Result<BTreeSet<u16>, ValidationError> {
    let Some(declared) = ctx.and_then(|c| c.get(SUCCESS_CODES)) else {
        return Ok(DEFAULT_SUCCESS_CODES.into_iter().collect());
    };
    let invalid = || ValidationError::new("successCodes must be a list of status codes");
    declared
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|code| {
            code.as_u64()
                .and_then(|c| u16::try_from(c).ok())
                .ok_or_else(invalid)
        })
        .collect()
}

/// Whether `useSSL` is requested. Absent means no.
fn use_ssl(ctx: Option<&Context>) -> Result<bool, ValidationError> {
    match ctx.and_then(|c| c.get(USE_SSL)) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(ValidationError::new("useSSL must be a boolean")),
    }
}

fn failure_message(status: StatusCode) -> String {
    format!(
        "Failed:{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
}

#[derive(Debug, Default)]
pub struct ExecuteHttpCall {
    client: reqwest::Client,
}

impl ExecuteHttpCall {
    pub fn boxed() -> Box<dyn TaskHandler> {
        Box::new(Self::default())
    }

    /// Issue the request and translate the response into a status update.
    async fn call(
        &self,
        task_id: &str,
        method: Method,
        url: &str,
        data: Option<&Value>,
        accepted: &BTreeSet<u16>,
    ) -> StatusUpdate {
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = data {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%url, error = %e, "HTTP task request failed");
                return StatusUpdate::failed(format!("Request failed: {e}"));
            }
        };

        let status = response.status();
        if !accepted.contains(&status.as_u16()) {
            tracing::warn!(%url, %method, status = status.as_u16(), "HTTP task got a failure code");
            return StatusUpdate::failed(failure_message(status));
        }

        match response.text().await {
            Ok(body) => {
                tracing::info!(%url, %method, status = status.as_u16(), "HTTP task succeeded");
                StatusUpdate::new(Status::Succeeded)
                    .with_patch(ContextPatch::add(
                        format!("/{task_id}/{RESULT}"),
                        Value::String(body),
                    ))
            }
            Err(e) => StatusUpdate::failed(format!("Failed to read response body: {e}")),
        }
    }
}

#[async_trait]
impl TaskHandler for ExecuteHttpCall {
    fn task_definition_id(&self) -> &str {
        TASK_DEFINITION_ID
    }

    async fn start_execution(
        &self,
        runtime: &dyn TaskRuntime,
        task_id: &str,
        _process: &Process,
        _process_context: &Context,
        task_context: Option<&Context>,
    ) -> CoreResult<StatusUpdate> {
        if runtime.is_dev() {
            return Ok(StatusUpdate::new(Status::Succeeded)
                .with_std_out("Development mode: HTTP call skipped"));
        }

        let method_name = require_str(task_context, METHOD)?;
        let Some(method) = parse_method(method_name) else {
            return Ok(StatusUpdate::failed(format!("Unsupported method:{method_name}")));
        };
        let url = require_str(task_context, URL)?;
        let accepted = success_codes(task_context)?;
        let data = task_context.and_then(|c| c.get(DATA));

        Ok(self.call(task_id, method, url, data, &accepted).await)
    }

    /// The call completes during execution, so polling reports the status
    /// already recorded on the task node.
    async fn check_status(
        &self,
        _runtime: &dyn TaskRuntime,
        task_id: &str,
        process: &Process,
        _process_context: &Context,
        _task_context: Option<&Context>,
    ) -> CoreResult<StatusUpdate> {
        let task = process
            .all_tasks
            .get(task_id)
            .ok_or_else(|| ValidationError::new(format!("Unknown task instance {task_id}")))?;
        Ok(StatusUpdate::new(task.status))
    }

    async fn validate(
        &self,
        _task_id: &str,
        _process: &Process,
        _process_context: &Context,
        task_context: Option<&Context>,
    ) -> CoreResult<()> {
        let method = require_str(task_context, METHOD)?;
        if parse_method(method).is_none() {
            return Err(ValidationError::new(format!("Unsupported method:{method}")).into());
        }
        let url = require(task_context, URL)?
            .as_str()
            .ok_or_else(|| ValidationError::new("Missing url"))?;
        if use_ssl(task_context)? && !url.starts_with("https://") {
            return Err(ValidationError::new("URL to use SSL must be https://").into());
        }
        success_codes(task_context)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
