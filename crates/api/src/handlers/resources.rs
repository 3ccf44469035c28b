//! Handlers for the `/resources` resource.
//!
//! Each handler is looked up by its registry key (`"{module}.{symbol}"`).
//! Failures raised by the handler come back as 400 with the error text. A body
//! that does not decode is a 400 as well.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use indexmap::IndexMap;

use satellite_core::handler::ResourceDefinitionInfo;
use satellite_core::resource::{MetricsDefinition, Plan, Resource, ResourceChange, Tool};
use satellite_core::types::Context;

use crate::error::{AppError, AppResult};
use crate::query::BackfillParams;
use crate::state::AppState;

fn bad_body(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// GET /api/v1/resources/definitions
pub async fn list_definitions(
    State(state): State<AppState>,
) -> Json<IndexMap<String, ResourceDefinitionInfo>> {
    Json(state.resources.definitions().clone())
}

/// GET /api/v1/resources/tags
pub async fn list_tags(State(state): State<AppState>) -> Json<IndexMap<String, Vec<String>>> {
    Json(state.resources.tags().clone())
}

/// POST /api/v1/resources/{handler}
///
/// Plan a change. A returned process must form a valid workflow graph.
pub async fn plan_change(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<ResourceChange>, JsonRejection>,
) -> AppResult<Json<Plan>> {
    let Json(change) = body.map_err(bad_body)?;
    let handler = state.resources.get(&name).map_err(AppError::resource)?;
    let plan = handler
        .plan_change(change)
        .await
        .map_err(AppError::resource)?;
    if let Some(process) = &plan.process {
        process.validate_graph().map_err(AppError::resource)?;
    }
    tracing::info!(handler = %name, "Change planned");
    Ok(Json(plan))
}

/// POST /api/v1/resources/{handler}/currentstate
pub async fn current_state(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<Resource>, JsonRejection>,
) -> AppResult<Json<Context>> {
    let Json(resource) = body.map_err(bad_body)?;
    let handler = state.resources.get(&name).map_err(AppError::resource)?;
    let current = handler
        .read_external_current_state(&resource)
        .await
        .map_err(AppError::resource)?;
    Ok(Json(current))
}

/// GET|POST /api/v1/resources/{handler}/backfill?pageSize=N
///
/// 204 with an empty body once nothing is left, or when the handler does not
/// support backfill.
pub async fn backfill(
    State(state): State<AppState>,
    Path(name): Path<String>,
    params: Result<Query<BackfillParams>, QueryRejection>,
) -> AppResult<Response> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let handler = state.resources.get(&name).map_err(AppError::resource)?;

    let page = state
        .backfill
        .next_page(
            &name,
            &**handler,
            Arc::clone(&state.resource_db),
            params.page_size,
        )
        .await;

    Ok(match page {
        Some(resources) => Json(resources).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// POST /api/v1/resources/{handler}/tools
pub async fn tools(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<Resource>, JsonRejection>,
) -> AppResult<Json<Vec<Tool>>> {
    let Json(resource) = body.map_err(bad_body)?;
    let handler = state.resources.get(&name).map_err(AppError::resource)?;
    let tools = handler.tools(&resource).await.map_err(AppError::resource)?;
    Ok(Json(tools))
}

/// POST /api/v1/resources/{handler}/metrics
pub async fn metrics(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<Resource>, JsonRejection>,
) -> AppResult<Json<Vec<MetricsDefinition>>> {
    let Json(resource) = body.map_err(bad_body)?;
    let handler = state.resources.get(&name).map_err(AppError::resource)?;
    let metrics = handler.metrics(&resource).await.map_err(AppError::resource)?;
    Ok(Json(metrics))
}
