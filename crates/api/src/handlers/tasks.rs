//! Handlers for the `/tasks` resource.
//!
//! The request body is the full process as the orchestrator holds it; the
//! task context is read from `processContext[taskInstanceId]`.

use axum::extract::{Path, State};
use axum::Json;

use satellite_core::process::{Process, StatusUpdate};

use crate::error::AppResult;
use crate::state::AppState;

/// Path parameters shared by the per-instance task routes.
type TaskPath = Path<(String, String)>;

/// GET /api/v1/tasks/definitions
pub async fn list_definitions(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.runtime.tasks().ids().map(str::to_string).collect())
}

/// POST /api/v1/tasks/{task_definition_id}/{task_instance_id}/execution
pub async fn start_execution(
    State(state): State<AppState>,
    Path((definition_id, instance_id)): TaskPath,
    Json(process): Json<Process>,
) -> AppResult<Json<StatusUpdate>> {
    let update = state
        .runtime
        .start_execution(&definition_id, &instance_id, &process)
        .await?;
    tracing::info!(
        task = %definition_id,
        instance = %instance_id,
        status = %update.status,
        "Task execution started"
    );
    Ok(Json(update))
}

/// POST /api/v1/tasks/{task_definition_id}/{task_instance_id}/status
pub async fn check_status(
    State(state): State<AppState>,
    Path((definition_id, instance_id)): TaskPath,
    Json(process): Json<Process>,
) -> AppResult<Json<StatusUpdate>> {
    let update = state
        .runtime
        .check_status(&definition_id, &instance_id, &process)
        .await?;
    Ok(Json(update))
}

/// POST /api/v1/tasks/{task_definition_id}/{task_instance_id}/validation
///
/// 200 with an empty body when the task context is acceptable.
pub async fn validate(
    State(state): State<AppState>,
    Path((definition_id, instance_id)): TaskPath,
    Json(process): Json<Process>,
) -> AppResult<()> {
    state
        .runtime
        .validate(&definition_id, &instance_id, &process)
        .await?;
    Ok(())
}
