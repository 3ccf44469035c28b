pub mod health;
pub mod resources;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /resources/definitions                            registered resource handlers
/// /resources/tags                                   tag -> handler names
/// /resources/{handler}                              plan a change (POST)
/// /resources/{handler}/currentstate                 read external state (POST)
/// /resources/{handler}/backfill                     next backfill page (GET, POST)
/// /resources/{handler}/tools                        UI tools (POST)
/// /resources/{handler}/metrics                      metric queries (POST)
///
/// /tasks/definitions                                registered task ids
/// /tasks/{task_definition_id}/{task_instance_id}/execution   start (POST)
/// /tasks/{task_definition_id}/{task_instance_id}/status      poll (POST)
/// /tasks/{task_definition_id}/{task_instance_id}/validation  validate (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/resources", resources::router())
        .nest("/tasks", tasks::router())
}
