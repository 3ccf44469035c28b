//! Route definitions for the `/tasks` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /definitions                      -> list_definitions
/// POST   /{definition}/{instance}/execution -> start_execution
/// POST   /{definition}/{instance}/status    -> check_status
/// POST   /{definition}/{instance}/validation -> validate
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/definitions", get(tasks::list_definitions))
        .route(
            "/{definition}/{instance}/execution",
            post(tasks::start_execution),
        )
        .route("/{definition}/{instance}/status", post(tasks::check_status))
        .route("/{definition}/{instance}/validation", post(tasks::validate))
}
