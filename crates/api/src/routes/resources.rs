//! Route definitions for the `/resources` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::resources;
use crate::state::AppState;

/// Routes mounted at `/resources`.
///
/// ```text
/// GET    /definitions                -> list_definitions
/// GET    /tags                       -> list_tags
/// POST   /{handler}                  -> plan_change
/// POST   /{handler}/currentstate     -> current_state
/// GET    /{handler}/backfill         -> backfill
/// POST   /{handler}/backfill         -> backfill
/// POST   /{handler}/tools            -> tools
/// POST   /{handler}/metrics          -> metrics
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/definitions", get(resources::list_definitions))
        .route("/tags", get(resources::list_tags))
        .route("/{handler}", post(resources::plan_change))
        .route("/{handler}/currentstate", post(resources::current_state))
        .route(
            "/{handler}/backfill",
            get(resources::backfill).post(resources::backfill),
        )
        .route("/{handler}/tools", post(resources::tools))
        .route("/{handler}/metrics", post(resources::metrics))
}
