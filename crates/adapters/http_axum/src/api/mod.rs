//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod commands;
pub mod state;

use axum::Router;
use axum::routing::{get, post};

use vigil_app::ports::{StateStore, TriggerHistory};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<S, H>() -> Router<AppState<S, H>>
where
    S: StateStore + Send + Sync + 'static,
    H: TriggerHistory + Send + Sync + 'static,
{
    Router::new()
        .route("/state", get(state::get))
        .route("/commands/{name}", post(commands::invoke))
}
