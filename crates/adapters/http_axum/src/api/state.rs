//! `GET /api/state`: report of every event.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use vigil_app::ports::{StateStore, TriggerHistory};
use vigil_app::supervisor::StateFilter;
use vigil_domain::manager::StateReport;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StateQuery {
    #[serde(default)]
    pub new_triggers_only: bool,
}

impl StateQuery {
    fn filter(&self) -> StateFilter {
        if self.new_triggers_only {
            StateFilter::NewTriggersOnly
        } else {
            StateFilter::All
        }
    }
}

pub async fn get<S, H>(
    State(state): State<AppState<S, H>>,
    Query(query): Query<StateQuery>,
) -> Json<StateReport>
where
    S: StateStore + Send + Sync + 'static,
    H: TriggerHistory + Send + Sync + 'static,
{
    Json(state.manager.get_state(query.filter()).await)
}
