//! `POST /api/commands/{name}`: invoke a manager command.
//!
//! The body is an optional JSON object holding the command arguments.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde_json::Value;

use vigil_app::ports::{StateStore, TriggerHistory};
use vigil_domain::error::VigilError;

use crate::error::ApiError;
use crate::state::AppState;

fn parse_args(body: &[u8]) -> Result<Value, VigilError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    match serde_json::from_slice(body) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(VigilError::InvalidArgument(
            "command arguments must be a JSON object".to_string(),
        )),
        Err(err) => Err(VigilError::InvalidArgument(err.to_string())),
    }
}

pub async fn invoke<S, H>(
    State(state): State<AppState<S, H>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError>
where
    S: StateStore + Send + Sync + 'static,
    H: TriggerHistory + Send + Sync + 'static,
{
    let args = parse_args(&body)?;
    tracing::debug!(command = %name, "invoking command");
    let result = state.manager.invoke_command(&name, &args).await?;
    Ok(Json(result))
}
