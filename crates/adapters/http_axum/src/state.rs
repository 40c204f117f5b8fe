//! Shared application state for axum handlers.

use std::sync::Arc;

use vigil_app::ports::{StateStore, TriggerHistory};
use vigil_app::supervisor::EventManager;

/// Application state shared across all axum handlers.
///
/// `Clone` is implemented manually so the store types themselves do not
/// need to be `Clone`.
pub struct AppState<S, H> {
    pub manager: Arc<EventManager<S, H>>,
}

impl<S, H> Clone for AppState<S, H> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<S, H> AppState<S, H>
where
    S: StateStore + Send + Sync + 'static,
    H: TriggerHistory + Send + Sync + 'static,
{
    /// Create the state from a manager shared with the rest of the process.
    pub fn new(manager: Arc<EventManager<S, H>>) -> Self {
        Self { manager }
    }
}
