//! State store port: persistence of event runtime snapshots.

use std::collections::HashMap;
use std::future::Future;

use vigil_domain::error::VigilError;
use vigil_domain::event::EventSnapshot;

/// Keyed store of [`EventSnapshot`]s, one per event name.
pub trait StateStore {
    /// Insert or replace the snapshot of `event`.
    fn save(
        &self,
        event: &str,
        snapshot: &EventSnapshot,
    ) -> impl Future<Output = Result<(), VigilError>> + Send;

    /// Load every stored snapshot.
    fn load_all(
        &self,
    ) -> impl Future<Output = Result<HashMap<String, EventSnapshot>, VigilError>> + Send;
}
