//! `SQLite` implementation of [`StateStore`].
//!
//! Snapshots are stored as JSON, one row per event name.

use std::collections::HashMap;

use chrono::SecondsFormat;
use sqlx::SqlitePool;

use vigil_app::ports::StateStore;
use vigil_domain::error::VigilError;
use vigil_domain::event::EventSnapshot;
use vigil_domain::time;

use crate::error::StorageError;

const UPSERT: &str = r"
    INSERT INTO event_snapshots (name, snapshot, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT (name) DO UPDATE SET
        snapshot = excluded.snapshot,
        updated_at = excluded.updated_at
";

const SELECT_ALL: &str = "SELECT name, snapshot FROM event_snapshots";

/// `SQLite`-backed snapshot store.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl StateStore for SqliteStateStore {
    async fn save(&self, event: &str, snapshot: &EventSnapshot) -> Result<(), VigilError> {
        let json = serde_json::to_string(snapshot).map_err(StorageError::from)?;

        sqlx::query(UPSERT)
            .bind(event)
            .bind(&json)
            .bind(time::now().to_rfc3339_opts(SecondsFormat::Micros, true))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn load_all(&self) -> Result<HashMap<String, EventSnapshot>, VigilError> {
        let rows: Vec<(String, String)> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let mut snapshots = HashMap::with_capacity(rows.len());
        for (name, json) in rows {
            let snapshot: EventSnapshot =
                serde_json::from_str(&json).map_err(StorageError::from)?;
            snapshots.insert(name, snapshot);
        }
        Ok(snapshots)
    }
}
