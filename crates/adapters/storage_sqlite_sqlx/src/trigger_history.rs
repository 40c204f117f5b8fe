//! `SQLite` implementation of [`TriggerHistory`].

use chrono::SecondsFormat;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use vigil_app::ports::TriggerHistory;
use vigil_domain::error::VigilError;
use vigil_domain::id::TriggerRecordId;
use vigil_domain::time::Timestamp;
use vigil_domain::trigger_record::TriggerRecord;

use crate::error::StorageError;

struct Wrapper(TriggerRecord);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let triggered_at: String = row.try_get("triggered_at")?;

        let triggered_at = chrono::DateTime::parse_from_rfc3339(&triggered_at)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?
            .to_utc();

        Ok(Self(TriggerRecord {
            id: TriggerRecordId::from_uuid(id),
            event: row.try_get("event")?,
            triggered_at,
            label: row.try_get("label")?,
            camera: row.try_get("camera")?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO trigger_records (id, event, triggered_at, label, camera)
    VALUES (?, ?, ?, ?, ?)
";

const SELECT_RECENT: &str = "SELECT * FROM trigger_records ORDER BY triggered_at DESC LIMIT ?";
const SELECT_RECENT_BY_EVENT: &str =
    "SELECT * FROM trigger_records WHERE event = ? ORDER BY triggered_at DESC LIMIT ?";
const DELETE: &str = "DELETE FROM trigger_records WHERE id = ?";

fn format_timestamp(at: Timestamp) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `SQLite`-backed trigger history.
pub struct SqliteTriggerHistory {
    pool: SqlitePool,
}

impl SqliteTriggerHistory {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TriggerHistory for SqliteTriggerHistory {
    async fn record(&self, record: TriggerRecord) -> Result<(), VigilError> {
        sqlx::query(INSERT)
            .bind(record.id.as_uuid())
            .bind(&record.event)
            .bind(format_timestamp(record.triggered_at))
            .bind(&record.label)
            .bind(&record.camera)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn recent(
        &self,
        event: Option<&str>,
        limit: usize,
    ) -> Result<Vec<TriggerRecord>, VigilError> {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let query = match event {
            Some(event) => sqlx::query_as(SELECT_RECENT_BY_EVENT).bind(event),
            None => sqlx::query_as(SELECT_RECENT),
        };
        let rows: Vec<Wrapper> = query
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn delete(&self, id: TriggerRecordId) -> Result<u64, VigilError> {
        let result = sqlx::query(DELETE)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }
}
