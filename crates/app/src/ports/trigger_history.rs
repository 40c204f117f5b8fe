//! Trigger history port: append and query past triggers.

use std::future::Future;

use vigil_domain::error::VigilError;
use vigil_domain::id::TriggerRecordId;
use vigil_domain::trigger_record::TriggerRecord;

/// Repository for persisting and querying [`TriggerRecord`]s.
pub trait TriggerHistory {
    fn record(&self, record: TriggerRecord) -> impl Future<Output = Result<(), VigilError>> + Send;

    /// Most recent records, newest first, optionally for one event only.
    fn recent(
        &self,
        event: Option<&str>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<TriggerRecord>, VigilError>> + Send;

    /// Delete a record, returning how many rows went away.
    fn delete(&self, id: TriggerRecordId) -> impl Future<Output = Result<u64, VigilError>> + Send;
}
