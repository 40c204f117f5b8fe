//! Storage-specific error type wrapping sqlx errors.

use vigil_domain::error::VigilError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to (de)serialize a stored JSON value.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for VigilError {
    fn from(err: StorageError) -> Self {
        Self::Persistence(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_into_persistence_error() {
        let err: VigilError = StorageError::from(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, VigilError::Persistence(_)));
    }
}
