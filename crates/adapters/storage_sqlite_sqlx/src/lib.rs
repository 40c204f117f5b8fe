//! # vigil-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `StateStore` and `TriggerHistory` ports defined in `vigil-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `vigil-app` (for port traits) and `vigil-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod pool;
pub mod state_store;
pub mod trigger_history;

pub use pool::{Config, Database};
pub use state_store::SqliteStateStore;
pub use trigger_history::SqliteTriggerHistory;
