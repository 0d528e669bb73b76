//! Database layer for the Arbor event journal.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization
//! and embedded SQL migrations. The persisted event journal is the only
//! table family Arbor keeps on disk; every table is created through
//! versioned migrations managed by this crate.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, open_journal_pool, DbPool, DbRuntimeSettings, PoolError};
