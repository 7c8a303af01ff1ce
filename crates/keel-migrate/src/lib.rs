//! Changelog-driven database migrations.
//!
//! `keel-migrate` is the execution side of `keel`. It reads JSON
//! changelogs, runs their change sets against SQLite and keeps track of
//! what ran:
//! - Every applied change set is recorded in `DATABASECHANGELOG` with its
//!   checksum, so edited change sets are detected
//! - A single-row `DATABASECHANGELOGLOCK` table keeps concurrent runs from
//!   migrating the same database
//! - Change sets roll back through explicit rollback changes or the
//!   automatic inverse of their changes
//! - Any changelog can be rendered as a SQL script for another dialect
//!   instead of being executed
//! - Two live databases can be diffed into a new changelog
//!
//! # Example
//!
//! ```rust,ignore
//! use keel_migrate::prelude::*;
//!
//! let pool = connect("sqlite:app.db").await?;
//! let changelog = DatabaseChangeLog::load("changelog.json")?;
//!
//! let executor = Executor::new(pool).contexts(vec!["prod".to_string()]);
//! for status in executor.status(&changelog).await? {
//!     println!("{} {}", status.status, status.identity);
//! }
//! executor.update(&changelog).await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Apply pending change sets
//! keel --url sqlite:app.db --changelog changelog.json update
//!
//! # Print the SQL for PostgreSQL without touching a database
//! keel --changelog changelog.json --dialect postgresql update-sql
//!
//! # Undo the last two change sets
//! keel --url sqlite:app.db --changelog changelog.json rollback --count 2
//!
//! # Generate a changelog from the differences of two databases
//! keel --url sqlite:app.db diff-changelog --reference-url sqlite:dev.db
//! ```

pub mod changelog;
pub mod connection;
pub mod diff;
pub mod error;
pub mod executor;
pub mod history;
pub mod introspect;
pub mod lock;
pub mod render;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::changelog::{ChangeSet, DatabaseChangeLog};
    pub use crate::connection::{connect, to_script};
    pub use crate::diff::{default_id_root, SchemaDiff};
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::{ChangeSetStatus, Executor, RunStatus, DEFAULT_LOCK_WAIT};
    pub use crate::history::{ChangeLogHistory, RanChangeSet};
    pub use crate::introspect::{read_snapshot, SqliteIntrospector};
    pub use crate::lock::{default_lock_owner, ChangeLogLock, LockInfo};
    pub use crate::render::ScriptRenderer;
}
