//! Diffing live SQLite databases and turning the result into a changelog.

use chrono::Utc;
use keel_core::changelog::{build_default_change_generators, DiffToChangeLog};
use keel_core::database::Database;
use keel_core::diff::{compare, CompareControl, DiffResult};
use keel_core::Snapshot;
use sqlx::sqlite::SqlitePool;
use tracing::info;

use crate::changelog::{ChangeSet, DatabaseChangeLog};
use crate::error::Result;
use crate::introspect::SqliteIntrospector;

/// Snapshots of a reference and a target database.
///
/// The reference is the desired schema; changes generated from the diff
/// bring the target in line with it.
#[derive(Debug, Clone)]
pub struct SchemaDiff {
    reference: Snapshot,
    target: Snapshot,
    control: CompareControl,
}

impl SchemaDiff {
    /// Wraps two existing snapshots.
    #[must_use]
    pub fn new(reference: Snapshot, target: Snapshot) -> Self {
        Self {
            reference,
            target,
            control: CompareControl::default(),
        }
    }

    /// Reads both schemas.
    pub async fn read(reference: &SqlitePool, target: &SqlitePool) -> Result<Self> {
        let reference = SqliteIntrospector::new(reference.clone()).snapshot().await?;
        let target = SqliteIntrospector::new(target.clone()).snapshot().await?;
        Ok(Self::new(reference, target))
    }

    /// Replaces the compare control.
    #[must_use]
    pub fn with_control(mut self, control: CompareControl) -> Self {
        self.control = control;
        self
    }

    /// Compares the snapshots.
    #[must_use]
    pub fn result(&self) -> DiffResult<'_> {
        compare(&self.reference, &self.target, &self.control)
    }

    /// One line per difference, or `No differences found`.
    #[must_use]
    pub fn summary(&self) -> String {
        self.result().summary()
    }

    /// Generates a changelog that brings the target in line with the
    /// reference, rendered for `database`.
    ///
    /// Change sets are numbered `<id_root>-1`, `<id_root>-2`, ... and
    /// carry one change each.
    ///
    /// # Errors
    ///
    /// Returns a core error if the change generators are ambiguous or
    /// their ordering hints contradict each other.
    pub fn to_changelog(
        &self,
        database: &dyn Database,
        id_root: &str,
        author: &str,
        filename: &str,
    ) -> Result<DatabaseChangeLog> {
        let generators = build_default_change_generators();
        let generated = DiffToChangeLog::new(&generators).generate_change_sets(
            &self.result(),
            database,
            id_root,
            author,
        )?;
        info!(
            count = generated.len(),
            database = database.short_name(),
            "Generated changelog from diff"
        );
        DatabaseChangeLog::new(
            generated
                .into_iter()
                .map(|change_set| ChangeSet::from(change_set).filename(filename))
                .collect(),
        )
    }
}

/// Default change set id root: the current UTC time, to the second.
#[must_use]
pub fn default_id_root() -> String {
    Utc::now().format("%Y%m%d%H%M%S").to_string()
}
