//! Changelog execution against SQLite.
//!
//! Every operation that writes takes the changelog lock first and always
//! releases it, whether the operation succeeded or not. Each change set
//! runs in its own transaction together with its history row.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use keel_core::change::Change;
use keel_core::database::SqliteDatabase;
use keel_core::sqlgen::{build_default_registry, SqlGeneratorRegistry};
use keel_core::ValidationErrors;
use sqlx::sqlite::SqlitePool;
use sqlx::{Connection, SqliteConnection};
use tracing::{debug, info, warn};

use crate::changelog::{ChangeSet, DatabaseChangeLog};
use crate::connection::execute_all;
use crate::error::{MigrateError, Result};
use crate::history::{ChangeLogHistory, RanChangeSet};
use crate::introspect::{read_snapshot, SqliteIntrospector};
use crate::lock::{default_lock_owner, ChangeLogLock};
use crate::render::ScriptRenderer;

/// How long [`Executor`] waits for the changelog lock by default.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(300);

/// What an update would do with a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Never ran; will run.
    NotRan,
    /// Ran with the same checksum; skipped.
    AlreadyRan,
    /// Ran, but marked to run on every update.
    RunAgain,
    /// Edited since it ran and marked to re-run on change.
    Changed,
    /// Edited since it ran; an update fails.
    ChecksumMismatch,
    /// Not part of the active contexts; skipped.
    Excluded,
}

impl RunStatus {
    /// Returns `true` if an update runs the change set.
    #[must_use]
    pub const fn will_run(self) -> bool {
        matches!(self, Self::NotRan | Self::RunAgain | Self::Changed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotRan => "not ran",
            Self::AlreadyRan => "ran",
            Self::RunAgain => "runs always",
            Self::Changed => "changed, will re-run",
            Self::ChecksumMismatch => "checksum mismatch",
            Self::Excluded => "excluded by context",
        };
        write!(f, "{text}")
    }
}

/// Status of one change set of the changelog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetStatus {
    /// `filename::id::author`.
    pub identity: String,
    /// What an update would do.
    pub status: RunStatus,
    /// Description of the changes.
    pub description: String,
}

fn status_of(change_set: &ChangeSet, ran: &[RanChangeSet], contexts: &[String]) -> Result<RunStatus> {
    if !change_set.matches_contexts(contexts) {
        return Ok(RunStatus::Excluded);
    }
    let Some(row) = ran.iter().find(|row| row.is(change_set)) else {
        return Ok(RunStatus::NotRan);
    };
    let checksum = change_set.checksum()?;
    let unchanged = row.md5sum.as_deref().is_none_or(|stored| stored == checksum);
    Ok(match (unchanged, change_set.run_always, change_set.run_on_change) {
        (true, true, _) => RunStatus::RunAgain,
        (true, false, _) => RunStatus::AlreadyRan,
        (false, _, true) => RunStatus::Changed,
        (false, _, false) => RunStatus::ChecksumMismatch,
    })
}

fn collect_errors(mut errors: Vec<MigrateError>) -> Result<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(MigrateError::Multiple(errors)),
    }
}

/// How a change set's history row changes after its changes ran.
#[derive(Debug, Clone, Copy)]
enum Record {
    Ran(i64),
    Removed,
}

/// Applies and rolls back changelogs on a SQLite database.
#[derive(Debug, Clone)]
pub struct Executor {
    pool: SqlitePool,
    registry: Arc<SqlGeneratorRegistry>,
    history: ChangeLogHistory,
    lock: ChangeLogLock,
    introspector: SqliteIntrospector,
    dry_run: bool,
    lock_wait: Duration,
    locked_by: String,
    contexts: Vec<String>,
}

impl Executor {
    /// Creates an executor with the default generators.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_registry(pool, Arc::new(build_default_registry()))
    }

    /// Creates an executor with a custom generator registry.
    #[must_use]
    pub fn with_registry(pool: SqlitePool, registry: Arc<SqlGeneratorRegistry>) -> Self {
        Self {
            history: ChangeLogHistory::new(pool.clone(), Arc::clone(&registry)),
            lock: ChangeLogLock::new(pool.clone(), Arc::clone(&registry)),
            introspector: SqliteIntrospector::new(pool.clone()),
            pool,
            registry,
            dry_run: false,
            lock_wait: DEFAULT_LOCK_WAIT,
            locked_by: default_lock_owner(),
            contexts: Vec::new(),
        }
    }

    /// Print SQL instead of executing it.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// How long to wait for the changelog lock.
    #[must_use]
    pub const fn lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    /// Owner recorded in the lock table.
    #[must_use]
    pub fn locked_by(mut self, owner: impl Into<String>) -> Self {
        self.locked_by = owner.into();
        self
    }

    /// Active contexts. Empty runs every change set.
    #[must_use]
    pub fn contexts(mut self, contexts: Vec<String>) -> Self {
        self.contexts = contexts;
        self
    }

    /// The history service.
    #[must_use]
    pub const fn history(&self) -> &ChangeLogHistory {
        &self.history
    }

    /// The lock service.
    #[must_use]
    pub const fn lock(&self) -> &ChangeLogLock {
        &self.lock
    }

    /// Reports what an update would do with each change set.
    pub async fn status(&self, changelog: &DatabaseChangeLog) -> Result<Vec<ChangeSetStatus>> {
        let ran = self.history.ran_change_sets().await?;
        changelog
            .change_sets
            .iter()
            .map(|change_set| -> Result<ChangeSetStatus> {
                Ok(ChangeSetStatus {
                    identity: change_set.identity(),
                    status: status_of(change_set, &ran, &self.contexts)?,
                    description: change_set.description(),
                })
            })
            .collect()
    }

    /// Returns the change sets an update would run, in changelog order.
    ///
    /// # Errors
    ///
    /// Returns every [`MigrateError::ChecksumMismatch`] found.
    pub async fn pending<'c>(&self, changelog: &'c DatabaseChangeLog) -> Result<Vec<&'c ChangeSet>> {
        let ran = self.history.ran_change_sets().await?;
        let mut pending = Vec::new();
        let mut errors = Vec::new();
        for change_set in &changelog.change_sets {
            match status_of(change_set, &ran, &self.contexts)? {
                RunStatus::ChecksumMismatch => {
                    let expected = ran
                        .iter()
                        .find(|row| row.is(change_set))
                        .and_then(|row| row.md5sum.clone())
                        .unwrap_or_default();
                    errors.push(MigrateError::ChecksumMismatch {
                        change_set: change_set.identity(),
                        expected,
                        actual: change_set.checksum()?,
                    });
                }
                status if status.will_run() => pending.push(change_set),
                _ => {}
            }
        }
        collect_errors(errors)?;
        Ok(pending)
    }

    /// Runs every pending change set. Returns how many ran.
    ///
    /// All pending change sets are validated before the first one runs.
    pub async fn update(&self, changelog: &DatabaseChangeLog) -> Result<usize> {
        if self.dry_run {
            print!("{}", self.update_sql(changelog).await?);
            return Ok(0);
        }
        self.lock.wait_for_lock(&self.locked_by, self.lock_wait).await?;
        let result = self.run_update(changelog).await;
        self.release(result).await
    }

    async fn run_update(&self, changelog: &DatabaseChangeLog) -> Result<usize> {
        self.history.ensure_table().await?;
        let pending = self.pending(changelog).await?;
        let mut errors = Vec::new();
        for change_set in &pending {
            self.validate(&change_set.identity(), &change_set.changes, &mut errors);
        }
        collect_errors(errors)?;

        let mut order = self.history.next_order().await?;
        for change_set in &pending {
            info!(change_set = %change_set.identity(), order, "Applying change set");
            self.execute(change_set, &change_set.changes, Record::Ran(order))
                .await?;
            order += 1;
        }
        info!(count = pending.len(), "Update complete");
        Ok(pending.len())
    }

    /// Renders the SQL an update would run, including history inserts.
    ///
    /// Rebuilds are rendered against the live schema, so a change set that
    /// rebuilds a table created earlier in the same script fails to render.
    pub async fn update_sql(&self, changelog: &DatabaseChangeLog) -> Result<String> {
        let pending = self.pending(changelog).await?;
        let database = SqliteDatabase::new().with_snapshot(self.introspector.snapshot().await?);
        let first_order = self.history.next_order().await?;
        let create_history_table = !self.history.exists().await?;
        ScriptRenderer::new(&self.registry, &database).update_script(
            &pending,
            first_order,
            create_history_table,
        )
    }

    /// Rolls back the last `count` ran change sets, most recent first.
    /// Returns how many were rolled back.
    pub async fn rollback(&self, changelog: &DatabaseChangeLog, count: usize) -> Result<usize> {
        if self.dry_run {
            print!("{}", self.rollback_sql(changelog, count).await?);
            return Ok(0);
        }
        self.lock.wait_for_lock(&self.locked_by, self.lock_wait).await?;
        let result = self.run_rollback(changelog, count).await;
        self.release(result).await
    }

    async fn run_rollback(&self, changelog: &DatabaseChangeLog, count: usize) -> Result<usize> {
        let targets = self.rollback_targets(changelog, count).await?;
        let mut plans = Vec::new();
        let mut errors = Vec::new();
        for change_set in &targets {
            let changes = change_set
                .rollback_changes()
                .ok_or_else(|| MigrateError::NotReversible(change_set.identity()))?;
            self.validate(&change_set.identity(), &changes, &mut errors);
            plans.push((*change_set, changes));
        }
        collect_errors(errors)?;

        for (change_set, changes) in &plans {
            info!(change_set = %change_set.identity(), "Rolling back change set");
            self.execute(change_set, changes, Record::Removed).await?;
        }
        info!(count = plans.len(), "Rollback complete");
        Ok(plans.len())
    }

    /// Renders the SQL a rollback of `count` change sets would run.
    pub async fn rollback_sql(&self, changelog: &DatabaseChangeLog, count: usize) -> Result<String> {
        let targets = self.rollback_targets(changelog, count).await?;
        let database = SqliteDatabase::new().with_snapshot(self.introspector.snapshot().await?);
        ScriptRenderer::new(&self.registry, &database).rollback_script(&targets)
    }

    async fn rollback_targets<'c>(
        &self,
        changelog: &'c DatabaseChangeLog,
        count: usize,
    ) -> Result<Vec<&'c ChangeSet>> {
        let ran = self.history.ran_change_sets().await?;
        let mut targets = Vec::new();
        let mut errors = Vec::new();
        for row in ran.iter().rev().take(count) {
            match changelog.find(&row.id, &row.author, &row.filename) {
                Some(change_set) if change_set.rollback_changes().is_some() => {
                    targets.push(change_set);
                }
                Some(change_set) => errors.push(MigrateError::NotReversible(change_set.identity())),
                None => errors.push(MigrateError::UnknownChangeSet(row.identity())),
            }
        }
        collect_errors(errors)?;
        if targets.len() < count {
            warn!(requested = count, available = targets.len(), "Fewer change sets ran than requested");
        }
        Ok(targets)
    }

    /// Tags the most recently ran change set.
    pub async fn tag(&self, tag: &str) -> Result<()> {
        self.history.tag(tag).await
    }

    /// Releases the changelog lock regardless of its holder.
    pub async fn release_locks(&self) -> Result<()> {
        self.lock.force_release().await
    }

    fn validate(&self, identity: &str, changes: &[Change], errors: &mut Vec<MigrateError>) {
        let database = SqliteDatabase::new();
        let mut found = ValidationErrors::new();
        for change in changes {
            match change.validate(&self.registry, &database) {
                Ok(problems) => found.extend(problems),
                Err(e) => errors.push(e.into()),
            }
        }
        for warning in found.warnings() {
            warn!(change_set = %identity, warning = %warning, "Validation warning");
        }
        if found.has_errors() {
            errors.push(MigrateError::Validation {
                change_set: identity.to_string(),
                errors: found,
            });
        }
    }

    async fn execute(&self, change_set: &ChangeSet, changes: &[Change], record: Record) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        // rebuilds drop tables other tables may reference
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;
        let result = self.execute_on(&mut *conn, change_set, changes, record).await;
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await?;
        // a failed rebuild can leave the legacy rename mode on
        sqlx::query("PRAGMA legacy_alter_table = OFF")
            .execute(&mut *conn)
            .await?;
        result
    }

    async fn execute_on(
        &self,
        conn: &mut SqliteConnection,
        change_set: &ChangeSet,
        changes: &[Change],
        record: Record,
    ) -> Result<()> {
        let mut tx = conn.begin().await?;
        let mut database = SqliteDatabase::new();
        for change in changes {
            if matches!(change, Change::TagDatabase { .. }) {
                continue;
            }
            for statement in change.generate_statements(&database) {
                debug!(statement = %statement.statement_type(), "Refreshing schema snapshot");
                database.set_snapshot(Some(read_snapshot(&mut *tx).await?));
                let sql = self.registry.generate_sql(&statement, &database)?;
                execute_all(&mut *tx, &sql).await?;
            }
        }
        match record {
            Record::Ran(order) => self.history.mark_ran(&mut *tx, change_set, order).await?,
            Record::Removed => self.history.remove_ran(&mut *tx, change_set).await?,
        }
        tx.commit().await?;
        Ok(())
    }

    async fn release<T>(&self, result: Result<T>) -> Result<T> {
        match (result, self.lock.release().await) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), Ok(())) | (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(release)) => Err(MigrateError::Multiple(vec![e, release])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::change::{ColumnConfig, DefaultValue};
    use keel_core::DataType;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool")
    }

    async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_optional(pool)
                .await
                .unwrap();
        row.is_some()
    }

    fn create_table(name: &str) -> Change {
        Change::CreateTable {
            schema_name: None,
            table_name: name.to_string(),
            columns: vec![
                ColumnConfig::new("id", DataType::Int).primary_key(),
                ColumnConfig::new("name", DataType::Varchar(Some(100))),
            ],
            tablespace: None,
            remarks: None,
        }
    }

    fn changelog(change_sets: Vec<ChangeSet>) -> DatabaseChangeLog {
        DatabaseChangeLog::new(
            change_sets
                .into_iter()
                .map(|cs| cs.filename("changelog.json"))
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_update_applies_and_records() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone());
        let changelog = changelog(vec![
            ChangeSet::new("1", "alice").change(create_table("users")),
            ChangeSet::new("2", "alice").change(create_table("teams")),
        ]);

        assert_eq!(executor.update(&changelog).await.unwrap(), 2);
        assert!(table_exists(&pool, "users").await);
        assert!(table_exists(&pool, "teams").await);

        let ran = executor.history().ran_change_sets().await.unwrap();
        let orders: Vec<i64> = ran.iter().map(|r| r.order_executed).collect();
        assert_eq!(orders, vec![1, 2]);

        let lock = executor.lock().current_lock().await.unwrap().unwrap();
        assert!(!lock.locked);
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool);
        let changelog = changelog(vec![ChangeSet::new("1", "alice").change(create_table("users"))]);

        assert_eq!(executor.update(&changelog).await.unwrap(), 1);
        assert_eq!(executor.update(&changelog).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_always_runs_every_time() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone());
        let changelog = changelog(vec![
            ChangeSet::new("1", "alice").change(create_table("users")),
            ChangeSet::new("2", "alice").run_always().change(Change::Sql {
                sql: "INSERT INTO users (id, name) SELECT COUNT(*) + 1, 'x' FROM users".to_string(),
                end_delimiter: None,
            }),
        ]);

        executor.update(&changelog).await.unwrap();
        assert_eq!(executor.update(&changelog).await.unwrap(), 1);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
        let ran = executor.history().ran_change_sets().await.unwrap();
        assert_eq!(ran.len(), 2);
        assert_eq!(ran[1].order_executed, 3);
    }

    #[tokio::test]
    async fn test_edited_change_set_is_rejected() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool);
        executor
            .update(&changelog(vec![
                ChangeSet::new("1", "alice").change(create_table("users"))
            ]))
            .await
            .unwrap();

        let edited = changelog(vec![ChangeSet::new("1", "alice").change(create_table("members"))]);
        let statuses = executor.status(&edited).await.unwrap();
        assert_eq!(statuses[0].status, RunStatus::ChecksumMismatch);
        assert!(matches!(
            executor.update(&edited).await,
            Err(MigrateError::ChecksumMismatch { .. })
        ));
        assert!(!executor.lock().current_lock().await.unwrap().unwrap().locked);
    }

    #[tokio::test]
    async fn test_run_on_change_reruns_edited_change_set() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone());
        let view = |query: &str| {
            ChangeSet::new("2", "alice")
                .run_on_change()
                .change(Change::CreateView {
                    schema_name: None,
                    view_name: "named".to_string(),
                    select_query: query.to_string(),
                    replace_if_exists: true,
                })
        };
        let first = changelog(vec![
            ChangeSet::new("1", "alice").change(create_table("users")),
            view("SELECT id FROM users"),
        ]);
        executor.update(&first).await.unwrap();

        let second = changelog(vec![
            ChangeSet::new("1", "alice").change(create_table("users")),
            view("SELECT id, name FROM users"),
        ]);
        assert_eq!(executor.status(&second).await.unwrap()[1].status, RunStatus::Changed);
        assert_eq!(executor.update(&second).await.unwrap(), 1);

        let ran = executor.history().ran_change_sets().await.unwrap();
        assert_eq!(ran[1].md5sum, Some(second.change_sets[1].checksum().unwrap()));
    }

    #[tokio::test]
    async fn test_invalid_change_set_stops_update_before_anything_runs() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone());
        let changelog = changelog(vec![
            ChangeSet::new("1", "alice").change(create_table("users")),
            ChangeSet::new("2", "alice").change(Change::CreateSequence {
                schema_name: None,
                sequence_name: "seq".to_string(),
                start_value: None,
                increment_by: None,
                min_value: None,
                max_value: None,
                ordered: None,
                cycle: None,
            }),
        ]);

        tokio_test::assert_err!(executor.update(&changelog).await);
        assert!(!table_exists(&pool, "users").await);
        assert!(executor.history().ran_change_sets().await.unwrap().is_empty());
        assert!(!executor.lock().current_lock().await.unwrap().unwrap().locked);
    }

    #[tokio::test]
    async fn test_failing_change_set_is_rolled_back_with_its_history() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone());
        let changelog = changelog(vec![ChangeSet::new("1", "alice")
            .change(create_table("users"))
            .change(Change::Sql {
                sql: "INSERT INTO missing_table VALUES (1)".to_string(),
                end_delimiter: None,
            })]);

        assert!(matches!(
            executor.update(&changelog).await,
            Err(MigrateError::Database(_))
        ));
        assert!(!table_exists(&pool, "users").await);
        assert!(executor.history().ran_change_sets().await.unwrap().is_empty());
        assert!(!executor.lock().current_lock().await.unwrap().unwrap().locked);
    }

    #[tokio::test]
    async fn test_held_lock_blocks_update() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool).lock_wait(Duration::ZERO);
        executor.lock().ensure_table().await.unwrap();
        assert!(executor.lock().acquire("someone else").await.unwrap());

        let changelog = changelog(vec![ChangeSet::new("1", "alice").change(create_table("users"))]);
        match executor.update(&changelog).await {
            Err(MigrateError::LockNotAcquired { locked_by }) => {
                assert_eq!(locked_by.as_deref(), Some("someone else"));
            }
            other => panic!("expected a lock error, got {other:?}"),
        }

        executor.release_locks().await.unwrap();
        assert_eq!(executor.update(&changelog).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rollback_last_change_sets() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone());
        let changelog = changelog(vec![
            ChangeSet::new("1", "alice").change(create_table("users")),
            ChangeSet::new("2", "alice").change(Change::AddColumn {
                schema_name: None,
                table_name: "users".to_string(),
                columns: vec![ColumnConfig::new("email", DataType::Text)],
            }),
            ChangeSet::new("3", "alice").change(create_table("teams")),
        ]);
        executor.update(&changelog).await.unwrap();

        assert_eq!(executor.rollback(&changelog, 2).await.unwrap(), 2);
        assert!(!table_exists(&pool, "teams").await);
        let columns: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info('users')")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(columns.len(), 2);

        let ran = executor.history().ran_change_sets().await.unwrap();
        assert_eq!(ran.len(), 1);
        assert_eq!(ran[0].id, "1");
    }

    #[tokio::test]
    async fn test_rollback_refuses_irreversible_change_set() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone());
        let changelog = changelog(vec![
            ChangeSet::new("1", "alice").change(create_table("users")),
            ChangeSet::new("2", "alice").change(Change::Sql {
                sql: "INSERT INTO users (id) VALUES (1)".to_string(),
                end_delimiter: None,
            }),
        ]);
        executor.update(&changelog).await.unwrap();

        assert!(matches!(
            executor.rollback(&changelog, 2).await,
            Err(MigrateError::NotReversible(_))
        ));
        assert_eq!(executor.history().ran_change_sets().await.unwrap().len(), 2);
        assert!(table_exists(&pool, "users").await);
    }

    #[tokio::test]
    async fn test_explicit_rollback_is_used() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone());
        let changelog = changelog(vec![
            ChangeSet::new("1", "alice").change(create_table("users")),
            ChangeSet::new("2", "alice")
                .change(Change::Sql {
                    sql: "INSERT INTO users (id) VALUES (1)".to_string(),
                    end_delimiter: None,
                })
                .rollback(Change::Sql {
                    sql: "DELETE FROM users WHERE id = 1".to_string(),
                    end_delimiter: None,
                }),
        ]);
        executor.update(&changelog).await.unwrap();
        executor.rollback(&changelog, 1).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_tag_database_change_tags_its_own_row() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool);
        let changelog = changelog(vec![
            ChangeSet::new("1", "alice").change(create_table("users")),
            ChangeSet::new("2", "alice").change(Change::TagDatabase {
                tag: "v1".to_string(),
            }),
        ]);
        executor.update(&changelog).await.unwrap();

        let ran = executor.history().ran_change_sets().await.unwrap();
        assert_eq!(ran[0].tag, None);
        assert_eq!(ran[1].tag.as_deref(), Some("v1"));

        executor.tag("v2").await.unwrap();
        let ran = executor.history().ran_change_sets().await.unwrap();
        assert_eq!(ran[1].tag.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_contexts_filter_change_sets() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone()).contexts(vec!["prod".to_string()]);
        let changelog = changelog(vec![
            ChangeSet::new("1", "alice").change(create_table("users")),
            ChangeSet::new("2", "alice")
                .context("test")
                .change(create_table("fixtures")),
        ]);

        assert_eq!(executor.update(&changelog).await.unwrap(), 1);
        assert!(!table_exists(&pool, "fixtures").await);
        let statuses = executor.status(&changelog).await.unwrap();
        assert_eq!(statuses[1].status, RunStatus::Excluded);
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone()).dry_run(true);
        let changelog = changelog(vec![ChangeSet::new("1", "alice").change(create_table("users"))]);

        assert_eq!(executor.update(&changelog).await.unwrap(), 0);
        assert!(!table_exists(&pool, "users").await);
        assert!(!table_exists(&pool, "DATABASECHANGELOG").await);
    }

    #[tokio::test]
    async fn test_update_sql_renders_pending_only() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool);
        let first = changelog(vec![ChangeSet::new("1", "alice").change(create_table("users"))]);
        executor.update(&first).await.unwrap();

        let second = changelog(vec![
            ChangeSet::new("1", "alice").change(create_table("users")),
            ChangeSet::new("2", "alice").change(Change::AddDefaultValue {
                schema_name: None,
                table_name: "users".to_string(),
                column_name: "name".to_string(),
                column_data_type: None,
                default_value: DefaultValue::Text("anonymous".to_string()),
            }),
        ]);
        let script = executor.update_sql(&second).await.unwrap();
        assert!(!script.contains("-- Changeset changelog.json::1::alice"));
        assert!(script.contains("-- Changeset changelog.json::2::alice"));
        assert!(script.contains("CREATE TABLE users_keel_tmp"));
        assert!(script.contains("DEFAULT 'anonymous'"));
        assert!(!script.contains("CREATE TABLE DATABASECHANGELOG"));
    }

    #[tokio::test]
    async fn test_sqlite_rebuild_keeps_rows() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone());
        let changelog = changelog(vec![
            ChangeSet::new("1", "alice").change(Change::CreateTable {
                schema_name: None,
                table_name: "t".to_string(),
                columns: vec![
                    ColumnConfig::new("a", DataType::Int),
                    ColumnConfig::new("b", DataType::Int),
                ],
                tablespace: None,
                remarks: None,
            }),
            ChangeSet::new("2", "alice").change(Change::Sql {
                sql: "INSERT INTO t (a, b) VALUES (1, 2), (3, 4)".to_string(),
                end_delimiter: None,
            }),
            ChangeSet::new("3", "alice").change(Change::ModifyDataType {
                schema_name: None,
                table_name: "t".to_string(),
                column_name: "b".to_string(),
                new_data_type: DataType::Text,
            }),
        ]);
        executor.update(&changelog).await.unwrap();

        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT a, b FROM t ORDER BY a")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(rows, vec![(1, "2".to_string()), (3, "4".to_string())]);

        let (type_name,): (String,) =
            sqlx::query_as("SELECT type FROM pragma_table_info('t') WHERE name = 'b'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(type_name, "TEXT");
        assert!(!table_exists(&pool, "t_keel_tmp").await);
    }

    #[tokio::test]
    async fn test_sqlite_rebuild_under_a_view() {
        let pool = create_test_pool().await;
        let executor = Executor::new(pool.clone());
        let sql = |id: &str, sql: &str| {
            ChangeSet::new(id, "alice").change(Change::Sql {
                sql: sql.to_string(),
                end_delimiter: None,
            })
        };
        let changelog = changelog(vec![
            sql("1", "CREATE TABLE t (a INT, b INT)"),
            sql("2", "INSERT INTO t (a, b) VALUES (1, 2)"),
            sql("3", "CREATE VIEW v AS SELECT a, b FROM t"),
            ChangeSet::new("4", "alice").change(Change::ModifyDataType {
                schema_name: None,
                table_name: "t".to_string(),
                column_name: "b".to_string(),
                new_data_type: DataType::Text,
            }),
        ]);
        assert_eq!(executor.update(&changelog).await.unwrap(), 4);

        let row: (i64, String) = sqlx::query_as("SELECT a, b FROM v")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row, (1, "2".to_string()));

        let (legacy,): (i64,) = sqlx::query_as("PRAGMA legacy_alter_table")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(legacy, 0);
    }
}
