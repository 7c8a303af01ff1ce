//! The `DATABASECHANGELOG` history table.
//!
//! Every SQL command touching the table is rendered by the generator
//! registry, so the same statements can be printed for any dialect.

use std::sync::Arc;

use chrono::NaiveDateTime;
use keel_core::database::SqliteDatabase;
use keel_core::sqlgen::SqlGeneratorRegistry;
use keel_core::statement::{
    CreateDatabaseChangeLogTableStatement, MarkChangeSetRanStatement,
    RemoveChangeSetRanStatusStatement, TagDatabaseStatement, DATABASE_CHANGELOG_TABLE,
};
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;
use tracing::info;

use crate::changelog::ChangeSet;
use crate::connection::{execute_all, table_exists};
use crate::error::{MigrateError, Result};

/// Value written to the `LIQUIBASE` column.
pub const HISTORY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A row of the history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RanChangeSet {
    /// Change set id.
    pub id: String,
    /// Change set author.
    pub author: String,
    /// Changelog file name.
    pub filename: String,
    /// When the change set ran, if the stored value parses.
    pub date_executed: Option<NaiveDateTime>,
    /// Position in the execution order, starting at 1.
    pub order_executed: i64,
    /// Checksum at the time it ran.
    pub md5sum: Option<String>,
    /// Description of the changes.
    pub description: Option<String>,
    /// Change set comment.
    pub comments: Option<String>,
    /// Tag, if the database was tagged at this change set.
    pub tag: Option<String>,
    /// Version of the tool that wrote the row.
    pub version: Option<String>,
}

impl RanChangeSet {
    /// Returns `true` if the row records the given change set.
    #[must_use]
    pub fn is(&self, change_set: &ChangeSet) -> bool {
        change_set.is(&self.id, &self.author, &self.filename)
    }

    /// Returns the `filename::id::author` identity.
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}::{}::{}", self.filename, self.id, self.author)
    }
}

type HistoryRow = (
    String,
    String,
    String,
    String,
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

impl From<HistoryRow> for RanChangeSet {
    fn from(row: HistoryRow) -> Self {
        let (id, author, filename, date, order, md5sum, description, comments, tag, version) = row;
        Self {
            id,
            author,
            filename,
            date_executed: NaiveDateTime::parse_from_str(&date, "%Y-%m-%d %H:%M:%S").ok(),
            order_executed: order,
            md5sum,
            description,
            comments,
            tag,
            version,
        }
    }
}

/// The history row written once a change set ran.
///
/// # Errors
///
/// Returns an error if the checksum cannot be computed.
pub fn mark_ran_statement(
    change_set: &ChangeSet,
    order_executed: i64,
) -> Result<MarkChangeSetRanStatement> {
    Ok(MarkChangeSetRanStatement {
        schema: None,
        id: change_set.id.clone(),
        author: change_set.author.clone(),
        filename: change_set.filename.clone(),
        order_executed,
        md5sum: change_set.checksum()?,
        description: change_set.description(),
        comments: change_set.comment.clone().unwrap_or_default(),
        tag: change_set.tag().map(ToString::to_string),
        version: HISTORY_VERSION.to_string(),
    })
}

/// The delete forgetting a change set.
#[must_use]
pub fn remove_ran_statement(change_set: &ChangeSet) -> RemoveChangeSetRanStatusStatement {
    RemoveChangeSetRanStatusStatement {
        schema: None,
        id: change_set.id.clone(),
        author: change_set.author.clone(),
        filename: change_set.filename.clone(),
    }
}

/// Reads and writes the history table of a SQLite database.
#[derive(Debug, Clone)]
pub struct ChangeLogHistory {
    pool: SqlitePool,
    registry: Arc<SqlGeneratorRegistry>,
    database: SqliteDatabase,
}

impl ChangeLogHistory {
    /// Creates a history service.
    #[must_use]
    pub fn new(pool: SqlitePool, registry: Arc<SqlGeneratorRegistry>) -> Self {
        Self {
            pool,
            registry,
            database: SqliteDatabase::new(),
        }
    }

    /// Returns `true` if the history table exists.
    pub async fn exists(&self) -> Result<bool> {
        table_exists(&self.pool, DATABASE_CHANGELOG_TABLE).await
    }

    /// Creates the history table if it doesn't exist.
    pub async fn ensure_table(&self) -> Result<()> {
        if self.exists().await? {
            return Ok(());
        }
        let sql = self.registry.generate(
            CreateDatabaseChangeLogTableStatement::default(),
            &self.database,
        )?;
        let mut conn = self.pool.acquire().await?;
        execute_all(&mut conn, &sql).await?;
        info!(table = DATABASE_CHANGELOG_TABLE, "Created history table");
        Ok(())
    }

    /// Returns every ran change set, in execution order. Empty if the table
    /// doesn't exist yet.
    pub async fn ran_change_sets(&self) -> Result<Vec<RanChangeSet>> {
        if !self.exists().await? {
            return Ok(Vec::new());
        }
        let rows: Vec<HistoryRow> = sqlx::query_as(&format!(
            "SELECT ID, AUTHOR, FILENAME, CAST(DATEEXECUTED AS TEXT), ORDEREXECUTED, \
             MD5SUM, DESCRIPTION, COMMENTS, TAG, LIQUIBASE \
             FROM {DATABASE_CHANGELOG_TABLE} ORDER BY ORDEREXECUTED"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RanChangeSet::from).collect())
    }

    /// Returns the next free `ORDEREXECUTED` value.
    pub async fn next_order(&self) -> Result<i64> {
        if !self.exists().await? {
            return Ok(1);
        }
        let (next,): (i64,) = sqlx::query_as(&format!(
            "SELECT COALESCE(MAX(ORDEREXECUTED), 0) + 1 FROM {DATABASE_CHANGELOG_TABLE}"
        ))
        .fetch_one(&self.pool)
        .await?;
        Ok(next)
    }

    /// Records a change set as ran on the given connection, replacing an
    /// earlier row for the same change set.
    pub async fn mark_ran(
        &self,
        conn: &mut SqliteConnection,
        change_set: &ChangeSet,
        order_executed: i64,
    ) -> Result<()> {
        let mut sql = self
            .registry
            .generate(remove_ran_statement(change_set), &self.database)?;
        sql.extend(
            self.registry
                .generate(mark_ran_statement(change_set, order_executed)?, &self.database)?,
        );
        execute_all(conn, &sql).await?;
        Ok(())
    }

    /// Forgets a change set on the given connection.
    pub async fn remove_ran(&self, conn: &mut SqliteConnection, change_set: &ChangeSet) -> Result<()> {
        let sql = self
            .registry
            .generate(remove_ran_statement(change_set), &self.database)?;
        execute_all(conn, &sql).await?;
        Ok(())
    }

    /// Tags the most recently ran change set.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::NothingToTag`] if no change set ran yet.
    pub async fn tag(&self, tag: &str) -> Result<()> {
        if !self.exists().await? {
            return Err(MigrateError::NothingToTag);
        }
        let sql = self.registry.generate(
            TagDatabaseStatement {
                schema: None,
                tag: tag.to_string(),
            },
            &self.database,
        )?;
        let mut conn = self.pool.acquire().await?;
        if execute_all(&mut conn, &sql).await? == 0 {
            return Err(MigrateError::NothingToTag);
        }
        info!(tag = %tag, "Tagged database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::change::Change;
    use keel_core::sqlgen::build_default_registry;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_history() -> ChangeLogHistory {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        ChangeLogHistory::new(pool, Arc::new(build_default_registry()))
    }

    fn change_set(id: &str) -> ChangeSet {
        ChangeSet::new(id, "alice")
            .filename("changelog.json")
            .comment("first")
            .change(Change::Sql {
                sql: "SELECT 1".to_string(),
                end_delimiter: None,
            })
    }

    #[tokio::test]
    async fn test_ensure_table_idempotent() {
        let history = create_test_history().await;
        assert!(!history.exists().await.unwrap());

        history.ensure_table().await.unwrap();
        history.ensure_table().await.unwrap();
        assert!(history.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_table_reads_empty() {
        let history = create_test_history().await;
        assert!(history.ran_change_sets().await.unwrap().is_empty());
        assert_eq!(history.next_order().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_and_remove() {
        let history = create_test_history().await;
        history.ensure_table().await.unwrap();

        let first = change_set("1");
        let second = change_set("2");
        let mut conn = history.pool.acquire().await.unwrap();
        history.mark_ran(&mut conn, &first, 1).await.unwrap();
        history.mark_ran(&mut conn, &second, 2).await.unwrap();
        drop(conn);

        let ran = history.ran_change_sets().await.unwrap();
        assert_eq!(ran.len(), 2);
        assert_eq!(ran[0].identity(), "changelog.json::1::alice");
        assert_eq!(ran[0].order_executed, 1);
        assert_eq!(ran[0].md5sum, Some(first.checksum().unwrap()));
        assert_eq!(ran[0].description.as_deref(), Some("Run custom SQL"));
        assert_eq!(ran[0].comments.as_deref(), Some("first"));
        assert_eq!(ran[0].version.as_deref(), Some(HISTORY_VERSION));
        assert!(ran[0].date_executed.is_some());
        assert!(ran[1].is(&second));
        assert_eq!(history.next_order().await.unwrap(), 3);

        let mut conn = history.pool.acquire().await.unwrap();
        history.remove_ran(&mut conn, &first).await.unwrap();
        drop(conn);
        let ran = history.ran_change_sets().await.unwrap();
        assert_eq!(ran.len(), 1);
        assert!(ran[0].is(&second));
    }

    #[tokio::test]
    async fn test_mark_ran_replaces_existing_row() {
        let history = create_test_history().await;
        history.ensure_table().await.unwrap();

        let first = change_set("1");
        let mut conn = history.pool.acquire().await.unwrap();
        history.mark_ran(&mut conn, &first, 1).await.unwrap();
        history.mark_ran(&mut conn, &first, 2).await.unwrap();
        drop(conn);

        let ran = history.ran_change_sets().await.unwrap();
        assert_eq!(ran.len(), 1);
        assert_eq!(ran[0].order_executed, 2);
    }

    #[tokio::test]
    async fn test_tag_last_change_set() {
        let history = create_test_history().await;
        assert!(matches!(
            history.tag("v1").await,
            Err(MigrateError::NothingToTag)
        ));

        history.ensure_table().await.unwrap();
        assert!(matches!(
            history.tag("v1").await,
            Err(MigrateError::NothingToTag)
        ));

        let mut conn = history.pool.acquire().await.unwrap();
        history.mark_ran(&mut conn, &change_set("1"), 1).await.unwrap();
        history.mark_ran(&mut conn, &change_set("2"), 2).await.unwrap();
        drop(conn);
        history.tag("v1").await.unwrap();

        let ran = history.ran_change_sets().await.unwrap();
        assert_eq!(ran[0].tag, None);
        assert_eq!(ran[1].tag.as_deref(), Some("v1"));
    }
}
