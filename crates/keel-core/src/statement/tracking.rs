//! Statements that maintain the change-set history and lock tables.

/// Name of the change-set history table.
pub const DATABASE_CHANGELOG_TABLE: &str = "DATABASECHANGELOG";

/// Name of the change-log lock table.
pub const DATABASE_CHANGELOG_LOCK_TABLE: &str = "DATABASECHANGELOGLOCK";

/// Create the history table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateDatabaseChangeLogTableStatement {
    /// Schema name.
    pub schema: Option<String>,
}

/// Create the lock table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateDatabaseChangeLogLockTableStatement {
    /// Schema name.
    pub schema: Option<String>,
}

/// Insert the single unlocked row into the lock table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InitializeDatabaseChangeLogLockTableStatement {
    /// Schema name.
    pub schema: Option<String>,
}

/// Conditionally take the lock; succeeds iff exactly one row is updated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockDatabaseChangeLogStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Description of the lock holder, usually `host (pid)`.
    pub locked_by: String,
}

/// Release the lock.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnlockDatabaseChangeLogStatement {
    /// Schema name.
    pub schema: Option<String>,
}

/// Record one executed change set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkChangeSetRanStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Change-set id.
    pub id: String,
    /// Change-set author.
    pub author: String,
    /// Changelog file the change set came from.
    pub filename: String,
    /// Position in execution order.
    pub order_executed: i64,
    /// Stored checksum, `8:<hex>`.
    pub md5sum: String,
    /// Short description of the changes.
    pub description: String,
    /// Change-set comment.
    pub comments: String,
    /// Tag, if any.
    pub tag: Option<String>,
    /// Version of the tool that applied the change set.
    pub version: String,
}

/// Delete the history row of one change set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoveChangeSetRanStatusStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Change-set id.
    pub id: String,
    /// Change-set author.
    pub author: String,
    /// Changelog file.
    pub filename: String,
}

/// Tag the most recently executed change set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagDatabaseStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Tag value.
    pub tag: String,
}
