//! The `DATABASECHANGELOGLOCK` table, a single row that serializes updates.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use keel_core::database::SqliteDatabase;
use keel_core::sqlgen::SqlGeneratorRegistry;
use keel_core::statement::{
    CreateDatabaseChangeLogLockTableStatement, InitializeDatabaseChangeLogLockTableStatement,
    LockDatabaseChangeLogStatement, UnlockDatabaseChangeLogStatement,
    DATABASE_CHANGELOG_LOCK_TABLE,
};
use sqlx::sqlite::SqlitePool;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::connection::{execute_all, table_exists};
use crate::error::{MigrateError, Result};

/// Delay between two attempts while waiting for the lock.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// State of the lock row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    /// Whether the lock is held.
    pub locked: bool,
    /// When the lock was granted.
    pub granted: Option<NaiveDateTime>,
    /// Who holds the lock.
    pub locked_by: Option<String>,
}

/// Acquires and releases the changelog lock of a SQLite database.
#[derive(Debug, Clone)]
pub struct ChangeLogLock {
    pool: SqlitePool,
    registry: Arc<SqlGeneratorRegistry>,
    database: SqliteDatabase,
}

impl ChangeLogLock {
    /// Creates a lock service.
    #[must_use]
    pub fn new(pool: SqlitePool, registry: Arc<SqlGeneratorRegistry>) -> Self {
        Self {
            pool,
            registry,
            database: SqliteDatabase::new(),
        }
    }

    /// Creates the lock table with its unlocked row, or restores the row if
    /// the table exists without it.
    pub async fn ensure_table(&self) -> Result<()> {
        let sql = if table_exists(&self.pool, DATABASE_CHANGELOG_LOCK_TABLE).await? {
            let (rows,): (i64,) = sqlx::query_as(&format!(
                "SELECT COUNT(*) FROM {DATABASE_CHANGELOG_LOCK_TABLE} WHERE ID = 1"
            ))
            .fetch_one(&self.pool)
            .await?;
            if rows > 0 {
                return Ok(());
            }
            self.registry.generate(
                InitializeDatabaseChangeLogLockTableStatement::default(),
                &self.database,
            )?
        } else {
            self.registry.generate(
                CreateDatabaseChangeLogLockTableStatement::default(),
                &self.database,
            )?
        };
        let mut conn = self.pool.acquire().await?;
        execute_all(&mut conn, &sql).await?;
        debug!(table = DATABASE_CHANGELOG_LOCK_TABLE, "Initialized lock table");
        Ok(())
    }

    /// Tries once to take the lock. Returns `false` if someone holds it.
    pub async fn acquire(&self, locked_by: &str) -> Result<bool> {
        let sql = self.registry.generate(
            LockDatabaseChangeLogStatement {
                schema: None,
                locked_by: locked_by.to_string(),
            },
            &self.database,
        )?;
        let mut conn = self.pool.acquire().await?;
        let acquired = execute_all(&mut conn, &sql).await? == 1;
        if acquired {
            info!(locked_by = %locked_by, "Acquired change log lock");
        }
        Ok(acquired)
    }

    /// Retries [`Self::acquire`] until it succeeds or `wait` has passed.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::LockNotAcquired`] naming the current holder
    /// on timeout.
    pub async fn wait_for_lock(&self, locked_by: &str, wait: Duration) -> Result<()> {
        self.ensure_table().await?;
        let deadline = Instant::now() + wait;
        loop {
            if self.acquire(locked_by).await? {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                let holder = self.current_lock().await?.and_then(|lock| lock.locked_by);
                return Err(MigrateError::LockNotAcquired { locked_by: holder });
            }
            debug!(locked_by = %locked_by, "Waiting for change log lock");
            tokio::time::sleep(LOCK_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Releases the lock, whoever holds it.
    pub async fn release(&self) -> Result<()> {
        let sql = self
            .registry
            .generate(UnlockDatabaseChangeLogStatement::default(), &self.database)?;
        let mut conn = self.pool.acquire().await?;
        execute_all(&mut conn, &sql).await?;
        info!("Released change log lock");
        Ok(())
    }

    /// Releases a lock left behind by a crashed run.
    pub async fn force_release(&self) -> Result<()> {
        self.ensure_table().await?;
        if let Some(lock) = self.current_lock().await? {
            if lock.locked {
                warn!(
                    locked_by = ?lock.locked_by,
                    granted = ?lock.granted,
                    "Forcing release of change log lock"
                );
            }
        }
        self.release().await
    }

    /// Reads the lock row. `None` if the lock table doesn't exist.
    pub async fn current_lock(&self) -> Result<Option<LockInfo>> {
        if !table_exists(&self.pool, DATABASE_CHANGELOG_LOCK_TABLE).await? {
            return Ok(None);
        }
        let row: Option<(i64, Option<String>, Option<String>)> = sqlx::query_as(&format!(
            "SELECT CAST(LOCKED AS INTEGER), CAST(LOCKGRANTED AS TEXT), LOCKEDBY \
             FROM {DATABASE_CHANGELOG_LOCK_TABLE} WHERE ID = 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(locked, granted, locked_by)| LockInfo {
            locked: locked != 0,
            granted: granted
                .and_then(|g| NaiveDateTime::parse_from_str(&g, "%Y-%m-%d %H:%M:%S").ok()),
            locked_by,
        }))
    }
}

/// Default lock owner: host name and process id.
#[must_use]
pub fn default_lock_owner() -> String {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    format!("{host} ({})", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::sqlgen::build_default_registry;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_lock() -> ChangeLogLock {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        ChangeLogLock::new(pool, Arc::new(build_default_registry()))
    }

    #[tokio::test]
    async fn test_ensure_table_creates_unlocked_row() {
        let lock = create_test_lock().await;
        assert_eq!(lock.current_lock().await.unwrap(), None);

        lock.ensure_table().await.unwrap();
        lock.ensure_table().await.unwrap();

        let info = lock.current_lock().await.unwrap().unwrap();
        assert!(!info.locked);
        assert_eq!(info.locked_by, None);
    }

    #[tokio::test]
    async fn test_acquire_is_exclusive() {
        let lock = create_test_lock().await;
        lock.ensure_table().await.unwrap();

        assert!(lock.acquire("first").await.unwrap());
        assert!(!lock.acquire("second").await.unwrap());

        let info = lock.current_lock().await.unwrap().unwrap();
        assert!(info.locked);
        assert_eq!(info.locked_by.as_deref(), Some("first"));
        assert!(info.granted.is_some());

        lock.release().await.unwrap();
        assert!(lock.acquire("second").await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_for_lock_times_out_naming_holder() {
        let lock = create_test_lock().await;
        lock.wait_for_lock("first", Duration::ZERO).await.unwrap();

        let result = lock
            .wait_for_lock("second", Duration::from_millis(300))
            .await;
        match result {
            Err(MigrateError::LockNotAcquired { locked_by }) => {
                assert_eq!(locked_by.as_deref(), Some("first"));
            }
            other => panic!("expected lock timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_force_release() {
        let lock = create_test_lock().await;
        lock.wait_for_lock("crashed", Duration::ZERO).await.unwrap();

        lock.force_release().await.unwrap();
        let info = lock.current_lock().await.unwrap().unwrap();
        assert!(!info.locked);
        assert_eq!(info.locked_by, None);
    }

    #[tokio::test]
    async fn test_ensure_table_restores_missing_row() {
        let lock = create_test_lock().await;
        lock.ensure_table().await.unwrap();
        sqlx::query("DELETE FROM DATABASECHANGELOGLOCK")
            .execute(&lock.pool)
            .await
            .unwrap();

        lock.ensure_table().await.unwrap();
        assert!(lock.acquire("me").await.unwrap());
    }

    #[test]
    fn test_default_owner_includes_pid() {
        let owner = default_lock_owner();
        assert!(owner.ends_with(&format!("({})", std::process::id())));
    }
}
