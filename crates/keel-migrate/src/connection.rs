//! Connecting to SQLite and running rendered SQL.

use std::str::FromStr;

use keel_core::Sql;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{MigrateError, Result};

/// Opens a pool for a `sqlite:` URL, creating the database file if needed.
///
/// # Errors
///
/// Returns [`MigrateError::UnsupportedUrl`] for URLs of other databases and
/// a database error if the connection fails.
pub async fn connect(url: &str) -> Result<SqlitePool> {
    if !url.starts_with("sqlite:") {
        return Err(MigrateError::UnsupportedUrl(url.to_string()));
    }
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Executes rendered commands in order and returns the total number of
/// affected rows.
pub(crate) async fn execute_all(conn: &mut SqliteConnection, sql: &[Sql]) -> Result<u64> {
    let mut affected = 0;
    for command in sql {
        debug!(sql = %command.text(), "Executing SQL");
        affected += sqlx::query(command.text())
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }
    Ok(affected)
}

/// Returns `true` if a table of that name exists.
pub(crate) async fn table_exists(pool: &SqlitePool, name: &str) -> Result<bool> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Renders commands as a script, each followed by its delimiter.
#[must_use]
pub fn to_script(sql: &[Sql]) -> String {
    sql.iter()
        .map(|command| format!("{}{}\n", command.text(), command.end_delimiter()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_sqlite_url() {
        let result = connect("postgres://localhost/app").await;
        assert!(matches!(result, Err(MigrateError::UnsupportedUrl(_))));
    }

    #[tokio::test]
    async fn test_execute_all_counts_rows() {
        let pool = connect("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let affected = execute_all(
            &mut conn,
            &[
                Sql::new("CREATE TABLE t (a INTEGER)"),
                Sql::new("INSERT INTO t (a) VALUES (1), (2)"),
                Sql::new("UPDATE t SET a = a + 1"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(affected, 4);
    }

    #[test]
    fn test_script_appends_delimiters() {
        let script = to_script(&[
            Sql::new("SELECT 1"),
            Sql::new("SELECT 2").with_delimiter("\nGO"),
        ]);
        assert_eq!(script, "SELECT 1;\nSELECT 2\nGO\n");
    }
}
