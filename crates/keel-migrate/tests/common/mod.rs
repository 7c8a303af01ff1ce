#![allow(dead_code)]

use std::path::{Path, PathBuf};

use keel_migrate::prelude::*;
use sqlx::sqlite::SqlitePool;

/// Opens (and creates) `name` inside `dir`.
pub async fn file_pool(dir: &Path, name: &str) -> SqlitePool {
    connect(&format!("sqlite:{}", dir.join(name).display()))
        .await
        .expect("Failed to open SQLite database")
}

/// Writes a changelog file and returns its path.
pub fn write_changelog(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("changelog.json");
    std::fs::write(&path, json).expect("Failed to write changelog");
    path
}

/// Runs raw SQL, one statement per entry.
pub async fn execute(pool: &SqlitePool, statements: &[&str]) {
    for sql in statements {
        sqlx::query(sql).execute(pool).await.unwrap();
    }
}

/// User tables and indexes, sorted.
pub async fn objects(pool: &SqlitePool, object_type: &str) -> Vec<String> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = ? AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
         ORDER BY name",
    )
    .bind(object_type)
    .fetch_all(pool)
    .await
    .unwrap();
    rows.into_iter().map(|(name,)| name).collect()
}

/// Column names of a table, in declaration order.
pub async fn columns(pool: &SqlitePool, table: &str) -> Vec<String> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?) ORDER BY cid")
        .bind(table)
        .fetch_all(pool)
        .await
        .unwrap();
    rows.into_iter().map(|(name,)| name).collect()
}

/// A users table built over five change sets, the last one tagging `v1`.
pub const USERS_CHANGELOG: &str = r#"{
    "databaseChangeLog": [
        {
            "changeSet": {
                "id": "1",
                "author": "alice",
                "changes": [
                    {
                        "change": "createTable",
                        "tableName": "users",
                        "columns": [
                            { "name": "id", "type": "INT", "primaryKey": true, "nullable": false },
                            { "name": "name", "type": "VARCHAR(100)", "nullable": false }
                        ]
                    }
                ]
            }
        },
        {
            "changeSet": {
                "id": "2",
                "author": "alice",
                "changes": [
                    {
                        "change": "insert",
                        "tableName": "users",
                        "columns": [
                            { "name": "id", "value": 1 },
                            { "name": "name", "value": "ada" }
                        ]
                    }
                ],
                "rollback": [
                    { "change": "sql", "sql": "DELETE FROM users WHERE id = 1" }
                ]
            }
        },
        {
            "changeSet": {
                "id": "3",
                "author": "bob",
                "changes": [
                    {
                        "change": "addColumn",
                        "tableName": "users",
                        "columns": [ { "name": "email", "type": "TEXT" } ]
                    }
                ]
            }
        },
        {
            "changeSet": {
                "id": "4",
                "author": "bob",
                "changes": [
                    {
                        "change": "createIndex",
                        "tableName": "users",
                        "indexName": "ix_users_email",
                        "columns": ["email"]
                    }
                ]
            }
        },
        {
            "changeSet": {
                "id": "5",
                "author": "bob",
                "changes": [ { "change": "tagDatabase", "tag": "v1" } ]
            }
        }
    ]
}"#;
