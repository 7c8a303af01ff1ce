//! Reading a live SQLite schema into a [`Snapshot`].
//!
//! Tables, views, columns and indexes come from `sqlite_master` and the
//! `pragma_*` table functions. SQLite forgets constraint names, so they are
//! recovered from the `CREATE TABLE` text.

use std::collections::BTreeMap;

use keel_core::snapshot::{
    Column, ForeignKey, ForeignKeyAction, Index, ObjectId, PrimaryKey, Table, UniqueConstraint,
    View,
};
use keel_core::{DataType, LiteralValue, Snapshot};
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::Result;

/// Builds snapshots of a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteIntrospector {
    pool: SqlitePool,
}

impl SqliteIntrospector {
    /// Creates an introspector over a pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Reads the current schema.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let mut conn = self.pool.acquire().await?;
        read_snapshot(&mut conn).await
    }
}

/// Reads the schema visible on one connection, including uncommitted DDL of
/// an open transaction.
pub async fn read_snapshot(conn: &mut SqliteConnection) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();

    let objects: Vec<(String, String, Option<String>)> = sqlx::query_as(
        "SELECT type, name, sql FROM sqlite_master \
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
         ORDER BY rowid",
    )
    .fetch_all(&mut *conn)
    .await?;

    for (kind, name, sql) in objects {
        let sql = sql.unwrap_or_default();
        if kind == "view" {
            snapshot.add_view(View::new(name, view_definition(&sql)));
        } else {
            read_table(conn, &mut snapshot, &name, &sql).await?;
        }
    }
    Ok(snapshot)
}

type ColumnRow = (String, String, i64, Option<String>, i64);
type IndexRow = (String, i64, String);
type ForeignKeyRow = (i64, String, String, Option<String>, String, String);

async fn read_table(
    conn: &mut SqliteConnection,
    snapshot: &mut Snapshot,
    name: &str,
    sql: &str,
) -> Result<()> {
    let table = snapshot.add_table(Table::new(name));
    let constraints = NamedConstraint::parse(sql);

    let columns: Vec<ColumnRow> = sqlx::query_as(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid",
    )
    .bind(name)
    .fetch_all(&mut *conn)
    .await?;

    let mut key_columns: Vec<(i64, String)> = columns
        .iter()
        .filter(|(.., pk)| *pk > 0)
        .map(|(column, .., pk)| (*pk, column.clone()))
        .collect();
    key_columns.sort();
    let autoincrement = key_columns.len() == 1 && sql.to_ascii_uppercase().contains("AUTOINCREMENT");

    for (column_name, type_name, not_null, default, pk) in &columns {
        let data_type = if type_name.trim().is_empty() {
            DataType::Blob
        } else {
            DataType::parse(type_name).unwrap_or_else(|_| DataType::Custom(type_name.clone()))
        };
        let mut column = Column::new(column_name.clone(), data_type.clone());
        if *not_null != 0 || *pk > 0 {
            column = column.not_null();
        }
        if let Some(literal) = default.as_deref().and_then(|d| parse_default(d, &data_type)) {
            column = column.default_value(literal);
        }
        if autoincrement && *pk > 0 {
            column = column.auto_increment();
        }
        snapshot.add_column(table, column);
    }

    let indexes: Vec<IndexRow> =
        sqlx::query_as("SELECT name, \"unique\", origin FROM pragma_index_list(?) ORDER BY seq")
            .bind(name)
            .fetch_all(&mut *conn)
            .await?;

    let mut primary_key_index = None;
    for (index_name, unique, origin) in indexes {
        let columns: Vec<(Option<String>,)> =
            sqlx::query_as("SELECT name FROM pragma_index_info(?) ORDER BY seqno")
                .bind(&index_name)
                .fetch_all(&mut *conn)
                .await?;
        let Some(columns) = columns.into_iter().map(|(c,)| c).collect::<Option<Vec<_>>>() else {
            debug!(index = %index_name, "Skipping expression index");
            continue;
        };

        let mut index = Index::new(index_name.clone(), columns.clone());
        if unique != 0 {
            index = index.unique();
        }
        let index_id = snapshot.add_index(table, index);
        match origin.as_str() {
            "pk" => primary_key_index = Some(index_id),
            "u" => {
                let mut constraint = UniqueConstraint::new(columns.clone()).backed_by(index_id);
                if let Some(name) = constraint_name(&constraints, ConstraintKind::Unique, &columns) {
                    constraint = constraint.named(name);
                }
                snapshot.add_unique_constraint(table, constraint);
            }
            _ => {}
        }
    }

    if !key_columns.is_empty() {
        let columns: Vec<String> = key_columns.into_iter().map(|(_, c)| c).collect();
        let mut primary_key = PrimaryKey::new(columns);
        if let Some(name) = primary_key_name(&constraints) {
            primary_key = primary_key.named(name);
        }
        if let Some(index) = primary_key_index {
            primary_key = primary_key.backed_by(index);
        }
        snapshot.add_primary_key(table, primary_key);
    }

    read_foreign_keys(conn, snapshot, table, name, &constraints).await
}

async fn read_foreign_keys(
    conn: &mut SqliteConnection,
    snapshot: &mut Snapshot,
    table: ObjectId,
    name: &str,
    constraints: &[NamedConstraint],
) -> Result<()> {
    let rows: Vec<ForeignKeyRow> = sqlx::query_as(
        "SELECT id, \"table\", \"from\", \"to\", on_update, on_delete \
         FROM pragma_foreign_key_list(?) ORDER BY id, seq",
    )
    .bind(name)
    .fetch_all(&mut *conn)
    .await?;

    let mut grouped: BTreeMap<i64, Vec<ForeignKeyRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.0).or_default().push(row);
    }

    for rows in grouped.into_values() {
        let Some((_, referenced_table, _, _, on_update, on_delete)) = rows.first().cloned() else {
            continue;
        };
        let columns: Vec<String> = rows.iter().map(|r| r.2.clone()).collect();
        // a NULL target means the referenced table's primary key
        let referenced_columns: Vec<String> = rows.iter().filter_map(|r| r.3.clone()).collect();

        let mut foreign_key = ForeignKey::new(columns.clone(), referenced_table, referenced_columns);
        foreign_key.on_update = referential_action(&on_update);
        foreign_key.on_delete = referential_action(&on_delete);
        if let Some(name) = constraint_name(constraints, ConstraintKind::ForeignKey, &columns) {
            foreign_key = foreign_key.named(name);
        }
        snapshot.add_foreign_key(table, foreign_key);
    }
    Ok(())
}

/// `NO ACTION` is the SQLite default and reads back as unset.
fn referential_action(value: &str) -> Option<ForeignKeyAction> {
    ForeignKeyAction::from_sql(value).filter(|a| *a != ForeignKeyAction::NoAction)
}

/// Parses a `dflt_value` as reported by `pragma_table_info`.
fn parse_default(value: &str, data_type: &DataType) -> Option<LiteralValue> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("NULL") {
        return None;
    }
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return Some(LiteralValue::Text(value[1..value.len() - 1].replace("''", "'")));
    }
    if *data_type == DataType::Boolean {
        match value.to_ascii_uppercase().as_str() {
            "1" | "TRUE" => return Some(LiteralValue::Boolean(true)),
            "0" | "FALSE" => return Some(LiteralValue::Boolean(false)),
            _ => {}
        }
    }
    if value.parse::<f64>().is_ok() {
        return Some(LiteralValue::numeric(value));
    }
    Some(LiteralValue::computed(value))
}

/// The select of a `CREATE VIEW .. AS <select>` statement.
fn view_definition(sql: &str) -> String {
    let upper = sql.to_ascii_uppercase();
    upper
        .find(" AS ")
        .map_or_else(|| sql.to_string(), |at| sql[at + 4..].trim().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
}

/// A `CONSTRAINT <name> ...` clause of a `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NamedConstraint {
    name: String,
    kind: ConstraintKind,
    columns: Vec<String>,
}

impl NamedConstraint {
    fn parse(sql: &str) -> Vec<Self> {
        let tokens = tokenize(sql);
        let is = |i: usize, word: &str| tokens.get(i).is_some_and(|t| t.eq_ignore_ascii_case(word));

        let mut constraints = Vec::new();
        for i in 0..tokens.len() {
            if !is(i, "CONSTRAINT") {
                continue;
            }
            let Some(name) = tokens.get(i + 1) else {
                break;
            };
            let (kind, list_start) = if is(i + 2, "PRIMARY") && is(i + 3, "KEY") {
                (ConstraintKind::PrimaryKey, i + 4)
            } else if is(i + 2, "UNIQUE") {
                (ConstraintKind::Unique, i + 3)
            } else if is(i + 2, "FOREIGN") && is(i + 3, "KEY") {
                (ConstraintKind::ForeignKey, i + 4)
            } else {
                continue;
            };
            constraints.push(Self {
                name: name.clone(),
                kind,
                columns: column_list(&tokens, list_start),
            });
        }
        constraints
    }
}

fn primary_key_name(constraints: &[NamedConstraint]) -> Option<String> {
    constraints
        .iter()
        .find(|c| c.kind == ConstraintKind::PrimaryKey)
        .map(|c| c.name.clone())
}

fn constraint_name(
    constraints: &[NamedConstraint],
    kind: ConstraintKind,
    columns: &[String],
) -> Option<String> {
    constraints
        .iter()
        .find(|c| {
            c.kind == kind
                && c.columns.len() == columns.len()
                && c.columns
                    .iter()
                    .zip(columns)
                    .all(|(a, b)| a.eq_ignore_ascii_case(b))
        })
        .map(|c| c.name.clone())
}

/// First word of each item of a parenthesized list starting at `start`.
fn column_list(tokens: &[String], start: usize) -> Vec<String> {
    if tokens.get(start).map(String::as_str) != Some("(") {
        return Vec::new();
    }
    let mut columns = Vec::new();
    let mut expect_name = true;
    for token in &tokens[start + 1..] {
        match token.as_str() {
            ")" => break,
            "," => expect_name = true,
            _ if expect_name => {
                columns.push(token.clone());
                expect_name = false;
            }
            _ => {}
        }
    }
    columns
}

/// Splits SQL into words, unquoted identifiers and `(`, `)`, `,`. String
/// literals become a single `''` token.
fn tokenize(sql: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' | ')' | ',' => tokens.push(c.to_string()),
            '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                tokens.push(chars.by_ref().take_while(|n| *n != close).collect());
            }
            '\'' => {
                while let Some(n) = chars.next() {
                    if n == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                tokens.push("''".to_string());
            }
            _ => {
                let mut word = c.to_string();
                while let Some(&n) = chars.peek() {
                    if n.is_whitespace() || "(),\"`['".contains(n) {
                        break;
                    }
                    word.push(n);
                    chars.next();
                }
                tokens.push(word);
            }
        }
    }
    tokens
}
