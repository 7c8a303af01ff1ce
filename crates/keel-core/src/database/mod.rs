//! Dialect capability objects.
//!
//! A [`Database`] answers the questions SQL generators ask about a target
//! backend: how identifiers are quoted, which physical type a logical
//! [`DataType`] maps to, how literals are written and which features exist.
//! Generators never branch on concrete dialect types; they query
//! [`Database::kind`] and [`Database::supports`] instead.

mod generic;
mod mysql;
mod postgres;
mod sqlite;

pub use generic::GenericDatabase;
pub use mysql::MySqlDatabase;
pub use postgres::PostgresDatabase;
pub use sqlite::SqliteDatabase;

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::datatype::{DataType, LiteralValue};
use crate::snapshot::{ObjectType, Snapshot};

/// Family of a database backend, used by generator `supports()` predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseKind {
    /// ANSI-leaning fallback dialect.
    Generic,
    /// PostgreSQL.
    Postgres,
    /// SQLite.
    Sqlite,
    /// MySQL and MariaDB.
    MySql,
}

impl DatabaseKind {
    /// Parses a dialect short name.
    #[must_use]
    pub fn from_short_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "generic" => Some(Self::Generic),
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            "mysql" | "mariadb" => Some(Self::MySql),
            _ => None,
        }
    }
}

/// Optional features a backend may or may not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `CREATE SEQUENCE` and friends.
    Sequences,
    /// Tablespace clauses on tables and indexes.
    Tablespaces,
    /// Schema-qualified object names.
    Schemas,
    /// In-place column and constraint mutation (`ALTER TABLE .. ALTER
    /// COLUMN`, `ADD CONSTRAINT`). Backends without it rebuild the table.
    AlterColumn,
    /// `DROP TABLE .. CASCADE`.
    DropTableCascade,
    /// Adding a primary key column to an existing table.
    AddPrimaryKeyColumn,
    /// An auto-increment column must declare its primary key inline.
    InlinePrimaryKeyForAutoIncrement,
    /// `IF EXISTS` / `IF NOT EXISTS` guards.
    IfExists,
}

/// How identifiers are quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotingStrategy {
    /// Quote only reserved words and names that are not plain identifiers.
    #[default]
    Legacy,
    /// Quote every identifier.
    QuoteAll,
}

/// Words that always need quoting when used as identifiers.
pub const SQL_RESERVED_WORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
    "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FALSE", "FOR",
    "FOREIGN", "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IN", "INDEX", "INNER", "INSERT",
    "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET",
    "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE",
    "THEN", "TO", "TRUE", "UNION", "UNIQUE", "UPDATE", "USER", "USING", "VALUES", "VIEW", "WHEN",
    "WHERE", "WITH",
];

/// Per-backend facts and formatting functions consumed by SQL generators.
pub trait Database: Send + Sync + fmt::Debug {
    /// Returns the dialect family.
    fn kind(&self) -> DatabaseKind;

    /// Returns the short name used in messages and `supports()` checks.
    fn short_name(&self) -> &str;

    /// Returns whether the backend has a feature.
    fn supports(&self, capability: Capability) -> bool;

    /// Returns the identifier quoting strategy.
    fn quoting_strategy(&self) -> QuotingStrategy {
        QuotingStrategy::Legacy
    }

    /// Returns the opening and closing identifier quote characters.
    fn quote_chars(&self) -> (char, char) {
        ('"', '"')
    }

    /// Returns the words that must be quoted as identifiers.
    fn reserved_words(&self) -> &'static [&'static str] {
        SQL_RESERVED_WORDS
    }

    /// Returns `true` if `word` is reserved on this backend.
    fn is_reserved_word(&self, word: &str) -> bool {
        self.reserved_words()
            .iter()
            .any(|w| w.eq_ignore_ascii_case(word))
    }

    /// Returns `true` if `name` must be quoted under the legacy strategy.
    fn requires_quoting(&self, name: &str) -> bool {
        !is_plain_identifier(name) || self.is_reserved_word(name)
    }

    /// Applies the backend's case folding to an unquoted name.
    fn correct_object_name(&self, name: &str, _object_type: ObjectType) -> String {
        name.to_string()
    }

    /// Escapes a single object name.
    fn escape_object_name(&self, name: &str, object_type: ObjectType) -> String {
        let quote = match self.quoting_strategy() {
            QuotingStrategy::QuoteAll => true,
            QuotingStrategy::Legacy => self.requires_quoting(name),
        };
        if quote {
            let (open, close) = self.quote_chars();
            let escaped = name.replace(close, &format!("{close}{close}"));
            format!("{open}{escaped}{close}")
        } else {
            self.correct_object_name(name, object_type)
        }
    }

    /// Escapes a name, prefixing the schema when the backend has schemas.
    fn escape_qualified_name(
        &self,
        schema: Option<&str>,
        name: &str,
        object_type: ObjectType,
    ) -> String {
        match schema.filter(|s| !s.is_empty()) {
            Some(schema) if self.supports(Capability::Schemas) => format!(
                "{}.{}",
                self.escape_object_name(schema, ObjectType::Schema),
                self.escape_object_name(name, object_type)
            ),
            _ => self.escape_object_name(name, object_type),
        }
    }

    /// Escapes a table name.
    fn escape_table_name(&self, schema: Option<&str>, table: &str) -> String {
        self.escape_qualified_name(schema, table, ObjectType::Table)
    }

    /// Escapes a column name.
    fn escape_column_name(&self, column: &str) -> String {
        self.escape_object_name(column, ObjectType::Column)
    }

    /// Escapes a comma-separated column list.
    fn escape_column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.escape_column_name(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Escapes an index name.
    fn escape_index_name(&self, schema: Option<&str>, index: &str) -> String {
        self.escape_qualified_name(schema, index, ObjectType::Index)
    }

    /// Escapes a constraint name. Constraints are never schema-qualified.
    fn escape_constraint_name(&self, name: &str) -> String {
        self.escape_object_name(name, ObjectType::ForeignKey)
    }

    /// Escapes a sequence name.
    fn escape_sequence_name(&self, schema: Option<&str>, sequence: &str) -> String {
        self.escape_qualified_name(schema, sequence, ObjectType::Sequence)
    }

    /// Escapes a view name.
    fn escape_view_name(&self, schema: Option<&str>, view: &str) -> String {
        self.escape_qualified_name(schema, view, ObjectType::View)
    }

    /// Maps a logical type to this backend's physical type name.
    fn column_type(&self, data_type: &DataType) -> String {
        data_type.to_string()
    }

    /// Physical type used for an auto-increment column.
    fn auto_increment_type(&self, data_type: &DataType) -> String {
        self.column_type(data_type)
    }

    /// Clause appended to an auto-increment column definition.
    fn auto_increment_clause(&self, start_with: Option<i64>, increment_by: Option<i64>) -> String {
        let mut clause = String::from("GENERATED BY DEFAULT AS IDENTITY");
        let mut options = Vec::new();
        if let Some(start) = start_with {
            options.push(format!("START WITH {start}"));
        }
        if let Some(by) = increment_by {
            options.push(format!("INCREMENT BY {by}"));
        }
        if !options.is_empty() {
            clause.push_str(&format!(" ({})", options.join(" ")));
        }
        clause
    }

    /// Renders an ISO-8601 date, time or date-time as a literal. Input that
    /// is not a recognizable date is quoted verbatim.
    fn date_literal(&self, iso: &str) -> String {
        let normalized = normalize_iso_date(iso).unwrap_or_else(|| iso.trim().to_string());
        format!("'{normalized}'")
    }

    /// Literal for boolean true.
    fn true_boolean_value(&self) -> &'static str {
        "TRUE"
    }

    /// Literal for boolean false.
    fn false_boolean_value(&self) -> &'static str {
        "FALSE"
    }

    /// Returns `false` when a text value is already a literal and must be
    /// written as-is.
    fn should_quote_value(&self, value: &str) -> bool {
        let trimmed = value.trim();
        let pre_quoted = trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'');
        !(pre_quoted || trimmed.eq_ignore_ascii_case("NULL"))
    }

    /// Renders a literal value.
    fn literal(&self, value: &LiteralValue) -> String {
        match value {
            LiteralValue::Null => "NULL".to_string(),
            LiteralValue::Text(text) => {
                if self.should_quote_value(text) {
                    format!("'{}'", text.replace('\'', "''"))
                } else {
                    text.trim().to_string()
                }
            }
            LiteralValue::Numeric(n) => n.clone(),
            LiteralValue::Boolean(true) => self.true_boolean_value().to_string(),
            LiteralValue::Boolean(false) => self.false_boolean_value().to_string(),
            LiteralValue::Date(iso) => self.date_literal(iso),
            LiteralValue::Computed(expr) => expr.clone(),
        }
    }

    /// Function returning the current date and time.
    fn current_date_time_function(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    /// Live schema snapshot, when the caller provided one.
    fn snapshot(&self) -> Option<&Snapshot> {
        None
    }
}

/// Returns `true` for `[A-Za-z_][A-Za-z0-9_]*`.
#[must_use]
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Normalizes an ISO-8601 date, time or date-time to `YYYY-MM-DD`,
/// `HH:MM:SS` or `YYYY-MM-DD HH:MM:SS[.fff]`. Returns `None` if the input is
/// none of those.
#[must_use]
pub fn normalize_iso_date(iso: &str) -> Option<String> {
    let value = iso.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string());
        }
    }
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .ok()
        .map(|t| t.format("%H:%M:%S").to_string())
}

/// Builds the capability object for a dialect family.
#[must_use]
pub fn database_for(kind: DatabaseKind) -> Box<dyn Database> {
    match kind {
        DatabaseKind::Generic => Box::new(GenericDatabase::new()),
        DatabaseKind::Postgres => Box::new(PostgresDatabase::new()),
        DatabaseKind::Sqlite => Box::new(SqliteDatabase::new()),
        DatabaseKind::MySql => Box::new(MySqlDatabase::new()),
    }
}
