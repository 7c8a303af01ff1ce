//! Data statements and literal SQL.

use crate::datatype::LiteralValue;

/// `INSERT` a single row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InsertStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Target table.
    pub table: String,
    /// Column/value pairs in order.
    pub values: Vec<(String, LiteralValue)>,
}

impl InsertStatement {
    /// Creates an empty insert.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            values: Vec::new(),
        }
    }

    /// Adds a column value.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: LiteralValue) -> Self {
        self.values.push((column.into(), value));
        self
    }
}

/// `UPDATE` rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Target table.
    pub table: String,
    /// Column/value assignments.
    pub values: Vec<(String, LiteralValue)>,
    /// Raw `WHERE` condition.
    pub where_clause: Option<String>,
}

/// `DELETE` rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Target table.
    pub table: String,
    /// Raw `WHERE` condition.
    pub where_clause: Option<String>,
}

/// Literal SQL, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawSqlStatement {
    /// SQL text.
    pub sql: String,
    /// Delimiter that ends the statement; `;` when unset.
    pub end_delimiter: Option<String>,
}

impl RawSqlStatement {
    /// Creates a raw statement.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            end_delimiter: None,
        }
    }
}

/// Copy the listed columns from one table into another with the same
/// column names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyRowsStatement {
    /// Schema name of both tables.
    pub schema: Option<String>,
    /// Table rows are read from.
    pub source_table: String,
    /// Table rows are written to.
    pub target_table: String,
    /// Columns to copy.
    pub columns: Vec<String>,
}
