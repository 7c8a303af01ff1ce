//! Constraint and index statements.

use crate::snapshot::ForeignKeyAction;

/// Add a primary key to an existing table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddPrimaryKeyStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Key columns.
    pub columns: Vec<String>,
    /// Constraint name.
    pub constraint_name: Option<String>,
    /// Tablespace of the backing index.
    pub tablespace: Option<String>,
}

/// Drop a table's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropPrimaryKeyStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Constraint name.
    pub constraint_name: Option<String>,
}

/// Add a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddUniqueConstraintStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Constrained columns.
    pub columns: Vec<String>,
    /// Constraint name.
    pub constraint_name: Option<String>,
    /// Tablespace of the backing index.
    pub tablespace: Option<String>,
}

/// Drop a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropUniqueConstraintStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Constraint name.
    pub constraint_name: String,
}

/// Add a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddForeignKeyConstraintStatement {
    /// Schema of the referencing table.
    pub schema: Option<String>,
    /// Referencing table.
    pub table: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Schema of the referenced table.
    pub referenced_schema: Option<String>,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
    /// Constraint name.
    pub constraint_name: String,
    /// `ON DELETE` action.
    pub on_delete: Option<ForeignKeyAction>,
    /// `ON UPDATE` action.
    pub on_update: Option<ForeignKeyAction>,
}

/// Drop a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropForeignKeyConstraintStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Referencing table.
    pub table: String,
    /// Constraint name.
    pub constraint_name: String,
}

/// `CREATE INDEX`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateIndexStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Indexed table.
    pub table: String,
    /// Index name.
    pub index_name: String,
    /// Indexed columns.
    pub columns: Vec<String>,
    /// Whether the index is unique.
    pub unique: bool,
    /// Tablespace.
    pub tablespace: Option<String>,
    /// Whether to emit `IF NOT EXISTS`.
    pub if_not_exists: bool,
}

impl CreateIndexStatement {
    /// Creates a non-unique index.
    #[must_use]
    pub fn new<S: Into<String>>(
        index_name: impl Into<String>,
        table: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// `DROP INDEX`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropIndexStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Indexed table, required by backends that scope index names to tables.
    pub table: String,
    /// Index name.
    pub index_name: String,
}
