//! Table and column statements.

use crate::datatype::{DataType, LiteralValue};
use crate::snapshot::{AutoIncrement, ForeignKeyAction};

/// Column definition used by `CREATE TABLE` and `ADD COLUMN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Logical type; required by every generator.
    pub data_type: Option<DataType>,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Default value.
    pub default_value: Option<LiteralValue>,
    /// Auto-increment settings.
    pub auto_increment: Option<AutoIncrement>,
    /// Whether the column is (part of) the primary key.
    pub primary_key: bool,
    /// Whether the column carries an inline UNIQUE constraint.
    pub unique: bool,
    /// Column comment.
    pub remarks: Option<String>,
}

impl Default for ColumnDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            data_type: None,
            nullable: true,
            default_value: None,
            auto_increment: None,
            primary_key: false,
            unique: false,
            remarks: None,
        }
    }
}

impl ColumnDef {
    /// Creates a nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
            ..Self::default()
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as primary key (implies NOT NULL).
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = Some(AutoIncrement::default());
        self
    }

    /// Marks the column unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: LiteralValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Returns `true` if the column auto-increments.
    #[must_use]
    pub const fn is_auto_increment(&self) -> bool {
        self.auto_increment.is_some()
    }
}

/// Table-level primary key of a `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrimaryKeyDef {
    /// Constraint name.
    pub name: Option<String>,
    /// Key columns.
    pub columns: Vec<String>,
    /// Tablespace of the backing index.
    pub tablespace: Option<String>,
}

/// Table-level unique constraint of a `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniqueDef {
    /// Constraint name.
    pub name: Option<String>,
    /// Constrained columns.
    pub columns: Vec<String>,
}

/// Table-level foreign key of a `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ForeignKeyDef {
    /// Constraint name.
    pub name: Option<String>,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Schema of the referenced table.
    pub referenced_schema: Option<String>,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
    /// `ON DELETE` action.
    pub on_delete: Option<ForeignKeyAction>,
    /// `ON UPDATE` action.
    pub on_update: Option<ForeignKeyAction>,
}

/// `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateTableStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Columns in order.
    pub columns: Vec<ColumnDef>,
    /// Table-level primary key. Columns flagged `primary_key` are merged
    /// into it.
    pub primary_key: Option<PrimaryKeyDef>,
    /// Table-level unique constraints.
    pub unique_constraints: Vec<UniqueDef>,
    /// Table-level foreign keys.
    pub foreign_keys: Vec<ForeignKeyDef>,
    /// Tablespace.
    pub tablespace: Option<String>,
    /// Table comment.
    pub remarks: Option<String>,
    /// Whether to emit `IF NOT EXISTS`.
    pub if_not_exists: bool,
}

impl CreateTableStatement {
    /// Creates an empty table definition.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Sets the schema.
    #[must_use]
    pub fn schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Appends a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKeyDef) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Returns the effective primary key columns: the table-level key if
    /// present, otherwise the columns flagged `primary_key`.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<String> {
        match &self.primary_key {
            Some(pk) if !pk.columns.is_empty() => pk.columns.clone(),
            _ => self
                .columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.clone())
                .collect(),
        }
    }
}

/// `DROP TABLE`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropTableStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Whether dependent constraints are dropped too.
    pub cascade: bool,
    /// Whether to emit `IF EXISTS`.
    pub if_exists: bool,
}

impl DropTableStatement {
    /// Creates a plain drop.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }
}

/// Rename a table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenameTableStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Current name.
    pub old_name: String,
    /// New name.
    pub new_name: String,
}

impl RenameTableStatement {
    /// Creates a rename.
    #[must_use]
    pub fn new(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            schema: None,
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }
}

/// Add a column to an existing table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddColumnStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// The new column.
    pub column: ColumnDef,
}

impl AddColumnStatement {
    /// Creates an add-column statement.
    #[must_use]
    pub fn new(table: impl Into<String>, column: ColumnDef) -> Self {
        Self {
            schema: None,
            table: table.into(),
            column,
        }
    }
}

/// Drop a column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropColumnStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
}

impl DropColumnStatement {
    /// Creates a drop-column statement.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Rename a column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenameColumnStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Current column name.
    pub old_name: String,
    /// New column name.
    pub new_name: String,
    /// Column type, required by backends that restate it on rename.
    pub data_type: Option<DataType>,
}

/// Change a column's type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModifyDataTypeStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Target type.
    pub new_data_type: Option<DataType>,
}

impl ModifyDataTypeStatement {
    /// Creates a retype statement.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>, new_data_type: DataType) -> Self {
        Self {
            schema: None,
            table: table.into(),
            column: column.into(),
            new_data_type: Some(new_data_type),
        }
    }
}

/// Add (`nullable == false`) or drop (`nullable == true`) a NOT NULL
/// constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetNullableStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Column type, required by backends that restate it.
    pub data_type: Option<DataType>,
    /// Target nullability.
    pub nullable: bool,
}

/// Set a column default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddDefaultValueStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Column type.
    pub data_type: Option<DataType>,
    /// The default value.
    pub value: Option<LiteralValue>,
}

/// Remove a column default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropDefaultValueStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Column type.
    pub data_type: Option<DataType>,
}

/// Make an existing column auto-increment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddAutoIncrementStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Column type.
    pub data_type: Option<DataType>,
    /// Sequence settings.
    pub auto_increment: AutoIncrement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_key_flag_implies_not_null() {
        let column = ColumnDef::new("id", DataType::Int).primary_key();
        assert!(!column.nullable);
        assert!(column.primary_key);
    }

    #[test]
    fn primary_key_columns_prefer_table_level_key() {
        let table = CreateTableStatement::new("t")
            .column(ColumnDef::new("a", DataType::Int).primary_key())
            .column(ColumnDef::new("b", DataType::Int));
        assert_eq!(table.primary_key_columns(), ["a"]);

        let explicit = CreateTableStatement {
            primary_key: Some(PrimaryKeyDef {
                name: Some("pk_t".into()),
                columns: vec!["a".into(), "b".into()],
                tablespace: None,
            }),
            ..table
        };
        assert_eq!(explicit.primary_key_columns(), ["a", "b"]);
    }
}
