//! Changes: the persistable, human-authored form of a schema mutation.
//!
//! A [`Change`] is what a changelog stores and what the diff pipeline
//! emits. It lowers to one or more [statements](crate::statement) with
//! [`Change::generate_statements`] and knows how to undo itself with
//! [`Change::reverse`] where that is possible without extra input.
//!
//! Changes serialize as JSON objects tagged by a `change` field:
//!
//! ```json
//! {"change": "addColumn", "tableName": "users",
//!  "columns": [{"name": "bio", "type": "TEXT"}]}
//! ```

mod column;
mod lower;

pub use column::{ColumnConfig, DefaultValue};

use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::datatype::DataType;
use crate::error::Result;
use crate::snapshot::ForeignKeyAction;
use crate::sqlgen::SqlGeneratorRegistry;
use crate::statement::SqlStatement;
use crate::validation::ValidationErrors;

fn is_false(value: &bool) -> bool {
    !*value
}

/// A schema or data mutation as written in a changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "change",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Change {
    /// Create a table.
    CreateTable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        columns: Vec<ColumnConfig>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tablespace: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remarks: Option<String>,
    },

    /// Drop a table.
    DropTable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        #[serde(default, skip_serializing_if = "is_false")]
        cascade_constraints: bool,
    },

    /// Rename a table.
    RenameTable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        old_table_name: String,
        new_table_name: String,
    },

    /// Add one or more columns.
    AddColumn {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        columns: Vec<ColumnConfig>,
    },

    /// Drop a column.
    DropColumn {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        column_name: String,
    },

    /// Rename a column.
    RenameColumn {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        old_column_name: String,
        new_column_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column_data_type: Option<DataType>,
    },

    /// Change a column's type.
    ModifyDataType {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        column_name: String,
        new_data_type: DataType,
    },

    /// Make a column NOT NULL, optionally filling existing NULLs first.
    AddNotNullConstraint {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        column_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column_data_type: Option<DataType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_null_value: Option<DefaultValue>,
    },

    /// Allow NULL in a column.
    DropNotNullConstraint {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        column_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column_data_type: Option<DataType>,
    },

    /// Set a column default.
    AddDefaultValue {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        column_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column_data_type: Option<DataType>,
        default_value: DefaultValue,
    },

    /// Remove a column default.
    DropDefaultValue {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        column_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column_data_type: Option<DataType>,
    },

    /// Make a column auto-increment.
    AddAutoIncrement {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        column_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column_data_type: Option<DataType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_with: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        increment_by: Option<i64>,
    },

    /// Add a primary key.
    AddPrimaryKey {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        column_names: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        constraint_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tablespace: Option<String>,
    },

    /// Drop a primary key.
    DropPrimaryKey {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        constraint_name: Option<String>,
    },

    /// Add a unique constraint.
    AddUniqueConstraint {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        column_names: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        constraint_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tablespace: Option<String>,
    },

    /// Drop a unique constraint.
    DropUniqueConstraint {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        constraint_name: String,
    },

    /// Add a foreign key.
    AddForeignKeyConstraint {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_table_schema_name: Option<String>,
        base_table_name: String,
        base_column_names: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        referenced_table_schema_name: Option<String>,
        referenced_table_name: String,
        referenced_column_names: Vec<String>,
        constraint_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_delete: Option<ForeignKeyAction>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_update: Option<ForeignKeyAction>,
    },

    /// Drop a foreign key.
    DropForeignKeyConstraint {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_table_schema_name: Option<String>,
        base_table_name: String,
        constraint_name: String,
    },

    /// Create an index.
    CreateIndex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        index_name: String,
        columns: Vec<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        unique: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tablespace: Option<String>,
    },

    /// Drop an index.
    DropIndex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        index_name: String,
    },

    /// Create a sequence.
    CreateSequence {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        sequence_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_value: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        increment_by: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_value: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_value: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ordered: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cycle: Option<bool>,
    },

    /// Alter a sequence.
    AlterSequence {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        sequence_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        increment_by: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_value: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_value: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ordered: Option<bool>,
    },

    /// Drop a sequence.
    DropSequence {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        sequence_name: String,
    },

    /// Create (or replace) a view.
    CreateView {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        view_name: String,
        select_query: String,
        #[serde(default, skip_serializing_if = "is_false")]
        replace_if_exists: bool,
    },

    /// Drop a view.
    DropView {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        view_name: String,
    },

    /// Insert one row.
    Insert {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        columns: Vec<ColumnConfig>,
    },

    /// Literal SQL.
    Sql {
        sql: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_delimiter: Option<String>,
    },

    /// Tag the database at this point.
    TagDatabase { tag: String },
}

impl Change {
    /// Returns the changelog name of this change, e.g. `addColumn`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "createTable",
            Self::DropTable { .. } => "dropTable",
            Self::RenameTable { .. } => "renameTable",
            Self::AddColumn { .. } => "addColumn",
            Self::DropColumn { .. } => "dropColumn",
            Self::RenameColumn { .. } => "renameColumn",
            Self::ModifyDataType { .. } => "modifyDataType",
            Self::AddNotNullConstraint { .. } => "addNotNullConstraint",
            Self::DropNotNullConstraint { .. } => "dropNotNullConstraint",
            Self::AddDefaultValue { .. } => "addDefaultValue",
            Self::DropDefaultValue { .. } => "dropDefaultValue",
            Self::AddAutoIncrement { .. } => "addAutoIncrement",
            Self::AddPrimaryKey { .. } => "addPrimaryKey",
            Self::DropPrimaryKey { .. } => "dropPrimaryKey",
            Self::AddUniqueConstraint { .. } => "addUniqueConstraint",
            Self::DropUniqueConstraint { .. } => "dropUniqueConstraint",
            Self::AddForeignKeyConstraint { .. } => "addForeignKeyConstraint",
            Self::DropForeignKeyConstraint { .. } => "dropForeignKeyConstraint",
            Self::CreateIndex { .. } => "createIndex",
            Self::DropIndex { .. } => "dropIndex",
            Self::CreateSequence { .. } => "createSequence",
            Self::AlterSequence { .. } => "alterSequence",
            Self::DropSequence { .. } => "dropSequence",
            Self::CreateView { .. } => "createView",
            Self::DropView { .. } => "dropView",
            Self::Insert { .. } => "insert",
            Self::Sql { .. } => "sql",
            Self::TagDatabase { .. } => "tagDatabase",
        }
    }

    /// Lowers the change to statements for the database.
    #[must_use]
    pub fn generate_statements(&self, database: &dyn Database) -> Vec<SqlStatement> {
        lower::statements(self, database)
    }

    /// Validates every statement the change lowers to and merges the
    /// results.
    ///
    /// # Errors
    ///
    /// Returns an error if no generator can be resolved for a statement.
    pub fn validate(
        &self,
        registry: &SqlGeneratorRegistry,
        database: &dyn Database,
    ) -> Result<ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for statement in self.generate_statements(database) {
            errors.extend(registry.validate(&statement, database)?);
        }
        Ok(errors)
    }

    /// Returns a one-line human description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { table_name, .. } => format!("Create table '{table_name}'"),
            Self::DropTable { table_name, .. } => format!("Drop table '{table_name}'"),
            Self::RenameTable {
                old_table_name,
                new_table_name,
                ..
            } => format!("Rename table '{old_table_name}' to '{new_table_name}'"),
            Self::AddColumn {
                table_name,
                columns,
                ..
            } => {
                let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
                format!("Add column '{}' to table '{table_name}'", names.join(", "))
            }
            Self::DropColumn {
                table_name,
                column_name,
                ..
            } => format!("Drop column '{column_name}' from table '{table_name}'"),
            Self::RenameColumn {
                table_name,
                old_column_name,
                new_column_name,
                ..
            } => format!(
                "Rename column '{old_column_name}' to '{new_column_name}' in table '{table_name}'"
            ),
            Self::ModifyDataType {
                table_name,
                column_name,
                new_data_type,
                ..
            } => format!("Change type of '{table_name}.{column_name}' to {new_data_type}"),
            Self::AddNotNullConstraint {
                table_name,
                column_name,
                ..
            } => format!("Add not null constraint to '{table_name}.{column_name}'"),
            Self::DropNotNullConstraint {
                table_name,
                column_name,
                ..
            } => format!("Drop not null constraint from '{table_name}.{column_name}'"),
            Self::AddDefaultValue {
                table_name,
                column_name,
                ..
            } => format!("Add default value to '{table_name}.{column_name}'"),
            Self::DropDefaultValue {
                table_name,
                column_name,
                ..
            } => format!("Drop default value from '{table_name}.{column_name}'"),
            Self::AddAutoIncrement {
                table_name,
                column_name,
                ..
            } => format!("Make '{table_name}.{column_name}' auto-increment"),
            Self::AddPrimaryKey { table_name, .. } => {
                format!("Add primary key to table '{table_name}'")
            }
            Self::DropPrimaryKey { table_name, .. } => {
                format!("Drop primary key from table '{table_name}'")
            }
            Self::AddUniqueConstraint {
                table_name,
                column_names,
                ..
            } => format!(
                "Add unique constraint on '{}' to table '{table_name}'",
                column_names.join(", ")
            ),
            Self::DropUniqueConstraint {
                table_name,
                constraint_name,
                ..
            } => format!("Drop unique constraint '{constraint_name}' from table '{table_name}'"),
            Self::AddForeignKeyConstraint {
                base_table_name,
                constraint_name,
                ..
            } => format!("Add foreign key '{constraint_name}' to table '{base_table_name}'"),
            Self::DropForeignKeyConstraint {
                base_table_name,
                constraint_name,
                ..
            } => format!("Drop foreign key '{constraint_name}' from table '{base_table_name}'"),
            Self::CreateIndex {
                table_name,
                index_name,
                ..
            } => format!("Create index '{index_name}' on table '{table_name}'"),
            Self::DropIndex { index_name, .. } => format!("Drop index '{index_name}'"),
            Self::CreateSequence { sequence_name, .. } => {
                format!("Create sequence '{sequence_name}'")
            }
            Self::AlterSequence { sequence_name, .. } => {
                format!("Alter sequence '{sequence_name}'")
            }
            Self::DropSequence { sequence_name, .. } => format!("Drop sequence '{sequence_name}'"),
            Self::CreateView { view_name, .. } => format!("Create view '{view_name}'"),
            Self::DropView { view_name, .. } => format!("Drop view '{view_name}'"),
            Self::Insert { table_name, .. } => format!("Insert row into table '{table_name}'"),
            Self::Sql { .. } => "Run custom SQL".to_string(),
            Self::TagDatabase { tag } => format!("Tag database '{tag}'"),
        }
    }

    /// Returns `true` if [`Self::reverse`] can undo the change.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        match self {
            Self::CreateTable { .. }
            | Self::RenameTable { .. }
            | Self::AddColumn { .. }
            | Self::RenameColumn { .. }
            | Self::AddNotNullConstraint { .. }
            | Self::DropNotNullConstraint { .. }
            | Self::AddDefaultValue { .. }
            | Self::AddPrimaryKey { .. }
            | Self::AddForeignKeyConstraint { .. }
            | Self::CreateIndex { .. }
            | Self::CreateSequence { .. }
            | Self::CreateView { .. }
            | Self::TagDatabase { .. } => true,
            Self::AddUniqueConstraint {
                constraint_name, ..
            } => constraint_name.is_some(),
            Self::DropTable { .. }
            | Self::DropColumn { .. }
            | Self::ModifyDataType { .. }
            | Self::DropDefaultValue { .. }
            | Self::AddAutoIncrement { .. }
            | Self::DropPrimaryKey { .. }
            | Self::DropUniqueConstraint { .. }
            | Self::DropForeignKeyConstraint { .. }
            | Self::DropIndex { .. }
            | Self::AlterSequence { .. }
            | Self::DropSequence { .. }
            | Self::DropView { .. }
            | Self::Insert { .. }
            | Self::Sql { .. } => false,
        }
    }

    /// Returns the changes that undo this one, in execution order, or
    /// `None` if the change cannot be undone from its own description.
    #[must_use]
    pub fn reverse(&self) -> Option<Vec<Self>> {
        let reversed = match self.clone() {
            Self::CreateTable {
                schema_name,
                table_name,
                ..
            } => vec![Self::DropTable {
                schema_name,
                table_name,
                cascade_constraints: false,
            }],
            Self::RenameTable {
                schema_name,
                old_table_name,
                new_table_name,
            } => vec![Self::RenameTable {
                schema_name,
                old_table_name: new_table_name,
                new_table_name: old_table_name,
            }],
            Self::AddColumn {
                schema_name,
                table_name,
                columns,
            } => columns
                .into_iter()
                .rev()
                .map(|c| Self::DropColumn {
                    schema_name: schema_name.clone(),
                    table_name: table_name.clone(),
                    column_name: c.name,
                })
                .collect(),
            Self::RenameColumn {
                schema_name,
                table_name,
                old_column_name,
                new_column_name,
                column_data_type,
            } => vec![Self::RenameColumn {
                schema_name,
                table_name,
                old_column_name: new_column_name,
                new_column_name: old_column_name,
                column_data_type,
            }],
            Self::AddNotNullConstraint {
                schema_name,
                table_name,
                column_name,
                column_data_type,
                ..
            } => vec![Self::DropNotNullConstraint {
                schema_name,
                table_name,
                column_name,
                column_data_type,
            }],
            Self::DropNotNullConstraint {
                schema_name,
                table_name,
                column_name,
                column_data_type,
            } => vec![Self::AddNotNullConstraint {
                schema_name,
                table_name,
                column_name,
                column_data_type,
                default_null_value: None,
            }],
            Self::AddDefaultValue {
                schema_name,
                table_name,
                column_name,
                column_data_type,
                ..
            } => vec![Self::DropDefaultValue {
                schema_name,
                table_name,
                column_name,
                column_data_type,
            }],
            Self::AddPrimaryKey {
                schema_name,
                table_name,
                constraint_name,
                ..
            } => vec![Self::DropPrimaryKey {
                schema_name,
                table_name,
                constraint_name,
            }],
            Self::AddUniqueConstraint {
                schema_name,
                table_name,
                constraint_name: Some(constraint_name),
                ..
            } => vec![Self::DropUniqueConstraint {
                schema_name,
                table_name,
                constraint_name,
            }],
            Self::AddForeignKeyConstraint {
                base_table_schema_name,
                base_table_name,
                constraint_name,
                ..
            } => vec![Self::DropForeignKeyConstraint {
                base_table_schema_name,
                base_table_name,
                constraint_name,
            }],
            Self::CreateIndex {
                schema_name,
                table_name,
                index_name,
                ..
            } => vec![Self::DropIndex {
                schema_name,
                table_name,
                index_name,
            }],
            Self::CreateSequence {
                schema_name,
                sequence_name,
                ..
            } => vec![Self::DropSequence {
                schema_name,
                sequence_name,
            }],
            Self::CreateView {
                schema_name,
                view_name,
                ..
            } => vec![Self::DropView {
                schema_name,
                view_name,
            }],
            // the history row carries the tag; nothing to undo in the schema
            Self::TagDatabase { .. } => Vec::new(),
            _ => return None,
        };
        Some(reversed)
    }
}
