//! Change to statement lowering.

use tracing::warn;

use super::{Change, ColumnConfig, DefaultValue};
use crate::database::{Capability, Database};
use crate::datatype::LiteralValue;
use crate::snapshot::AutoIncrement;
use crate::statement::{
    AddAutoIncrementStatement, AddColumnStatement, AddDefaultValueStatement,
    AddForeignKeyConstraintStatement, AddPrimaryKeyStatement, AddUniqueConstraintStatement,
    AlterSequenceStatement, CreateIndexStatement, CreateSequenceStatement, CreateTableStatement,
    CreateViewStatement, DropColumnStatement, DropDefaultValueStatement,
    DropForeignKeyConstraintStatement, DropIndexStatement, DropPrimaryKeyStatement,
    DropSequenceStatement, DropTableStatement, DropUniqueConstraintStatement, DropViewStatement,
    InsertStatement, ModifyDataTypeStatement, PrimaryKeyDef, RawSqlStatement,
    RenameColumnStatement, RenameTableStatement, SetNullableStatement, SqlStatement,
    TagDatabaseStatement, UpdateStatement,
};

pub(super) fn statements(change: &Change, database: &dyn Database) -> Vec<SqlStatement> {
    match change.clone() {
        Change::CreateTable {
            schema_name,
            table_name,
            columns,
            tablespace,
            remarks,
        } => vec![create_table(schema_name, table_name, &columns, tablespace, remarks).into()],
        Change::DropTable {
            schema_name,
            table_name,
            cascade_constraints,
        } => {
            let cascade = cascade_constraints && database.supports(Capability::DropTableCascade);
            if cascade_constraints && !cascade {
                warn!(
                    table = %table_name,
                    database = database.short_name(),
                    "database cannot cascade a table drop, dropping without CASCADE"
                );
            }
            vec![DropTableStatement {
                schema: schema_name,
                table: table_name,
                cascade,
                if_exists: false,
            }
            .into()]
        }
        Change::RenameTable {
            schema_name,
            old_table_name,
            new_table_name,
        } => vec![RenameTableStatement {
            schema: schema_name,
            old_name: old_table_name,
            new_name: new_table_name,
        }
        .into()],
        Change::AddColumn {
            schema_name,
            table_name,
            columns,
        } => add_columns(schema_name, &table_name, &columns),
        Change::DropColumn {
            schema_name,
            table_name,
            column_name,
        } => vec![DropColumnStatement {
            schema: schema_name,
            table: table_name,
            column: column_name,
        }
        .into()],
        Change::RenameColumn {
            schema_name,
            table_name,
            old_column_name,
            new_column_name,
            column_data_type,
        } => vec![RenameColumnStatement {
            schema: schema_name,
            table: table_name,
            old_name: old_column_name,
            new_name: new_column_name,
            data_type: column_data_type,
        }
        .into()],
        Change::ModifyDataType {
            schema_name,
            table_name,
            column_name,
            new_data_type,
        } => vec![ModifyDataTypeStatement {
            schema: schema_name,
            table: table_name,
            column: column_name,
            new_data_type: Some(new_data_type),
        }
        .into()],
        Change::AddNotNullConstraint {
            schema_name,
            table_name,
            column_name,
            column_data_type,
            default_null_value,
        } => {
            let mut statements = Vec::with_capacity(2);
            if let Some(value) = default_null_value {
                statements.push(
                    UpdateStatement {
                        schema: schema_name.clone(),
                        table: table_name.clone(),
                        values: vec![(column_name.clone(), value.to_literal())],
                        where_clause: Some(format!(
                            "{} IS NULL",
                            database.escape_column_name(&column_name)
                        )),
                    }
                    .into(),
                );
            }
            statements.push(
                SetNullableStatement {
                    schema: schema_name,
                    table: table_name,
                    column: column_name,
                    data_type: column_data_type,
                    nullable: false,
                }
                .into(),
            );
            statements
        }
        Change::DropNotNullConstraint {
            schema_name,
            table_name,
            column_name,
            column_data_type,
        } => vec![SetNullableStatement {
            schema: schema_name,
            table: table_name,
            column: column_name,
            data_type: column_data_type,
            nullable: true,
        }
        .into()],
        Change::AddDefaultValue {
            schema_name,
            table_name,
            column_name,
            column_data_type,
            default_value,
        } => vec![AddDefaultValueStatement {
            schema: schema_name,
            table: table_name,
            column: column_name,
            data_type: column_data_type,
            value: Some(default_value.to_literal()),
        }
        .into()],
        Change::DropDefaultValue {
            schema_name,
            table_name,
            column_name,
            column_data_type,
        } => vec![DropDefaultValueStatement {
            schema: schema_name,
            table: table_name,
            column: column_name,
            data_type: column_data_type,
        }
        .into()],
        Change::AddAutoIncrement {
            schema_name,
            table_name,
            column_name,
            column_data_type,
            start_with,
            increment_by,
        } => vec![AddAutoIncrementStatement {
            schema: schema_name,
            table: table_name,
            column: column_name,
            data_type: column_data_type,
            auto_increment: AutoIncrement {
                start_with,
                increment_by,
            },
        }
        .into()],
        Change::AddPrimaryKey {
            schema_name,
            table_name,
            column_names,
            constraint_name,
            tablespace,
        } => vec![AddPrimaryKeyStatement {
            schema: schema_name,
            table: table_name,
            columns: column_names,
            constraint_name,
            tablespace,
        }
        .into()],
        Change::DropPrimaryKey {
            schema_name,
            table_name,
            constraint_name,
        } => vec![DropPrimaryKeyStatement {
            schema: schema_name,
            table: table_name,
            constraint_name,
        }
        .into()],
        Change::AddUniqueConstraint {
            schema_name,
            table_name,
            column_names,
            constraint_name,
            tablespace,
        } => vec![AddUniqueConstraintStatement {
            schema: schema_name,
            table: table_name,
            columns: column_names,
            constraint_name,
            tablespace,
        }
        .into()],
        Change::DropUniqueConstraint {
            schema_name,
            table_name,
            constraint_name,
        } => vec![DropUniqueConstraintStatement {
            schema: schema_name,
            table: table_name,
            constraint_name,
        }
        .into()],
        Change::AddForeignKeyConstraint {
            base_table_schema_name,
            base_table_name,
            base_column_names,
            referenced_table_schema_name,
            referenced_table_name,
            referenced_column_names,
            constraint_name,
            on_delete,
            on_update,
        } => vec![AddForeignKeyConstraintStatement {
            schema: base_table_schema_name,
            table: base_table_name,
            columns: base_column_names,
            referenced_schema: referenced_table_schema_name,
            referenced_table: referenced_table_name,
            referenced_columns: referenced_column_names,
            constraint_name,
            on_delete,
            on_update,
        }
        .into()],
        Change::DropForeignKeyConstraint {
            base_table_schema_name,
            base_table_name,
            constraint_name,
        } => vec![DropForeignKeyConstraintStatement {
            schema: base_table_schema_name,
            table: base_table_name,
            constraint_name,
        }
        .into()],
        Change::CreateIndex {
            schema_name,
            table_name,
            index_name,
            columns,
            unique,
            tablespace,
        } => vec![CreateIndexStatement {
            schema: schema_name,
            unique,
            tablespace,
            ..CreateIndexStatement::new(index_name, table_name, columns)
        }
        .into()],
        Change::DropIndex {
            schema_name,
            table_name,
            index_name,
        } => vec![DropIndexStatement {
            schema: schema_name,
            table: table_name,
            index_name,
        }
        .into()],
        Change::CreateSequence {
            schema_name,
            sequence_name,
            start_value,
            increment_by,
            min_value,
            max_value,
            ordered,
            cycle,
        } => vec![CreateSequenceStatement {
            schema: schema_name,
            name: sequence_name,
            start_value,
            increment_by,
            min_value,
            max_value,
            ordered,
            cycle,
        }
        .into()],
        Change::AlterSequence {
            schema_name,
            sequence_name,
            increment_by,
            min_value,
            max_value,
            ordered,
        } => vec![AlterSequenceStatement {
            schema: schema_name,
            name: sequence_name,
            increment_by,
            min_value,
            max_value,
            ordered,
        }
        .into()],
        Change::DropSequence {
            schema_name,
            sequence_name,
        } => vec![DropSequenceStatement {
            schema: schema_name,
            name: sequence_name,
        }
        .into()],
        Change::CreateView {
            schema_name,
            view_name,
            select_query,
            replace_if_exists,
        } => vec![CreateViewStatement {
            schema: schema_name,
            name: view_name,
            select: select_query,
            replace_if_exists,
        }
        .into()],
        Change::DropView {
            schema_name,
            view_name,
        } => vec![DropViewStatement {
            schema: schema_name,
            name: view_name,
        }
        .into()],
        Change::Insert {
            schema_name,
            table_name,
            columns,
        } => vec![InsertStatement {
            schema: schema_name,
            table: table_name,
            values: columns
                .iter()
                .map(|c| (c.name.clone(), literal_or_null(c.value.as_ref())))
                .collect(),
        }
        .into()],
        Change::Sql { sql, end_delimiter } => {
            vec![RawSqlStatement { sql, end_delimiter }.into()]
        }
        Change::TagDatabase { tag } => vec![TagDatabaseStatement { schema: None, tag }.into()],
    }
}

fn literal_or_null(value: Option<&DefaultValue>) -> LiteralValue {
    value.map_or(LiteralValue::Null, DefaultValue::to_literal)
}

fn create_table(
    schema: Option<String>,
    table: String,
    columns: &[ColumnConfig],
    tablespace: Option<String>,
    remarks: Option<String>,
) -> CreateTableStatement {
    let primary_key = columns
        .iter()
        .find_map(|c| c.primary_key_name.clone())
        .map(|name| PrimaryKeyDef {
            name: Some(name),
            columns: columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.clone())
                .collect(),
            tablespace: None,
        });
    CreateTableStatement {
        schema,
        table,
        columns: columns.iter().map(ColumnConfig::to_column_def).collect(),
        primary_key,
        tablespace,
        remarks,
        ..CreateTableStatement::default()
    }
}

fn add_columns(schema: Option<String>, table: &str, columns: &[ColumnConfig]) -> Vec<SqlStatement> {
    let mut statements = Vec::with_capacity(columns.len());
    for column in columns {
        statements.push(
            AddColumnStatement {
                schema: schema.clone(),
                table: table.to_string(),
                column: column.to_column_def(),
            }
            .into(),
        );
        if let Some(value) = &column.value {
            statements.push(
                UpdateStatement {
                    schema: schema.clone(),
                    table: table.to_string(),
                    values: vec![(column.name.clone(), value.to_literal())],
                    where_clause: None,
                }
                .into(),
            );
        }
    }
    statements
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::{GenericDatabase, PostgresDatabase, SqliteDatabase};
    use crate::datatype::DataType;
    use crate::sql::Sql;
    use crate::sqlgen::build_default_registry;

    fn render(change: &Change, database: &dyn Database) -> Vec<String> {
        let registry = build_default_registry();
        change
            .generate_statements(database)
            .into_iter()
            .flat_map(|s| registry.generate_sql(&s, database).unwrap())
            .map(|s: Sql| s.text().to_string())
            .collect()
    }

    #[test]
    fn create_table_with_named_primary_key() {
        let change = Change::CreateTable {
            schema_name: None,
            table_name: "users".into(),
            columns: vec![
                ColumnConfig {
                    primary_key_name: Some("pk_users".into()),
                    ..ColumnConfig::new("id", DataType::Int).primary_key()
                },
                ColumnConfig::new("email", DataType::Varchar(Some(255))).not_null(),
            ],
            tablespace: None,
            remarks: None,
        };
        assert_eq!(
            render(&change, &PostgresDatabase::new()),
            ["CREATE TABLE users (id INTEGER NOT NULL, email VARCHAR(255) NOT NULL, CONSTRAINT pk_users PRIMARY KEY (id))"]
        );
    }

    #[test]
    fn not_null_fills_existing_nulls_first() {
        let change = Change::AddNotNullConstraint {
            schema_name: None,
            table_name: "users".into(),
            column_name: "status".into(),
            column_data_type: Some(DataType::Varchar(Some(20))),
            default_null_value: Some(DefaultValue::Text("active".into())),
        };
        assert_eq!(
            render(&change, &PostgresDatabase::new()),
            [
                "UPDATE users SET status = 'active' WHERE status IS NULL",
                "ALTER TABLE users ALTER COLUMN status SET NOT NULL",
            ]
        );
    }

    #[test]
    fn add_column_with_value_populates_rows() {
        let change = Change::AddColumn {
            schema_name: None,
            table_name: "users".into(),
            columns: vec![ColumnConfig {
                value: Some(DefaultValue::Boolean(true)),
                ..ColumnConfig::new("active", DataType::Boolean)
            }],
        };
        assert_eq!(
            render(&change, &SqliteDatabase::new()),
            ["ALTER TABLE users ADD active BOOLEAN", "UPDATE users SET active = 1"]
        );
    }

    #[test]
    fn cascade_is_dropped_where_unsupported() {
        let change = Change::DropTable {
            schema_name: None,
            table_name: "users".into(),
            cascade_constraints: true,
        };
        assert_eq!(render(&change, &PostgresDatabase::new()), ["DROP TABLE users CASCADE"]);
        assert_eq!(render(&change, &SqliteDatabase::new()), ["DROP TABLE users"]);
    }

    #[test]
    fn insert_renders_literals() {
        let change = Change::Insert {
            schema_name: None,
            table_name: "settings".into(),
            columns: vec![
                ColumnConfig::value("name", DefaultValue::Text("theme".into())),
                ColumnConfig::value("value", DefaultValue::Text("dark".into())),
                ColumnConfig::value("updated", DefaultValue::computed("CURRENT_TIMESTAMP")),
            ],
        };
        assert_eq!(
            render(&change, &GenericDatabase::new()),
            ["INSERT INTO settings (name, value, updated) VALUES ('theme', 'dark', CURRENT_TIMESTAMP)"]
        );
    }
}
