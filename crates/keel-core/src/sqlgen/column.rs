//! Column-level generators.
//!
//! Everything except adding, dropping and renaming a column needs
//! [`Capability::AlterColumn`]; backends without it get table-rebuild
//! generators instead.

use super::table::{column_definition, validate_column};
use super::{SqlGenerator, SqlGeneratorRegistry};
use crate::database::{Capability, Database};
use crate::error::Result;
use crate::snapshot::ObjectType;
use crate::sql::{AffectedObject, Sql};
use crate::statement::{
    AddAutoIncrementStatement, AddColumnStatement, AddDefaultValueStatement, DropColumnStatement,
    DropDefaultValueStatement, ModifyDataTypeStatement, RenameColumnStatement,
    SetNullableStatement,
};
use crate::validation::ValidationErrors;

pub(super) fn register(registry: &mut SqlGeneratorRegistry) {
    registry
        .register(AddColumnGenerator)
        .register(DropColumnGenerator)
        .register(RenameColumnGenerator)
        .register(ModifyDataTypeGenerator)
        .register(SetNullableGenerator)
        .register(AddDefaultValueGenerator)
        .register(DropDefaultValueGenerator)
        .register(AddAutoIncrementGenerator);
}

pub(crate) fn alter_column_prefix(
    database: &dyn Database,
    schema: Option<&str>,
    table: &str,
    column: &str,
) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {}",
        database.escape_table_name(schema, table),
        database.escape_column_name(column)
    )
}

pub(crate) fn column_sql(sql: String, schema: Option<&str>, table: &str, column: &str) -> Vec<Sql> {
    vec![Sql::new(sql).affecting(AffectedObject::child(ObjectType::Column, schema, table, column))]
}

fn check_table_and_column(errors: &mut ValidationErrors, table: &str, column: &str) {
    errors.check_required_field("tableName", table);
    errors.check_required_field("columnName", column);
}

/// Checks shared by every `ADD COLUMN` generator.
pub(crate) fn validate_add_column(
    statement: &AddColumnStatement,
    database: &dyn Database,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("tableName", &statement.table);
    validate_column(&statement.column, &mut errors);
    if statement.column.primary_key && !database.supports(Capability::AddPrimaryKeyColumn) {
        errors.add_error(format!(
            "cannot add a primary key column on {}",
            database.short_name()
        ));
    }
    errors
}

/// `ALTER TABLE .. ADD column`.
pub struct AddColumnGenerator;

impl SqlGenerator for AddColumnGenerator {
    type Statement = AddColumnStatement;

    fn name(&self) -> &str {
        "AddColumnGenerator"
    }

    fn validate(&self, statement: &AddColumnStatement, database: &dyn Database) -> ValidationErrors {
        validate_add_column(statement, database)
    }

    fn generate_sql(
        &self,
        statement: &AddColumnStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let inline_primary_key = statement.column.primary_key.then_some("PRIMARY KEY");
        let sql = format!(
            "ALTER TABLE {} ADD {}",
            database.escape_table_name(schema, &statement.table),
            column_definition(&statement.column, database, inline_primary_key)
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.column.name))
    }
}

/// Checks shared by every `DROP COLUMN` generator.
pub(crate) fn validate_drop_column(statement: &DropColumnStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_table_and_column(&mut errors, &statement.table, &statement.column);
    errors
}

/// `ALTER TABLE .. DROP COLUMN`.
pub struct DropColumnGenerator;

impl SqlGenerator for DropColumnGenerator {
    type Statement = DropColumnStatement;

    fn name(&self) -> &str {
        "DropColumnGenerator"
    }

    fn validate(&self, statement: &DropColumnStatement, _database: &dyn Database) -> ValidationErrors {
        validate_drop_column(statement)
    }

    fn generate_sql(
        &self,
        statement: &DropColumnStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            database.escape_table_name(schema, &statement.table),
            database.escape_column_name(&statement.column)
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.column))
    }
}

/// Checks shared by every column rename generator.
pub(crate) fn validate_rename_column(statement: &RenameColumnStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("tableName", &statement.table);
    errors.check_required_field("oldColumnName", &statement.old_name);
    errors.check_required_field("newColumnName", &statement.new_name);
    errors
}

/// `ALTER TABLE .. RENAME COLUMN .. TO ..`.
pub struct RenameColumnGenerator;

impl SqlGenerator for RenameColumnGenerator {
    type Statement = RenameColumnStatement;

    fn name(&self) -> &str {
        "RenameColumnGenerator"
    }

    fn validate(&self, statement: &RenameColumnStatement, _database: &dyn Database) -> ValidationErrors {
        validate_rename_column(statement)
    }

    fn generate_sql(
        &self,
        statement: &RenameColumnStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let sql = format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            database.escape_table_name(schema, &statement.table),
            database.escape_column_name(&statement.old_name),
            database.escape_column_name(&statement.new_name)
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.new_name))
    }
}

/// Checks shared by every retype generator.
pub(crate) fn validate_modify_data_type(statement: &ModifyDataTypeStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_table_and_column(&mut errors, &statement.table, &statement.column);
    errors.check_required_value("newDataType", statement.new_data_type.as_ref());
    errors
}

/// `ALTER TABLE .. ALTER COLUMN .. SET DATA TYPE ..`.
pub struct ModifyDataTypeGenerator;

impl SqlGenerator for ModifyDataTypeGenerator {
    type Statement = ModifyDataTypeStatement;

    fn name(&self) -> &str {
        "ModifyDataTypeGenerator"
    }

    fn supports(&self, _statement: &ModifyDataTypeStatement, database: &dyn Database) -> bool {
        database.supports(Capability::AlterColumn)
    }

    fn validate(&self, statement: &ModifyDataTypeStatement, _database: &dyn Database) -> ValidationErrors {
        validate_modify_data_type(statement)
    }

    fn generate_sql(
        &self,
        statement: &ModifyDataTypeStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let type_name = statement
            .new_data_type
            .as_ref()
            .map(|t| database.column_type(t))
            .unwrap_or_default();
        let sql = format!(
            "{} SET DATA TYPE {type_name}",
            alter_column_prefix(database, schema, &statement.table, &statement.column)
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.column))
    }
}

/// Checks shared by every nullability generator.
pub(crate) fn validate_set_nullable(statement: &SetNullableStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_table_and_column(&mut errors, &statement.table, &statement.column);
    errors
}

/// `ALTER TABLE .. ALTER COLUMN .. SET NOT NULL` / `DROP NOT NULL`.
pub struct SetNullableGenerator;

impl SqlGenerator for SetNullableGenerator {
    type Statement = SetNullableStatement;

    fn name(&self) -> &str {
        "SetNullableGenerator"
    }

    fn supports(&self, _statement: &SetNullableStatement, database: &dyn Database) -> bool {
        database.supports(Capability::AlterColumn)
    }

    fn validate(&self, statement: &SetNullableStatement, _database: &dyn Database) -> ValidationErrors {
        validate_set_nullable(statement)
    }

    fn generate_sql(
        &self,
        statement: &SetNullableStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let action = if statement.nullable {
            "DROP NOT NULL"
        } else {
            "SET NOT NULL"
        };
        let sql = format!(
            "{} {action}",
            alter_column_prefix(database, schema, &statement.table, &statement.column)
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.column))
    }
}

/// Checks shared by every default-value generator.
pub(crate) fn validate_add_default_value(statement: &AddDefaultValueStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_table_and_column(&mut errors, &statement.table, &statement.column);
    errors.check_required_value("defaultValue", statement.value.as_ref());
    errors
}

/// `ALTER TABLE .. ALTER COLUMN .. SET DEFAULT ..`.
pub struct AddDefaultValueGenerator;

impl SqlGenerator for AddDefaultValueGenerator {
    type Statement = AddDefaultValueStatement;

    fn name(&self) -> &str {
        "AddDefaultValueGenerator"
    }

    fn supports(&self, _statement: &AddDefaultValueStatement, database: &dyn Database) -> bool {
        database.supports(Capability::AlterColumn)
    }

    fn validate(&self, statement: &AddDefaultValueStatement, _database: &dyn Database) -> ValidationErrors {
        validate_add_default_value(statement)
    }

    fn generate_sql(
        &self,
        statement: &AddDefaultValueStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let value = statement
            .value
            .as_ref()
            .map(|v| database.literal(v))
            .unwrap_or_default();
        let sql = format!(
            "{} SET DEFAULT {value}",
            alter_column_prefix(database, schema, &statement.table, &statement.column)
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.column))
    }
}

/// Checks shared by every drop-default generator.
pub(crate) fn validate_drop_default_value(statement: &DropDefaultValueStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_table_and_column(&mut errors, &statement.table, &statement.column);
    errors
}

/// `ALTER TABLE .. ALTER COLUMN .. DROP DEFAULT`.
pub struct DropDefaultValueGenerator;

impl SqlGenerator for DropDefaultValueGenerator {
    type Statement = DropDefaultValueStatement;

    fn name(&self) -> &str {
        "DropDefaultValueGenerator"
    }

    fn supports(&self, _statement: &DropDefaultValueStatement, database: &dyn Database) -> bool {
        database.supports(Capability::AlterColumn)
    }

    fn validate(&self, statement: &DropDefaultValueStatement, _database: &dyn Database) -> ValidationErrors {
        validate_drop_default_value(statement)
    }

    fn generate_sql(
        &self,
        statement: &DropDefaultValueStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let sql = format!(
            "{} DROP DEFAULT",
            alter_column_prefix(database, schema, &statement.table, &statement.column)
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.column))
    }
}

/// Checks shared by every auto-increment generator.
pub(crate) fn validate_add_auto_increment(statement: &AddAutoIncrementStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_table_and_column(&mut errors, &statement.table, &statement.column);
    errors.check_required_value("columnDataType", statement.data_type.as_ref());
    errors
}

/// `ALTER TABLE .. MODIFY column TYPE <auto-increment clause>`.
pub struct AddAutoIncrementGenerator;

impl SqlGenerator for AddAutoIncrementGenerator {
    type Statement = AddAutoIncrementStatement;

    fn name(&self) -> &str {
        "AddAutoIncrementGenerator"
    }

    fn supports(&self, _statement: &AddAutoIncrementStatement, database: &dyn Database) -> bool {
        database.supports(Capability::AlterColumn)
    }

    fn validate(&self, statement: &AddAutoIncrementStatement, _database: &dyn Database) -> ValidationErrors {
        validate_add_auto_increment(statement)
    }

    fn generate_sql(
        &self,
        statement: &AddAutoIncrementStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let type_name = statement
            .data_type
            .as_ref()
            .map(|t| database.auto_increment_type(t))
            .unwrap_or_default();
        let auto = statement.auto_increment;
        let sql = format!(
            "ALTER TABLE {} MODIFY {} {type_name} {}",
            database.escape_table_name(schema, &statement.table),
            database.escape_column_name(&statement.column),
            database.auto_increment_clause(auto.start_with, auto.increment_by)
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.column))
    }
}
