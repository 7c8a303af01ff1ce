//! MySQL overrides.
//!
//! MySQL restates the full column type for most column changes and drops
//! keys with its own syntax instead of `DROP CONSTRAINT`.

use super::column::{
    column_sql, validate_add_column, validate_modify_data_type, validate_rename_column,
    validate_set_nullable,
};
use super::constraint::{
    alter_table, validate_drop_foreign_key, validate_drop_index, validate_drop_primary_key,
    validate_drop_unique_constraint,
};
use super::tracking::{truncate, validate_tag_database, MAX_TEXT_LENGTH};
use super::{Priority, SqlGenerator, SqlGeneratorRegistry};
use crate::database::{Database, DatabaseKind};
use crate::datatype::DataType;
use crate::error::Result;
use crate::snapshot::ObjectType;
use crate::sql::{AffectedObject, Sql};
use crate::statement::{
    AddColumnStatement, DropForeignKeyConstraintStatement, DropIndexStatement,
    DropPrimaryKeyStatement, DropUniqueConstraintStatement, ModifyDataTypeStatement,
    RenameColumnStatement, SetNullableStatement, TagDatabaseStatement, DATABASE_CHANGELOG_TABLE,
};
use crate::validation::ValidationErrors;

pub(super) fn register(registry: &mut SqlGeneratorRegistry) {
    registry
        .register(MySqlAddColumnGenerator)
        .register(MySqlModifyDataTypeGenerator)
        .register(MySqlSetNullableGenerator)
        .register(MySqlRenameColumnGenerator)
        .register(MySqlDropIndexGenerator)
        .register(MySqlDropForeignKeyGenerator)
        .register(MySqlDropPrimaryKeyGenerator)
        .register(MySqlDropUniqueConstraintGenerator)
        .register(MySqlTagDatabaseGenerator);
}

fn is_mysql(database: &dyn Database) -> bool {
    database.kind() == DatabaseKind::MySql
}

fn type_name(database: &dyn Database, data_type: Option<&DataType>) -> String {
    data_type.map(|t| database.column_type(t)).unwrap_or_default()
}

/// Portable `ADD COLUMN`, rejecting auto-increment columns that are not
/// the primary key.
pub struct MySqlAddColumnGenerator;

impl SqlGenerator for MySqlAddColumnGenerator {
    type Statement = AddColumnStatement;

    fn name(&self) -> &str {
        "MySqlAddColumnGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &AddColumnStatement, database: &dyn Database) -> bool {
        is_mysql(database)
    }

    fn validate(&self, statement: &AddColumnStatement, database: &dyn Database) -> ValidationErrors {
        let mut errors = validate_add_column(statement, database);
        if statement.column.is_auto_increment() && !statement.column.primary_key {
            errors.add_error(format!(
                "auto-increment column '{}' must be a primary key on mysql",
                statement.column.name
            ));
        }
        errors
    }

    fn generate_sql(
        &self,
        statement: &AddColumnStatement,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        super::column::AddColumnGenerator.generate_sql(statement, database, registry)
    }
}

/// `ALTER TABLE .. MODIFY column type`.
pub struct MySqlModifyDataTypeGenerator;

impl SqlGenerator for MySqlModifyDataTypeGenerator {
    type Statement = ModifyDataTypeStatement;

    fn name(&self) -> &str {
        "MySqlModifyDataTypeGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &ModifyDataTypeStatement, database: &dyn Database) -> bool {
        is_mysql(database)
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
        let sql = format!(
            "{} MODIFY {} {}",
            alter_table(database, schema, &statement.table),
            database.escape_column_name(&statement.column),
            type_name(database, statement.new_data_type.as_ref())
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.column))
    }
}

/// `ALTER TABLE .. MODIFY column type [NOT] NULL`.
pub struct MySqlSetNullableGenerator;

impl SqlGenerator for MySqlSetNullableGenerator {
    type Statement = SetNullableStatement;

    fn name(&self) -> &str {
        "MySqlSetNullableGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &SetNullableStatement, database: &dyn Database) -> bool {
        is_mysql(database)
    }

    fn validate(&self, statement: &SetNullableStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = validate_set_nullable(statement);
        errors.check_required_value("columnDataType", statement.data_type.as_ref());
        errors
    }

    fn generate_sql(
        &self,
        statement: &SetNullableStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let null = if statement.nullable { "NULL" } else { "NOT NULL" };
        let sql = format!(
            "{} MODIFY {} {} {null}",
            alter_table(database, schema, &statement.table),
            database.escape_column_name(&statement.column),
            type_name(database, statement.data_type.as_ref())
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.column))
    }
}

/// `ALTER TABLE .. CHANGE old new type`.
pub struct MySqlRenameColumnGenerator;

impl SqlGenerator for MySqlRenameColumnGenerator {
    type Statement = RenameColumnStatement;

    fn name(&self) -> &str {
        "MySqlRenameColumnGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &RenameColumnStatement, database: &dyn Database) -> bool {
        is_mysql(database)
    }

    fn validate(&self, statement: &RenameColumnStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = validate_rename_column(statement);
        errors.check_required_value("columnDataType", statement.data_type.as_ref());
        errors
    }

    fn generate_sql(
        &self,
        statement: &RenameColumnStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let sql = format!(
            "{} CHANGE {} {} {}",
            alter_table(database, schema, &statement.table),
            database.escape_column_name(&statement.old_name),
            database.escape_column_name(&statement.new_name),
            type_name(database, statement.data_type.as_ref())
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.new_name))
    }
}

/// `DROP INDEX name ON table`.
pub struct MySqlDropIndexGenerator;

impl SqlGenerator for MySqlDropIndexGenerator {
    type Statement = DropIndexStatement;

    fn name(&self) -> &str {
        "MySqlDropIndexGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &DropIndexStatement, database: &dyn Database) -> bool {
        is_mysql(database)
    }

    fn validate(&self, statement: &DropIndexStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = validate_drop_index(statement);
        errors.check_required_field("tableName", &statement.table);
        errors
    }

    fn generate_sql(
        &self,
        statement: &DropIndexStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let sql = format!(
            "DROP INDEX {} ON {}",
            database.escape_index_name(None, &statement.index_name),
            database.escape_table_name(schema, &statement.table)
        );
        Ok(vec![Sql::new(sql).affecting(AffectedObject::child(
            ObjectType::Index,
            schema,
            &statement.table,
            &statement.index_name,
        ))])
    }
}

/// Renders `ALTER TABLE .. DROP <clause>` for one of the table's keys.
fn drop_key(
    database: &dyn Database,
    schema: Option<&str>,
    table: &str,
    clause: &str,
    object_type: ObjectType,
    name: &str,
) -> Vec<Sql> {
    let sql = format!("{} DROP {clause}", alter_table(database, schema, table));
    vec![Sql::new(sql).affecting(AffectedObject::child(object_type, schema, table, name))]
}

/// `ALTER TABLE .. DROP FOREIGN KEY name`.
pub struct MySqlDropForeignKeyGenerator;

impl SqlGenerator for MySqlDropForeignKeyGenerator {
    type Statement = DropForeignKeyConstraintStatement;

    fn name(&self) -> &str {
        "MySqlDropForeignKeyGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &DropForeignKeyConstraintStatement, database: &dyn Database) -> bool {
        is_mysql(database)
    }

    fn validate(
        &self,
        statement: &DropForeignKeyConstraintStatement,
        _database: &dyn Database,
    ) -> ValidationErrors {
        validate_drop_foreign_key(statement)
    }

    fn generate_sql(
        &self,
        statement: &DropForeignKeyConstraintStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let clause = format!(
            "FOREIGN KEY {}",
            database.escape_constraint_name(&statement.constraint_name)
        );
        Ok(drop_key(
            database,
            statement.schema.as_deref(),
            &statement.table,
            &clause,
            ObjectType::ForeignKey,
            &statement.constraint_name,
        ))
    }
}

/// `ALTER TABLE .. DROP PRIMARY KEY`. MySQL primary keys have no usable name.
pub struct MySqlDropPrimaryKeyGenerator;

impl SqlGenerator for MySqlDropPrimaryKeyGenerator {
    type Statement = DropPrimaryKeyStatement;

    fn name(&self) -> &str {
        "MySqlDropPrimaryKeyGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &DropPrimaryKeyStatement, database: &dyn Database) -> bool {
        is_mysql(database)
    }

    fn validate(&self, statement: &DropPrimaryKeyStatement, _database: &dyn Database) -> ValidationErrors {
        validate_drop_primary_key(statement)
    }

    fn generate_sql(
        &self,
        statement: &DropPrimaryKeyStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        Ok(drop_key(
            database,
            statement.schema.as_deref(),
            &statement.table,
            "PRIMARY KEY",
            ObjectType::PrimaryKey,
            statement.constraint_name.as_deref().unwrap_or("PRIMARY"),
        ))
    }
}

/// `ALTER TABLE .. DROP KEY name`.
pub struct MySqlDropUniqueConstraintGenerator;

impl SqlGenerator for MySqlDropUniqueConstraintGenerator {
    type Statement = DropUniqueConstraintStatement;

    fn name(&self) -> &str {
        "MySqlDropUniqueConstraintGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &DropUniqueConstraintStatement, database: &dyn Database) -> bool {
        is_mysql(database)
    }

    fn validate(
        &self,
        statement: &DropUniqueConstraintStatement,
        _database: &dyn Database,
    ) -> ValidationErrors {
        validate_drop_unique_constraint(statement)
    }

    fn generate_sql(
        &self,
        statement: &DropUniqueConstraintStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let clause = format!(
            "KEY {}",
            database.escape_constraint_name(&statement.constraint_name)
        );
        Ok(drop_key(
            database,
            statement.schema.as_deref(),
            &statement.table,
            &clause,
            ObjectType::UniqueConstraint,
            &statement.constraint_name,
        ))
    }
}

/// Tags through a join, since MySQL cannot update a table it selects from
/// in a subquery.
pub struct MySqlTagDatabaseGenerator;

impl SqlGenerator for MySqlTagDatabaseGenerator {
    type Statement = TagDatabaseStatement;

    fn name(&self) -> &str {
        "MySqlTagDatabaseGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &TagDatabaseStatement, database: &dyn Database) -> bool {
        is_mysql(database)
    }

    fn validate(&self, statement: &TagDatabaseStatement, _database: &dyn Database) -> ValidationErrors {
        validate_tag_database(statement)
    }

    fn generate_sql(
        &self,
        statement: &TagDatabaseStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let table = database.escape_table_name(statement.schema.as_deref(), DATABASE_CHANGELOG_TABLE);
        let order = database.escape_column_name("ORDEREXECUTED");
        let sql = format!(
            "UPDATE {table} C INNER JOIN (SELECT MAX({order}) AS MAXORDER FROM {table}) D \
             ON C.{order} = D.MAXORDER SET C.{} = '{}'",
            database.escape_column_name("TAG"),
            truncate(&statement.tag, MAX_TEXT_LENGTH).replace('\'', "''")
        );
        Ok(vec![Sql::new(sql)])
    }
}
