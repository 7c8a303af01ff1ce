//! Key, constraint and index generators.

use super::{SqlGenerator, SqlGeneratorRegistry};
use crate::database::{Capability, Database};
use crate::error::Result;
use crate::snapshot::{ForeignKeyAction, ObjectType};
use crate::sql::{AffectedObject, Sql};
use crate::statement::{
    AddForeignKeyConstraintStatement, AddPrimaryKeyStatement, AddUniqueConstraintStatement,
    CreateIndexStatement, DropForeignKeyConstraintStatement, DropIndexStatement,
    DropPrimaryKeyStatement, DropUniqueConstraintStatement,
};
use crate::validation::ValidationErrors;

pub(super) fn register(registry: &mut SqlGeneratorRegistry) {
    registry
        .register(AddPrimaryKeyGenerator)
        .register(DropPrimaryKeyGenerator)
        .register(AddUniqueConstraintGenerator)
        .register(DropUniqueConstraintGenerator)
        .register(AddForeignKeyConstraintGenerator)
        .register(DropForeignKeyConstraintGenerator)
        .register(CreateIndexGenerator)
        .register(DropIndexGenerator);
}

/// `CONSTRAINT name ` or nothing for an unnamed constraint.
pub(crate) fn constraint_prefix(name: Option<&str>, database: &dyn Database) -> String {
    match name.filter(|n| !n.is_empty()) {
        Some(name) => format!("CONSTRAINT {} ", database.escape_constraint_name(name)),
        None => String::new(),
    }
}

/// `REFERENCES table (columns) [ON DELETE ..] [ON UPDATE ..]`.
pub(crate) fn references_clause(
    schema: Option<&str>,
    table: &str,
    columns: &[String],
    on_delete: Option<ForeignKeyAction>,
    on_update: Option<ForeignKeyAction>,
    database: &dyn Database,
) -> String {
    let mut sql = format!(
        "REFERENCES {} ({})",
        database.escape_table_name(schema, table),
        database.escape_column_list(columns)
    );
    if let Some(action) = on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.as_sql());
    }
    if let Some(action) = on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action.as_sql());
    }
    sql
}

pub(crate) fn alter_table(database: &dyn Database, schema: Option<&str>, table: &str) -> String {
    format!("ALTER TABLE {}", database.escape_table_name(schema, table))
}

/// Checks shared by every `ADD PRIMARY KEY` generator.
pub(crate) fn validate_add_primary_key(statement: &AddPrimaryKeyStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("tableName", &statement.table);
    errors.check_required_list("columnNames", &statement.columns);
    errors
}

/// `ALTER TABLE .. ADD PRIMARY KEY`.
pub struct AddPrimaryKeyGenerator;

impl SqlGenerator for AddPrimaryKeyGenerator {
    type Statement = AddPrimaryKeyStatement;

    fn name(&self) -> &str {
        "AddPrimaryKeyGenerator"
    }

    fn validate(&self, statement: &AddPrimaryKeyStatement, database: &dyn Database) -> ValidationErrors {
        let mut errors = validate_add_primary_key(statement);
        if statement.tablespace.is_some() && !database.supports(Capability::Tablespaces) {
            errors.add_warning(format!("tablespace is ignored on {}", database.short_name()));
        }
        errors
    }

    fn generate_sql(
        &self,
        statement: &AddPrimaryKeyStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let mut sql = format!(
            "{} ADD {}PRIMARY KEY ({})",
            alter_table(database, schema, &statement.table),
            constraint_prefix(statement.constraint_name.as_deref(), database),
            database.escape_column_list(&statement.columns)
        );
        if let Some(tablespace) = &statement.tablespace {
            if database.supports(Capability::Tablespaces) {
                sql.push_str(" USING INDEX TABLESPACE ");
                sql.push_str(&database.escape_object_name(tablespace, ObjectType::Schema));
            }
        }
        let name = statement.constraint_name.as_deref().unwrap_or_default();
        Ok(vec![Sql::new(sql).affecting(AffectedObject::child(
            ObjectType::PrimaryKey,
            schema,
            &statement.table,
            name,
        ))])
    }
}

/// Checks shared by every `DROP PRIMARY KEY` generator.
pub(crate) fn validate_drop_primary_key(statement: &DropPrimaryKeyStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("tableName", &statement.table);
    errors
}

/// `ALTER TABLE .. DROP CONSTRAINT name`. Needs the constraint name.
pub struct DropPrimaryKeyGenerator;

impl SqlGenerator for DropPrimaryKeyGenerator {
    type Statement = DropPrimaryKeyStatement;

    fn name(&self) -> &str {
        "DropPrimaryKeyGenerator"
    }

    fn validate(&self, statement: &DropPrimaryKeyStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = validate_drop_primary_key(statement);
        errors.check_required_value("constraintName", statement.constraint_name.as_ref());
        errors
    }

    fn generate_sql(
        &self,
        statement: &DropPrimaryKeyStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let name = statement.constraint_name.as_deref().unwrap_or_default();
        Ok(vec![drop_constraint(database, schema, &statement.table, name, ObjectType::PrimaryKey)])
    }
}

/// `ALTER TABLE .. DROP CONSTRAINT name`.
pub(crate) fn drop_constraint(
    database: &dyn Database,
    schema: Option<&str>,
    table: &str,
    name: &str,
    object_type: ObjectType,
) -> Sql {
    let sql = format!(
        "{} DROP CONSTRAINT {}",
        alter_table(database, schema, table),
        database.escape_constraint_name(name)
    );
    Sql::new(sql).affecting(AffectedObject::child(object_type, schema, table, name))
}

/// Checks shared by every `ADD UNIQUE` generator.
pub(crate) fn validate_add_unique_constraint(
    statement: &AddUniqueConstraintStatement,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("tableName", &statement.table);
    errors.check_required_list("columnNames", &statement.columns);
    errors
}

/// `ALTER TABLE .. ADD [CONSTRAINT name] UNIQUE (..)`.
pub struct AddUniqueConstraintGenerator;

impl SqlGenerator for AddUniqueConstraintGenerator {
    type Statement = AddUniqueConstraintStatement;

    fn name(&self) -> &str {
        "AddUniqueConstraintGenerator"
    }

    fn validate(&self, statement: &AddUniqueConstraintStatement, _database: &dyn Database) -> ValidationErrors {
        validate_add_unique_constraint(statement)
    }

    fn generate_sql(
        &self,
        statement: &AddUniqueConstraintStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let mut sql = format!(
            "{} ADD {}UNIQUE ({})",
            alter_table(database, schema, &statement.table),
            constraint_prefix(statement.constraint_name.as_deref(), database),
            database.escape_column_list(&statement.columns)
        );
        if let Some(tablespace) = &statement.tablespace {
            if database.supports(Capability::Tablespaces) {
                sql.push_str(" USING INDEX TABLESPACE ");
                sql.push_str(&database.escape_object_name(tablespace, ObjectType::Schema));
            }
        }
        let name = statement.constraint_name.as_deref().unwrap_or_default();
        Ok(vec![Sql::new(sql).affecting(AffectedObject::child(
            ObjectType::UniqueConstraint,
            schema,
            &statement.table,
            name,
        ))])
    }
}

/// Checks shared by every `DROP UNIQUE` generator.
pub(crate) fn validate_drop_unique_constraint(
    statement: &DropUniqueConstraintStatement,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("tableName", &statement.table);
    errors.check_required_field("constraintName", &statement.constraint_name);
    errors
}

/// `ALTER TABLE .. DROP CONSTRAINT name`.
pub struct DropUniqueConstraintGenerator;

impl SqlGenerator for DropUniqueConstraintGenerator {
    type Statement = DropUniqueConstraintStatement;

    fn name(&self) -> &str {
        "DropUniqueConstraintGenerator"
    }

    fn validate(&self, statement: &DropUniqueConstraintStatement, _database: &dyn Database) -> ValidationErrors {
        validate_drop_unique_constraint(statement)
    }

    fn generate_sql(
        &self,
        statement: &DropUniqueConstraintStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        Ok(vec![drop_constraint(
            database,
            statement.schema.as_deref(),
            &statement.table,
            &statement.constraint_name,
            ObjectType::UniqueConstraint,
        )])
    }
}

/// Checks shared by every `ADD FOREIGN KEY` generator.
pub(crate) fn validate_add_foreign_key(
    statement: &AddForeignKeyConstraintStatement,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("constraintName", &statement.constraint_name);
    errors.check_required_field("baseTableName", &statement.table);
    errors.check_required_list("baseColumnNames", &statement.columns);
    errors.check_required_field("referencedTableName", &statement.referenced_table);
    errors.check_required_list("referencedColumnNames", &statement.referenced_columns);
    if !statement.columns.is_empty()
        && !statement.referenced_columns.is_empty()
        && statement.columns.len() != statement.referenced_columns.len()
    {
        errors.add_error(format!(
            "baseColumnNames has {} columns but referencedColumnNames has {}",
            statement.columns.len(),
            statement.referenced_columns.len()
        ));
    }
    errors
}

/// `ALTER TABLE .. ADD CONSTRAINT name FOREIGN KEY (..) REFERENCES ..`.
pub struct AddForeignKeyConstraintGenerator;

impl SqlGenerator for AddForeignKeyConstraintGenerator {
    type Statement = AddForeignKeyConstraintStatement;

    fn name(&self) -> &str {
        "AddForeignKeyConstraintGenerator"
    }

    fn validate(
        &self,
        statement: &AddForeignKeyConstraintStatement,
        _database: &dyn Database,
    ) -> ValidationErrors {
        validate_add_foreign_key(statement)
    }

    fn generate_sql(
        &self,
        statement: &AddForeignKeyConstraintStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let sql = format!(
            "{} ADD {}FOREIGN KEY ({}) {}",
            alter_table(database, schema, &statement.table),
            constraint_prefix(Some(&statement.constraint_name), database),
            database.escape_column_list(&statement.columns),
            references_clause(
                statement.referenced_schema.as_deref(),
                &statement.referenced_table,
                &statement.referenced_columns,
                statement.on_delete,
                statement.on_update,
                database,
            )
        );
        Ok(vec![Sql::new(sql).affecting(AffectedObject::child(
            ObjectType::ForeignKey,
            schema,
            &statement.table,
            &statement.constraint_name,
        ))])
    }
}

/// Checks shared by every `DROP FOREIGN KEY` generator.
pub(crate) fn validate_drop_foreign_key(
    statement: &DropForeignKeyConstraintStatement,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("baseTableName", &statement.table);
    errors.check_required_field("constraintName", &statement.constraint_name);
    errors
}

/// `ALTER TABLE .. DROP CONSTRAINT name`.
pub struct DropForeignKeyConstraintGenerator;

impl SqlGenerator for DropForeignKeyConstraintGenerator {
    type Statement = DropForeignKeyConstraintStatement;

    fn name(&self) -> &str {
        "DropForeignKeyConstraintGenerator"
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
        Ok(vec![drop_constraint(
            database,
            statement.schema.as_deref(),
            &statement.table,
            &statement.constraint_name,
            ObjectType::ForeignKey,
        )])
    }
}

/// Renders `CREATE [UNIQUE] INDEX`. The index lives in its table's schema,
/// so its own name is never qualified.
pub(crate) fn create_index_sql(statement: &CreateIndexStatement, database: &dyn Database) -> Sql {
    let schema = statement.schema.as_deref();
    let mut sql = String::from("CREATE ");
    if statement.unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str("INDEX ");
    if statement.if_not_exists && database.supports(Capability::IfExists) {
        sql.push_str("IF NOT EXISTS ");
    }
    sql.push_str(&database.escape_index_name(None, &statement.index_name));
    sql.push_str(" ON ");
    sql.push_str(&database.escape_table_name(schema, &statement.table));
    sql.push_str(" (");
    sql.push_str(&database.escape_column_list(&statement.columns));
    sql.push(')');
    if let Some(tablespace) = &statement.tablespace {
        if database.supports(Capability::Tablespaces) {
            sql.push_str(" TABLESPACE ");
            sql.push_str(&database.escape_object_name(tablespace, ObjectType::Schema));
        }
    }
    Sql::new(sql).affecting(AffectedObject::child(
        ObjectType::Index,
        schema,
        &statement.table,
        &statement.index_name,
    ))
}

/// `CREATE INDEX`.
pub struct CreateIndexGenerator;

impl SqlGenerator for CreateIndexGenerator {
    type Statement = CreateIndexStatement;

    fn name(&self) -> &str {
        "CreateIndexGenerator"
    }

    fn validate(&self, statement: &CreateIndexStatement, database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("indexName", &statement.index_name);
        errors.check_required_field("tableName", &statement.table);
        errors.check_required_list("columns", &statement.columns);
        if statement.tablespace.is_some() && !database.supports(Capability::Tablespaces) {
            errors.add_warning(format!("tablespace is ignored on {}", database.short_name()));
        }
        errors
    }

    fn generate_sql(
        &self,
        statement: &CreateIndexStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        Ok(vec![create_index_sql(statement, database)])
    }
}

/// Checks shared by every `DROP INDEX` generator.
pub(crate) fn validate_drop_index(statement: &DropIndexStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("indexName", &statement.index_name);
    errors
}

/// `DROP INDEX name`.
pub struct DropIndexGenerator;

impl SqlGenerator for DropIndexGenerator {
    type Statement = DropIndexStatement;

    fn name(&self) -> &str {
        "DropIndexGenerator"
    }

    fn validate(&self, statement: &DropIndexStatement, _database: &dyn Database) -> ValidationErrors {
        validate_drop_index(statement)
    }

    fn generate_sql(
        &self,
        statement: &DropIndexStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let sql = format!(
            "DROP INDEX {}",
            database.escape_index_name(schema, &statement.index_name)
        );
        Ok(vec![Sql::new(sql).affecting(AffectedObject::child(
            ObjectType::Index,
            schema,
            &statement.table,
            &statement.index_name,
        ))])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::{GenericDatabase, PostgresDatabase};
    use crate::sqlgen::build_default_registry;

    fn first(statement: impl Into<crate::statement::SqlStatement>, database: &dyn Database) -> String {
        build_default_registry()
            .generate(statement, database)
            .unwrap()
            .remove(0)
            .text()
            .to_string()
    }

    #[test]
    fn foreign_key_with_actions() {
        let statement = AddForeignKeyConstraintStatement {
            table: "orders".into(),
            columns: vec!["user_id".into()],
            referenced_schema: Some("app".into()),
            referenced_table: "users".into(),
            referenced_columns: vec!["id".into()],
            constraint_name: "fk_orders_user".into(),
            on_delete: Some(ForeignKeyAction::Cascade),
            on_update: Some(ForeignKeyAction::NoAction),
            ..Default::default()
        };
        assert_eq!(
            first(statement, &PostgresDatabase::new()),
            "ALTER TABLE orders ADD CONSTRAINT fk_orders_user FOREIGN KEY (user_id) \
             REFERENCES app.users (id) ON DELETE CASCADE ON UPDATE NO ACTION"
        );
    }

    #[test]
    fn foreign_key_validation_lists_every_problem() {
        let statement = AddForeignKeyConstraintStatement {
            columns: vec!["a".into(), "b".into()],
            referenced_columns: vec!["id".into()],
            ..Default::default()
        };
        let errors = validate_add_foreign_key(&statement);
        assert_eq!(
            errors.errors(),
            [
                "constraintName is required",
                "baseTableName is required",
                "referencedTableName is required",
                "baseColumnNames has 2 columns but referencedColumnNames has 1",
            ]
        );
    }

    #[test]
    fn unique_index_with_tablespace() {
        let statement = CreateIndexStatement {
            unique: true,
            tablespace: Some("fast".into()),
            ..CreateIndexStatement::new("ix_users_email", "users", ["email"])
        };
        assert_eq!(
            first(statement, &PostgresDatabase::new()),
            "CREATE UNIQUE INDEX ix_users_email ON users (email) TABLESPACE fast"
        );
    }

    #[test]
    fn unnamed_primary_key() {
        let statement = AddPrimaryKeyStatement {
            table: "t".into(),
            columns: vec!["a".into(), "b".into()],
            ..Default::default()
        };
        assert_eq!(
            first(statement, &GenericDatabase::new()),
            "ALTER TABLE t ADD PRIMARY KEY (a, b)"
        );
    }

    #[test]
    fn generic_drop_primary_key_requires_name() {
        let statement = DropPrimaryKeyStatement {
            table: "t".into(),
            ..Default::default()
        };
        let errors = build_default_registry()
            .validate(&statement.into(), &GenericDatabase::new())
            .unwrap();
        assert_eq!(errors.errors(), ["constraintName is required"]);
    }
}
