//! Table-level generators.

use super::constraint::{constraint_prefix, references_clause};
use super::{SqlGenerator, SqlGeneratorRegistry};
use crate::database::{Capability, Database};
use crate::error::Result;
use crate::snapshot::ObjectType;
use crate::sql::{AffectedObject, Sql};
use crate::statement::{ColumnDef, CreateTableStatement, DropTableStatement, RenameTableStatement};
use crate::validation::ValidationErrors;

pub(super) fn register(registry: &mut SqlGeneratorRegistry) {
    registry
        .register(CreateTableGenerator)
        .register(DropTableGenerator)
        .register(RenameTableGenerator);
}

/// Renders `name TYPE [DEFAULT ..] [NOT NULL] [..]`.
///
/// `inline_primary_key` is the primary key clause to attach to this column,
/// if the key is declared inline.
pub(crate) fn column_definition(
    column: &ColumnDef,
    database: &dyn Database,
    inline_primary_key: Option<&str>,
) -> String {
    let mut sql = database.escape_column_name(&column.name);
    if let Some(data_type) = &column.data_type {
        sql.push(' ');
        if column.is_auto_increment() {
            sql.push_str(&database.auto_increment_type(data_type));
        } else {
            sql.push_str(&database.column_type(data_type));
        }
    }
    if let (Some(value), None) = (&column.default_value, column.auto_increment) {
        sql.push_str(" DEFAULT ");
        sql.push_str(&database.literal(value));
    }
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    let inline_auto_increment = database.supports(Capability::InlinePrimaryKeyForAutoIncrement);
    if let Some(primary_key) = inline_primary_key {
        sql.push(' ');
        sql.push_str(primary_key);
    }
    if let Some(auto) = column.auto_increment {
        if inline_primary_key.is_some() || !inline_auto_increment {
            sql.push(' ');
            sql.push_str(&database.auto_increment_clause(auto.start_with, auto.increment_by));
        }
    }
    if column.unique && !column.primary_key {
        sql.push_str(" UNIQUE");
    }
    sql
}

/// Shared column checks for `CREATE TABLE` and `ADD COLUMN`.
pub(crate) fn validate_column(column: &ColumnDef, errors: &mut ValidationErrors) {
    errors.check_required_field("columnName", &column.name);
    if column.data_type.is_none() {
        errors.add_error(format!("columnType is required for column '{}'", column.name));
    }
}

/// Rules every `CREATE TABLE` generator applies.
pub(crate) fn validate_create_table(
    statement: &CreateTableStatement,
    database: &dyn Database,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("tableName", &statement.table);
    errors.check_required_list("columns", &statement.columns);
    for column in &statement.columns {
        validate_column(column, &mut errors);
    }
    if database.supports(Capability::InlinePrimaryKeyForAutoIncrement) {
        let primary_key = statement.primary_key_columns();
        for column in statement.columns.iter().filter(|c| c.is_auto_increment()) {
            if primary_key != [column.name.as_str()] {
                errors.add_error(format!(
                    "auto-increment column '{}' must be the only primary key column on {}",
                    column.name,
                    database.short_name()
                ));
            }
        }
    }
    for foreign_key in &statement.foreign_keys {
        errors.check_required_field("referencedTableName", &foreign_key.referenced_table);
        if foreign_key.columns.len() != foreign_key.referenced_columns.len() {
            errors.add_error(format!(
                "foreign key on {} references {} columns",
                foreign_key.columns.join(", "),
                foreign_key.referenced_columns.len()
            ));
        }
    }
    if statement.tablespace.is_some() && !database.supports(Capability::Tablespaces) {
        errors.add_warning(format!("tablespace is ignored on {}", database.short_name()));
    }
    if statement.if_not_exists && !database.supports(Capability::IfExists) {
        errors.add_warning(format!("IF NOT EXISTS is ignored on {}", database.short_name()));
    }
    errors
}

/// Returns the column whose auto-increment forces an inline primary key.
fn inline_primary_key_column<'a>(
    statement: &'a CreateTableStatement,
    database: &dyn Database,
) -> Option<&'a str> {
    if !database.supports(Capability::InlinePrimaryKeyForAutoIncrement) {
        return None;
    }
    let primary_key = statement.primary_key_columns();
    let [only] = primary_key.as_slice() else {
        return None;
    };
    statement
        .columns
        .iter()
        .find(|c| &c.name == only && c.is_auto_increment())
        .map(|c| c.name.as_str())
}

/// `CREATE TABLE` with inline column, key and foreign key definitions.
pub struct CreateTableGenerator;

impl SqlGenerator for CreateTableGenerator {
    type Statement = CreateTableStatement;

    fn name(&self) -> &str {
        "CreateTableGenerator"
    }

    fn validate(&self, statement: &CreateTableStatement, database: &dyn Database) -> ValidationErrors {
        validate_create_table(statement, database)
    }

    fn generate_sql(
        &self,
        statement: &CreateTableStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let primary_key = statement.primary_key_columns();
        let primary_key_name = statement.primary_key.as_ref().and_then(|pk| pk.name.as_deref());
        let inline = inline_primary_key_column(statement, database);
        let inline_clause = format!("{}PRIMARY KEY", constraint_prefix(primary_key_name, database));

        let mut parts: Vec<String> = statement
            .columns
            .iter()
            .map(|column| {
                let clause = (inline == Some(column.name.as_str())).then_some(inline_clause.as_str());
                column_definition(column, database, clause)
            })
            .collect();

        if inline.is_none() && !primary_key.is_empty() {
            parts.push(format!(
                "{}PRIMARY KEY ({})",
                constraint_prefix(primary_key_name, database),
                database.escape_column_list(&primary_key)
            ));
        }
        for unique in &statement.unique_constraints {
            parts.push(format!(
                "{}UNIQUE ({})",
                constraint_prefix(unique.name.as_deref(), database),
                database.escape_column_list(&unique.columns)
            ));
        }
        for foreign_key in &statement.foreign_keys {
            parts.push(format!(
                "{}FOREIGN KEY ({}) {}",
                constraint_prefix(foreign_key.name.as_deref(), database),
                database.escape_column_list(&foreign_key.columns),
                references_clause(
                    foreign_key.referenced_schema.as_deref(),
                    &foreign_key.referenced_table,
                    &foreign_key.referenced_columns,
                    foreign_key.on_delete,
                    foreign_key.on_update,
                    database,
                )
            ));
        }

        let mut sql = String::from("CREATE TABLE ");
        if statement.if_not_exists && database.supports(Capability::IfExists) {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&database.escape_table_name(schema, &statement.table));
        sql.push_str(" (");
        sql.push_str(&parts.join(", "));
        sql.push(')');
        if let Some(tablespace) = &statement.tablespace {
            if database.supports(Capability::Tablespaces) {
                sql.push_str(" TABLESPACE ");
                sql.push_str(&database.escape_object_name(tablespace, ObjectType::Schema));
            }
        }
        Ok(vec![
            Sql::new(sql).affecting(AffectedObject::table(schema, &statement.table)),
        ])
    }
}

/// `DROP TABLE`.
pub struct DropTableGenerator;

impl SqlGenerator for DropTableGenerator {
    type Statement = DropTableStatement;

    fn name(&self) -> &str {
        "DropTableGenerator"
    }

    fn validate(&self, statement: &DropTableStatement, database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("tableName", &statement.table);
        if statement.cascade && !database.supports(Capability::DropTableCascade) {
            errors.add_error(format!(
                "cascadeConstraints is not allowed on {}",
                database.short_name()
            ));
        }
        errors
    }

    fn generate_sql(
        &self,
        statement: &DropTableStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let mut sql = String::from("DROP TABLE ");
        if statement.if_exists && database.supports(Capability::IfExists) {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&database.escape_table_name(schema, &statement.table));
        if statement.cascade {
            sql.push_str(" CASCADE");
        }
        Ok(vec![
            Sql::new(sql).affecting(AffectedObject::table(schema, &statement.table)),
        ])
    }
}

/// `ALTER TABLE .. RENAME TO ..`.
pub struct RenameTableGenerator;

impl SqlGenerator for RenameTableGenerator {
    type Statement = RenameTableStatement;

    fn name(&self) -> &str {
        "RenameTableGenerator"
    }

    fn validate(&self, statement: &RenameTableStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("oldTableName", &statement.old_name);
        errors.check_required_field("newTableName", &statement.new_name);
        errors
    }

    fn generate_sql(
        &self,
        statement: &RenameTableStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let sql = format!(
            "ALTER TABLE {} RENAME TO {}",
            database.escape_table_name(schema, &statement.old_name),
            database.escape_object_name(&statement.new_name, ObjectType::Table)
        );
        Ok(vec![Sql::new(sql)
            .affecting(AffectedObject::table(schema, &statement.old_name))
            .affecting(AffectedObject::table(schema, &statement.new_name))])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::{MySqlDatabase, PostgresDatabase, SqliteDatabase};
    use crate::datatype::{DataType, LiteralValue};
    use crate::sqlgen::build_default_registry;
    use crate::statement::{ForeignKeyDef, PrimaryKeyDef};

    fn users() -> CreateTableStatement {
        CreateTableStatement::new("users")
            .column(ColumnDef::new("id", DataType::Int).primary_key().auto_increment())
            .column(ColumnDef::new("email", DataType::Varchar(Some(255))).not_null().unique())
            .column(ColumnDef::new("active", DataType::Boolean).default_value(LiteralValue::Boolean(true)))
    }

    fn render(statement: CreateTableStatement, database: &dyn Database) -> String {
        build_default_registry()
            .generate(statement, database)
            .unwrap()
            .remove(0)
            .text()
            .to_string()
    }

    #[test]
    fn sqlite_declares_auto_increment_key_inline() {
        assert_eq!(
            render(users(), &SqliteDatabase::new()),
            "CREATE TABLE users (id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT, \
             email VARCHAR(255) NOT NULL UNIQUE, active BOOLEAN DEFAULT 1)"
        );
    }

    #[test]
    fn postgres_uses_identity_and_table_level_key() {
        assert_eq!(
            render(users(), &PostgresDatabase::new()),
            "CREATE TABLE users (id INTEGER NOT NULL GENERATED BY DEFAULT AS IDENTITY, \
             email VARCHAR(255) NOT NULL UNIQUE, active BOOLEAN DEFAULT TRUE, PRIMARY KEY (id))"
        );
    }

    #[test]
    fn mysql_quotes_with_backticks_only_when_needed() {
        let statement = CreateTableStatement::new("order")
            .column(ColumnDef::new("id", DataType::BigInt).not_null())
            .column(ColumnDef::new("user_id", DataType::BigInt))
            .foreign_key(ForeignKeyDef {
                name: Some("fk_order_user".into()),
                columns: vec!["user_id".into()],
                referenced_table: "users".into(),
                referenced_columns: vec!["id".into()],
                ..ForeignKeyDef::default()
            });
        let statement = CreateTableStatement {
            primary_key: Some(PrimaryKeyDef {
                name: Some("pk_order".into()),
                columns: vec!["id".into()],
                tablespace: None,
            }),
            ..statement
        };
        assert_eq!(
            render(statement, &MySqlDatabase::new()),
            "CREATE TABLE `order` (id BIGINT NOT NULL, user_id BIGINT, \
             CONSTRAINT pk_order PRIMARY KEY (id), \
             CONSTRAINT fk_order_user FOREIGN KEY (user_id) REFERENCES users (id))"
        );
    }

    #[test]
    fn sqlite_rejects_auto_increment_outside_single_key() {
        let statement = CreateTableStatement::new("t")
            .column(ColumnDef::new("a", DataType::Int).primary_key())
            .column(ColumnDef::new("b", DataType::Int).primary_key().auto_increment());
        let errors = validate_create_table(&statement, &SqliteDatabase::new());
        assert_eq!(errors.errors().len(), 1);
        assert!(errors.errors()[0].contains("'b'"));
    }

    #[test]
    fn drop_table_cascade_depends_on_capability() {
        let statement = DropTableStatement {
            cascade: true,
            ..DropTableStatement::new("users")
        };
        let registry = build_default_registry();
        let sql = registry.generate(statement.clone(), &PostgresDatabase::new()).unwrap();
        assert_eq!(sql[0].text(), "DROP TABLE users CASCADE");

        let errors = registry
            .validate(&statement.into(), &SqliteDatabase::new())
            .unwrap();
        assert_eq!(errors.errors(), ["cascadeConstraints is not allowed on sqlite"]);
    }

    #[test]
    fn rename_table() {
        let sql = build_default_registry()
            .generate(RenameTableStatement::new("a", "b"), &PostgresDatabase::new())
            .unwrap();
        assert_eq!(sql[0].to_string(), "ALTER TABLE a RENAME TO b;");
    }
}
