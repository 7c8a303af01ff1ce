//! PostgreSQL overrides.

use super::column::{
    alter_column_prefix, column_sql, validate_add_auto_increment, validate_modify_data_type,
};
use super::constraint::{drop_constraint, validate_drop_primary_key};
use super::{Priority, SqlGenerator, SqlGeneratorRegistry};
use crate::database::{Database, DatabaseKind};
use crate::error::Result;
use crate::snapshot::ObjectType;
use crate::sql::Sql;
use crate::statement::{AddAutoIncrementStatement, DropPrimaryKeyStatement, ModifyDataTypeStatement};
use crate::validation::ValidationErrors;

pub(super) fn register(registry: &mut SqlGeneratorRegistry) {
    registry
        .register(PostgresModifyDataTypeGenerator)
        .register(PostgresAddAutoIncrementGenerator)
        .register(PostgresDropPrimaryKeyGenerator);
}

fn is_postgres(database: &dyn Database) -> bool {
    database.kind() == DatabaseKind::Postgres
}

/// `ALTER COLUMN .. TYPE .. USING (..)`, so existing values are cast.
pub struct PostgresModifyDataTypeGenerator;

impl SqlGenerator for PostgresModifyDataTypeGenerator {
    type Statement = ModifyDataTypeStatement;

    fn name(&self) -> &str {
        "PostgresModifyDataTypeGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &ModifyDataTypeStatement, database: &dyn Database) -> bool {
        is_postgres(database)
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
            "{} TYPE {type_name} USING ({}::{type_name})",
            alter_column_prefix(database, schema, &statement.table, &statement.column),
            database.escape_column_name(&statement.column)
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.column))
    }
}

/// Turns a column into an identity column.
pub struct PostgresAddAutoIncrementGenerator;

impl SqlGenerator for PostgresAddAutoIncrementGenerator {
    type Statement = AddAutoIncrementStatement;

    fn name(&self) -> &str {
        "PostgresAddAutoIncrementGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &AddAutoIncrementStatement, database: &dyn Database) -> bool {
        is_postgres(database)
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
        let auto = statement.auto_increment;
        let sql = format!(
            "{} ADD {}",
            alter_column_prefix(database, schema, &statement.table, &statement.column),
            database.auto_increment_clause(auto.start_with, auto.increment_by)
        );
        Ok(column_sql(sql, schema, &statement.table, &statement.column))
    }
}

/// Drops the primary key, defaulting to the `<table>_pkey` name PostgreSQL
/// assigns to unnamed keys.
pub struct PostgresDropPrimaryKeyGenerator;

impl SqlGenerator for PostgresDropPrimaryKeyGenerator {
    type Statement = DropPrimaryKeyStatement;

    fn name(&self) -> &str {
        "PostgresDropPrimaryKeyGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &DropPrimaryKeyStatement, database: &dyn Database) -> bool {
        is_postgres(database)
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
        let name = statement
            .constraint_name
            .clone()
            .unwrap_or_else(|| format!("{}_pkey", statement.table.to_ascii_lowercase()));
        Ok(vec![drop_constraint(
            database,
            statement.schema.as_deref(),
            &statement.table,
            &name,
            ObjectType::PrimaryKey,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{GenericDatabase, PostgresDatabase};
    use crate::datatype::DataType;
    use crate::sqlgen::build_default_registry;
    use crate::snapshot::AutoIncrement;

    #[test]
    fn retype_casts_existing_values() {
        let sql = build_default_registry()
            .generate(
                ModifyDataTypeStatement::new("orders", "total", DataType::BigInt),
                &PostgresDatabase::new(),
            )
            .unwrap();
        assert_eq!(
            sql[0].text(),
            "ALTER TABLE orders ALTER COLUMN total TYPE BIGINT USING (total::BIGINT)"
        );
    }

    #[test]
    fn identity_with_start_value() {
        let statement = AddAutoIncrementStatement {
            table: "orders".into(),
            column: "id".into(),
            data_type: Some(DataType::Int),
            auto_increment: AutoIncrement {
                start_with: Some(1000),
                increment_by: None,
            },
            ..Default::default()
        };
        let sql = build_default_registry()
            .generate(statement, &PostgresDatabase::new())
            .unwrap();
        assert_eq!(
            sql[0].text(),
            "ALTER TABLE orders ALTER COLUMN id ADD GENERATED BY DEFAULT AS IDENTITY (START WITH 1000)"
        );
    }

    #[test]
    fn unnamed_primary_key_uses_default_name() {
        let statement = DropPrimaryKeyStatement {
            table: "Orders".into(),
            ..Default::default()
        };
        let registry = build_default_registry();
        let sql = registry
            .generate(statement.clone(), &PostgresDatabase::new())
            .unwrap();
        assert_eq!(sql[0].text(), "ALTER TABLE \"Orders\" DROP CONSTRAINT orders_pkey");

        // other backends still need the name
        assert!(registry.generate(statement, &GenericDatabase::new()).is_err());
    }
}
