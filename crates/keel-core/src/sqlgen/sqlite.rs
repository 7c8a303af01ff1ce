//! SQLite overrides.
//!
//! Column and constraint changes go through [`SqliteRebuildGenerator`].

use super::rebuild::SqliteRebuildGenerator;
use super::sequence::{create_view_sql, validate_create_view};
use super::{Priority, SqlGenerator, SqlGeneratorRegistry};
use crate::database::{Database, DatabaseKind};
use crate::error::Result;
use crate::snapshot::ObjectType;
use crate::sql::{AffectedObject, Sql};
use crate::statement::{
    AddAutoIncrementStatement, AddColumnStatement, AddDefaultValueStatement,
    AddForeignKeyConstraintStatement, AddPrimaryKeyStatement, AddUniqueConstraintStatement,
    CreateViewStatement, DropColumnStatement, DropDefaultValueStatement,
    DropForeignKeyConstraintStatement, DropPrimaryKeyStatement, DropUniqueConstraintStatement,
    ModifyDataTypeStatement, SetNullableStatement,
};
use crate::validation::ValidationErrors;

pub(super) fn register(registry: &mut SqlGeneratorRegistry) {
    registry
        .register(SqliteRebuildGenerator::<ModifyDataTypeStatement>::new())
        .register(SqliteRebuildGenerator::<DropColumnStatement>::new())
        .register(SqliteRebuildGenerator::<SetNullableStatement>::new())
        .register(SqliteRebuildGenerator::<AddDefaultValueStatement>::new())
        .register(SqliteRebuildGenerator::<DropDefaultValueStatement>::new())
        .register(SqliteRebuildGenerator::<AddAutoIncrementStatement>::new())
        .register(SqliteRebuildGenerator::<AddColumnStatement>::new())
        .register(SqliteRebuildGenerator::<AddPrimaryKeyStatement>::new())
        .register(SqliteRebuildGenerator::<DropPrimaryKeyStatement>::new())
        .register(SqliteRebuildGenerator::<AddForeignKeyConstraintStatement>::new())
        .register(SqliteRebuildGenerator::<DropForeignKeyConstraintStatement>::new())
        .register(SqliteRebuildGenerator::<AddUniqueConstraintStatement>::new())
        .register(SqliteRebuildGenerator::<DropUniqueConstraintStatement>::new())
        .register(SqliteCreateViewGenerator);
}

fn is_sqlite(database: &dyn Database) -> bool {
    database.kind() == DatabaseKind::Sqlite
}

/// SQLite has no `CREATE OR REPLACE VIEW`; replacing drops first.
pub struct SqliteCreateViewGenerator;

impl SqlGenerator for SqliteCreateViewGenerator {
    type Statement = CreateViewStatement;

    fn name(&self) -> &str {
        "SqliteCreateViewGenerator"
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, _statement: &CreateViewStatement, database: &dyn Database) -> bool {
        is_sqlite(database)
    }

    fn validate(&self, statement: &CreateViewStatement, _database: &dyn Database) -> ValidationErrors {
        validate_create_view(statement)
    }

    fn generate_sql(
        &self,
        statement: &CreateViewStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let mut sql = Vec::with_capacity(2);
        if statement.replace_if_exists {
            let schema = statement.schema.as_deref();
            sql.push(
                Sql::new(format!(
                    "DROP VIEW IF EXISTS {}",
                    database.escape_view_name(schema, &statement.name)
                ))
                .affecting(AffectedObject::named(ObjectType::View, schema, &statement.name)),
            );
        }
        sql.push(create_view_sql(statement, database, false));
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::SqliteDatabase;
    use crate::sqlgen::build_default_registry;

    #[test]
    fn replacing_a_view_drops_it_first() {
        let statement = CreateViewStatement {
            name: "adults".into(),
            select: "SELECT * FROM users WHERE age >= 18".into(),
            replace_if_exists: true,
            ..Default::default()
        };
        let sql = build_default_registry()
            .generate(statement, &SqliteDatabase::new())
            .unwrap();
        let texts: Vec<&str> = sql.iter().map(Sql::text).collect();
        assert_eq!(
            texts,
            [
                "DROP VIEW IF EXISTS adults",
                "CREATE VIEW adults AS SELECT * FROM users WHERE age >= 18",
            ]
        );
    }
}
