//! Data and raw SQL generators.

use super::{SqlGenerator, SqlGeneratorRegistry};
use crate::database::Database;
use crate::error::Result;
use crate::sql::{AffectedObject, Sql};
use crate::statement::{
    CopyRowsStatement, DeleteStatement, InsertStatement, RawSqlStatement, UpdateStatement,
};
use crate::validation::ValidationErrors;

pub(super) fn register(registry: &mut SqlGeneratorRegistry) {
    registry
        .register(InsertGenerator)
        .register(UpdateGenerator)
        .register(DeleteGenerator)
        .register(RawSqlGenerator)
        .register(CopyRowsGenerator);
}

/// `INSERT INTO .. (..) VALUES (..)`.
pub struct InsertGenerator;

impl SqlGenerator for InsertGenerator {
    type Statement = InsertStatement;

    fn name(&self) -> &str {
        "InsertGenerator"
    }

    fn validate(&self, statement: &InsertStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("tableName", &statement.table);
        errors.check_required_list("columns", &statement.values);
        errors
    }

    fn generate_sql(
        &self,
        statement: &InsertStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let columns: Vec<String> = statement
            .values
            .iter()
            .map(|(column, _)| database.escape_column_name(column))
            .collect();
        let values: Vec<String> = statement
            .values
            .iter()
            .map(|(_, value)| database.literal(value))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            database.escape_table_name(schema, &statement.table),
            columns.join(", "),
            values.join(", ")
        );
        Ok(vec![
            Sql::new(sql).affecting(AffectedObject::table(schema, &statement.table)),
        ])
    }
}

/// `UPDATE .. SET .. [WHERE ..]`.
pub struct UpdateGenerator;

impl SqlGenerator for UpdateGenerator {
    type Statement = UpdateStatement;

    fn name(&self) -> &str {
        "UpdateGenerator"
    }

    fn validate(&self, statement: &UpdateStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("tableName", &statement.table);
        errors.check_required_list("columns", &statement.values);
        errors
    }

    fn generate_sql(
        &self,
        statement: &UpdateStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let assignments: Vec<String> = statement
            .values
            .iter()
            .map(|(column, value)| {
                format!(
                    "{} = {}",
                    database.escape_column_name(column),
                    database.literal(value)
                )
            })
            .collect();
        let mut sql = format!(
            "UPDATE {} SET {}",
            database.escape_table_name(schema, &statement.table),
            assignments.join(", ")
        );
        if let Some(condition) = &statement.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(condition);
        }
        Ok(vec![
            Sql::new(sql).affecting(AffectedObject::table(schema, &statement.table)),
        ])
    }
}

/// `DELETE FROM .. [WHERE ..]`.
pub struct DeleteGenerator;

impl SqlGenerator for DeleteGenerator {
    type Statement = DeleteStatement;

    fn name(&self) -> &str {
        "DeleteGenerator"
    }

    fn validate(&self, statement: &DeleteStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("tableName", &statement.table);
        errors
    }

    fn generate_sql(
        &self,
        statement: &DeleteStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let mut sql = format!(
            "DELETE FROM {}",
            database.escape_table_name(schema, &statement.table)
        );
        if let Some(condition) = &statement.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(condition);
        }
        Ok(vec![
            Sql::new(sql).affecting(AffectedObject::table(schema, &statement.table)),
        ])
    }
}

/// Passes SQL through, stripping one trailing delimiter.
pub struct RawSqlGenerator;

impl SqlGenerator for RawSqlGenerator {
    type Statement = RawSqlStatement;

    fn name(&self) -> &str {
        "RawSqlGenerator"
    }

    fn validate(&self, statement: &RawSqlStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("sql", &statement.sql);
        errors
    }

    fn generate_sql(
        &self,
        statement: &RawSqlStatement,
        _database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let delimiter = statement.end_delimiter.as_deref().unwrap_or(";");
        let text = statement.sql.trim();
        let text = text.strip_suffix(delimiter).unwrap_or(text).trim_end();
        Ok(vec![Sql::new(text).with_delimiter(delimiter)])
    }
}

/// `INSERT INTO target (..) SELECT .. FROM source`.
pub struct CopyRowsGenerator;

impl SqlGenerator for CopyRowsGenerator {
    type Statement = CopyRowsStatement;

    fn name(&self) -> &str {
        "CopyRowsGenerator"
    }

    fn validate(&self, statement: &CopyRowsStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("sourceTable", &statement.source_table);
        errors.check_required_field("targetTable", &statement.target_table);
        errors
    }

    fn generate_sql(
        &self,
        statement: &CopyRowsStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        if statement.columns.is_empty() {
            return Ok(Vec::new());
        }
        let schema = statement.schema.as_deref();
        let columns = database.escape_column_list(&statement.columns);
        let sql = format!(
            "INSERT INTO {} ({columns}) SELECT {columns} FROM {}",
            database.escape_table_name(schema, &statement.target_table),
            database.escape_table_name(schema, &statement.source_table)
        );
        Ok(vec![
            Sql::new(sql).affecting(AffectedObject::table(schema, &statement.target_table)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{GenericDatabase, MySqlDatabase};
    use crate::datatype::LiteralValue;
    use crate::sqlgen::build_default_registry;

    #[test]
    fn insert_renders_literals_per_dialect() {
        let statement = InsertStatement::new("flags")
            .value("name", LiteralValue::text("dark mode"))
            .value("enabled", LiteralValue::Boolean(true))
            .value("note", LiteralValue::Null);
        let sql = build_default_registry()
            .generate(statement, &MySqlDatabase::new())
            .unwrap();
        assert_eq!(
            sql[0].text(),
            "INSERT INTO flags (name, enabled, note) VALUES ('dark mode', 1, NULL)"
        );
    }

    #[test]
    fn raw_sql_keeps_custom_delimiter() {
        let statement = RawSqlStatement {
            sql: "CREATE TRIGGER t BEGIN SELECT 1; END\n/".into(),
            end_delimiter: Some("/".into()),
        };
        let sql = build_default_registry()
            .generate(statement, &GenericDatabase::new())
            .unwrap();
        assert_eq!(sql[0].text(), "CREATE TRIGGER t BEGIN SELECT 1; END");
        assert_eq!(sql[0].to_string(), "CREATE TRIGGER t BEGIN SELECT 1; END/");
    }

    #[test]
    fn copy_rows_without_columns_is_a_no_op() {
        let statement = CopyRowsStatement {
            source_table: "a".into(),
            target_table: "b".into(),
            ..Default::default()
        };
        let sql = build_default_registry()
            .generate(statement, &GenericDatabase::new())
            .unwrap();
        assert!(sql.is_empty());
    }
}
