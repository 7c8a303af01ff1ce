//! Sequence and view generators.

use super::{SqlGenerator, SqlGeneratorRegistry};
use crate::database::{Capability, Database, DatabaseKind};
use crate::error::Result;
use crate::snapshot::ObjectType;
use crate::sql::{AffectedObject, Sql};
use crate::statement::{
    AlterSequenceStatement, CreateSequenceStatement, CreateViewStatement, DropSequenceStatement,
    DropViewStatement,
};
use crate::validation::ValidationErrors;

pub(super) fn register(registry: &mut SqlGeneratorRegistry) {
    registry
        .register(CreateSequenceGenerator)
        .register(AlterSequenceGenerator)
        .register(DropSequenceGenerator)
        .register(CreateViewGenerator)
        .register(DropViewGenerator);
}

fn sequence_sql(sql: String, schema: Option<&str>, name: &str) -> Vec<Sql> {
    vec![Sql::new(sql).affecting(AffectedObject::named(ObjectType::Sequence, schema, name))]
}

/// `CREATE SEQUENCE`.
pub struct CreateSequenceGenerator;

impl SqlGenerator for CreateSequenceGenerator {
    type Statement = CreateSequenceStatement;

    fn name(&self) -> &str {
        "CreateSequenceGenerator"
    }

    fn supports(&self, _statement: &CreateSequenceStatement, database: &dyn Database) -> bool {
        database.supports(Capability::Sequences)
    }

    fn validate(&self, statement: &CreateSequenceStatement, database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("sequenceName", &statement.name);
        errors.check_disallowed_field(
            "ordered",
            statement.ordered.is_some(),
            database,
            &[DatabaseKind::Postgres],
        );
        errors
    }

    fn generate_sql(
        &self,
        statement: &CreateSequenceStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let mut sql = format!(
            "CREATE SEQUENCE {}",
            database.escape_sequence_name(schema, &statement.name)
        );
        if let Some(start) = statement.start_value {
            sql.push_str(&format!(" START WITH {start}"));
        }
        if let Some(by) = statement.increment_by {
            sql.push_str(&format!(" INCREMENT BY {by}"));
        }
        if let Some(min) = statement.min_value {
            sql.push_str(&format!(" MINVALUE {min}"));
        }
        if let Some(max) = statement.max_value {
            sql.push_str(&format!(" MAXVALUE {max}"));
        }
        match statement.ordered {
            Some(true) => sql.push_str(" ORDER"),
            Some(false) => sql.push_str(" NOORDER"),
            None => {}
        }
        match statement.cycle {
            Some(true) => sql.push_str(" CYCLE"),
            Some(false) => sql.push_str(" NO CYCLE"),
            None => {}
        }
        Ok(sequence_sql(sql, schema, &statement.name))
    }
}

/// `ALTER SEQUENCE`.
pub struct AlterSequenceGenerator;

impl SqlGenerator for AlterSequenceGenerator {
    type Statement = AlterSequenceStatement;

    fn name(&self) -> &str {
        "AlterSequenceGenerator"
    }

    fn supports(&self, _statement: &AlterSequenceStatement, database: &dyn Database) -> bool {
        database.supports(Capability::Sequences)
    }

    fn validate(&self, statement: &AlterSequenceStatement, database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("sequenceName", &statement.name);
        if statement.is_empty() {
            errors.add_error("at least one sequence attribute to alter is required");
        }
        errors.check_disallowed_field(
            "ordered",
            statement.ordered.is_some(),
            database,
            &[DatabaseKind::Postgres],
        );
        errors
    }

    fn generate_sql(
        &self,
        statement: &AlterSequenceStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let mut sql = format!(
            "ALTER SEQUENCE {}",
            database.escape_sequence_name(schema, &statement.name)
        );
        if let Some(by) = statement.increment_by {
            sql.push_str(&format!(" INCREMENT BY {by}"));
        }
        if let Some(min) = statement.min_value {
            sql.push_str(&format!(" MINVALUE {min}"));
        }
        if let Some(max) = statement.max_value {
            sql.push_str(&format!(" MAXVALUE {max}"));
        }
        match statement.ordered {
            Some(true) => sql.push_str(" ORDER"),
            Some(false) => sql.push_str(" NOORDER"),
            None => {}
        }
        Ok(sequence_sql(sql, schema, &statement.name))
    }
}

/// `DROP SEQUENCE`.
pub struct DropSequenceGenerator;

impl SqlGenerator for DropSequenceGenerator {
    type Statement = DropSequenceStatement;

    fn name(&self) -> &str {
        "DropSequenceGenerator"
    }

    fn supports(&self, _statement: &DropSequenceStatement, database: &dyn Database) -> bool {
        database.supports(Capability::Sequences)
    }

    fn validate(&self, statement: &DropSequenceStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("sequenceName", &statement.name);
        errors
    }

    fn generate_sql(
        &self,
        statement: &DropSequenceStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let sql = format!(
            "DROP SEQUENCE {}",
            database.escape_sequence_name(schema, &statement.name)
        );
        Ok(sequence_sql(sql, schema, &statement.name))
    }
}

/// Checks shared by every `CREATE VIEW` generator.
pub(crate) fn validate_create_view(statement: &CreateViewStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("viewName", &statement.name);
    errors.check_required_field("selectQuery", &statement.select);
    errors
}

/// Renders `CREATE [OR REPLACE] VIEW`.
pub(crate) fn create_view_sql(
    statement: &CreateViewStatement,
    database: &dyn Database,
    or_replace: bool,
) -> Sql {
    let schema = statement.schema.as_deref();
    let verb = if or_replace {
        "CREATE OR REPLACE VIEW"
    } else {
        "CREATE VIEW"
    };
    let sql = format!(
        "{verb} {} AS {}",
        database.escape_view_name(schema, &statement.name),
        statement.select.trim()
    );
    Sql::new(sql).affecting(AffectedObject::named(ObjectType::View, schema, &statement.name))
}

/// `CREATE [OR REPLACE] VIEW .. AS ..`.
pub struct CreateViewGenerator;

impl SqlGenerator for CreateViewGenerator {
    type Statement = CreateViewStatement;

    fn name(&self) -> &str {
        "CreateViewGenerator"
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
        Ok(vec![create_view_sql(statement, database, statement.replace_if_exists)])
    }
}

/// `DROP VIEW`.
pub struct DropViewGenerator;

impl SqlGenerator for DropViewGenerator {
    type Statement = DropViewStatement;

    fn name(&self) -> &str {
        "DropViewGenerator"
    }

    fn validate(&self, statement: &DropViewStatement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("viewName", &statement.name);
        errors
    }

    fn generate_sql(
        &self,
        statement: &DropViewStatement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let schema = statement.schema.as_deref();
        let sql = format!("DROP VIEW {}", database.escape_view_name(schema, &statement.name));
        Ok(vec![
            Sql::new(sql).affecting(AffectedObject::named(ObjectType::View, schema, &statement.name)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{GenericDatabase, PostgresDatabase};
    use crate::sqlgen::build_default_registry;

    #[test]
    fn create_sequence_with_options() {
        let statement = CreateSequenceStatement {
            name: "order_seq".into(),
            start_value: Some(100),
            increment_by: Some(5),
            cycle: Some(false),
            ..Default::default()
        };
        let sql = build_default_registry()
            .generate(statement, &PostgresDatabase::new())
            .unwrap();
        assert_eq!(
            sql[0].text(),
            "CREATE SEQUENCE order_seq START WITH 100 INCREMENT BY 5 NO CYCLE"
        );
    }

    #[test]
    fn ordered_is_rejected_on_postgres() {
        let statement = AlterSequenceStatement {
            name: "s".into(),
            ordered: Some(true),
            ..Default::default()
        };
        let registry = build_default_registry();
        let errors = registry
            .validate(&statement.clone().into(), &PostgresDatabase::new())
            .unwrap();
        assert_eq!(errors.errors(), ["ordered is not allowed on postgresql"]);

        let sql = registry.generate(statement, &GenericDatabase::new()).unwrap();
        assert_eq!(sql[0].text(), "ALTER SEQUENCE s ORDER");
    }

    #[test]
    fn replace_view() {
        let statement = CreateViewStatement {
            name: "active_users".into(),
            select: "SELECT * FROM users WHERE active = TRUE".into(),
            replace_if_exists: true,
            ..Default::default()
        };
        let sql = build_default_registry()
            .generate(statement, &PostgresDatabase::new())
            .unwrap();
        assert_eq!(
            sql[0].text(),
            "CREATE OR REPLACE VIEW active_users AS SELECT * FROM users WHERE active = TRUE"
        );
    }
}
