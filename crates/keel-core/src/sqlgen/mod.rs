//! SQL generators and their registry.
//!
//! A generator turns one statement type into [`Sql`] for the databases its
//! [`SqlGenerator::supports`] predicate accepts. The
//! [`SqlGeneratorRegistry`] picks the single applicable generator with the
//! highest [`Priority`], validates the statement with it and then renders
//! it. Generators may hand sub-statements back to the registry, which is
//! how composite operations (table rebuilds, tracking tables) are built
//! from primitive ones.
//!
//! # Example
//!
//! ```rust
//! use keel_core::database::PostgresDatabase;
//! use keel_core::sqlgen::build_default_registry;
//! use keel_core::statement::DropTableStatement;
//!
//! let registry = build_default_registry();
//! let sql = registry
//!     .generate(DropTableStatement::new("users"), &PostgresDatabase::new())
//!     .unwrap();
//! assert_eq!(sql[0].text(), "DROP TABLE users");
//! ```

mod column;
mod constraint;
mod data;
mod mysql;
mod postgres;
mod rebuild;
mod registry;
mod sequence;
mod sqlite;
mod table;
mod tracking;

pub use registry::SqlGeneratorRegistry;

use crate::database::Database;
use crate::error::{KeelError, Result};
use crate::sql::Sql;
use crate::statement::{SqlStatement, Statement, StatementType};
use crate::validation::ValidationErrors;

/// Priority tiers. A higher tier wins resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Portable generator usable on any database.
    Default,
    /// Dialect-specific override.
    Database,
    /// Supplementary generator that replaces both of the above.
    Additional,
}

/// Renders one statement type.
pub trait SqlGenerator: Send + Sync + 'static {
    /// Statement type this generator accepts.
    type Statement: Statement;

    /// Unique name, used for diagnostics and [`SqlGeneratorRegistry::unregister`].
    fn name(&self) -> &str;

    /// Resolution tier.
    fn priority(&self) -> Priority {
        Priority::Default
    }

    /// Returns whether this generator applies to the statement on the
    /// database.
    fn supports(&self, _statement: &Self::Statement, _database: &dyn Database) -> bool {
        true
    }

    /// Collects every problem with the statement.
    fn validate(&self, statement: &Self::Statement, database: &dyn Database) -> ValidationErrors;

    /// Renders the statement. Only called after [`Self::validate`] found no
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns an error if a delegated sub-statement cannot be rendered.
    fn generate_sql(
        &self,
        statement: &Self::Statement,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>>;
}

/// Object-safe view of a [`SqlGenerator`], as stored in the registry.
pub trait DynSqlGenerator: Send + Sync {
    /// See [`SqlGenerator::name`].
    fn name(&self) -> &str;

    /// Statement type this generator accepts.
    fn statement_type(&self) -> StatementType;

    /// See [`SqlGenerator::priority`].
    fn priority(&self) -> Priority;

    /// Returns `false` for statements of another type.
    fn supports(&self, statement: &SqlStatement, database: &dyn Database) -> bool;

    /// See [`SqlGenerator::validate`].
    fn validate(&self, statement: &SqlStatement, database: &dyn Database) -> ValidationErrors;

    /// See [`SqlGenerator::generate_sql`].
    ///
    /// # Errors
    ///
    /// Returns an error for a statement of another type or when a delegated
    /// sub-statement cannot be rendered.
    fn generate_sql(
        &self,
        statement: &SqlStatement,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>>;
}

impl<G: SqlGenerator> DynSqlGenerator for G {
    fn name(&self) -> &str {
        SqlGenerator::name(self)
    }

    fn statement_type(&self) -> StatementType {
        G::Statement::TYPE
    }

    fn priority(&self) -> Priority {
        SqlGenerator::priority(self)
    }

    fn supports(&self, statement: &SqlStatement, database: &dyn Database) -> bool {
        G::Statement::from_statement(statement)
            .is_some_and(|s| SqlGenerator::supports(self, s, database))
    }

    fn validate(&self, statement: &SqlStatement, database: &dyn Database) -> ValidationErrors {
        match G::Statement::from_statement(statement) {
            Some(s) => SqlGenerator::validate(self, s, database),
            None => {
                let mut errors = ValidationErrors::new();
                errors.add_error(format!(
                    "{} cannot validate a {} statement",
                    SqlGenerator::name(self),
                    statement.statement_type()
                ));
                errors
            }
        }
    }

    fn generate_sql(
        &self,
        statement: &SqlStatement,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let Some(s) = G::Statement::from_statement(statement) else {
            return Err(KeelError::NoGeneratorFound {
                statement: statement.statement_type().to_string(),
                database: database.short_name().to_string(),
            });
        };
        SqlGenerator::generate_sql(self, s, database, registry)
    }
}

/// Builds a registry holding every built-in generator.
#[must_use]
pub fn build_default_registry() -> SqlGeneratorRegistry {
    let mut registry = SqlGeneratorRegistry::new();
    table::register(&mut registry);
    column::register(&mut registry);
    constraint::register(&mut registry);
    sequence::register(&mut registry);
    data::register(&mut registry);
    tracking::register(&mut registry);
    postgres::register(&mut registry);
    mysql::register(&mut registry);
    sqlite::register(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        Capability, DatabaseKind, GenericDatabase, MySqlDatabase, PostgresDatabase,
        SqliteDatabase,
    };
    use crate::datatype::DataType;
    use crate::statement::{
        AddColumnStatement, ColumnDef, CreateSequenceStatement, DropColumnStatement,
        ModifyDataTypeStatement,
    };

    #[derive(Debug)]
    struct XyzDatabase;

    impl Database for XyzDatabase {
        fn kind(&self) -> DatabaseKind {
            DatabaseKind::Generic
        }

        fn short_name(&self) -> &str {
            "xyz"
        }

        fn supports(&self, _capability: Capability) -> bool {
            true
        }
    }

    struct AddColumnGeneratorXyz;

    impl SqlGenerator for AddColumnGeneratorXyz {
        type Statement = AddColumnStatement;

        fn name(&self) -> &str {
            "AddColumnGeneratorXyz"
        }

        fn priority(&self) -> Priority {
            Priority::Database
        }

        fn supports(&self, _statement: &AddColumnStatement, database: &dyn Database) -> bool {
            database.short_name() == "xyz"
        }

        fn validate(&self, statement: &AddColumnStatement, database: &dyn Database) -> ValidationErrors {
            column::validate_add_column(statement, database)
        }

        fn generate_sql(
            &self,
            statement: &AddColumnStatement,
            _database: &dyn Database,
            _registry: &SqlGeneratorRegistry,
        ) -> Result<Vec<Sql>> {
            Ok(vec![Sql::new(format!("XYZ ADD {}", statement.column.name))])
        }
    }

    fn add_column() -> SqlStatement {
        AddColumnStatement::new("users", ColumnDef::new("email", DataType::Text)).into()
    }

    #[test]
    fn dialect_override_outranks_generic() {
        let mut registry = build_default_registry();
        registry.register(AddColumnGeneratorXyz);
        let statement = add_column();

        let xyz = registry.resolve(&statement, &XyzDatabase).unwrap();
        assert_eq!(xyz.name(), "AddColumnGeneratorXyz");
        let generic = registry.resolve(&statement, &GenericDatabase::new()).unwrap();
        assert_eq!(generic.name(), "AddColumnGenerator");

        assert_eq!(registry.unregister("AddColumnGeneratorXyz"), 1);
        let after = registry.resolve(&statement, &XyzDatabase).unwrap();
        assert_eq!(after.name(), "AddColumnGenerator");
    }

    #[test]
    fn resolution_is_deterministic() {
        let registry = build_default_registry();
        let statement: SqlStatement =
            ModifyDataTypeStatement::new("t", "b", DataType::Text).into();
        let db = PostgresDatabase::new();
        let names: Vec<_> = (0..5)
            .map(|_| registry.resolve(&statement, &db).unwrap().name().to_string())
            .collect();
        assert!(names.iter().all(|n| n == "PostgresModifyDataTypeGenerator"));
    }

    #[test]
    fn tied_priorities_are_ambiguous() {
        struct Twin(&'static str);
        impl SqlGenerator for Twin {
            type Statement = AddColumnStatement;
            fn name(&self) -> &str {
                self.0
            }
            fn priority(&self) -> Priority {
                Priority::Additional
            }
            fn validate(&self, _: &AddColumnStatement, _: &dyn Database) -> ValidationErrors {
                ValidationErrors::new()
            }
            fn generate_sql(
                &self,
                _: &AddColumnStatement,
                _: &dyn Database,
                _: &SqlGeneratorRegistry,
            ) -> Result<Vec<Sql>> {
                Ok(Vec::new())
            }
        }

        let mut registry = build_default_registry();
        registry.register(Twin("first")).register(Twin("second"));
        let err = registry
            .resolve(&add_column(), &GenericDatabase::new())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            KeelError::AmbiguousGenerator { ref candidates, .. } if candidates.len() == 2
        ));
    }

    #[test]
    fn unsupported_feature_is_no_generator_found() {
        let registry = build_default_registry();
        let statement: SqlStatement = CreateSequenceStatement {
            name: "seq".into(),
            ..Default::default()
        }
        .into();
        let err = registry
            .generate_sql(&statement, &SqliteDatabase::new())
            .unwrap_err();
        assert!(matches!(err, KeelError::NoGeneratorFound { .. }));
        assert!(err.to_string().contains("sqlite"));
        assert!(!registry.supports(&statement, &MySqlDatabase::new()));
        assert!(registry.supports(&statement, &PostgresDatabase::new()));
    }

    #[test]
    fn validation_errors_are_aggregated() {
        let registry = build_default_registry();
        let statement: SqlStatement = DropColumnStatement::default().into();
        let errors = registry
            .validate(&statement, &GenericDatabase::new())
            .unwrap();
        assert_eq!(errors.errors().len(), 2);

        let err = registry
            .generate_sql(&statement, &GenericDatabase::new())
            .unwrap_err();
        match err {
            KeelError::Validation { errors, .. } => assert_eq!(errors.errors().len(), 2),
            other => panic!("expected validation error, got {other}"),
        }
    }
}
