//! Generator resolution.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace, warn};

use super::{DynSqlGenerator, SqlGenerator};
use crate::database::Database;
use crate::error::{KeelError, Result};
use crate::sql::Sql;
use crate::statement::{SqlStatement, StatementType};
use crate::validation::ValidationErrors;

/// Generators keyed by statement type.
///
/// Populate the registry once, then share it read-only. Resolution picks
/// the single supporting generator with the highest priority; a tie at the
/// top is reported as [`KeelError::AmbiguousGenerator`].
#[derive(Default)]
pub struct SqlGeneratorRegistry {
    generators: BTreeMap<StatementType, Vec<Box<dyn DynSqlGenerator>>>,
}

impl fmt::Debug for SqlGeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.generators.iter().map(|(ty, gens)| {
                (ty, gens.iter().map(|g| g.name()).collect::<Vec<_>>())
            }))
            .finish()
    }
}

impl SqlGeneratorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a generator.
    pub fn register<G: SqlGenerator>(&mut self, generator: G) -> &mut Self {
        self.register_boxed(Box::new(generator))
    }

    /// Adds an already boxed generator.
    pub fn register_boxed(&mut self, generator: Box<dyn DynSqlGenerator>) -> &mut Self {
        trace!(
            generator = generator.name(),
            statement = %generator.statement_type(),
            "registering SQL generator"
        );
        self.generators
            .entry(generator.statement_type())
            .or_default()
            .push(generator);
        self
    }

    /// Removes every generator with the given name and returns how many
    /// were removed.
    pub fn unregister(&mut self, name: &str) -> usize {
        let mut removed = 0;
        for generators in self.generators.values_mut() {
            let before = generators.len();
            generators.retain(|g| g.name() != name);
            removed += before - generators.len();
        }
        removed
    }

    /// Returns the number of registered generators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generators.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the generators that accept the statement on the database,
    /// highest priority first.
    #[must_use]
    pub fn candidates<'a>(
        &'a self,
        statement: &SqlStatement,
        database: &dyn Database,
    ) -> Vec<&'a dyn DynSqlGenerator> {
        let mut candidates: Vec<&dyn DynSqlGenerator> = self
            .generators
            .get(&statement.statement_type())
            .into_iter()
            .flatten()
            .filter(|g| g.supports(statement, database))
            .map(|g| g.as_ref())
            .collect();
        candidates.sort_by(|a, b| b.priority().cmp(&a.priority()));
        candidates
    }

    /// Returns the single generator to use.
    ///
    /// # Errors
    ///
    /// [`KeelError::NoGeneratorFound`] if nothing supports the statement,
    /// [`KeelError::AmbiguousGenerator`] if the top priority is shared.
    pub fn resolve<'a>(
        &'a self,
        statement: &SqlStatement,
        database: &dyn Database,
    ) -> Result<&'a dyn DynSqlGenerator> {
        let candidates = self.candidates(statement, database);
        let Some(best) = candidates.first() else {
            return Err(KeelError::NoGeneratorFound {
                statement: statement.statement_type().to_string(),
                database: database.short_name().to_string(),
            });
        };
        let tied: Vec<String> = candidates
            .iter()
            .filter(|g| g.priority() == best.priority())
            .map(|g| g.name().to_string())
            .collect();
        if tied.len() > 1 {
            return Err(KeelError::AmbiguousGenerator {
                statement: statement.statement_type().to_string(),
                database: database.short_name().to_string(),
                candidates: tied,
            });
        }
        debug!(
            statement = %statement.statement_type(),
            database = database.short_name(),
            generator = best.name(),
            "resolved SQL generator"
        );
        Ok(*best)
    }

    /// Returns `true` if some generator supports the statement.
    #[must_use]
    pub fn supports(&self, statement: &SqlStatement, database: &dyn Database) -> bool {
        !self.candidates(statement, database).is_empty()
    }

    /// Validates a statement with the generator that would render it.
    ///
    /// # Errors
    ///
    /// Resolution errors only; validation problems are returned as data.
    pub fn validate(
        &self,
        statement: &SqlStatement,
        database: &dyn Database,
    ) -> Result<ValidationErrors> {
        Ok(self.resolve(statement, database)?.validate(statement, database))
    }

    /// Validates and renders a statement.
    ///
    /// # Errors
    ///
    /// Resolution errors, or [`KeelError::Validation`] carrying every
    /// problem found.
    pub fn generate_sql(&self, statement: &SqlStatement, database: &dyn Database) -> Result<Vec<Sql>> {
        let generator = self.resolve(statement, database)?;
        let errors = generator.validate(statement, database);
        for warning in errors.warnings() {
            warn!(statement = %statement.statement_type(), "{warning}");
        }
        if errors.has_errors() {
            return Err(KeelError::Validation {
                statement: statement.statement_type().to_string(),
                errors,
            });
        }
        let sql = generator.generate_sql(statement, database, self)?;
        for s in &sql {
            debug!(sql = %s, "generated SQL");
        }
        Ok(sql)
    }

    /// Convenience wrapper around [`Self::generate_sql`] for a concrete
    /// statement.
    ///
    /// # Errors
    ///
    /// See [`Self::generate_sql`].
    pub fn generate(
        &self,
        statement: impl Into<SqlStatement>,
        database: &dyn Database,
    ) -> Result<Vec<Sql>> {
        self.generate_sql(&statement.into(), database)
    }

    /// Renders statements in order.
    ///
    /// # Errors
    ///
    /// Stops at the first statement that fails; see [`Self::generate_sql`].
    pub fn generate_sql_all(
        &self,
        statements: &[SqlStatement],
        database: &dyn Database,
    ) -> Result<Vec<Sql>> {
        let mut sql = Vec::new();
        for statement in statements {
            sql.extend(self.generate_sql(statement, database)?);
        }
        Ok(sql)
    }
}
