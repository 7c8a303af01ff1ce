//! Rendering change sets as SQL scripts without executing them.

use keel_core::change::Change;
use keel_core::database::Database;
use keel_core::sqlgen::SqlGeneratorRegistry;
use keel_core::statement::CreateDatabaseChangeLogTableStatement;
use keel_core::Sql;

use crate::changelog::ChangeSet;
use crate::connection::to_script;
use crate::error::{MigrateError, Result};
use crate::history::{mark_ran_statement, remove_ran_statement};

/// Renders SQL for one target database.
#[derive(Clone, Copy)]
pub struct ScriptRenderer<'a> {
    registry: &'a SqlGeneratorRegistry,
    database: &'a dyn Database,
}

impl<'a> ScriptRenderer<'a> {
    /// Creates a renderer.
    #[must_use]
    pub const fn new(registry: &'a SqlGeneratorRegistry, database: &'a dyn Database) -> Self {
        Self { registry, database }
    }

    /// Renders the changes of a change set.
    ///
    /// `tagDatabase` changes render nothing here: the tag is written with
    /// the change set's history row.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement has no generator or fails
    /// validation.
    pub fn change_set_sql(&self, change_set: &ChangeSet) -> Result<Vec<Sql>> {
        self.changes_sql(&change_set.changes)
    }

    /// Renders the changes undoing a change set.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::NotReversible`] if the change set has no
    /// rollback, or a generation error.
    pub fn rollback_sql(&self, change_set: &ChangeSet) -> Result<Vec<Sql>> {
        let changes = change_set
            .rollback_changes()
            .ok_or_else(|| MigrateError::NotReversible(change_set.identity()))?;
        self.changes_sql(&changes)
    }

    fn changes_sql(&self, changes: &[Change]) -> Result<Vec<Sql>> {
        let mut sql = Vec::new();
        for change in changes {
            if matches!(change, Change::TagDatabase { .. }) {
                continue;
            }
            for statement in change.generate_statements(self.database) {
                sql.extend(self.registry.generate_sql(&statement, self.database)?);
            }
        }
        Ok(sql)
    }

    /// Renders an update script: each change set followed by its history
    /// insert, numbered from `first_order`.
    ///
    /// # Errors
    ///
    /// Returns the first generation error.
    pub fn update_script(
        &self,
        change_sets: &[&ChangeSet],
        first_order: i64,
        create_history_table: bool,
    ) -> Result<String> {
        let mut script = self.header("Update");
        if create_history_table {
            let sql = self
                .registry
                .generate(CreateDatabaseChangeLogTableStatement::default(), self.database)?;
            script.push_str(&to_script(&sql));
            script.push('\n');
        }
        for (order, change_set) in (first_order..).zip(change_sets) {
            script.push_str(&format!("-- Changeset {}\n", change_set.identity()));
            let mut sql = self.change_set_sql(change_set)?;
            sql.extend(
                self.registry
                    .generate(mark_ran_statement(change_set, order)?, self.database)?,
            );
            script.push_str(&to_script(&sql));
            script.push('\n');
        }
        Ok(script)
    }

    /// Renders a rollback script for change sets given most recent first.
    ///
    /// # Errors
    ///
    /// Returns the first generation error, or [`MigrateError::NotReversible`].
    pub fn rollback_script(&self, change_sets: &[&ChangeSet]) -> Result<String> {
        let mut script = self.header("Rollback");
        for change_set in change_sets {
            script.push_str(&format!("-- Rolling back changeset {}\n", change_set.identity()));
            let mut sql = self.rollback_sql(change_set)?;
            sql.extend(
                self.registry
                    .generate(remove_ran_statement(change_set), self.database)?,
            );
            script.push_str(&to_script(&sql));
            script.push('\n');
        }
        Ok(script)
    }

    fn header(&self, kind: &str) -> String {
        format!(
            "-- {kind} script for {}\n-- Generated by keel {}\n\n",
            self.database.short_name(),
            env!("CARGO_PKG_VERSION")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::change::ColumnConfig;
    use keel_core::database::PostgresDatabase;
    use keel_core::sqlgen::build_default_registry;
    use keel_core::DataType;

    fn create_users() -> ChangeSet {
        ChangeSet::new("1", "alice")
            .filename("changelog.json")
            .change(Change::CreateTable {
                schema_name: None,
                table_name: "users".to_string(),
                columns: vec![ColumnConfig::new("id", DataType::Int).primary_key()],
                tablespace: None,
                remarks: None,
            })
    }

    #[test]
    fn test_update_script_lists_change_sets_with_history() {
        let registry = build_default_registry();
        let database = PostgresDatabase::new();
        let renderer = ScriptRenderer::new(&registry, &database);

        let change_set = create_users();
        let script = renderer.update_script(&[&change_set], 7, true).unwrap();

        assert!(script.starts_with("-- Update script for postgresql\n"));
        assert!(script.contains("CREATE TABLE databasechangelog"));
        assert!(script.contains("-- Changeset changelog.json::1::alice\nCREATE TABLE users"));
        assert!(script.contains("INSERT INTO databasechangelog"));
        assert!(script.contains("CURRENT_TIMESTAMP, 7, '8:"));
    }

    #[test]
    fn test_rollback_script_reverses_and_forgets() {
        let registry = build_default_registry();
        let database = PostgresDatabase::new();
        let renderer = ScriptRenderer::new(&registry, &database);

        let change_set = create_users();
        let script = renderer.rollback_script(&[&change_set]).unwrap();
        assert!(script.contains("DROP TABLE users;\n"));
        assert!(script.contains("DELETE FROM databasechangelog"));
    }

    #[test]
    fn test_irreversible_change_set() {
        let registry = build_default_registry();
        let database = PostgresDatabase::new();
        let renderer = ScriptRenderer::new(&registry, &database);

        let change_set = ChangeSet::new("2", "alice").change(Change::Sql {
            sql: "DELETE FROM users".to_string(),
            end_delimiter: None,
        });
        assert!(matches!(
            renderer.rollback_script(&[&change_set]),
            Err(MigrateError::NotReversible(_))
        ));
    }

    #[test]
    fn test_tag_change_renders_no_statement() {
        let registry = build_default_registry();
        let database = PostgresDatabase::new();
        let renderer = ScriptRenderer::new(&registry, &database);

        let change_set = ChangeSet::new("3", "alice").change(Change::TagDatabase {
            tag: "v1".to_string(),
        });
        assert!(renderer.change_set_sql(&change_set).unwrap().is_empty());
    }
}
