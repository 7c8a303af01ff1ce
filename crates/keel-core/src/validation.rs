//! Aggregated statement validation.
//!
//! Generators report every problem they find in one [`ValidationErrors`]
//! value instead of failing on the first one, so callers can show the
//! complete list before refusing to execute.

use std::fmt;

use crate::database::{Database, DatabaseKind};

/// Collected validation problems for one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationErrors {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Records a warning. Warnings never block generation.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Records an error if a required text field is blank.
    pub fn check_required_field(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add_error(format!("{field} is required"));
        }
    }

    /// Records an error if a required value is absent.
    pub fn check_required_value<T>(&mut self, field: &str, value: Option<&T>) {
        if value.is_none() {
            self.add_error(format!("{field} is required"));
        }
    }

    /// Records an error if a required list is empty.
    pub fn check_required_list<T>(&mut self, field: &str, value: &[T]) {
        if value.is_empty() {
            self.add_error(format!("{field} is required"));
        }
    }

    /// Records an error if `present` is set on one of the listed
    /// database kinds.
    pub fn check_disallowed_field(
        &mut self,
        field: &str,
        present: bool,
        database: &dyn Database,
        disallowed: &[DatabaseKind],
    ) {
        if present && disallowed.contains(&database.kind()) {
            self.add_error(format!(
                "{field} is not allowed on {}",
                database.short_name()
            ));
        }
    }

    /// Merges another collection into this one.
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Returns `true` if any error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the recorded errors.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns the recorded warnings.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MySqlDatabase, SqliteDatabase};

    #[test]
    fn collects_every_missing_field() {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("tableName", "");
        errors.check_required_field("columnName", "  ");
        errors.check_required_value::<u8>("columnType", None);
        errors.check_required_field("schemaName", "public");

        assert_eq!(errors.errors().len(), 3);
        assert_eq!(errors.errors()[0], "tableName is required");
    }

    #[test]
    fn disallowed_field_only_fires_for_listed_kinds() {
        let mut errors = ValidationErrors::new();
        errors.check_disallowed_field(
            "cascadeConstraints",
            true,
            &SqliteDatabase::new(),
            &[DatabaseKind::Sqlite],
        );
        errors.check_disallowed_field(
            "cascadeConstraints",
            true,
            &MySqlDatabase::new(),
            &[DatabaseKind::Sqlite],
        );

        assert_eq!(
            errors.errors(),
            ["cascadeConstraints is not allowed on sqlite"]
        );
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut errors = ValidationErrors::new();
        errors.add_warning("tablespace ignored");
        assert!(!errors.has_errors());

        let mut other = ValidationErrors::new();
        other.add_error("boom");
        errors.extend(other);
        assert!(errors.has_errors());
        assert_eq!(errors.warnings().len(), 1);
        assert_eq!(errors.to_string(), "boom");
    }
}
