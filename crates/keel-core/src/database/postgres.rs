//! PostgreSQL dialect.

use super::{Capability, Database, DatabaseKind, QuotingStrategy};
use crate::datatype::DataType;
use crate::snapshot::ObjectType;

/// PostgreSQL capability object.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDatabase {
    quoting: QuotingStrategy,
}

impl PostgresDatabase {
    /// Creates a PostgreSQL dialect with legacy quoting.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            quoting: QuotingStrategy::Legacy,
        }
    }

    /// Sets the quoting strategy.
    #[must_use]
    pub const fn quoting(mut self, quoting: QuotingStrategy) -> Self {
        self.quoting = quoting;
        self
    }
}

impl Database for PostgresDatabase {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    fn short_name(&self) -> &str {
        "postgresql"
    }

    fn supports(&self, capability: Capability) -> bool {
        !matches!(capability, Capability::InlinePrimaryKeyForAutoIncrement)
    }

    fn quoting_strategy(&self) -> QuotingStrategy {
        self.quoting
    }

    // Unquoted names fold to lower case, so mixed-case names only survive
    // when quoted.
    fn requires_quoting(&self, name: &str) -> bool {
        let mixed_case =
            name.chars().any(|c| c.is_ascii_uppercase()) && name.chars().any(|c| c.is_ascii_lowercase());
        mixed_case || !super::is_plain_identifier(name) || self.is_reserved_word(name)
    }

    fn correct_object_name(&self, name: &str, _object_type: ObjectType) -> String {
        name.to_ascii_lowercase()
    }

    fn column_type(&self, data_type: &DataType) -> String {
        match data_type {
            DataType::TinyInt => "SMALLINT".to_string(),
            DataType::Int => "INTEGER".to_string(),
            DataType::Float => "REAL".to_string(),
            DataType::Double => "DOUBLE PRECISION".to_string(),
            DataType::Blob => "BYTEA".to_string(),
            DataType::DateTime => "TIMESTAMP".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_unquoted_names_to_lower_case() {
        let db = PostgresDatabase::new();
        assert_eq!(db.escape_table_name(None, "USERS"), "users");
        assert_eq!(db.escape_table_name(None, "UserAccounts"), "\"UserAccounts\"");
        assert_eq!(db.escape_table_name(Some("public"), "orders"), "public.orders");
    }

    #[test]
    fn maps_types() {
        let db = PostgresDatabase::new();
        assert_eq!(db.column_type(&DataType::Blob), "BYTEA");
        assert_eq!(db.column_type(&DataType::DateTime), "TIMESTAMP");
        assert_eq!(db.column_type(&DataType::Varchar(Some(20))), "VARCHAR(20)");
    }
}
