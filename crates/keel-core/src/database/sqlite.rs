//! SQLite dialect.
//!
//! SQLite cannot alter or drop most column properties in place, so its
//! generators rebuild tables. They read the current table shape from the
//! snapshot attached with [`SqliteDatabase::with_snapshot`].

use super::{Capability, Database, DatabaseKind, QuotingStrategy};
use crate::datatype::DataType;
use crate::snapshot::Snapshot;

/// SQLite capability object.
#[derive(Debug, Clone, Default)]
pub struct SqliteDatabase {
    quoting: QuotingStrategy,
    snapshot: Option<Snapshot>,
}

impl SqliteDatabase {
    /// Creates a SQLite dialect with legacy quoting and no snapshot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            quoting: QuotingStrategy::Legacy,
            snapshot: None,
        }
    }

    /// Sets the quoting strategy.
    #[must_use]
    pub fn quoting(mut self, quoting: QuotingStrategy) -> Self {
        self.quoting = quoting;
        self
    }

    /// Attaches the current schema, used by table-rebuild generators.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Replaces the attached schema snapshot.
    pub fn set_snapshot(&mut self, snapshot: Option<Snapshot>) {
        self.snapshot = snapshot;
    }
}

impl Database for SqliteDatabase {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Sqlite
    }

    fn short_name(&self) -> &str {
        "sqlite"
    }

    fn supports(&self, capability: Capability) -> bool {
        matches!(
            capability,
            Capability::InlinePrimaryKeyForAutoIncrement | Capability::IfExists
        )
    }

    fn quoting_strategy(&self) -> QuotingStrategy {
        self.quoting
    }

    fn column_type(&self, data_type: &DataType) -> String {
        match data_type {
            DataType::Int => "INTEGER".to_string(),
            DataType::Float => "REAL".to_string(),
            other => other.to_string(),
        }
    }

    // AUTOINCREMENT is only accepted on an INTEGER PRIMARY KEY.
    fn auto_increment_type(&self, _data_type: &DataType) -> String {
        "INTEGER".to_string()
    }

    fn auto_increment_clause(&self, _start_with: Option<i64>, _increment_by: Option<i64>) -> String {
        "AUTOINCREMENT".to_string()
    }

    fn true_boolean_value(&self) -> &'static str {
        "1"
    }

    fn false_boolean_value(&self) -> &'static str {
        "0"
    }

    fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lacks_in_place_alter() {
        let db = SqliteDatabase::new();
        assert!(!db.supports(Capability::AlterColumn));
        assert!(!db.supports(Capability::Sequences));
        assert!(db.supports(Capability::InlinePrimaryKeyForAutoIncrement));
    }

    #[test]
    fn auto_increment_forces_integer() {
        let db = SqliteDatabase::new();
        assert_eq!(db.auto_increment_type(&DataType::BigInt), "INTEGER");
        assert_eq!(db.column_type(&DataType::BigInt), "BIGINT");
    }
}
