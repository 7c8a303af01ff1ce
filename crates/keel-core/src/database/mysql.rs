//! MySQL dialect.

use super::{Capability, Database, DatabaseKind, QuotingStrategy};
use crate::datatype::DataType;

/// MySQL and MariaDB capability object.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDatabase {
    quoting: QuotingStrategy,
}

impl MySqlDatabase {
    /// Creates a MySQL dialect with legacy quoting.
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

impl Database for MySqlDatabase {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    fn short_name(&self) -> &str {
        "mysql"
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Sequences
            | Capability::Tablespaces
            | Capability::Schemas
            | Capability::DropTableCascade => false,
            Capability::AlterColumn
            | Capability::AddPrimaryKeyColumn
            | Capability::InlinePrimaryKeyForAutoIncrement
            | Capability::IfExists => true,
        }
    }

    fn quoting_strategy(&self) -> QuotingStrategy {
        self.quoting
    }

    fn quote_chars(&self) -> (char, char) {
        ('`', '`')
    }

    fn column_type(&self, data_type: &DataType) -> String {
        match data_type {
            DataType::Boolean => "BIT(1)".to_string(),
            DataType::Text => "LONGTEXT".to_string(),
            DataType::Blob => "LONGBLOB".to_string(),
            DataType::Uuid => "CHAR(36)".to_string(),
            other => other.to_string(),
        }
    }

    fn auto_increment_clause(&self, _start_with: Option<i64>, _increment_by: Option<i64>) -> String {
        "AUTO_INCREMENT".to_string()
    }

    fn true_boolean_value(&self) -> &'static str {
        "1"
    }

    fn false_boolean_value(&self) -> &'static str {
        "0"
    }

    fn current_date_time_function(&self) -> &'static str {
        "NOW()"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_with_backticks() {
        let db = MySqlDatabase::new();
        assert_eq!(db.escape_table_name(None, "order"), "`order`");
        assert_eq!(db.escape_table_name(Some("shop"), "items"), "items");
    }

    #[test]
    fn maps_booleans_to_bit() {
        assert_eq!(MySqlDatabase::new().column_type(&DataType::Boolean), "BIT(1)");
    }
}
