//! Column descriptions used inside changes.

use serde::{Deserialize, Serialize};

use crate::datatype::{DataType, LiteralValue};
use crate::snapshot::{AutoIncrement, Column};
use crate::statement::ColumnDef;

/// A column default or inserted value as written in a changelog.
///
/// JSON strings, numbers and booleans map to the matching literal;
/// `{"computed": ".."}` and `{"date": ".."}` carry expressions and
/// ISO-8601 dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// `true` / `false`.
    Boolean(bool),
    /// A number.
    Numeric(serde_json::Number),
    /// A string.
    Text(String),
    /// A function call or expression.
    Computed {
        /// The expression, e.g. `CURRENT_TIMESTAMP`.
        computed: String,
    },
    /// A date, time or date-time.
    Date {
        /// ISO-8601 value.
        date: String,
    },
}

impl DefaultValue {
    /// Creates a computed value.
    #[must_use]
    pub fn computed(expr: impl Into<String>) -> Self {
        Self::Computed {
            computed: expr.into(),
        }
    }

    /// Converts to the literal the statements carry.
    #[must_use]
    pub fn to_literal(&self) -> LiteralValue {
        match self {
            Self::Boolean(b) => LiteralValue::Boolean(*b),
            Self::Numeric(n) => LiteralValue::numeric(n),
            Self::Text(s) => LiteralValue::text(s.clone()),
            Self::Computed { computed } => LiteralValue::computed(computed.clone()),
            Self::Date { date } => LiteralValue::Date(date.clone()),
        }
    }

    /// Converts a snapshot literal back. `NULL` is no default at all.
    #[must_use]
    pub fn from_literal(literal: &LiteralValue) -> Option<Self> {
        let value = match literal {
            LiteralValue::Null => return None,
            LiteralValue::Boolean(b) => Self::Boolean(*b),
            LiteralValue::Numeric(n) => n
                .parse::<serde_json::Number>()
                .map_or_else(|_| Self::computed(n.clone()), Self::Numeric),
            LiteralValue::Text(s) => Self::Text(s.clone()),
            LiteralValue::Date(d) => Self::Date { date: d.clone() },
            LiteralValue::Computed(c) => Self::computed(c.clone()),
        };
        Some(value)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One column of a `createTable`, `addColumn` or `insert` change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnConfig {
    /// Column name.
    pub name: String,
    /// Column type; not needed for `insert`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
    /// Value written by `insert`, or copied into every row by `addColumn`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<DefaultValue>,
    /// Whether the column auto-increments.
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,
    /// First auto-increment value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_with: Option<i64>,
    /// Auto-increment step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment_by: Option<i64>,
    /// Whether NULL is allowed; defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Whether the column is (part of) the primary key.
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    /// Name of the primary key constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_name: Option<String>,
    /// Whether the column is unique.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl ColumnConfig {
    /// Creates a typed, nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
            ..Self::default()
        }
    }

    /// Creates an untyped column carrying a value, for `insert`.
    #[must_use]
    pub fn value(name: impl Into<String>, value: DefaultValue) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            ..Self::default()
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    /// Marks the column primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = Some(false);
        self
    }

    /// Marks the column auto-increment.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Returns the effective nullability.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        !self.primary_key && self.nullable.unwrap_or(true)
    }

    /// Converts to the statement-level column definition.
    #[must_use]
    pub fn to_column_def(&self) -> ColumnDef {
        ColumnDef {
            name: self.name.clone(),
            data_type: self.data_type.clone(),
            nullable: self.is_nullable(),
            default_value: self.default_value.as_ref().map(DefaultValue::to_literal),
            auto_increment: self.auto_increment.then_some(AutoIncrement {
                start_with: self.start_with,
                increment_by: self.increment_by,
            }),
            primary_key: self.primary_key,
            unique: self.unique,
            remarks: self.remarks.clone(),
        }
    }
}

impl From<&Column> for ColumnConfig {
    fn from(column: &Column) -> Self {
        let auto_increment = column.auto_increment.unwrap_or_default();
        Self {
            name: column.name.clone(),
            data_type: Some(column.data_type.clone()),
            default_value: column
                .default_value
                .as_ref()
                .and_then(DefaultValue::from_literal),
            auto_increment: column.auto_increment.is_some(),
            start_with: auto_increment.start_with,
            increment_by: auto_increment.increment_by,
            nullable: (!column.nullable).then_some(false),
            remarks: column.remarks.clone(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_values_read_naturally() {
        let values: Vec<DefaultValue> =
            serde_json::from_str(r#"[true, 42, 1.5, "draft", {"computed": "NOW()"}, {"date": "2024-01-31"}]"#)
                .unwrap();
        let literals: Vec<LiteralValue> = values.iter().map(DefaultValue::to_literal).collect();
        assert_eq!(
            literals,
            [
                LiteralValue::Boolean(true),
                LiteralValue::numeric(42),
                LiteralValue::numeric(1.5),
                LiteralValue::text("draft"),
                LiteralValue::computed("NOW()"),
                LiteralValue::Date("2024-01-31".into()),
            ]
        );
    }

    #[test]
    fn column_json_uses_changelog_names() {
        let column: ColumnConfig = serde_json::from_str(
            r#"{"name": "id", "type": "int", "autoIncrement": true, "primaryKey": true}"#,
        )
        .unwrap();
        assert_eq!(column.data_type, Some(DataType::Int));
        assert!(!column.is_nullable());

        let def = column.to_column_def();
        assert!(def.primary_key);
        assert!(def.is_auto_increment());
        assert_eq!(
            serde_json::to_string(&column).unwrap(),
            r#"{"name":"id","type":"INT","autoIncrement":true,"primaryKey":true}"#
        );
    }

    #[test]
    fn from_snapshot_column() {
        let column = Column::new("status", DataType::Varchar(Some(20)))
            .not_null()
            .default_value(LiteralValue::text("new"));
        let config = ColumnConfig::from(&column);
        assert_eq!(config.nullable, Some(false));
        assert_eq!(config.default_value, Some(DefaultValue::Text("new".into())));

        let null_default = Column::new("note", DataType::Text).default_value(LiteralValue::Null);
        assert_eq!(ColumnConfig::from(&null_default).default_value, None);
    }
}
