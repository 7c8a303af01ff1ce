//! Logical column types.
//!
//! Changelogs and snapshots describe columns with a dialect-neutral
//! [`DataType`]. Each [`Database`](crate::database::Database) maps it to
//! a physical type name when SQL is rendered.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeelError;

/// A dialect-neutral column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    /// Boolean.
    Boolean,
    /// 8-bit integer.
    TinyInt,
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    BigInt,
    /// Single precision floating point.
    Float,
    /// Double precision floating point.
    Double,
    /// Exact numeric with optional precision and scale.
    Decimal {
        /// Total number of digits.
        precision: Option<u32>,
        /// Digits after the decimal point.
        scale: Option<u32>,
    },
    /// Fixed-length character string.
    Char(Option<u32>),
    /// Variable-length character string.
    Varchar(Option<u32>),
    /// Unbounded text.
    Text,
    /// Binary large object.
    Blob,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    DateTime,
    /// Timestamp.
    Timestamp,
    /// UUID.
    Uuid,
    /// Any type name the model does not know, kept verbatim.
    Custom(String),
}

impl DataType {
    /// Returns `true` for the integer family.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::Int | Self::BigInt
        )
    }

    /// Returns `true` for types whose literal values are written as quoted
    /// strings.
    #[must_use]
    pub const fn is_character(&self) -> bool {
        matches!(
            self,
            Self::Char(_) | Self::Varchar(_) | Self::Text | Self::Uuid | Self::Custom(_)
        )
    }

    /// Returns `true` for date and time types.
    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date | Self::Time | Self::DateTime | Self::Timestamp
        )
    }

    /// Parses a type string such as `VARCHAR(255)` or `decimal(10, 2)`.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::InvalidDataType`] for an empty string or
    /// malformed parameters.
    pub fn parse(input: &str) -> Result<Self, KeelError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(KeelError::InvalidDataType(input.to_string()));
        }

        let (base, params) = match trimmed.find('(') {
            Some(open) => {
                let close = trimmed
                    .rfind(')')
                    .filter(|close| *close > open)
                    .ok_or_else(|| KeelError::InvalidDataType(input.to_string()))?;
                let params = trimmed[open + 1..close]
                    .split(',')
                    .map(|p| p.trim().parse::<u32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| KeelError::InvalidDataType(input.to_string()))?;
                (trimmed[..open].trim(), params)
            }
            None => (trimmed, Vec::new()),
        };

        let base_upper = base
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        let first = params.first().copied();
        let second = params.get(1).copied();

        let parsed = match base_upper.as_str() {
            "BOOLEAN" | "BOOL" | "BIT" if params.is_empty() || first == Some(1) => Self::Boolean,
            "TINYINT" | "INT1" => Self::TinyInt,
            "SMALLINT" | "INT2" => Self::SmallInt,
            "INT" | "INTEGER" | "INT4" | "MEDIUMINT" | "SERIAL" => Self::Int,
            "BIGINT" | "INT8" | "BIGSERIAL" => Self::BigInt,
            "FLOAT" | "REAL" | "FLOAT4" => Self::Float,
            "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" => Self::Double,
            "DECIMAL" | "NUMERIC" | "NUMBER" => Self::Decimal {
                precision: first,
                scale: second,
            },
            "CHAR" | "CHARACTER" | "NCHAR" => Self::Char(first),
            "VARCHAR" | "CHARACTER VARYING" | "NVARCHAR" | "VARCHAR2" => Self::Varchar(first),
            "TEXT" | "CLOB" | "LONGTEXT" | "MEDIUMTEXT" => Self::Text,
            "BLOB" | "BYTEA" | "LONGBLOB" | "VARBINARY" | "BINARY" => Self::Blob,
            "DATE" => Self::Date,
            "TIME" | "TIME WITHOUT TIME ZONE" => Self::Time,
            "DATETIME" => Self::DateTime,
            "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" => Self::Timestamp,
            "UUID" | "UNIQUEIDENTIFIER" => Self::Uuid,
            _ => Self::Custom(trimmed.to_string()),
        };
        Ok(parsed)
    }
}

/// A literal value used for column defaults and data statements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LiteralValue {
    /// SQL NULL.
    Null,
    /// A string, quoted when rendered.
    Text(String),
    /// A number, rendered verbatim.
    Numeric(String),
    /// A boolean, rendered with the dialect's boolean literals.
    Boolean(bool),
    /// An ISO-8601 date, time or date-time.
    Date(String),
    /// A function call or expression such as `CURRENT_TIMESTAMP`.
    Computed(String),
}

impl LiteralValue {
    /// Creates a text literal.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a numeric literal.
    #[must_use]
    pub fn numeric(value: impl ToString) -> Self {
        Self::Numeric(value.to_string())
    }

    /// Creates a computed expression.
    #[must_use]
    pub fn computed(expr: impl Into<String>) -> Self {
        Self::Computed(expr.into())
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Text(v) => write!(f, "'{v}'"),
            Self::Numeric(v) | Self::Date(v) | Self::Computed(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::TinyInt => write!(f, "TINYINT"),
            Self::SmallInt => write!(f, "SMALLINT"),
            Self::Int => write!(f, "INT"),
            Self::BigInt => write!(f, "BIGINT"),
            Self::Float => write!(f, "FLOAT"),
            Self::Double => write!(f, "DOUBLE"),
            Self::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => write!(f, "DECIMAL({p}, {s})"),
                (Some(p), None) => write!(f, "DECIMAL({p})"),
                _ => write!(f, "DECIMAL"),
            },
            Self::Char(Some(n)) => write!(f, "CHAR({n})"),
            Self::Char(None) => write!(f, "CHAR"),
            Self::Varchar(Some(n)) => write!(f, "VARCHAR({n})"),
            Self::Varchar(None) => write!(f, "VARCHAR"),
            Self::Text => write!(f, "TEXT"),
            Self::Blob => write!(f, "BLOB"),
            Self::Date => write!(f, "DATE"),
            Self::Time => write!(f, "TIME"),
            Self::DateTime => write!(f, "DATETIME"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Uuid => write!(f, "UUID"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for DataType {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DataType {
    type Error = KeelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.to_string()
    }
}
