//! Sequence and view statements.

/// `CREATE SEQUENCE`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateSequenceStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Sequence name.
    pub name: String,
    /// First value.
    pub start_value: Option<i64>,
    /// Step.
    pub increment_by: Option<i64>,
    /// Lower bound.
    pub min_value: Option<i64>,
    /// Upper bound.
    pub max_value: Option<i64>,
    /// Request-order generation.
    pub ordered: Option<bool>,
    /// Wrap around at the bounds.
    pub cycle: Option<bool>,
}

/// `ALTER SEQUENCE`. Only the fields that are set are changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlterSequenceStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Sequence name.
    pub name: String,
    /// New step.
    pub increment_by: Option<i64>,
    /// New lower bound.
    pub min_value: Option<i64>,
    /// New upper bound.
    pub max_value: Option<i64>,
    /// New ordering flag.
    pub ordered: Option<bool>,
}

impl AlterSequenceStatement {
    /// Returns `true` if nothing would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.increment_by.is_none()
            && self.min_value.is_none()
            && self.max_value.is_none()
            && self.ordered.is_none()
    }
}

/// `DROP SEQUENCE`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropSequenceStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// Sequence name.
    pub name: String,
}

/// `CREATE VIEW`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateViewStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// View name.
    pub name: String,
    /// Defining query.
    pub select: String,
    /// Replace an existing view of the same name.
    pub replace_if_exists: bool,
}

/// `DROP VIEW`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropViewStatement {
    /// Schema name.
    pub schema: Option<String>,
    /// View name.
    pub name: String,
}
