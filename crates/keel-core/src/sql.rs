//! Rendered SQL.

use std::fmt;

use crate::snapshot::ObjectType;

/// Object a rendered statement touches, kept for bookkeeping by the
/// execution layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AffectedObject {
    /// Object type.
    pub object_type: ObjectType,
    /// Schema name, if qualified.
    pub schema: Option<String>,
    /// Owning table for columns, indexes and constraints.
    pub relation: Option<String>,
    /// Object name.
    pub name: String,
}

impl AffectedObject {
    /// A table.
    #[must_use]
    pub fn table(schema: Option<&str>, name: &str) -> Self {
        Self {
            object_type: ObjectType::Table,
            schema: schema.map(str::to_string),
            relation: None,
            name: name.to_string(),
        }
    }

    /// A child of a table.
    #[must_use]
    pub fn child(object_type: ObjectType, schema: Option<&str>, table: &str, name: &str) -> Self {
        Self {
            object_type,
            schema: schema.map(str::to_string),
            relation: Some(table.to_string()),
            name: name.to_string(),
        }
    }

    /// A schema-level object other than a table.
    #[must_use]
    pub fn named(object_type: ObjectType, schema: Option<&str>, name: &str) -> Self {
        Self {
            object_type,
            schema: schema.map(str::to_string),
            relation: None,
            name: name.to_string(),
        }
    }
}

/// One rendered SQL command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sql {
    text: String,
    end_delimiter: String,
    affected: Vec<AffectedObject>,
}

impl Sql {
    /// Creates a command terminated by `;`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            end_delimiter: ";".to_string(),
            affected: Vec::new(),
        }
    }

    /// Overrides the terminating delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.end_delimiter = delimiter.into();
        self
    }

    /// Records an affected object.
    #[must_use]
    pub fn affecting(mut self, object: AffectedObject) -> Self {
        self.affected.push(object);
        self
    }

    /// The SQL text without delimiter.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The terminating delimiter.
    #[must_use]
    pub fn end_delimiter(&self) -> &str {
        &self.end_delimiter
    }

    /// Objects this command touches.
    #[must_use]
    pub fn affected(&self) -> &[AffectedObject] {
        &self.affected
    }
}

/// Renders the text followed by the delimiter.
impl fmt::Display for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.text, self.end_delimiter)
    }
}
