//! Error types for SQL generation and schema diffing.

use crate::changelog::DiffKind;
use crate::snapshot::ObjectType;
use crate::validation::ValidationErrors;

/// Errors raised by the generator registries and the diff pipeline.
#[derive(Debug, thiserror::Error)]
pub enum KeelError {
    /// No registered generator accepts the statement on this database.
    #[error("Cannot find generators for database {database}, statement: {statement}")]
    NoGeneratorFound {
        /// Statement type name.
        statement: String,
        /// Database short name.
        database: String,
    },

    /// Two or more generators share the top priority.
    #[error(
        "Ambiguous generators for database {database}, statement {statement}: {}",
        .candidates.join(", ")
    )]
    AmbiguousGenerator {
        /// Statement type name.
        statement: String,
        /// Database short name.
        database: String,
        /// Names of the tied generators.
        candidates: Vec<String>,
    },

    /// A statement failed validation and no SQL was generated for it.
    #[error("Validation failed for {statement}: {errors}")]
    Validation {
        /// Statement type name.
        statement: String,
        /// Every problem found.
        errors: ValidationErrors,
    },

    /// Two or more change generators share the top priority for one
    /// object type.
    #[error(
        "Ambiguous {kind} change generators for {object_type}: {}",
        .candidates.join(", ")
    )]
    AmbiguousChangeGenerator {
        /// Object type being fixed.
        object_type: ObjectType,
        /// Diff kind being fixed.
        kind: DiffKind,
        /// Names of the tied generators.
        candidates: Vec<String>,
    },

    /// The run-before/run-after hints of the change generators form a
    /// cycle.
    #[error(
        "Could not order {kind} change generators, contradictory hints between: {}",
        .types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    ContradictoryOrdering {
        /// Diff kind whose generators were being ordered.
        kind: DiffKind,
        /// Object types left on the cycle.
        types: Vec<ObjectType>,
    },

    /// A table rebuild needs the current shape of a table that the
    /// database snapshot does not contain.
    #[error("Cannot rebuild table '{table}': its current shape is unknown")]
    MissingTableShape {
        /// Table name.
        table: String,
    },

    /// A column type string could not be parsed.
    #[error("Invalid data type: '{0}'")]
    InvalidDataType(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, KeelError>;
