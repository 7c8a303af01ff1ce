//! # keel-core
//!
//! Dialect-aware SQL generation and schema diffing for database migrations.
//!
//! This crate provides:
//! - A catalogue of abstract schema and data [statements](statement)
//! - A priority-based [generator registry](sqlgen) that renders statements
//!   into SQL for a target [database](database), including table rebuilds
//!   on dialects without in-place `ALTER TABLE`
//! - In-memory [snapshots](snapshot) of a schema and a [diff] engine
//!   comparing two of them
//! - [Changes](change) and the [changelog] generators that turn a diff
//!   into an ordered list of changes
//!
//! The core is synchronous and performs no I/O. Reading a live schema and
//! executing SQL happen in `keel-migrate`.
//!
//! ## Generating SQL
//!
//! ```rust
//! use keel_core::prelude::*;
//!
//! let registry = build_default_registry();
//! let statement = CreateTableStatement::new("users")
//!     .column(ColumnDef::new("id", DataType::Int).primary_key())
//!     .column(ColumnDef::new("email", DataType::Varchar(Some(255))).not_null());
//!
//! let sql = registry.generate(statement, &SqliteDatabase::new()).unwrap();
//! assert_eq!(
//!     sql[0].text(),
//!     "CREATE TABLE users (id INTEGER NOT NULL, email VARCHAR(255) NOT NULL, PRIMARY KEY (id))"
//! );
//! ```
//!
//! ## Diffing schemas
//!
//! ```rust
//! use keel_core::prelude::*;
//!
//! let mut reference = Snapshot::new();
//! let users = reference.add_table(Table::new("users"));
//! reference.add_column(users, Column::new("id", DataType::Int));
//! reference.add_column(users, Column::new("bio", DataType::Text));
//!
//! let mut comparison = Snapshot::new();
//! let users = comparison.add_table(Table::new("users"));
//! comparison.add_column(users, Column::new("id", DataType::Int));
//!
//! let diff = compare(&reference, &comparison, &CompareControl::default());
//! assert_eq!(diff.summary(), "Missing Column users.bio\n");
//! ```

pub mod change;
pub mod changelog;
pub mod database;
pub mod datatype;
pub mod diff;
pub mod error;
pub mod snapshot;
pub mod sql;
pub mod sqlgen;
pub mod statement;
pub mod validation;

pub use change::Change;
pub use database::Database;
pub use datatype::{DataType, LiteralValue};
pub use error::{KeelError, Result};
pub use snapshot::Snapshot;
pub use sql::Sql;
pub use statement::SqlStatement;
pub use validation::ValidationErrors;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::change::{Change, ColumnConfig, DefaultValue};
    pub use crate::changelog::{
        build_default_change_generators, ChangeGenerator, ChangeGeneratorRegistry, DiffKind,
        DiffOutputControl, DiffToChangeLog, GeneratedChangeSet,
    };
    pub use crate::database::{
        database_for, Capability, Database, DatabaseKind, GenericDatabase, MySqlDatabase,
        PostgresDatabase, SqliteDatabase,
    };
    pub use crate::datatype::{DataType, LiteralValue};
    pub use crate::diff::{compare, CompareControl, DiffResult};
    pub use crate::error::{KeelError, Result};
    pub use crate::snapshot::{
        Column, ForeignKey, ForeignKeyAction, Index, ObjectType, PrimaryKey, Sequence, Snapshot,
        Table, UniqueConstraint, View,
    };
    pub use crate::sql::Sql;
    pub use crate::sqlgen::{build_default_registry, Priority, SqlGenerator, SqlGeneratorRegistry};
    pub use crate::statement::{
        AddColumnStatement, ColumnDef, CreateIndexStatement, CreateTableStatement,
        DropTableStatement, SqlStatement, Statement,
    };
    pub use crate::validation::ValidationErrors;
}
