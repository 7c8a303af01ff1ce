//! Database-agnostic statements.
//!
//! A statement describes one DDL or DML intent with named fields and no
//! behavior. SQL generators turn statements into [`Sql`](crate::sql::Sql)
//! for a specific [`Database`](crate::database::Database).

mod constraint;
mod data;
mod sequence;
mod table;
mod tracking;

pub use constraint::{
    AddForeignKeyConstraintStatement, AddPrimaryKeyStatement, AddUniqueConstraintStatement,
    CreateIndexStatement, DropForeignKeyConstraintStatement, DropIndexStatement,
    DropPrimaryKeyStatement, DropUniqueConstraintStatement,
};
pub use data::{
    CopyRowsStatement, DeleteStatement, InsertStatement, RawSqlStatement, UpdateStatement,
};
pub use sequence::{
    AlterSequenceStatement, CreateSequenceStatement, CreateViewStatement, DropSequenceStatement,
    DropViewStatement,
};
pub use table::{
    AddAutoIncrementStatement, AddColumnStatement, AddDefaultValueStatement, ColumnDef,
    CreateTableStatement, DropColumnStatement, DropDefaultValueStatement, DropTableStatement,
    ForeignKeyDef, ModifyDataTypeStatement, PrimaryKeyDef, RenameColumnStatement,
    RenameTableStatement, SetNullableStatement, UniqueDef,
};
pub use tracking::{
    CreateDatabaseChangeLogLockTableStatement, CreateDatabaseChangeLogTableStatement,
    InitializeDatabaseChangeLogLockTableStatement, LockDatabaseChangeLogStatement,
    MarkChangeSetRanStatement, RemoveChangeSetRanStatusStatement, TagDatabaseStatement,
    UnlockDatabaseChangeLogStatement, DATABASE_CHANGELOG_LOCK_TABLE, DATABASE_CHANGELOG_TABLE,
};

use std::fmt;

/// A concrete statement type that can be wrapped in [`SqlStatement`].
pub trait Statement: fmt::Debug + Clone + Into<SqlStatement> + Send + Sync + 'static {
    /// Registry key of this statement type.
    const TYPE: StatementType;

    /// Borrows the concrete statement out of the enum, if it has this type.
    fn from_statement(statement: &SqlStatement) -> Option<&Self>;
}

macro_rules! statements {
    ($($(#[$doc:meta])* $variant:ident($ty:ty)),+ $(,)?) => {
        /// Any statement.
        #[derive(Debug, Clone, PartialEq)]
        pub enum SqlStatement {
            $($(#[$doc])* $variant($ty),)+
        }

        /// Discriminant of [`SqlStatement`], used as the generator registry key.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum StatementType {
            $($(#[$doc])* $variant,)+
        }

        impl SqlStatement {
            /// Returns the statement type.
            #[must_use]
            pub const fn statement_type(&self) -> StatementType {
                match self {
                    $(Self::$variant(_) => StatementType::$variant,)+
                }
            }
        }

        impl StatementType {
            /// Returns the type name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }
        }

        $(
            impl From<$ty> for SqlStatement {
                fn from(statement: $ty) -> Self {
                    Self::$variant(statement)
                }
            }

            impl Statement for $ty {
                const TYPE: StatementType = StatementType::$variant;

                fn from_statement(statement: &SqlStatement) -> Option<&Self> {
                    match statement {
                        SqlStatement::$variant(s) => Some(s),
                        _ => None,
                    }
                }
            }
        )+
    };
}

statements! {
    /// `CREATE TABLE`.
    CreateTable(CreateTableStatement),
    /// `DROP TABLE`.
    DropTable(DropTableStatement),
    /// Rename a table.
    RenameTable(RenameTableStatement),
    /// Add a column.
    AddColumn(AddColumnStatement),
    /// Drop a column.
    DropColumn(DropColumnStatement),
    /// Rename a column.
    RenameColumn(RenameColumnStatement),
    /// Change a column's type.
    ModifyDataType(ModifyDataTypeStatement),
    /// Add or drop a NOT NULL constraint.
    SetNullable(SetNullableStatement),
    /// Set a column default.
    AddDefaultValue(AddDefaultValueStatement),
    /// Remove a column default.
    DropDefaultValue(DropDefaultValueStatement),
    /// Make a column auto-increment.
    AddAutoIncrement(AddAutoIncrementStatement),
    /// Add a primary key.
    AddPrimaryKey(AddPrimaryKeyStatement),
    /// Drop a primary key.
    DropPrimaryKey(DropPrimaryKeyStatement),
    /// Add a unique constraint.
    AddUniqueConstraint(AddUniqueConstraintStatement),
    /// Drop a unique constraint.
    DropUniqueConstraint(DropUniqueConstraintStatement),
    /// Add a foreign key.
    AddForeignKeyConstraint(AddForeignKeyConstraintStatement),
    /// Drop a foreign key.
    DropForeignKeyConstraint(DropForeignKeyConstraintStatement),
    /// `CREATE INDEX`.
    CreateIndex(CreateIndexStatement),
    /// `DROP INDEX`.
    DropIndex(DropIndexStatement),
    /// `CREATE SEQUENCE`.
    CreateSequence(CreateSequenceStatement),
    /// `ALTER SEQUENCE`.
    AlterSequence(AlterSequenceStatement),
    /// `DROP SEQUENCE`.
    DropSequence(DropSequenceStatement),
    /// `CREATE VIEW`.
    CreateView(CreateViewStatement),
    /// `DROP VIEW`.
    DropView(DropViewStatement),
    /// `INSERT` one row.
    Insert(InsertStatement),
    /// `UPDATE` rows.
    Update(UpdateStatement),
    /// `DELETE` rows.
    Delete(DeleteStatement),
    /// Literal SQL.
    RawSql(RawSqlStatement),
    /// Copy rows between two tables.
    CopyRows(CopyRowsStatement),
    /// Create the change-set history table.
    CreateDatabaseChangeLogTable(CreateDatabaseChangeLogTableStatement),
    /// Create the change-log lock table.
    CreateDatabaseChangeLogLockTable(CreateDatabaseChangeLogLockTableStatement),
    /// Seed the lock table with its single row.
    InitializeDatabaseChangeLogLockTable(InitializeDatabaseChangeLogLockTableStatement),
    /// Take the change-log lock.
    LockDatabaseChangeLog(LockDatabaseChangeLogStatement),
    /// Release the change-log lock.
    UnlockDatabaseChangeLog(UnlockDatabaseChangeLogStatement),
    /// Record a change set as executed.
    MarkChangeSetRan(MarkChangeSetRanStatement),
    /// Forget an executed change set.
    RemoveChangeSetRanStatus(RemoveChangeSetRanStatusStatement),
    /// Tag the most recent change set.
    TagDatabase(TagDatabaseStatement),
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_round_trips_through_concrete_type() {
        let statement: SqlStatement = DropTableStatement::new("users").into();
        assert_eq!(statement.statement_type(), StatementType::DropTable);
        assert_eq!(DropTableStatement::TYPE, StatementType::DropTable);

        let concrete = DropTableStatement::from_statement(&statement).unwrap();
        assert_eq!(concrete.table, "users");
        assert!(CreateTableStatement::from_statement(&statement).is_none());
    }

    #[test]
    fn type_names() {
        assert_eq!(StatementType::AddColumn.to_string(), "AddColumn");
        assert_eq!(
            StatementType::CreateDatabaseChangeLogLockTable.name(),
            "CreateDatabaseChangeLogLockTable"
        );
    }
}
