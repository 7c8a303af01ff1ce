//! Generators for the change-set history and lock tables.
//!
//! All of them lower to primitive statements through the registry, so the
//! tracking tables follow each dialect's type mapping and quoting.

use super::{SqlGenerator, SqlGeneratorRegistry};
use crate::database::Database;
use crate::datatype::{DataType, LiteralValue};
use crate::error::Result;
use crate::sql::Sql;
use crate::statement::{
    ColumnDef, CreateDatabaseChangeLogLockTableStatement, CreateDatabaseChangeLogTableStatement,
    CreateTableStatement, DeleteStatement, InitializeDatabaseChangeLogLockTableStatement,
    InsertStatement, LockDatabaseChangeLogStatement, MarkChangeSetRanStatement, PrimaryKeyDef,
    RemoveChangeSetRanStatusStatement, TagDatabaseStatement, UnlockDatabaseChangeLogStatement,
    UniqueDef, UpdateStatement, DATABASE_CHANGELOG_LOCK_TABLE, DATABASE_CHANGELOG_TABLE,
};
use crate::validation::ValidationErrors;

/// Longest text stored in the 255-character history columns.
pub const MAX_TEXT_LENGTH: usize = 255;

pub(super) fn register(registry: &mut SqlGeneratorRegistry) {
    registry
        .register(CreateDatabaseChangeLogTableGenerator)
        .register(CreateDatabaseChangeLogLockTableGenerator)
        .register(InitializeDatabaseChangeLogLockTableGenerator)
        .register(LockDatabaseChangeLogGenerator)
        .register(UnlockDatabaseChangeLogGenerator)
        .register(MarkChangeSetRanGenerator)
        .register(RemoveChangeSetRanStatusGenerator)
        .register(TagDatabaseGenerator);
}

/// Truncates to at most `max` characters.
pub(crate) fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Equality condition on a text column.
fn text_condition(database: &dyn Database, column: &str, value: &str) -> String {
    format!(
        "{} = '{}'",
        database.escape_column_name(column),
        value.replace('\'', "''")
    )
}

/// Always-quoted text, so history values such as `NULL` stay strings.
fn quoted(value: &str) -> LiteralValue {
    LiteralValue::computed(format!("'{}'", value.replace('\'', "''")))
}

fn lock_row() -> InsertStatement {
    InsertStatement::new(DATABASE_CHANGELOG_LOCK_TABLE)
        .value("ID", LiteralValue::numeric(1))
        .value("LOCKED", LiteralValue::Boolean(false))
        .value("LOCKGRANTED", LiteralValue::Null)
        .value("LOCKEDBY", LiteralValue::Null)
}

/// Creates `DATABASECHANGELOG`.
pub struct CreateDatabaseChangeLogTableGenerator;

impl SqlGenerator for CreateDatabaseChangeLogTableGenerator {
    type Statement = CreateDatabaseChangeLogTableStatement;

    fn name(&self) -> &str {
        "CreateDatabaseChangeLogTableGenerator"
    }

    fn validate(&self, _statement: &Self::Statement, _database: &dyn Database) -> ValidationErrors {
        ValidationErrors::new()
    }

    fn generate_sql(
        &self,
        statement: &Self::Statement,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let table = CreateTableStatement {
            schema: statement.schema.clone(),
            primary_key: Some(PrimaryKeyDef {
                name: Some(format!("PK_{DATABASE_CHANGELOG_TABLE}")),
                columns: vec!["ID".into(), "AUTHOR".into(), "FILENAME".into()],
                tablespace: None,
            }),
            unique_constraints: vec![UniqueDef {
                name: Some(format!("UC_{DATABASE_CHANGELOG_TABLE}_ORDEREXECUTED")),
                columns: vec!["ORDEREXECUTED".into()],
            }],
            ..CreateTableStatement::new(DATABASE_CHANGELOG_TABLE)
        }
        .column(ColumnDef::new("ID", DataType::Varchar(Some(63))).not_null())
        .column(ColumnDef::new("AUTHOR", DataType::Varchar(Some(63))).not_null())
        .column(ColumnDef::new("FILENAME", DataType::Varchar(Some(200))).not_null())
        .column(ColumnDef::new("DATEEXECUTED", DataType::DateTime).not_null())
        .column(ColumnDef::new("ORDEREXECUTED", DataType::Int).not_null())
        .column(ColumnDef::new("MD5SUM", DataType::Varchar(Some(35))))
        .column(ColumnDef::new("DESCRIPTION", DataType::Varchar(Some(255))))
        .column(ColumnDef::new("COMMENTS", DataType::Varchar(Some(255))))
        .column(ColumnDef::new("TAG", DataType::Varchar(Some(255))))
        .column(ColumnDef::new("LIQUIBASE", DataType::Varchar(Some(10))));
        registry.generate(table, database)
    }
}

/// Creates `DATABASECHANGELOGLOCK` and inserts its unlocked row.
pub struct CreateDatabaseChangeLogLockTableGenerator;

impl SqlGenerator for CreateDatabaseChangeLogLockTableGenerator {
    type Statement = CreateDatabaseChangeLogLockTableStatement;

    fn name(&self) -> &str {
        "CreateDatabaseChangeLogLockTableGenerator"
    }

    fn validate(&self, _statement: &Self::Statement, _database: &dyn Database) -> ValidationErrors {
        ValidationErrors::new()
    }

    fn generate_sql(
        &self,
        statement: &Self::Statement,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let table = CreateTableStatement {
            schema: statement.schema.clone(),
            primary_key: Some(PrimaryKeyDef {
                name: Some(format!("PK_{DATABASE_CHANGELOG_LOCK_TABLE}")),
                columns: vec!["ID".into()],
                tablespace: None,
            }),
            ..CreateTableStatement::new(DATABASE_CHANGELOG_LOCK_TABLE)
        }
        .column(ColumnDef::new("ID", DataType::Int).not_null())
        .column(ColumnDef::new("LOCKED", DataType::Boolean).not_null())
        .column(ColumnDef::new("LOCKGRANTED", DataType::DateTime))
        .column(ColumnDef::new("LOCKEDBY", DataType::Varchar(Some(255))));
        let insert = InsertStatement {
            schema: statement.schema.clone(),
            ..lock_row()
        };

        let mut sql = registry.generate(table, database)?;
        sql.extend(registry.generate(insert, database)?);
        Ok(sql)
    }
}

/// Resets the lock table to its single unlocked row.
pub struct InitializeDatabaseChangeLogLockTableGenerator;

impl SqlGenerator for InitializeDatabaseChangeLogLockTableGenerator {
    type Statement = InitializeDatabaseChangeLogLockTableStatement;

    fn name(&self) -> &str {
        "InitializeDatabaseChangeLogLockTableGenerator"
    }

    fn validate(&self, _statement: &Self::Statement, _database: &dyn Database) -> ValidationErrors {
        ValidationErrors::new()
    }

    fn generate_sql(
        &self,
        statement: &Self::Statement,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let delete = DeleteStatement {
            schema: statement.schema.clone(),
            table: DATABASE_CHANGELOG_LOCK_TABLE.to_string(),
            where_clause: None,
        };
        let insert = InsertStatement {
            schema: statement.schema.clone(),
            ..lock_row()
        };
        let mut sql = registry.generate(delete, database)?;
        sql.extend(registry.generate(insert, database)?);
        Ok(sql)
    }
}

/// Takes the lock if it is free. The caller checks that one row changed.
pub struct LockDatabaseChangeLogGenerator;

impl SqlGenerator for LockDatabaseChangeLogGenerator {
    type Statement = LockDatabaseChangeLogStatement;

    fn name(&self) -> &str {
        "LockDatabaseChangeLogGenerator"
    }

    fn validate(&self, statement: &Self::Statement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("lockedBy", &statement.locked_by);
        errors
    }

    fn generate_sql(
        &self,
        statement: &Self::Statement,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let update = UpdateStatement {
            schema: statement.schema.clone(),
            table: DATABASE_CHANGELOG_LOCK_TABLE.to_string(),
            values: vec![
                ("LOCKED".into(), LiteralValue::Boolean(true)),
                (
                    "LOCKEDBY".into(),
                    quoted(&truncate(&statement.locked_by, MAX_TEXT_LENGTH)),
                ),
                (
                    "LOCKGRANTED".into(),
                    LiteralValue::computed(database.current_date_time_function()),
                ),
            ],
            where_clause: Some(format!(
                "{} = 1 AND {} = {}",
                database.escape_column_name("ID"),
                database.escape_column_name("LOCKED"),
                database.false_boolean_value()
            )),
        };
        registry.generate(update, database)
    }
}

/// Releases the lock unconditionally.
pub struct UnlockDatabaseChangeLogGenerator;

impl SqlGenerator for UnlockDatabaseChangeLogGenerator {
    type Statement = UnlockDatabaseChangeLogStatement;

    fn name(&self) -> &str {
        "UnlockDatabaseChangeLogGenerator"
    }

    fn validate(&self, _statement: &Self::Statement, _database: &dyn Database) -> ValidationErrors {
        ValidationErrors::new()
    }

    fn generate_sql(
        &self,
        statement: &Self::Statement,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let update = UpdateStatement {
            schema: statement.schema.clone(),
            table: DATABASE_CHANGELOG_LOCK_TABLE.to_string(),
            values: vec![
                ("LOCKED".into(), LiteralValue::Boolean(false)),
                ("LOCKGRANTED".into(), LiteralValue::Null),
                ("LOCKEDBY".into(), LiteralValue::Null),
            ],
            where_clause: Some(format!("{} = 1", database.escape_column_name("ID"))),
        };
        registry.generate(update, database)
    }
}

/// Appends a row to the history table.
pub struct MarkChangeSetRanGenerator;

impl SqlGenerator for MarkChangeSetRanGenerator {
    type Statement = MarkChangeSetRanStatement;

    fn name(&self) -> &str {
        "MarkChangeSetRanGenerator"
    }

    fn validate(&self, statement: &Self::Statement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("id", &statement.id);
        errors.check_required_field("author", &statement.author);
        errors.check_required_field("filename", &statement.filename);
        errors
    }

    fn generate_sql(
        &self,
        statement: &Self::Statement,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let tag = statement
            .tag
            .as_deref()
            .map_or(LiteralValue::Null, |t| quoted(&truncate(t, MAX_TEXT_LENGTH)));
        let insert = InsertStatement {
            schema: statement.schema.clone(),
            ..InsertStatement::new(DATABASE_CHANGELOG_TABLE)
        }
        .value("ID", quoted(&statement.id))
        .value("AUTHOR", quoted(&statement.author))
        .value("FILENAME", quoted(&statement.filename))
        .value(
            "DATEEXECUTED",
            LiteralValue::computed(database.current_date_time_function()),
        )
        .value("ORDEREXECUTED", LiteralValue::numeric(statement.order_executed))
        .value("MD5SUM", quoted(&statement.md5sum))
        .value(
            "DESCRIPTION",
            quoted(&truncate(&statement.description, MAX_TEXT_LENGTH)),
        )
        .value("COMMENTS", quoted(&truncate(&statement.comments, MAX_TEXT_LENGTH)))
        .value("TAG", tag)
        .value("LIQUIBASE", quoted(&truncate(&statement.version, 10)));
        registry.generate(insert, database)
    }
}

/// Deletes the history row of one change set.
pub struct RemoveChangeSetRanStatusGenerator;

impl SqlGenerator for RemoveChangeSetRanStatusGenerator {
    type Statement = RemoveChangeSetRanStatusStatement;

    fn name(&self) -> &str {
        "RemoveChangeSetRanStatusGenerator"
    }

    fn validate(&self, statement: &Self::Statement, _database: &dyn Database) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check_required_field("id", &statement.id);
        errors.check_required_field("author", &statement.author);
        errors.check_required_field("filename", &statement.filename);
        errors
    }

    fn generate_sql(
        &self,
        statement: &Self::Statement,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let delete = DeleteStatement {
            schema: statement.schema.clone(),
            table: DATABASE_CHANGELOG_TABLE.to_string(),
            where_clause: Some(format!(
                "{} AND {} AND {}",
                text_condition(database, "ID", &statement.id),
                text_condition(database, "AUTHOR", &statement.author),
                text_condition(database, "FILENAME", &statement.filename)
            )),
        };
        registry.generate(delete, database)
    }
}

/// Checks shared by every tag generator.
pub(crate) fn validate_tag_database(statement: &TagDatabaseStatement) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check_required_field("tag", &statement.tag);
    errors
}

/// Tags the history row with the highest `ORDEREXECUTED`.
pub struct TagDatabaseGenerator;

impl SqlGenerator for TagDatabaseGenerator {
    type Statement = TagDatabaseStatement;

    fn name(&self) -> &str {
        "TagDatabaseGenerator"
    }

    fn validate(&self, statement: &Self::Statement, _database: &dyn Database) -> ValidationErrors {
        validate_tag_database(statement)
    }

    fn generate_sql(
        &self,
        statement: &Self::Statement,
        database: &dyn Database,
        _registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        let table = database.escape_table_name(statement.schema.as_deref(), DATABASE_CHANGELOG_TABLE);
        let order = database.escape_column_name("ORDEREXECUTED");
        let sql = format!(
            "UPDATE {table} SET {} = '{}' WHERE {order} = (SELECT MAX({order}) FROM {table})",
            database.escape_column_name("TAG"),
            truncate(&statement.tag, MAX_TEXT_LENGTH).replace('\'', "''")
        );
        Ok(vec![Sql::new(sql)])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::{PostgresDatabase, SqliteDatabase};
    use crate::sqlgen::build_default_registry;

    fn texts(sql: &[Sql]) -> Vec<&str> {
        sql.iter().map(Sql::text).collect()
    }

    #[test]
    fn history_table_columns() {
        let sql = build_default_registry()
            .generate(
                CreateDatabaseChangeLogTableStatement::default(),
                &PostgresDatabase::new(),
            )
            .unwrap();
        assert_eq!(
            texts(&sql),
            [
                "CREATE TABLE databasechangelog (id VARCHAR(63) NOT NULL, author VARCHAR(63) NOT NULL, \
                 filename VARCHAR(200) NOT NULL, dateexecuted TIMESTAMP NOT NULL, \
                 orderexecuted INTEGER NOT NULL, md5sum VARCHAR(35), description VARCHAR(255), \
                 comments VARCHAR(255), tag VARCHAR(255), liquibase VARCHAR(10), \
                 CONSTRAINT pk_databasechangelog PRIMARY KEY (id, author, filename), \
                 CONSTRAINT uc_databasechangelog_orderexecuted UNIQUE (orderexecuted))"
            ]
        );
    }

    #[test]
    fn lock_table_is_created_with_its_row() {
        let sql = build_default_registry()
            .generate(
                CreateDatabaseChangeLogLockTableStatement::default(),
                &SqliteDatabase::new(),
            )
            .unwrap();
        assert_eq!(
            texts(&sql),
            [
                "CREATE TABLE DATABASECHANGELOGLOCK (ID INTEGER NOT NULL, LOCKED BOOLEAN NOT NULL, \
                 LOCKGRANTED DATETIME, LOCKEDBY VARCHAR(255), \
                 CONSTRAINT PK_DATABASECHANGELOGLOCK PRIMARY KEY (ID))",
                "INSERT INTO DATABASECHANGELOGLOCK (ID, LOCKED, LOCKGRANTED, LOCKEDBY) \
                 VALUES (1, 0, NULL, NULL)",
            ]
        );
    }

    #[test]
    fn lock_and_unlock() {
        let registry = build_default_registry();
        let db = SqliteDatabase::new();
        let lock = registry
            .generate(
                LockDatabaseChangeLogStatement {
                    schema: None,
                    locked_by: "build-01 (42)".into(),
                },
                &db,
            )
            .unwrap();
        assert_eq!(
            lock[0].text(),
            "UPDATE DATABASECHANGELOGLOCK SET LOCKED = 1, LOCKEDBY = 'build-01 (42)', \
             LOCKGRANTED = CURRENT_TIMESTAMP WHERE ID = 1 AND LOCKED = 0"
        );
        let unlock = registry
            .generate(UnlockDatabaseChangeLogStatement::default(), &db)
            .unwrap();
        assert_eq!(
            unlock[0].text(),
            "UPDATE DATABASECHANGELOGLOCK SET LOCKED = 0, LOCKGRANTED = NULL, LOCKEDBY = NULL \
             WHERE ID = 1"
        );
    }

    #[test]
    fn mark_ran_escapes_and_truncates() {
        let statement = MarkChangeSetRanStatement {
            id: "1".into(),
            author: "o'neil".into(),
            filename: "changelog.json".into(),
            order_executed: 3,
            md5sum: "8:abc".into(),
            description: "x".repeat(300),
            comments: String::new(),
            tag: None,
            version: "0.1.0".into(),
            schema: None,
        };
        let sql = build_default_registry()
            .generate(statement, &SqliteDatabase::new())
            .unwrap();
        let text = sql[0].text();
        assert!(text.contains("'o''neil'"));
        assert!(text.contains(&format!("'{}'", "x".repeat(255))));
        assert!(!text.contains(&"x".repeat(256)));
        assert!(text.contains("CURRENT_TIMESTAMP, 3, '8:abc'"));
    }

    #[test]
    fn tag_targets_last_change_set() {
        let sql = build_default_registry()
            .generate(
                TagDatabaseStatement {
                    schema: None,
                    tag: "v1".into(),
                },
                &SqliteDatabase::new(),
            )
            .unwrap();
        assert_eq!(
            sql[0].text(),
            "UPDATE DATABASECHANGELOG SET TAG = 'v1' WHERE ORDEREXECUTED = \
             (SELECT MAX(ORDEREXECUTED) FROM DATABASECHANGELOG)"
        );
    }
}
