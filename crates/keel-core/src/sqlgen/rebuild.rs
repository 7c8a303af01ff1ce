//! Table rebuilds for backends without in-place `ALTER`.
//!
//! SQLite cannot retype a column, change nullability or defaults, or add
//! and drop constraints on an existing table. The rebuild reads the
//! table's current shape from the database snapshot, applies the change to
//! that shape and then emits, through the registry:
//!
//! 1. `CREATE TABLE <table>_keel_tmp` with the new shape
//! 2. a row copy of the surviving columns
//! 3. `DROP TABLE <table>`
//! 4. a rename of the temporary table back to `<table>`
//! 5. `CREATE INDEX` for every explicit index that survived
//!
//! On SQLite the rename runs with `legacy_alter_table` on. Otherwise the
//! rename re-resolves every view and trigger of the schema, and one
//! selecting from the dropped table aborts it.

use std::marker::PhantomData;

use tracing::{debug, warn};

use super::column::{
    validate_add_auto_increment, validate_add_default_value,
    validate_drop_column, validate_drop_default_value, validate_modify_data_type,
    validate_set_nullable,
};
use super::constraint::{
    validate_add_foreign_key, validate_add_primary_key, validate_add_unique_constraint,
    validate_drop_foreign_key, validate_drop_primary_key, validate_drop_unique_constraint,
};
use super::{Priority, SqlGenerator, SqlGeneratorRegistry};
use crate::database::{Capability, Database, DatabaseKind};
use crate::error::{KeelError, Result};
use crate::snapshot::{ObjectData, Snapshot};
use crate::sql::Sql;
use crate::statement::{
    AddAutoIncrementStatement, AddColumnStatement, AddDefaultValueStatement,
    AddForeignKeyConstraintStatement, AddPrimaryKeyStatement, AddUniqueConstraintStatement,
    ColumnDef, CopyRowsStatement, CreateIndexStatement, CreateTableStatement,
    DropColumnStatement, DropDefaultValueStatement, DropForeignKeyConstraintStatement,
    DropPrimaryKeyStatement, DropTableStatement, DropUniqueConstraintStatement, ForeignKeyDef, ModifyDataTypeStatement, PrimaryKeyDef, RenameTableStatement,
    SetNullableStatement, Statement, UniqueDef,
};
use crate::validation::ValidationErrors;

/// Suffix of the temporary table a rebuild copies into.
pub const REBUILD_TABLE_SUFFIX: &str = "_keel_tmp";

/// Prefix of the indexes SQLite creates for inline constraints.
const SQLITE_AUTOINDEX_PREFIX: &str = "sqlite_autoindex_";

/// Structure of a table as the rebuild sees it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableShape {
    /// Columns in declaration order.
    pub columns: Vec<ColumnDef>,
    /// Table-level primary key.
    pub primary_key: Option<PrimaryKeyDef>,
    /// Unique constraints.
    pub unique_constraints: Vec<UniqueDef>,
    /// Foreign keys.
    pub foreign_keys: Vec<ForeignKeyDef>,
    /// Explicit indexes, recreated after the rebuild.
    pub indexes: Vec<CreateIndexStatement>,
}

impl TableShape {
    /// Reads a table's shape from a snapshot. Returns `None` if the table is
    /// not in it.
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot, schema: Option<&str>, table: &str) -> Option<Self> {
        let id = snapshot.find_table(schema, table)?;
        let columns = snapshot
            .columns_of(id)
            .into_iter()
            .map(|c| ColumnDef {
                name: c.name.clone(),
                data_type: Some(c.data_type.clone()),
                nullable: c.nullable,
                default_value: c.default_value.clone(),
                auto_increment: c.auto_increment,
                remarks: c.remarks.clone(),
                ..ColumnDef::default()
            })
            .collect();

        let mut shape = Self {
            columns,
            ..Self::default()
        };
        for object in snapshot.children(id) {
            match &object.data {
                ObjectData::PrimaryKey(pk) => {
                    shape.primary_key = Some(PrimaryKeyDef {
                        name: pk.name.clone(),
                        columns: pk.columns.clone(),
                        tablespace: None,
                    });
                }
                ObjectData::UniqueConstraint(uc) => shape.unique_constraints.push(UniqueDef {
                    name: uc.name.clone(),
                    columns: uc.columns.clone(),
                }),
                ObjectData::ForeignKey(fk) => shape.foreign_keys.push(ForeignKeyDef {
                    name: fk.name.clone(),
                    columns: fk.columns.clone(),
                    referenced_schema: fk.referenced_schema.clone(),
                    referenced_table: fk.referenced_table.clone(),
                    referenced_columns: fk.referenced_columns.clone(),
                    on_delete: fk.on_delete,
                    on_update: fk.on_update,
                }),
                ObjectData::Index(index)
                    if !snapshot.is_backing_index(object.id)
                        && !index.name.starts_with(SQLITE_AUTOINDEX_PREFIX) =>
                {
                    shape.indexes.push(CreateIndexStatement {
                        schema: schema.map(ToString::to_string),
                        table: table.to_string(),
                        index_name: index.name.clone(),
                        columns: index.columns.clone(),
                        unique: index.unique,
                        tablespace: None,
                        if_not_exists: false,
                    });
                }
                _ => {}
            }
        }
        Some(shape)
    }

    /// Finds a column by name, ignoring case.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnDef> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Removes every key, constraint and index that covers a dropped column.
    fn forget_columns(&mut self, dropped: &[String]) {
        if dropped.is_empty() {
            return;
        }
        let touches = |columns: &[String]| {
            columns
                .iter()
                .any(|c| dropped.iter().any(|d| d.eq_ignore_ascii_case(c)))
        };
        if self
            .primary_key
            .as_ref()
            .is_some_and(|pk| touches(&pk.columns))
        {
            self.primary_key = None;
        }
        self.unique_constraints.retain(|uc| !touches(&uc.columns));
        self.foreign_keys.retain(|fk| !touches(&fk.columns));
        self.indexes.retain(|ix| !touches(&ix.columns));
    }

    fn create_table(&self, schema: Option<&str>, name: &str) -> CreateTableStatement {
        CreateTableStatement {
            schema: schema.map(ToString::to_string),
            table: name.to_string(),
            columns: self.columns.clone(),
            primary_key: self.primary_key.clone(),
            unique_constraints: self.unique_constraints.clone(),
            foreign_keys: self.foreign_keys.clone(),
            ..CreateTableStatement::default()
        }
    }
}

/// What happens to an existing column during a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnDecision {
    /// Keep the column and its data unchanged.
    Copy,
    /// Keep the data under a new definition.
    Recreate(ColumnDef),
    /// Drop the column and its data.
    Skip,
}

/// A statement that can be applied by rebuilding its table.
pub trait Rebuild: Statement {
    /// Schema of the rebuilt table.
    fn schema(&self) -> Option<&str>;

    /// Name of the rebuilt table.
    fn table(&self) -> &str;

    /// Checks the statement.
    fn validate(&self, database: &dyn Database) -> ValidationErrors;

    /// Returns `false` when the statement can run without a rebuild.
    fn needs_rebuild(&self) -> bool {
        true
    }

    /// Decides what to do with one existing column.
    fn visit_column(&self, _column: &ColumnDef) -> ColumnDecision {
        ColumnDecision::Copy
    }

    /// Columns appended to the new table. Their data is not copied.
    fn added_columns(&self) -> Vec<ColumnDef> {
        Vec::new()
    }

    /// Final edits to keys and constraints.
    fn alter_shape(&self, _shape: &mut TableShape) {}
}

/// Applies a [`Rebuild`] statement on backends without
/// [`Capability::AlterColumn`].
pub struct SqliteRebuildGenerator<S> {
    name: String,
    statement: PhantomData<fn() -> S>,
}

impl<S: Rebuild> SqliteRebuildGenerator<S> {
    /// Creates the generator, named after the statement type.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: format!("Sqlite{}Generator", S::TYPE),
            statement: PhantomData,
        }
    }
}

impl<S: Rebuild> Default for SqliteRebuildGenerator<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Rebuild> SqlGenerator for SqliteRebuildGenerator<S> {
    type Statement = S;

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> Priority {
        Priority::Database
    }

    fn supports(&self, statement: &S, database: &dyn Database) -> bool {
        !database.supports(Capability::AlterColumn) && statement.needs_rebuild()
    }

    fn validate(&self, statement: &S, database: &dyn Database) -> ValidationErrors {
        statement.validate(database)
    }

    fn generate_sql(
        &self,
        statement: &S,
        database: &dyn Database,
        registry: &SqlGeneratorRegistry,
    ) -> Result<Vec<Sql>> {
        rebuild(statement, database, registry)
    }
}

fn rebuild<S: Rebuild>(
    statement: &S,
    database: &dyn Database,
    registry: &SqlGeneratorRegistry,
) -> Result<Vec<Sql>> {
    let schema = statement.schema();
    let table = statement.table();
    let current = database
        .snapshot()
        .and_then(|snapshot| TableShape::from_snapshot(snapshot, schema, table))
        .ok_or_else(|| KeelError::MissingTableShape {
            table: table.to_string(),
        })?;

    let mut columns = Vec::with_capacity(current.columns.len());
    let mut copied = Vec::new();
    let mut dropped = Vec::new();
    for column in &current.columns {
        match statement.visit_column(column) {
            ColumnDecision::Copy => {
                copied.push(column.name.clone());
                columns.push(column.clone());
            }
            ColumnDecision::Recreate(definition) => {
                copied.push(column.name.clone());
                columns.push(definition);
            }
            ColumnDecision::Skip => dropped.push(column.name.clone()),
        }
    }
    columns.extend(statement.added_columns());

    let mut shape = TableShape { columns, ..current };
    shape.forget_columns(&dropped);
    statement.alter_shape(&mut shape);

    let temp = format!("{table}{REBUILD_TABLE_SUFFIX}");
    let statement_type = S::TYPE;
    debug!(
        table = %table,
        statement = %statement_type,
        copied = copied.len(),
        dropped = dropped.len(),
        "Rebuilding table"
    );

    let mut sql = registry.generate(shape.create_table(schema, &temp), database)?;
    sql.extend(registry.generate(
        CopyRowsStatement {
            schema: schema.map(ToString::to_string),
            source_table: table.to_string(),
            target_table: temp.clone(),
            columns: copied,
        },
        database,
    )?);
    sql.extend(registry.generate(
        DropTableStatement {
            schema: schema.map(ToString::to_string),
            ..DropTableStatement::new(table)
        },
        database,
    )?);
    let legacy_rename = database.kind() == DatabaseKind::Sqlite;
    if legacy_rename {
        sql.push(Sql::new("PRAGMA legacy_alter_table = ON"));
    }
    sql.extend(registry.generate(
        RenameTableStatement {
            schema: schema.map(ToString::to_string),
            ..RenameTableStatement::new(temp, table)
        },
        database,
    )?);
    if legacy_rename {
        sql.push(Sql::new("PRAGMA legacy_alter_table = OFF"));
    }
    for index in shape.indexes {
        sql.extend(registry.generate(index, database)?);
    }
    Ok(sql)
}

fn same(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Recreates the named column with `edit` applied.
fn recreate(column: &ColumnDef, name: &str, edit: impl FnOnce(&mut ColumnDef)) -> ColumnDecision {
    if same(&column.name, name) {
        let mut definition = column.clone();
        edit(&mut definition);
        ColumnDecision::Recreate(definition)
    } else {
        ColumnDecision::Copy
    }
}

impl Rebuild for ModifyDataTypeStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_modify_data_type(self)
    }

    fn visit_column(&self, column: &ColumnDef) -> ColumnDecision {
        recreate(column, &self.column, |c| {
            c.data_type.clone_from(&self.new_data_type);
        })
    }
}

impl Rebuild for DropColumnStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_drop_column(self)
    }

    fn visit_column(&self, column: &ColumnDef) -> ColumnDecision {
        if same(&column.name, &self.column) {
            ColumnDecision::Skip
        } else {
            ColumnDecision::Copy
        }
    }
}

impl Rebuild for SetNullableStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_set_nullable(self)
    }

    fn visit_column(&self, column: &ColumnDef) -> ColumnDecision {
        recreate(column, &self.column, |c| c.nullable = self.nullable)
    }
}

impl Rebuild for AddDefaultValueStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_add_default_value(self)
    }

    fn visit_column(&self, column: &ColumnDef) -> ColumnDecision {
        recreate(column, &self.column, |c| {
            c.default_value.clone_from(&self.value);
        })
    }
}

impl Rebuild for DropDefaultValueStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_drop_default_value(self)
    }

    fn visit_column(&self, column: &ColumnDef) -> ColumnDecision {
        recreate(column, &self.column, |c| c.default_value = None)
    }
}

impl Rebuild for AddAutoIncrementStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_add_auto_increment(self)
    }

    fn visit_column(&self, column: &ColumnDef) -> ColumnDecision {
        recreate(column, &self.column, |c| {
            if self.data_type.is_some() {
                c.data_type.clone_from(&self.data_type);
            }
            c.auto_increment = Some(self.auto_increment);
            c.default_value = None;
            c.nullable = false;
        })
    }

    fn alter_shape(&self, shape: &mut TableShape) {
        if shape.primary_key.is_none() {
            shape.primary_key = Some(PrimaryKeyDef {
                columns: vec![self.column.clone()],
                ..PrimaryKeyDef::default()
            });
        }
    }
}

impl Rebuild for AddColumnStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        // the rebuild can add key columns, so the capability check does not
        // apply
        let mut errors = ValidationErrors::new();
        errors.check_required_field("tableName", &self.table);
        super::table::validate_column(&self.column, &mut errors);
        errors
    }

    /// Plain `ADD COLUMN` works unless the column carries a key.
    fn needs_rebuild(&self) -> bool {
        self.column.primary_key || self.column.unique
    }

    fn added_columns(&self) -> Vec<ColumnDef> {
        vec![self.column.clone()]
    }

    fn alter_shape(&self, shape: &mut TableShape) {
        if self.column.primary_key {
            let primary_key = shape.primary_key.get_or_insert_with(PrimaryKeyDef::default);
            primary_key.columns.push(self.column.name.clone());
        }
    }
}

impl Rebuild for AddPrimaryKeyStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_add_primary_key(self)
    }

    fn visit_column(&self, column: &ColumnDef) -> ColumnDecision {
        if self.columns.iter().any(|c| same(c, &column.name)) {
            recreate(column, &column.name, |c| c.nullable = false)
        } else {
            ColumnDecision::Copy
        }
    }

    fn alter_shape(&self, shape: &mut TableShape) {
        shape.primary_key = Some(PrimaryKeyDef {
            name: self.constraint_name.clone(),
            columns: self.columns.clone(),
            tablespace: None,
        });
    }
}

impl Rebuild for DropPrimaryKeyStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_drop_primary_key(self)
    }

    fn alter_shape(&self, shape: &mut TableShape) {
        let Some(primary_key) = shape.primary_key.take() else {
            warn!(table = %self.table, "Table has no primary key to drop");
            return;
        };
        // AUTOINCREMENT is only legal on the primary key
        for name in &primary_key.columns {
            if let Some(column) = shape.column_mut(name) {
                column.auto_increment = None;
            }
        }
    }
}

impl Rebuild for AddForeignKeyConstraintStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_add_foreign_key(self)
    }

    fn alter_shape(&self, shape: &mut TableShape) {
        shape.foreign_keys.push(ForeignKeyDef {
            name: Some(self.constraint_name.clone()),
            columns: self.columns.clone(),
            referenced_schema: self.referenced_schema.clone(),
            referenced_table: self.referenced_table.clone(),
            referenced_columns: self.referenced_columns.clone(),
            on_delete: self.on_delete,
            on_update: self.on_update,
        });
    }
}

impl Rebuild for DropForeignKeyConstraintStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_drop_foreign_key(self)
    }

    fn alter_shape(&self, shape: &mut TableShape) {
        let before = shape.foreign_keys.len();
        shape.foreign_keys.retain(|fk| {
            !fk.name
                .as_deref()
                .is_some_and(|name| same(name, &self.constraint_name))
        });
        if shape.foreign_keys.len() == before {
            warn!(
                table = %self.table,
                constraint = %self.constraint_name,
                "Foreign key not found, table is rebuilt unchanged"
            );
        }
    }
}

impl Rebuild for AddUniqueConstraintStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_add_unique_constraint(self)
    }

    fn alter_shape(&self, shape: &mut TableShape) {
        shape.unique_constraints.push(UniqueDef {
            name: self.constraint_name.clone(),
            columns: self.columns.clone(),
        });
    }
}

impl Rebuild for DropUniqueConstraintStatement {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self, _database: &dyn Database) -> ValidationErrors {
        validate_drop_unique_constraint(self)
    }

    /// Also drops a unique index of that name, the form older tools leave
    /// behind for unique constraints.
    fn alter_shape(&self, shape: &mut TableShape) {
        let before = shape.unique_constraints.len() + shape.indexes.len();
        shape.unique_constraints.retain(|uc| {
            !uc.name
                .as_deref()
                .is_some_and(|name| same(name, &self.constraint_name))
        });
        shape
            .indexes
            .retain(|ix| !(ix.unique && same(&ix.index_name, &self.constraint_name)));
        if shape.unique_constraints.len() + shape.indexes.len() == before {
            warn!(
                table = %self.table,
                constraint = %self.constraint_name,
                "Unique constraint not found, table is rebuilt unchanged"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::database::SqliteDatabase;
    use crate::datatype::DataType;
    use crate::snapshot::{Column, ForeignKey, Index, PrimaryKey, Table};
    use crate::sqlgen::build_default_registry;

    fn users() -> SqliteDatabase {
        let mut snapshot = Snapshot::new();
        let users = snapshot.add_table(Table::new("users"));
        snapshot.add_column(users, Column::new("id", DataType::Int).not_null().auto_increment());
        snapshot.add_column(users, Column::new("email", DataType::Varchar(Some(255))).not_null());
        snapshot.add_column(users, Column::new("age", DataType::Int));
        snapshot.add_column(users, Column::new("team_id", DataType::Int));
        snapshot.add_primary_key(users, PrimaryKey::new(["id"]));
        snapshot.add_foreign_key(
            users,
            ForeignKey::new(["team_id"], "teams", ["id"]).named("fk_users_team"),
        );
        snapshot.add_index(users, Index::new("ix_users_age", ["age"]));
        snapshot.add_index(users, Index::new("sqlite_autoindex_users_1", ["email"]).unique());
        SqliteDatabase::new().with_snapshot(snapshot)
    }

    fn texts(sql: &[Sql]) -> Vec<&str> {
        sql.iter().map(Sql::text).collect()
    }

    #[test]
    fn retype_rebuilds_table() {
        let sql = build_default_registry()
            .generate(
                ModifyDataTypeStatement::new("users", "age", DataType::BigInt),
                &users(),
            )
            .unwrap();
        assert_eq!(
            texts(&sql),
            [
                "CREATE TABLE users_keel_tmp (id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT, \
                 email VARCHAR(255) NOT NULL, age BIGINT, team_id INTEGER, \
                 CONSTRAINT fk_users_team FOREIGN KEY (team_id) REFERENCES teams (id))",
                "INSERT INTO users_keel_tmp (id, email, age, team_id) \
                 SELECT id, email, age, team_id FROM users",
                "DROP TABLE users",
                "PRAGMA legacy_alter_table = ON",
                "ALTER TABLE users_keel_tmp RENAME TO users",
                "PRAGMA legacy_alter_table = OFF",
                "CREATE INDEX ix_users_age ON users (age)",
            ]
        );
    }

    #[test]
    fn dropped_column_takes_its_index_and_key_along() {
        let registry = build_default_registry();
        let sql = registry
            .generate(DropColumnStatement::new("users", "age"), &users())
            .unwrap();
        assert_eq!(sql.len(), 6);
        assert!(!sql[0].text().contains("age"));
        assert_eq!(
            sql[1].text(),
            "INSERT INTO users_keel_tmp (id, email, team_id) SELECT id, email, team_id FROM users"
        );

        let sql = registry
            .generate(DropColumnStatement::new("users", "team_id"), &users())
            .unwrap();
        assert!(!sql[0].text().contains("FOREIGN KEY"));
    }

    #[test]
    fn drop_foreign_key_by_name() {
        let statement = DropForeignKeyConstraintStatement {
            table: "users".into(),
            constraint_name: "FK_USERS_TEAM".into(),
            ..Default::default()
        };
        let sql = build_default_registry().generate(statement, &users()).unwrap();
        assert_eq!(
            sql[0].text(),
            "CREATE TABLE users_keel_tmp (id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT, \
             email VARCHAR(255) NOT NULL, age INTEGER, team_id INTEGER)"
        );
    }

    #[test]
    fn unique_column_is_added_by_rebuild() {
        let registry = build_default_registry();
        let unique = AddColumnStatement::new(
            "users",
            ColumnDef::new("handle", DataType::Varchar(Some(40))).unique(),
        );
        let sql = registry.generate(unique, &users()).unwrap();
        assert!(sql[0].text().contains("handle VARCHAR(40) UNIQUE"));
        assert!(sql[1].text().starts_with("INSERT INTO users_keel_tmp (id, email, age, team_id)"));

        // plain columns keep using ALTER TABLE .. ADD
        let plain = AddColumnStatement::new("users", ColumnDef::new("bio", DataType::Text));
        let sql = registry.generate(plain, &users()).unwrap();
        assert_eq!(texts(&sql), ["ALTER TABLE users ADD bio TEXT"]);
    }

    #[test]
    fn unique_constraint_is_added_and_dropped_by_rebuild() {
        let registry = build_default_registry();
        let add = AddUniqueConstraintStatement {
            table: "users".into(),
            columns: vec!["email".into()],
            constraint_name: Some("uq_users_email".into()),
            ..Default::default()
        };
        let sql = registry.generate(add, &users()).unwrap();
        assert_eq!(
            sql[0].text(),
            "CREATE TABLE users_keel_tmp (id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT, \
             email VARCHAR(255) NOT NULL, age INTEGER, team_id INTEGER, \
             CONSTRAINT uq_users_email UNIQUE (email), \
             CONSTRAINT fk_users_team FOREIGN KEY (team_id) REFERENCES teams (id))"
        );

        let mut snapshot = users().snapshot().cloned().unwrap();
        let table = snapshot.find_table(None, "users").unwrap();
        snapshot.add_index(table, Index::new("uq_users_age", ["age"]).unique());
        let drop = DropUniqueConstraintStatement {
            table: "users".into(),
            constraint_name: "UQ_USERS_AGE".into(),
            ..Default::default()
        };
        let sql = registry
            .generate(drop, &SqliteDatabase::new().with_snapshot(snapshot))
            .unwrap();
        let rendered = texts(&sql);
        assert!(!rendered.iter().any(|s| s.contains("uq_users_age")));
        assert_eq!(rendered.last().copied(), Some("CREATE INDEX ix_users_age ON users (age)"));
    }

    #[test]
    fn rebuild_needs_the_table_shape() {
        let err = build_default_registry()
            .generate(
                ModifyDataTypeStatement::new("missing", "a", DataType::Int),
                &SqliteDatabase::new(),
            )
            .unwrap_err();
        assert!(matches!(err, KeelError::MissingTableShape { table } if table == "missing"));
    }

    #[test]
    fn generator_names_follow_statement() {
        let generator = SqliteRebuildGenerator::<SetNullableStatement>::new();
        assert_eq!(SqlGenerator::name(&generator), "SqliteSetNullableGenerator");
    }
}
