//! In-memory schema snapshots.
//!
//! A [`Snapshot`] is an arena of [`DatabaseObject`]s addressed by
//! [`ObjectId`]. Containment (schema owns table, table owns column) is a
//! tree stored as a parent id on each object. Cross references such as a
//! primary key's backing index or a foreign key's referenced table are
//! plain ids or names, never ownership.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datatype::{DataType, LiteralValue};

/// Stable id of an object inside one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

/// Kinds of database objects, declared in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    /// Catalog (database).
    Catalog,
    /// Schema inside a catalog.
    Schema,
    /// Sequence.
    Sequence,
    /// Base table.
    Table,
    /// View.
    View,
    /// Column of a table or view.
    Column,
    /// Primary key of a table.
    PrimaryKey,
    /// Unique constraint of a table.
    UniqueConstraint,
    /// Foreign key of a table.
    ForeignKey,
    /// Index of a table.
    Index,
}

impl ObjectType {
    /// Every object type in dependency order.
    pub const ALL: [Self; 10] = [
        Self::Catalog,
        Self::Schema,
        Self::Sequence,
        Self::Table,
        Self::View,
        Self::Column,
        Self::PrimaryKey,
        Self::UniqueConstraint,
        Self::ForeignKey,
        Self::Index,
    ];

    /// Returns the type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Catalog => "Catalog",
            Self::Schema => "Schema",
            Self::Sequence => "Sequence",
            Self::Table => "Table",
            Self::View => "View",
            Self::Column => "Column",
            Self::PrimaryKey => "PrimaryKey",
            Self::UniqueConstraint => "UniqueConstraint",
            Self::ForeignKey => "ForeignKey",
            Self::Index => "Index",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Referential action of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForeignKeyAction {
    /// `CASCADE`.
    Cascade,
    /// `SET NULL`.
    SetNull,
    /// `SET DEFAULT`.
    SetDefault,
    /// `RESTRICT`.
    Restrict,
    /// `NO ACTION`.
    NoAction,
}

impl ForeignKeyAction {
    /// Returns the SQL keyword(s).
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }

    /// Parses the SQL keyword(s), case-insensitively.
    #[must_use]
    pub fn from_sql(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            "RESTRICT" => Some(Self::Restrict),
            "NO ACTION" => Some(Self::NoAction),
            _ => None,
        }
    }
}

/// Auto-increment settings of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AutoIncrement {
    /// First generated value.
    pub start_with: Option<i64>,
    /// Step between generated values.
    pub increment_by: Option<i64>,
}

/// A schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Schema name; empty for the backend's default schema.
    pub name: String,
}

/// A base table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Table comment.
    pub remarks: Option<String>,
}

impl Table {
    /// Creates a table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remarks: None,
        }
    }

    /// Sets the table comment.
    #[must_use]
    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

/// A view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// View name.
    pub name: String,
    /// The `SELECT` the view is defined by.
    pub definition: String,
}

impl View {
    /// Creates a view.
    #[must_use]
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }
}

/// A sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sequence {
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
    /// Whether values are generated in request order.
    pub ordered: Option<bool>,
    /// Whether the sequence wraps around.
    pub cycle: Option<bool>,
}

impl Sequence {
    /// Creates a sequence with backend defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the step.
    #[must_use]
    pub const fn increment_by(mut self, by: i64) -> Self {
        self.increment_by = Some(by);
        self
    }

    /// Sets the first value.
    #[must_use]
    pub const fn start_value(mut self, start: i64) -> Self {
        self.start_value = Some(start);
        self
    }

    /// Sets the upper bound.
    #[must_use]
    pub const fn max_value(mut self, max: i64) -> Self {
        self.max_value = Some(max);
        self
    }

    /// Sets request-order generation.
    #[must_use]
    pub const fn ordered(mut self, ordered: bool) -> Self {
        self.ordered = Some(ordered);
        self
    }
}

/// A column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Logical type.
    pub data_type: DataType,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Default value.
    pub default_value: Option<LiteralValue>,
    /// Auto-increment settings; `None` if the column does not auto-increment.
    pub auto_increment: Option<AutoIncrement>,
    /// Column comment.
    pub remarks: Option<String>,
}

impl Column {
    /// Creates a nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            default_value: None,
            auto_increment: None,
            remarks: None,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: LiteralValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Marks the column auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = Some(AutoIncrement::default());
        self
    }
}

/// An index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Indexed columns in order.
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

impl Index {
    /// Creates a non-unique index.
    #[must_use]
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Marks the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    /// Constraint name, if the backend reports one.
    pub name: Option<String>,
    /// Key columns in order.
    pub columns: Vec<String>,
    /// Index that enforces the key.
    pub backing_index: Option<ObjectId>,
}

impl PrimaryKey {
    /// Creates a primary key.
    #[must_use]
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            backing_index: None,
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Links the backing index.
    #[must_use]
    pub const fn backed_by(mut self, index: ObjectId) -> Self {
        self.backing_index = Some(index);
        self
    }
}

/// A unique constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    /// Constraint name, if any.
    pub name: Option<String>,
    /// Constrained columns in order.
    pub columns: Vec<String>,
    /// Index that enforces the constraint.
    pub backing_index: Option<ObjectId>,
}

impl UniqueConstraint {
    /// Creates a unique constraint.
    #[must_use]
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            backing_index: None,
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Links the backing index.
    #[must_use]
    pub const fn backed_by(mut self, index: ObjectId) -> Self {
        self.backing_index = Some(index);
        self
    }
}

/// A foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Constraint name, if any.
    pub name: Option<String>,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Schema of the referenced table.
    pub referenced_schema: Option<String>,
    /// Referenced table name (a named link, not an id).
    pub referenced_table: String,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
    /// `ON DELETE` action.
    pub on_delete: Option<ForeignKeyAction>,
    /// `ON UPDATE` action.
    pub on_update: Option<ForeignKeyAction>,
    /// Index that supports the key, if the backend creates one.
    pub backing_index: Option<ObjectId>,
}

impl ForeignKey {
    /// Creates a foreign key.
    #[must_use]
    pub fn new<S: Into<String>, R: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        referenced_table: impl Into<String>,
        referenced_columns: impl IntoIterator<Item = R>,
    ) -> Self {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            referenced_schema: None,
            referenced_table: referenced_table.into(),
            referenced_columns: referenced_columns.into_iter().map(Into::into).collect(),
            on_delete: None,
            on_update: None,
            backing_index: None,
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the `ON DELETE` action.
    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Links the backing index.
    #[must_use]
    pub const fn backed_by(mut self, index: ObjectId) -> Self {
        self.backing_index = Some(index);
        self
    }
}

/// Type-specific payload of a snapshot object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectData {
    /// Catalog, carrying its name.
    Catalog(String),
    /// Schema.
    Schema(Schema),
    /// Sequence.
    Sequence(Sequence),
    /// Table.
    Table(Table),
    /// View.
    View(View),
    /// Column.
    Column(Column),
    /// Primary key.
    PrimaryKey(PrimaryKey),
    /// Unique constraint.
    UniqueConstraint(UniqueConstraint),
    /// Foreign key.
    ForeignKey(ForeignKey),
    /// Index.
    Index(Index),
}

/// One node of the snapshot arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseObject {
    /// Id of this object.
    pub id: ObjectId,
    /// Id of the owning object; `None` only for the catalog.
    pub container: Option<ObjectId>,
    /// Type-specific attributes.
    pub data: ObjectData,
}

impl DatabaseObject {
    /// Returns the object type.
    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        match self.data {
            ObjectData::Catalog(_) => ObjectType::Catalog,
            ObjectData::Schema(_) => ObjectType::Schema,
            ObjectData::Sequence(_) => ObjectType::Sequence,
            ObjectData::Table(_) => ObjectType::Table,
            ObjectData::View(_) => ObjectType::View,
            ObjectData::Column(_) => ObjectType::Column,
            ObjectData::PrimaryKey(_) => ObjectType::PrimaryKey,
            ObjectData::UniqueConstraint(_) => ObjectType::UniqueConstraint,
            ObjectData::ForeignKey(_) => ObjectType::ForeignKey,
            ObjectData::Index(_) => ObjectType::Index,
        }
    }

    /// Returns the object's name. Unnamed constraints return an empty
    /// string.
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.data {
            ObjectData::Catalog(name) => name,
            ObjectData::Schema(s) => &s.name,
            ObjectData::Sequence(s) => &s.name,
            ObjectData::Table(t) => &t.name,
            ObjectData::View(v) => &v.name,
            ObjectData::Column(c) => &c.name,
            ObjectData::Index(i) => &i.name,
            ObjectData::PrimaryKey(pk) => pk.name.as_deref().unwrap_or(""),
            ObjectData::UniqueConstraint(uc) => uc.name.as_deref().unwrap_or(""),
            ObjectData::ForeignKey(fk) => fk.name.as_deref().unwrap_or(""),
        }
    }

    /// Returns the column list of an index or constraint.
    #[must_use]
    pub fn columns(&self) -> Option<&[String]> {
        match &self.data {
            ObjectData::Index(i) => Some(&i.columns),
            ObjectData::PrimaryKey(pk) => Some(&pk.columns),
            ObjectData::UniqueConstraint(uc) => Some(&uc.columns),
            ObjectData::ForeignKey(fk) => Some(&fk.columns),
            _ => None,
        }
    }

    /// Returns the backing index link of a constraint.
    #[must_use]
    pub const fn backing_index(&self) -> Option<ObjectId> {
        match &self.data {
            ObjectData::PrimaryKey(pk) => pk.backing_index,
            ObjectData::UniqueConstraint(uc) => uc.backing_index,
            ObjectData::ForeignKey(fk) => fk.backing_index,
            _ => None,
        }
    }
}

/// Schema-qualified, optionally case-folded identity used to match
/// objects across snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Object type.
    pub object_type: ObjectType,
    /// Schema name; empty for the default schema.
    pub schema: String,
    /// Owning table or view; empty for schema-level objects.
    pub relation: String,
    /// Object name, or the column list for unnamed constraints.
    pub name: String,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.object_type)?;
        if !self.schema.is_empty() {
            write!(f, "{}.", self.schema)?;
        }
        if !self.relation.is_empty() {
            write!(f, "{}.", self.relation)?;
        }
        write!(f, "{}", self.name)
    }
}

/// Captured structure of a database at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    objects: Vec<DatabaseObject>,
    default_schema: ObjectId,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshot {
    /// Creates a snapshot holding one unnamed catalog with one unnamed
    /// default schema.
    #[must_use]
    pub fn new() -> Self {
        let mut snapshot = Self {
            objects: Vec::new(),
            default_schema: ObjectId(0),
        };
        let catalog = snapshot.push(None, ObjectData::Catalog(String::new()));
        snapshot.default_schema = snapshot.push(
            Some(catalog),
            ObjectData::Schema(Schema {
                name: String::new(),
            }),
        );
        snapshot
    }

    /// Creates a snapshot whose default schema has a name.
    #[must_use]
    pub fn with_default_schema(name: impl Into<String>) -> Self {
        let mut snapshot = Self::new();
        let schema = snapshot.default_schema;
        snapshot.objects[schema.0].data = ObjectData::Schema(Schema { name: name.into() });
        snapshot
    }

    fn push(&mut self, container: Option<ObjectId>, data: ObjectData) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(DatabaseObject {
            id,
            container,
            data,
        });
        id
    }

    /// Returns the default schema.
    #[must_use]
    pub const fn default_schema(&self) -> ObjectId {
        self.default_schema
    }

    /// Adds a named schema to the catalog.
    pub fn add_schema(&mut self, name: impl Into<String>) -> ObjectId {
        let catalog = self.objects[self.default_schema.0].container;
        self.push(catalog, ObjectData::Schema(Schema { name: name.into() }))
    }

    /// Adds a table to the default schema.
    pub fn add_table(&mut self, table: Table) -> ObjectId {
        self.push(Some(self.default_schema), ObjectData::Table(table))
    }

    /// Adds a table to a specific schema.
    pub fn add_table_in(&mut self, schema: ObjectId, table: Table) -> ObjectId {
        self.push(Some(schema), ObjectData::Table(table))
    }

    /// Adds a view to the default schema.
    pub fn add_view(&mut self, view: View) -> ObjectId {
        self.push(Some(self.default_schema), ObjectData::View(view))
    }

    /// Adds a sequence to the default schema.
    pub fn add_sequence(&mut self, sequence: Sequence) -> ObjectId {
        self.push(Some(self.default_schema), ObjectData::Sequence(sequence))
    }

    /// Adds a column to a table or view.
    pub fn add_column(&mut self, relation: ObjectId, column: Column) -> ObjectId {
        self.push(Some(relation), ObjectData::Column(column))
    }

    /// Adds an index to a table.
    pub fn add_index(&mut self, table: ObjectId, index: Index) -> ObjectId {
        self.push(Some(table), ObjectData::Index(index))
    }

    /// Adds a primary key to a table.
    pub fn add_primary_key(&mut self, table: ObjectId, primary_key: PrimaryKey) -> ObjectId {
        self.push(Some(table), ObjectData::PrimaryKey(primary_key))
    }

    /// Adds a unique constraint to a table.
    pub fn add_unique_constraint(&mut self, table: ObjectId, constraint: UniqueConstraint) -> ObjectId {
        self.push(Some(table), ObjectData::UniqueConstraint(constraint))
    }

    /// Adds a foreign key to a table.
    pub fn add_foreign_key(&mut self, table: ObjectId, foreign_key: ForeignKey) -> ObjectId {
        self.push(Some(table), ObjectData::ForeignKey(foreign_key))
    }

    /// Looks up an object by id.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&DatabaseObject> {
        self.objects.get(id.0)
    }

    /// Iterates over every object in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = &DatabaseObject> {
        self.objects.iter()
    }

    /// Iterates over the objects of one type.
    pub fn objects_of(&self, object_type: ObjectType) -> impl Iterator<Item = &DatabaseObject> {
        self.objects
            .iter()
            .filter(move |o| o.object_type() == object_type)
    }

    /// Iterates over the direct children of an object.
    pub fn children(&self, container: ObjectId) -> impl Iterator<Item = &DatabaseObject> {
        self.objects
            .iter()
            .filter(move |o| o.container == Some(container))
    }

    /// Returns the owning object.
    #[must_use]
    pub fn container(&self, id: ObjectId) -> Option<&DatabaseObject> {
        self.get(id)?.container.and_then(|c| self.get(c))
    }

    /// Returns the table or view that owns a column, index or constraint.
    #[must_use]
    pub fn relation_of(&self, id: ObjectId) -> Option<&DatabaseObject> {
        let container = self.container(id)?;
        matches!(container.object_type(), ObjectType::Table | ObjectType::View).then_some(container)
    }

    /// Returns the name of the schema an object lives in; empty for the
    /// default unnamed schema.
    #[must_use]
    pub fn schema_name(&self, id: ObjectId) -> &str {
        let mut current = self.get(id);
        while let Some(object) = current {
            if let ObjectData::Schema(schema) = &object.data {
                return &schema.name;
            }
            current = object.container.and_then(|c| self.get(c));
        }
        ""
    }

    /// Returns the schema name as an `Option`, `None` for the default
    /// unnamed schema.
    #[must_use]
    pub fn schema_option(&self, id: ObjectId) -> Option<String> {
        let name = self.schema_name(id);
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Finds a table by name, ignoring case.
    #[must_use]
    pub fn find_table(&self, schema: Option<&str>, name: &str) -> Option<ObjectId> {
        self.objects_of(ObjectType::Table)
            .find(|t| {
                t.name().eq_ignore_ascii_case(name)
                    && schema.is_none_or(|s| self.schema_name(t.id).eq_ignore_ascii_case(s))
            })
            .map(|t| t.id)
    }

    /// Returns the columns of a table or view in declaration order.
    #[must_use]
    pub fn columns_of(&self, relation: ObjectId) -> Vec<&Column> {
        self.children(relation)
            .filter_map(|o| match &o.data {
                ObjectData::Column(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Returns the primary key of a table.
    #[must_use]
    pub fn primary_key_of(&self, table: ObjectId) -> Option<&DatabaseObject> {
        self.children(table)
            .find(|o| o.object_type() == ObjectType::PrimaryKey)
    }

    /// Returns the children of a table with the given type.
    #[must_use]
    pub fn children_of_type(&self, table: ObjectId, object_type: ObjectType) -> Vec<&DatabaseObject> {
        self.children(table)
            .filter(|o| o.object_type() == object_type)
            .collect()
    }

    /// Returns `true` if some constraint of the same table is backed by
    /// this index.
    #[must_use]
    pub fn is_backing_index(&self, index: ObjectId) -> bool {
        self.backing_owner(index).is_some()
    }

    /// Returns the constraint an index backs, if any.
    #[must_use]
    pub fn backing_owner(&self, index: ObjectId) -> Option<&DatabaseObject> {
        self.objects
            .iter()
            .find(|o| o.backing_index() == Some(index))
    }

    /// Computes the matching identity of an object. A backing index is
    /// identified by the type of its constraint and its columns, not by its
    /// name.
    #[must_use]
    pub fn identity(&self, id: ObjectId, case_sensitive: bool) -> Option<ObjectKey> {
        let object = self.get(id)?;
        let fold = |s: &str| {
            if case_sensitive {
                s.to_string()
            } else {
                s.to_ascii_lowercase()
            }
        };
        let object_type = object.object_type();
        let relation = self.relation_of(id).map(|r| fold(r.name())).unwrap_or_default();
        let name = match object_type {
            ObjectType::PrimaryKey => String::new(),
            ObjectType::UniqueConstraint | ObjectType::ForeignKey if object.name().is_empty() => {
                let columns = object.columns().unwrap_or_default();
                fold(&columns.join(","))
            }
            // backing index names are positional on some backends
            ObjectType::Index => match self.backing_owner(id) {
                Some(owner) => {
                    let columns = object.columns().unwrap_or_default();
                    format!("{}({})", owner.object_type(), fold(&columns.join(",")))
                }
                None => fold(object.name()),
            },
            _ => fold(object.name()),
        };
        Some(ObjectKey {
            object_type,
            schema: fold(self.schema_name(id)),
            relation,
            name,
        })
    }
}
