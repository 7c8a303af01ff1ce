//! Diff to changelog.
//!
//! Change generators turn one side of a [`DiffResult`] (a missing,
//! unexpected or changed object) into [`Change`]s. They are registered per
//! `(ObjectType, DiffKind)` in a [`ChangeGeneratorRegistry`] and resolved by
//! priority exactly like SQL generators. Each generator declares which
//! object types it must run after or before; [`DiffToChangeLog`] orders the
//! object types accordingly.
//!
//! Generators share a [`DiffOutputControl`]. A generator that subsumes
//! another object (a table creating its primary key inline, a primary key
//! creating its backing index) marks it handled so the object's own
//! generator skips it.
//!
//! # Example
//!
//! ```rust
//! use keel_core::changelog::{build_default_change_generators, DiffToChangeLog};
//! use keel_core::database::SqliteDatabase;
//! use keel_core::datatype::DataType;
//! use keel_core::diff::{compare, CompareControl};
//! use keel_core::snapshot::{Column, Snapshot, Table};
//!
//! let mut reference = Snapshot::new();
//! let users = reference.add_table(Table::new("users"));
//! reference.add_column(users, Column::new("id", DataType::Int).not_null());
//!
//! let diff = compare(&reference, &Snapshot::new(), &CompareControl::default());
//! let registry = build_default_change_generators();
//! let changes = DiffToChangeLog::new(&registry)
//!     .generate_changes(&diff, &SqliteDatabase::new())
//!     .unwrap();
//! assert_eq!(changes[0].description(), "Create table 'users'");
//! ```

// Declares a unit generator whose behavior lives in a plain function.
macro_rules! change_generator {
    (
        $(#[$doc:meta])*
        $name:ident: $kind:ident $object_type:ident,
        after = [$($after:ident),*],
        before = [$($before:ident),*],
        fix = $fix:path $(,)?
    ) => {
        $(#[$doc])*
        pub struct $name;

        impl $crate::changelog::ChangeGenerator for $name {
            fn name(&self) -> &str {
                stringify!($name)
            }

            fn object_type(&self) -> $crate::snapshot::ObjectType {
                $crate::snapshot::ObjectType::$object_type
            }

            fn kind(&self) -> $crate::changelog::DiffKind {
                $crate::changelog::DiffKind::$kind
            }

            fn run_after(&self) -> &[$crate::snapshot::ObjectType] {
                &[$($crate::snapshot::ObjectType::$after),*]
            }

            fn run_before(&self) -> &[$crate::snapshot::ObjectType] {
                &[$($crate::snapshot::ObjectType::$before),*]
            }

            fn fix(
                &self,
                object: $crate::changelog::DiffObject<'_>,
                diff: &$crate::diff::DiffResult<'_>,
                database: &dyn $crate::database::Database,
                control: &mut $crate::changelog::DiffOutputControl,
            ) -> Vec<$crate::change::Change> {
                $fix(object, diff, database, control)
            }
        }
    };
}

mod changed;
mod missing;
mod registry;
mod unexpected;

pub use registry::ChangeGeneratorRegistry;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::change::Change;
use crate::database::Database;
use crate::diff::{ChangedObject, DiffResult};
use crate::error::Result;
use crate::snapshot::{ObjectId, ObjectKey, ObjectType, Snapshot};
use crate::sqlgen::Priority;

/// Which side of a diff a change generator fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiffKind {
    /// Present in the reference only.
    Missing,
    /// Present in the comparison only.
    Unexpected,
    /// Present in both, with differences.
    Changed,
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "missing",
            Self::Unexpected => "unexpected",
            Self::Changed => "changed",
        })
    }
}

/// The object a change generator is asked to fix.
#[derive(Debug, Clone, Copy)]
pub enum DiffObject<'d> {
    /// Id in the reference snapshot.
    Missing(ObjectId),
    /// Id in the comparison snapshot.
    Unexpected(ObjectId),
    /// Matched pair with its differences.
    Changed(&'d ChangedObject),
}

/// Emits the changes that bring the comparison side in line with the
/// reference side for one object type and diff kind.
pub trait ChangeGenerator: Send + Sync {
    /// Unique name, used for diagnostics and unregistering.
    fn name(&self) -> &str;

    /// Object type this generator fixes.
    fn object_type(&self) -> ObjectType;

    /// Diff kind this generator fixes.
    fn kind(&self) -> DiffKind;

    /// Resolution tier.
    fn priority(&self) -> Priority {
        Priority::Default
    }

    /// Returns whether this generator applies to changelogs for the
    /// database.
    fn supports(&self, _database: &dyn Database) -> bool {
        true
    }

    /// Object types whose generators must run before this one.
    fn run_after(&self) -> &[ObjectType] {
        &[]
    }

    /// Object types whose generators must run after this one.
    fn run_before(&self) -> &[ObjectType] {
        &[]
    }

    /// Emits changes for one object. Returning nothing is normal.
    fn fix(
        &self,
        object: DiffObject<'_>,
        diff: &DiffResult<'_>,
        database: &dyn Database,
        control: &mut DiffOutputControl,
    ) -> Vec<Change>;
}

/// Output options plus the "already handled" side channel.
#[derive(Debug, Clone, Default)]
pub struct DiffOutputControl {
    include_schema: bool,
    handled: HashSet<ObjectKey>,
}

impl DiffOutputControl {
    /// Creates a control that leaves schema names out of the changes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes schema names into the changes.
    #[must_use]
    pub const fn include_schema(mut self, include: bool) -> Self {
        self.include_schema = include;
        self
    }

    /// Returns whether schema names are written.
    #[must_use]
    pub const fn includes_schema(&self) -> bool {
        self.include_schema
    }

    /// Marks an object as covered by a change already emitted.
    pub fn mark_handled(&mut self, key: ObjectKey) {
        self.handled.insert(key);
    }

    /// Marks a snapshot object as handled.
    pub fn mark_object_handled(&mut self, snapshot: &Snapshot, id: ObjectId) {
        if let Some(key) = snapshot.identity(id, false) {
            self.mark_handled(key);
        }
    }

    /// Returns `true` if a change already covers the object.
    #[must_use]
    pub fn is_handled(&self, key: &ObjectKey) -> bool {
        self.handled.contains(key)
    }

    /// Returns `true` if a change already covers the snapshot object.
    #[must_use]
    pub fn is_object_handled(&self, snapshot: &Snapshot, id: ObjectId) -> bool {
        snapshot
            .identity(id, false)
            .is_some_and(|key| self.is_handled(&key))
    }

    /// Schema name to write for an object.
    #[must_use]
    pub fn schema_for(&self, snapshot: &Snapshot, id: ObjectId) -> Option<String> {
        if self.include_schema {
            snapshot.schema_option(id)
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.handled.clear();
    }
}

/// A generated change set, before it is written to a changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedChangeSet {
    /// `<root>-<n>`, numbered from 1.
    pub id: String,
    /// Author recorded on the change set.
    pub author: String,
    /// The changes, one per set.
    pub changes: Vec<Change>,
}

/// Turns a [`DiffResult`] into an ordered list of changes.
#[derive(Debug)]
pub struct DiffToChangeLog<'r> {
    registry: &'r ChangeGeneratorRegistry,
    control: DiffOutputControl,
}

impl<'r> DiffToChangeLog<'r> {
    /// Creates a converter with the default output control.
    #[must_use]
    pub fn new(registry: &'r ChangeGeneratorRegistry) -> Self {
        Self {
            registry,
            control: DiffOutputControl::new(),
        }
    }

    /// Replaces the output control.
    #[must_use]
    pub fn with_control(mut self, control: DiffOutputControl) -> Self {
        self.control = control;
        self
    }

    /// Generates the changes: foreign-key drops first, then creates, then
    /// the remaining drops, then updates.
    ///
    /// Changed objects are processed first so that their handled marks
    /// suppress duplicate creates and drops; unexpected objects are
    /// processed in reverse dependency order. Foreign keys are dropped
    /// before anything else so no create or update trips over a stale
    /// reference.
    ///
    /// # Errors
    ///
    /// [`KeelError::AmbiguousChangeGenerator`](crate::error::KeelError::AmbiguousChangeGenerator)
    /// or [`KeelError::ContradictoryOrdering`](crate::error::KeelError::ContradictoryOrdering)
    /// from the registry.
    pub fn generate_changes(&self, diff: &DiffResult<'_>, database: &dyn Database) -> Result<Vec<Change>> {
        let mut control = self.control.clone();
        control.reset();
        let compared: Vec<ObjectType> = diff.control().compared_types().collect();

        let mut updates = Vec::new();
        for generator in self.registry.ordered(DiffKind::Changed, &compared, database)? {
            for changed in diff.changed(generator.object_type()) {
                updates.extend(generator.fix(DiffObject::Changed(changed), diff, database, &mut control));
            }
        }

        let mut creates = Vec::new();
        for generator in self.registry.ordered(DiffKind::Missing, &compared, database)? {
            for id in diff.missing(generator.object_type()) {
                if control.is_object_handled(diff.reference(), *id) {
                    continue;
                }
                creates.extend(generator.fix(DiffObject::Missing(*id), diff, database, &mut control));
            }
        }

        let mut drops = Vec::new();
        for generator in self.registry.ordered(DiffKind::Unexpected, &compared, database)? {
            for id in diff.unexpected(generator.object_type()) {
                if control.is_object_handled(diff.comparison(), *id) {
                    continue;
                }
                drops.extend(generator.fix(DiffObject::Unexpected(*id), diff, database, &mut control));
            }
        }

        debug!(
            creates = creates.len(),
            drops = drops.len(),
            updates = updates.len(),
            "generated changes from diff"
        );
        creates.append(&mut drops);
        creates.append(&mut updates);
        let (mut changes, rest): (Vec<Change>, Vec<Change>) = creates
            .into_iter()
            .partition(|c| matches!(c, Change::DropForeignKeyConstraint { .. }));
        changes.extend(rest);
        Ok(changes)
    }

    /// Generates changes and wraps each in its own change set.
    ///
    /// # Errors
    ///
    /// See [`Self::generate_changes`].
    pub fn generate_change_sets(
        &self,
        diff: &DiffResult<'_>,
        database: &dyn Database,
        id_root: &str,
        author: &str,
    ) -> Result<Vec<GeneratedChangeSet>> {
        let change_sets: Vec<GeneratedChangeSet> = self
            .generate_changes(diff, database)?
            .into_iter()
            .enumerate()
            .map(|(n, change)| GeneratedChangeSet {
                id: format!("{id_root}-{}", n + 1),
                author: author.to_string(),
                changes: vec![change],
            })
            .collect();
        info!(count = change_sets.len(), "generated change sets");
        Ok(change_sets)
    }
}

/// Builds a registry holding every built-in change generator.
#[must_use]
pub fn build_default_change_generators() -> ChangeGeneratorRegistry {
    let mut registry = ChangeGeneratorRegistry::new();
    missing::register(&mut registry);
    unexpected::register(&mut registry);
    changed::register(&mut registry);
    registry
}

/// Table name and schema of the relation that owns an object.
fn owning_table(snapshot: &Snapshot, id: ObjectId) -> Option<(ObjectId, String)> {
    let relation = snapshot.relation_of(id)?;
    (relation.object_type() == ObjectType::Table).then(|| (relation.id, relation.name().to_string()))
}

