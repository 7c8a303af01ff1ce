//! Generators for objects only the comparison database has.
//!
//! Drops run in reverse dependency order: foreign keys first, tables and
//! sequences last. Children of a table that is itself dropped produce
//! nothing, except foreign keys, which other tables may still reference.

use tracing::warn;

use super::{owning_table, ChangeGeneratorRegistry, DiffObject, DiffOutputControl};
use crate::change::Change;
use crate::database::Database;
use crate::diff::DiffResult;
use crate::snapshot::{ObjectData, ObjectId, ObjectType, Snapshot};

pub(super) fn register(registry: &mut ChangeGeneratorRegistry) {
    registry
        .register(UnexpectedForeignKeyChangeGenerator)
        .register(UnexpectedPrimaryKeyChangeGenerator)
        .register(UnexpectedUniqueConstraintChangeGenerator)
        .register(UnexpectedIndexChangeGenerator)
        .register(UnexpectedColumnChangeGenerator)
        .register(UnexpectedViewChangeGenerator)
        .register(UnexpectedTableChangeGenerator)
        .register(UnexpectedSequenceChangeGenerator);
}

change_generator! {
    /// `dropForeignKeyConstraint`.
    UnexpectedForeignKeyChangeGenerator: Unexpected ForeignKey,
    after = [],
    before = [Table, Column, PrimaryKey, UniqueConstraint, Index],
    fix = fix_foreign_key,
}

change_generator! {
    /// `dropPrimaryKey`.
    UnexpectedPrimaryKeyChangeGenerator: Unexpected PrimaryKey,
    after = [ForeignKey],
    before = [Table, Column, Index],
    fix = fix_primary_key,
}

change_generator! {
    /// `dropUniqueConstraint`.
    UnexpectedUniqueConstraintChangeGenerator: Unexpected UniqueConstraint,
    after = [ForeignKey],
    before = [Table, Column, Index],
    fix = fix_unique_constraint,
}

change_generator! {
    /// `dropIndex`.
    UnexpectedIndexChangeGenerator: Unexpected Index,
    after = [ForeignKey],
    before = [Table, Column],
    fix = fix_index,
}

change_generator! {
    /// `dropColumn`.
    UnexpectedColumnChangeGenerator: Unexpected Column,
    after = [ForeignKey, PrimaryKey, UniqueConstraint, Index],
    before = [Table],
    fix = fix_column,
}

change_generator! {
    /// `dropView`.
    UnexpectedViewChangeGenerator: Unexpected View,
    after = [],
    before = [Table],
    fix = fix_view,
}

change_generator! {
    /// `dropTable`.
    UnexpectedTableChangeGenerator: Unexpected Table,
    after = [],
    before = [],
    fix = fix_table,
}

change_generator! {
    /// `dropSequence`.
    UnexpectedSequenceChangeGenerator: Unexpected Sequence,
    after = [Table],
    before = [],
    fix = fix_sequence,
}

fn unexpected<'s>(object: DiffObject<'_>, snapshot: &'s Snapshot) -> Option<(ObjectId, &'s ObjectData)> {
    let DiffObject::Unexpected(id) = object else {
        return None;
    };
    snapshot.get(id).map(|o| (id, &o.data))
}

/// Owning table of a constraint, unless the table is dropped as a whole.
fn surviving_table(diff: &DiffResult<'_>, id: ObjectId) -> Option<String> {
    let (table, name) = owning_table(diff.comparison(), id)?;
    (!diff.unexpected(ObjectType::Table).contains(&table)).then_some(name)
}

fn mark_backing_index(snapshot: &Snapshot, id: ObjectId, control: &mut DiffOutputControl) {
    if let Some(index) = snapshot.get(id).and_then(|o| o.backing_index()) {
        control.mark_object_handled(snapshot, index);
    }
}

fn fix_foreign_key(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.comparison();
    let Some((id, ObjectData::ForeignKey(fk))) = unexpected(object, snapshot) else {
        return Vec::new();
    };
    let Some((_, table_name)) = owning_table(snapshot, id) else {
        return Vec::new();
    };
    mark_backing_index(snapshot, id, control);
    let Some(constraint_name) = fk.name.clone() else {
        warn!(
            table = %table_name,
            columns = ?fk.columns,
            "cannot drop a foreign key without a name"
        );
        return Vec::new();
    };
    vec![Change::DropForeignKeyConstraint {
        base_table_schema_name: control.schema_for(snapshot, id),
        base_table_name: table_name,
        constraint_name,
    }]
}

fn fix_primary_key(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.comparison();
    let Some((id, ObjectData::PrimaryKey(pk))) = unexpected(object, snapshot) else {
        return Vec::new();
    };
    mark_backing_index(snapshot, id, control);
    let Some(table_name) = surviving_table(diff, id) else {
        return Vec::new();
    };
    vec![Change::DropPrimaryKey {
        schema_name: control.schema_for(snapshot, id),
        table_name,
        constraint_name: pk.name.clone(),
    }]
}

fn fix_unique_constraint(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.comparison();
    let Some((id, ObjectData::UniqueConstraint(unique))) = unexpected(object, snapshot) else {
        return Vec::new();
    };
    mark_backing_index(snapshot, id, control);
    let Some(table_name) = surviving_table(diff, id) else {
        return Vec::new();
    };
    let Some(constraint_name) = unique.name.clone() else {
        warn!(
            table = %table_name,
            columns = ?unique.columns,
            "cannot drop a unique constraint without a name"
        );
        return Vec::new();
    };
    vec![Change::DropUniqueConstraint {
        schema_name: control.schema_for(snapshot, id),
        table_name,
        constraint_name,
    }]
}

fn fix_index(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.comparison();
    let Some((id, ObjectData::Index(index))) = unexpected(object, snapshot) else {
        return Vec::new();
    };
    if snapshot.is_backing_index(id) {
        return Vec::new();
    }
    let Some(table_name) = surviving_table(diff, id) else {
        return Vec::new();
    };
    vec![Change::DropIndex {
        schema_name: control.schema_for(snapshot, id),
        table_name,
        index_name: index.name.clone(),
    }]
}

fn fix_column(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.comparison();
    let Some((id, ObjectData::Column(column))) = unexpected(object, snapshot) else {
        return Vec::new();
    };
    let Some(table_name) = surviving_table(diff, id) else {
        return Vec::new();
    };
    vec![Change::DropColumn {
        schema_name: control.schema_for(snapshot, id),
        table_name,
        column_name: column.name.clone(),
    }]
}

fn fix_view(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.comparison();
    let Some((id, ObjectData::View(view))) = unexpected(object, snapshot) else {
        return Vec::new();
    };
    vec![Change::DropView {
        schema_name: control.schema_for(snapshot, id),
        view_name: view.name.clone(),
    }]
}

fn fix_table(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.comparison();
    let Some((id, ObjectData::Table(table))) = unexpected(object, snapshot) else {
        return Vec::new();
    };
    vec![Change::DropTable {
        schema_name: control.schema_for(snapshot, id),
        table_name: table.name.clone(),
        cascade_constraints: false,
    }]
}

fn fix_sequence(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.comparison();
    let Some((id, ObjectData::Sequence(sequence))) = unexpected(object, snapshot) else {
        return Vec::new();
    };
    vec![Change::DropSequence {
        schema_name: control.schema_for(snapshot, id),
        sequence_name: sequence.name.clone(),
    }]
}
