//! Generators for objects present on both sides whose attributes differ.
//!
//! Names come from the comparison side, which is what exists in the target
//! database; desired values come from the reference side.

use tracing::warn;

use super::{owning_table, ChangeGeneratorRegistry, DiffObject, DiffOutputControl};
use crate::change::{Change, DefaultValue};
use crate::database::Database;
use crate::diff::{ChangedObject, DiffResult};
use crate::snapshot::{ObjectData, Snapshot};

pub(super) fn register(registry: &mut ChangeGeneratorRegistry) {
    registry
        .register(ChangedColumnChangeGenerator)
        .register(ChangedPrimaryKeyChangeGenerator)
        .register(ChangedUniqueConstraintChangeGenerator)
        .register(ChangedForeignKeyChangeGenerator)
        .register(ChangedIndexChangeGenerator)
        .register(ChangedSequenceChangeGenerator)
        .register(ChangedViewChangeGenerator);
}

change_generator! {
    /// Column type, nullability, default and auto-increment updates.
    ChangedColumnChangeGenerator: Changed Column,
    after = [Table],
    before = [PrimaryKey],
    fix = fix_column,
}

change_generator! {
    /// Drops and re-adds a primary key whose columns changed.
    ChangedPrimaryKeyChangeGenerator: Changed PrimaryKey,
    after = [Table, Column],
    before = [Index],
    fix = fix_primary_key,
}

change_generator! {
    /// Drops and re-adds a unique constraint whose columns changed.
    ChangedUniqueConstraintChangeGenerator: Changed UniqueConstraint,
    after = [Table, Column],
    before = [Index],
    fix = fix_unique_constraint,
}

change_generator! {
    /// Drops and re-adds a foreign key.
    ChangedForeignKeyChangeGenerator: Changed ForeignKey,
    after = [Table, Column, PrimaryKey, UniqueConstraint],
    before = [Index],
    fix = fix_foreign_key,
}

change_generator! {
    /// Drops and recreates an index.
    ChangedIndexChangeGenerator: Changed Index,
    after = [Table, Column],
    before = [],
    fix = fix_index,
}

change_generator! {
    /// One `alterSequence` per alterable attribute that differs.
    ChangedSequenceChangeGenerator: Changed Sequence,
    after = [],
    before = [Table],
    fix = fix_sequence,
}

change_generator! {
    /// Replaces a view whose definition changed.
    ChangedViewChangeGenerator: Changed View,
    after = [Table, Column],
    before = [],
    fix = fix_view,
}

struct Pair<'s> {
    changed: &'s ChangedObject,
    reference: &'s ObjectData,
    comparison: &'s ObjectData,
}

fn pair<'s>(object: DiffObject<'s>, diff: &DiffResult<'s>) -> Option<Pair<'s>> {
    let DiffObject::Changed(changed) = object else {
        return None;
    };
    Some(Pair {
        changed,
        reference: &diff.reference().get(changed.reference)?.data,
        comparison: &diff.comparison().get(changed.comparison)?.data,
    })
}

/// Marks the backing index of a constraint on both sides.
fn mark_backing_indexes(diff: &DiffResult<'_>, changed: &ChangedObject, control: &mut DiffOutputControl) {
    let sides: [(&Snapshot, _); 2] = [
        (diff.reference(), changed.reference),
        (diff.comparison(), changed.comparison),
    ];
    for (snapshot, id) in sides {
        if let Some(index) = snapshot.get(id).and_then(|o| o.backing_index()) {
            control.mark_object_handled(snapshot, index);
        }
    }
}

fn fix_column(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let Some(Pair {
        changed,
        reference: ObjectData::Column(desired),
        comparison: ObjectData::Column(current),
    }) = pair(object, diff)
    else {
        return Vec::new();
    };
    let snapshot = diff.comparison();
    let Some((_, table_name)) = owning_table(snapshot, changed.comparison) else {
        return Vec::new();
    };
    let schema_name = control.schema_for(snapshot, changed.comparison);
    let column_name = current.name.clone();
    let differences = &changed.differences;
    let mut changes = Vec::new();

    if differences.has("type") {
        changes.push(Change::ModifyDataType {
            schema_name: schema_name.clone(),
            table_name: table_name.clone(),
            column_name: column_name.clone(),
            new_data_type: desired.data_type.clone(),
        });
    }
    if differences.has("nullable") {
        changes.push(if desired.nullable {
            Change::DropNotNullConstraint {
                schema_name: schema_name.clone(),
                table_name: table_name.clone(),
                column_name: column_name.clone(),
                column_data_type: Some(desired.data_type.clone()),
            }
        } else {
            Change::AddNotNullConstraint {
                schema_name: schema_name.clone(),
                table_name: table_name.clone(),
                column_name: column_name.clone(),
                column_data_type: Some(desired.data_type.clone()),
                default_null_value: None,
            }
        });
    }
    if differences.has("defaultValue") {
        changes.push(
            match desired.default_value.as_ref().and_then(DefaultValue::from_literal) {
                Some(default_value) => Change::AddDefaultValue {
                    schema_name: schema_name.clone(),
                    table_name: table_name.clone(),
                    column_name: column_name.clone(),
                    column_data_type: Some(desired.data_type.clone()),
                    default_value,
                },
                None => Change::DropDefaultValue {
                    schema_name: schema_name.clone(),
                    table_name: table_name.clone(),
                    column_name: column_name.clone(),
                    column_data_type: Some(desired.data_type.clone()),
                },
            },
        );
    }
    if differences.has("autoIncrement") {
        match desired.auto_increment {
            Some(auto_increment) => changes.push(Change::AddAutoIncrement {
                schema_name,
                table_name,
                column_name,
                column_data_type: Some(desired.data_type.clone()),
                start_with: auto_increment.start_with,
                increment_by: auto_increment.increment_by,
            }),
            None => warn!(
                table = %table_name,
                column = %column_name,
                "removing auto-increment is not supported; leaving column as is"
            ),
        }
    }
    changes
}

fn fix_primary_key(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let Some(Pair {
        changed,
        reference: ObjectData::PrimaryKey(desired),
        comparison: ObjectData::PrimaryKey(current),
    }) = pair(object, diff)
    else {
        return Vec::new();
    };
    if !changed.differences.has("columns") {
        return Vec::new();
    }
    let snapshot = diff.comparison();
    let Some((_, table_name)) = owning_table(snapshot, changed.comparison) else {
        return Vec::new();
    };
    mark_backing_indexes(diff, changed, control);
    let schema_name = control.schema_for(snapshot, changed.comparison);
    vec![
        Change::DropPrimaryKey {
            schema_name: schema_name.clone(),
            table_name: table_name.clone(),
            constraint_name: current.name.clone(),
        },
        Change::AddPrimaryKey {
            schema_name,
            table_name,
            column_names: desired.columns.clone(),
            constraint_name: desired.name.clone(),
            tablespace: None,
        },
    ]
}

fn fix_unique_constraint(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let Some(Pair {
        changed,
        reference: ObjectData::UniqueConstraint(desired),
        comparison: ObjectData::UniqueConstraint(current),
    }) = pair(object, diff)
    else {
        return Vec::new();
    };
    if !changed.differences.has("columns") {
        return Vec::new();
    }
    let snapshot = diff.comparison();
    let Some((_, table_name)) = owning_table(snapshot, changed.comparison) else {
        return Vec::new();
    };
    mark_backing_indexes(diff, changed, control);
    let Some(constraint_name) = current.name.clone() else {
        warn!(table = %table_name, "cannot replace a unique constraint without a name");
        return Vec::new();
    };
    let schema_name = control.schema_for(snapshot, changed.comparison);
    vec![
        Change::DropUniqueConstraint {
            schema_name: schema_name.clone(),
            table_name: table_name.clone(),
            constraint_name,
        },
        Change::AddUniqueConstraint {
            schema_name,
            table_name,
            column_names: desired.columns.clone(),
            constraint_name: desired.name.clone(),
            tablespace: None,
        },
    ]
}

fn fix_foreign_key(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let Some(Pair {
        changed,
        reference: ObjectData::ForeignKey(desired),
        comparison: ObjectData::ForeignKey(current),
    }) = pair(object, diff)
    else {
        return Vec::new();
    };
    let snapshot = diff.comparison();
    let Some((_, table_name)) = owning_table(snapshot, changed.comparison) else {
        return Vec::new();
    };
    mark_backing_indexes(diff, changed, control);
    let Some(current_name) = current.name.clone() else {
        warn!(table = %table_name, "cannot replace a foreign key without a name");
        return Vec::new();
    };
    let schema_name = control.schema_for(snapshot, changed.comparison);
    vec![
        Change::DropForeignKeyConstraint {
            base_table_schema_name: schema_name.clone(),
            base_table_name: table_name.clone(),
            constraint_name: current_name.clone(),
        },
        Change::AddForeignKeyConstraint {
            base_table_schema_name: schema_name,
            base_table_name: table_name,
            base_column_names: desired.columns.clone(),
            referenced_table_schema_name: if control.includes_schema() {
                desired.referenced_schema.clone()
            } else {
                None
            },
            referenced_table_name: desired.referenced_table.clone(),
            referenced_column_names: desired.referenced_columns.clone(),
            constraint_name: desired.name.clone().unwrap_or(current_name),
            on_delete: desired.on_delete,
            on_update: desired.on_update,
        },
    ]
}

fn fix_index(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let Some(Pair {
        changed,
        reference: ObjectData::Index(desired),
        comparison: ObjectData::Index(current),
    }) = pair(object, diff)
    else {
        return Vec::new();
    };
    if diff.reference().is_backing_index(changed.reference)
        || diff.comparison().is_backing_index(changed.comparison)
        || control.is_object_handled(diff.comparison(), changed.comparison)
    {
        return Vec::new();
    }
    let snapshot = diff.comparison();
    let Some((_, table_name)) = owning_table(snapshot, changed.comparison) else {
        return Vec::new();
    };
    control.mark_object_handled(snapshot, changed.comparison);
    let schema_name = control.schema_for(snapshot, changed.comparison);
    vec![
        Change::DropIndex {
            schema_name: schema_name.clone(),
            table_name: table_name.clone(),
            index_name: current.name.clone(),
        },
        Change::CreateIndex {
            schema_name,
            table_name,
            index_name: desired.name.clone(),
            columns: desired.columns.clone(),
            unique: desired.unique,
            tablespace: None,
        },
    ]
}

fn fix_sequence(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let Some(Pair {
        changed,
        reference: ObjectData::Sequence(desired),
        comparison: ObjectData::Sequence(current),
    }) = pair(object, diff)
    else {
        return Vec::new();
    };
    let schema_name = control.schema_for(diff.comparison(), changed.comparison);
    let alter = |increment_by, max_value, ordered| Change::AlterSequence {
        schema_name: schema_name.clone(),
        sequence_name: current.name.clone(),
        increment_by,
        min_value: None,
        max_value,
        ordered,
    };
    let differences = &changed.differences;
    let mut changes = Vec::new();
    if differences.has("incrementBy") {
        changes.push(alter(desired.increment_by, None, None));
    }
    if differences.has("maxValue") {
        changes.push(alter(None, desired.max_value, None));
    }
    if differences.has("ordered") {
        changes.push(alter(None, None, desired.ordered));
    }
    changes
}

fn fix_view(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let Some(Pair {
        changed,
        reference: ObjectData::View(desired),
        comparison: ObjectData::View(current),
    }) = pair(object, diff)
    else {
        return Vec::new();
    };
    vec![Change::CreateView {
        schema_name: control.schema_for(diff.comparison(), changed.comparison),
        view_name: current.name.clone(),
        select_query: desired.definition.clone(),
        replace_if_exists: true,
    }]
}
