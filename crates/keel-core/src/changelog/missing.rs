//! Generators for objects the comparison database lacks.

use tracing::debug;

use super::{owning_table, ChangeGeneratorRegistry, DiffObject, DiffOutputControl};
use crate::change::{Change, ColumnConfig};
use crate::database::{Capability, Database};
use crate::diff::DiffResult;
use crate::snapshot::{ObjectData, ObjectId, Snapshot};

pub(super) fn register(registry: &mut ChangeGeneratorRegistry) {
    registry
        .register(MissingSequenceChangeGenerator)
        .register(MissingTableChangeGenerator)
        .register(MissingViewChangeGenerator)
        .register(MissingColumnChangeGenerator)
        .register(MissingPrimaryKeyChangeGenerator)
        .register(MissingUniqueConstraintChangeGenerator)
        .register(MissingForeignKeyChangeGenerator)
        .register(MissingIndexChangeGenerator);
}

change_generator! {
    /// `createSequence`.
    MissingSequenceChangeGenerator: Missing Sequence,
    after = [],
    before = [Table],
    fix = fix_sequence,
}

change_generator! {
    /// `createTable` with every column, absorbing the primary key when it
    /// has to be declared inline.
    MissingTableChangeGenerator: Missing Table,
    after = [],
    before = [],
    fix = fix_table,
}

change_generator! {
    /// `createView`.
    MissingViewChangeGenerator: Missing View,
    after = [Table, Column],
    before = [],
    fix = fix_view,
}

change_generator! {
    /// `addColumn` on an existing base table.
    MissingColumnChangeGenerator: Missing Column,
    after = [Table],
    before = [PrimaryKey],
    fix = fix_column,
}

change_generator! {
    /// `addPrimaryKey`.
    MissingPrimaryKeyChangeGenerator: Missing PrimaryKey,
    after = [Table, Column],
    before = [Index],
    fix = fix_primary_key,
}

change_generator! {
    /// `addUniqueConstraint`.
    MissingUniqueConstraintChangeGenerator: Missing UniqueConstraint,
    after = [Table, Column],
    before = [Index],
    fix = fix_unique_constraint,
}

change_generator! {
    /// `addForeignKeyConstraint`.
    MissingForeignKeyChangeGenerator: Missing ForeignKey,
    after = [Table, Column, PrimaryKey, UniqueConstraint],
    before = [Index],
    fix = fix_foreign_key,
}

change_generator! {
    /// `createIndex` for indexes no constraint accounts for.
    MissingIndexChangeGenerator: Missing Index,
    after = [Table, Column],
    before = [],
    fix = fix_index,
}

fn missing<'s>(object: DiffObject<'_>, snapshot: &'s Snapshot) -> Option<(ObjectId, &'s ObjectData)> {
    let DiffObject::Missing(id) = object else {
        return None;
    };
    snapshot.get(id).map(|o| (id, &o.data))
}

fn mark_backing_index(snapshot: &Snapshot, id: ObjectId, control: &mut DiffOutputControl) {
    if let Some(index) = snapshot.get(id).and_then(|o| o.backing_index()) {
        control.mark_object_handled(snapshot, index);
    }
}

fn fix_sequence(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.reference();
    let Some((id, ObjectData::Sequence(sequence))) = missing(object, snapshot) else {
        return Vec::new();
    };
    vec![Change::CreateSequence {
        schema_name: control.schema_for(snapshot, id),
        sequence_name: sequence.name.clone(),
        start_value: sequence.start_value,
        increment_by: sequence.increment_by,
        min_value: sequence.min_value,
        max_value: sequence.max_value,
        ordered: sequence.ordered,
        cycle: sequence.cycle,
    }]
}

fn fix_table(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.reference();
    let Some((id, ObjectData::Table(table))) = missing(object, snapshot) else {
        return Vec::new();
    };
    let primary_key = snapshot.primary_key_of(id);
    let primary_key_columns = primary_key
        .and_then(|pk| pk.columns())
        .unwrap_or_default();
    let is_key_column =
        |name: &str| primary_key_columns.iter().any(|c| c.eq_ignore_ascii_case(name));

    let columns = snapshot.columns_of(id);
    // an auto-increment key column must be declared with the table, and a
    // key added later would need a rebuild where ALTER is missing
    let inline_key = !primary_key_columns.is_empty()
        && (!database.supports(Capability::AlterColumn)
            || columns
                .iter()
                .any(|c| c.auto_increment.is_some() && is_key_column(&c.name)));
    let key_name = primary_key.and_then(|pk| match &pk.data {
        ObjectData::PrimaryKey(pk) => pk.name.clone(),
        _ => None,
    });

    let configs: Vec<ColumnConfig> = columns
        .iter()
        .map(|column| {
            let config = ColumnConfig::from(*column);
            if inline_key && is_key_column(&column.name) {
                ColumnConfig {
                    primary_key_name: key_name.clone(),
                    ..config.primary_key()
                }
            } else {
                config
            }
        })
        .collect();

    for column in snapshot.children(id).filter(|o| matches!(o.data, ObjectData::Column(_))) {
        control.mark_object_handled(snapshot, column.id);
    }
    if inline_key {
        if let Some(pk) = primary_key {
            control.mark_object_handled(snapshot, pk.id);
            mark_backing_index(snapshot, pk.id, control);
        }
    }

    vec![Change::CreateTable {
        schema_name: control.schema_for(snapshot, id),
        table_name: table.name.clone(),
        columns: configs,
        tablespace: None,
        remarks: table.remarks.clone(),
    }]
}

fn fix_view(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.reference();
    let Some((id, ObjectData::View(view))) = missing(object, snapshot) else {
        return Vec::new();
    };
    for column in snapshot.children(id) {
        control.mark_object_handled(snapshot, column.id);
    }
    vec![Change::CreateView {
        schema_name: control.schema_for(snapshot, id),
        view_name: view.name.clone(),
        select_query: view.definition.clone(),
        replace_if_exists: false,
    }]
}

fn fix_column(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.reference();
    let Some((id, ObjectData::Column(column))) = missing(object, snapshot) else {
        return Vec::new();
    };
    let Some((_, table_name)) = owning_table(snapshot, id) else {
        debug!(column = %column.name, "skipping column that does not belong to a base table");
        return Vec::new();
    };
    vec![Change::AddColumn {
        schema_name: control.schema_for(snapshot, id),
        table_name,
        columns: vec![ColumnConfig::from(column)],
    }]
}

fn fix_primary_key(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.reference();
    let Some((id, ObjectData::PrimaryKey(pk))) = missing(object, snapshot) else {
        return Vec::new();
    };
    let Some((_, table_name)) = owning_table(snapshot, id) else {
        return Vec::new();
    };
    mark_backing_index(snapshot, id, control);
    vec![Change::AddPrimaryKey {
        schema_name: control.schema_for(snapshot, id),
        table_name,
        column_names: pk.columns.clone(),
        constraint_name: pk.name.clone(),
        tablespace: None,
    }]
}

fn fix_unique_constraint(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.reference();
    let Some((id, ObjectData::UniqueConstraint(unique))) = missing(object, snapshot) else {
        return Vec::new();
    };
    let Some((_, table_name)) = owning_table(snapshot, id) else {
        return Vec::new();
    };
    mark_backing_index(snapshot, id, control);
    vec![Change::AddUniqueConstraint {
        schema_name: control.schema_for(snapshot, id),
        table_name,
        column_names: unique.columns.clone(),
        constraint_name: unique.name.clone(),
        tablespace: None,
    }]
}

fn fix_foreign_key(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.reference();
    let Some((id, ObjectData::ForeignKey(fk))) = missing(object, snapshot) else {
        return Vec::new();
    };
    let Some((_, table_name)) = owning_table(snapshot, id) else {
        return Vec::new();
    };
    mark_backing_index(snapshot, id, control);
    let constraint_name = fk
        .name
        .clone()
        .unwrap_or_else(|| format!("fk_{table_name}_{}", fk.columns.join("_")).to_ascii_lowercase());
    vec![Change::AddForeignKeyConstraint {
        base_table_schema_name: control.schema_for(snapshot, id),
        base_table_name: table_name,
        base_column_names: fk.columns.clone(),
        referenced_table_schema_name: if control.includes_schema() {
            fk.referenced_schema.clone()
        } else {
            None
        },
        referenced_table_name: fk.referenced_table.clone(),
        referenced_column_names: fk.referenced_columns.clone(),
        constraint_name,
        on_delete: fk.on_delete,
        on_update: fk.on_update,
    }]
}

fn fix_index(
    object: DiffObject<'_>,
    diff: &DiffResult<'_>,
    _database: &dyn Database,
    control: &mut DiffOutputControl,
) -> Vec<Change> {
    let snapshot = diff.reference();
    let Some((id, ObjectData::Index(index))) = missing(object, snapshot) else {
        return Vec::new();
    };
    if snapshot.is_backing_index(id) {
        return Vec::new();
    }
    let Some((_, table_name)) = owning_table(snapshot, id) else {
        return Vec::new();
    };
    vec![Change::CreateIndex {
        schema_name: control.schema_for(snapshot, id),
        table_name,
        index_name: index.name.clone(),
        columns: index.columns.clone(),
        unique: index.unique,
        tablespace: None,
    }]
}
