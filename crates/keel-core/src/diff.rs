//! Structural comparison of two snapshots.
//!
//! [`compare`] matches objects of the *reference* and *comparison*
//! snapshots by their [`ObjectKey`] and sorts them into three buckets per
//! object type:
//!
//! - **missing**: in the reference, not in the comparison;
//! - **unexpected**: in the comparison, not in the reference;
//! - **changed**: in both, with at least one watched attribute differing.
//!
//! Only watched attributes are compared. A field absent from an
//! [`ObjectDifferences`] was not compared, it is not known to be equal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

use crate::snapshot::{
    DatabaseObject, ForeignKeyAction, ObjectData, ObjectId, ObjectKey, ObjectType, Snapshot,
};
use crate::statement::{DATABASE_CHANGELOG_LOCK_TABLE, DATABASE_CHANGELOG_TABLE};

/// Object types compared when nothing else is configured.
pub const DEFAULT_COMPARED_TYPES: [ObjectType; 8] = [
    ObjectType::Sequence,
    ObjectType::Table,
    ObjectType::View,
    ObjectType::Column,
    ObjectType::PrimaryKey,
    ObjectType::UniqueConstraint,
    ObjectType::ForeignKey,
    ObjectType::Index,
];

/// What [`compare`] looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareControl {
    case_sensitive: bool,
    types: BTreeSet<ObjectType>,
    skip_tracking_tables: bool,
}

impl Default for CompareControl {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            types: DEFAULT_COMPARED_TYPES.into_iter().collect(),
            skip_tracking_tables: true,
        }
    }
}

impl CompareControl {
    /// Creates the default control: case-insensitive, every object type
    /// below the schema, tracking tables skipped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches names case-sensitively.
    #[must_use]
    pub const fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Restricts the comparison to the given types.
    #[must_use]
    pub fn types(mut self, types: impl IntoIterator<Item = ObjectType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    /// Also compares `DATABASECHANGELOG` and `DATABASECHANGELOGLOCK`.
    #[must_use]
    pub const fn include_tracking_tables(mut self) -> Self {
        self.skip_tracking_tables = false;
        self
    }

    /// Returns whether names are matched case-sensitively.
    #[must_use]
    pub const fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Returns whether objects of this type are compared.
    #[must_use]
    pub fn compares(&self, object_type: ObjectType) -> bool {
        self.types.contains(&object_type)
    }

    /// Returns the compared types in dependency order.
    pub fn compared_types(&self) -> impl Iterator<Item = ObjectType> + '_ {
        ObjectType::ALL.into_iter().filter(|t| self.compares(*t))
    }

    fn skips(&self, snapshot: &Snapshot, object: &DatabaseObject) -> bool {
        if !self.skip_tracking_tables {
            return false;
        }
        let table = match object.object_type() {
            ObjectType::Table => Some(object.name()),
            _ => snapshot.relation_of(object.id).map(DatabaseObject::name),
        };
        table.is_some_and(is_tracking_table)
    }

    fn fold(&self, value: &str) -> String {
        if self.case_sensitive {
            value.to_string()
        } else {
            value.to_ascii_lowercase()
        }
    }
}

/// Returns `true` for the two tables the migration engine maintains itself.
#[must_use]
pub fn is_tracking_table(name: &str) -> bool {
    name.eq_ignore_ascii_case(DATABASE_CHANGELOG_TABLE)
        || name.eq_ignore_ascii_case(DATABASE_CHANGELOG_LOCK_TABLE)
}

/// Before/after values of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    /// Attribute name, e.g. `type` or `columns`.
    pub field: &'static str,
    /// Value in the reference snapshot.
    pub reference: Option<String>,
    /// Value in the comparison snapshot.
    pub comparison: Option<String>,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.field,
            self.reference.as_deref().unwrap_or("NULL"),
            self.comparison.as_deref().unwrap_or("NULL")
        )
    }
}

/// The differing attributes of one matched object pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectDifferences {
    differences: BTreeMap<&'static str, Difference>,
}

impl ObjectDifferences {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `field` if the two values differ.
    pub fn compare(&mut self, field: &'static str, reference: Option<String>, comparison: Option<String>) {
        if reference != comparison {
            self.differences.insert(
                field,
                Difference {
                    field,
                    reference,
                    comparison,
                },
            );
        }
    }

    /// Returns the difference recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Difference> {
        self.differences.get(field)
    }

    /// Returns `true` if `field` differs.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.differences.contains_key(field)
    }

    /// Iterates over the differences, ordered by field name.
    pub fn iter(&self) -> impl Iterator<Item = &Difference> {
        self.differences.values()
    }

    /// Returns the number of differing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.differences.len()
    }

    /// Returns `true` if nothing differs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }
}

/// An object present in both snapshots whose watched attributes differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedObject {
    /// Id in the reference snapshot.
    pub reference: ObjectId,
    /// Id in the comparison snapshot.
    pub comparison: ObjectId,
    /// What differs.
    pub differences: ObjectDifferences,
}

/// Output of [`compare`].
#[derive(Debug, Clone)]
pub struct DiffResult<'a> {
    reference: &'a Snapshot,
    comparison: &'a Snapshot,
    control: CompareControl,
    missing: BTreeMap<ObjectType, Vec<ObjectId>>,
    unexpected: BTreeMap<ObjectType, Vec<ObjectId>>,
    changed: BTreeMap<ObjectType, Vec<ChangedObject>>,
}

impl<'a> DiffResult<'a> {
    /// Returns the reference snapshot.
    #[must_use]
    pub const fn reference(&self) -> &'a Snapshot {
        self.reference
    }

    /// Returns the comparison snapshot.
    #[must_use]
    pub const fn comparison(&self) -> &'a Snapshot {
        self.comparison
    }

    /// Returns the control the comparison ran with.
    #[must_use]
    pub const fn control(&self) -> &CompareControl {
        &self.control
    }

    /// Reference ids of objects the comparison snapshot lacks.
    #[must_use]
    pub fn missing(&self, object_type: ObjectType) -> &[ObjectId] {
        self.missing.get(&object_type).map_or(&[], Vec::as_slice)
    }

    /// Comparison ids of objects the reference snapshot lacks.
    #[must_use]
    pub fn unexpected(&self, object_type: ObjectType) -> &[ObjectId] {
        self.unexpected.get(&object_type).map_or(&[], Vec::as_slice)
    }

    /// Matched objects whose watched attributes differ.
    #[must_use]
    pub fn changed(&self, object_type: ObjectType) -> &[ChangedObject] {
        self.changed.get(&object_type).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if the snapshots are equivalent under the control.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing.values().all(Vec::is_empty)
            && self.unexpected.values().all(Vec::is_empty)
            && self.changed.values().all(Vec::is_empty)
    }

    /// Renders every difference, one per line, in dependency order.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "No differences found".to_string();
        }
        let mut out = String::new();
        for object_type in self.control.compared_types() {
            for id in self.missing(object_type) {
                push_line(&mut out, "Missing", self.reference, *id);
            }
            for id in self.unexpected(object_type) {
                push_line(&mut out, "Unexpected", self.comparison, *id);
            }
            for changed in self.changed(object_type) {
                push_line(&mut out, "Changed", self.reference, changed.reference);
                for difference in changed.differences.iter() {
                    out.push_str("    ");
                    out.push_str(&difference.to_string());
                    out.push('\n');
                }
            }
        }
        out
    }
}

fn push_line(out: &mut String, label: &str, snapshot: &Snapshot, id: ObjectId) {
    if let Some(key) = snapshot.identity(id, true) {
        out.push_str(label);
        out.push(' ');
        out.push_str(&key.to_string());
        out.push('\n');
    }
}

/// Compares two snapshots.
#[must_use]
pub fn compare<'a>(
    reference: &'a Snapshot,
    comparison: &'a Snapshot,
    control: &CompareControl,
) -> DiffResult<'a> {
    let mut result = DiffResult {
        reference,
        comparison,
        control: control.clone(),
        missing: BTreeMap::new(),
        unexpected: BTreeMap::new(),
        changed: BTreeMap::new(),
    };

    for object_type in control.compared_types() {
        let reference_keys = keyed(reference, object_type, control);
        let comparison_keys = keyed(comparison, object_type, control);

        let mut missing = Vec::new();
        let mut changed = Vec::new();
        for (key, reference_id) in &reference_keys {
            match comparison_keys.get(key) {
                Some(comparison_id) => {
                    let differences =
                        compare_objects(reference, *reference_id, comparison, *comparison_id, control);
                    if !differences.is_empty() {
                        changed.push(ChangedObject {
                            reference: *reference_id,
                            comparison: *comparison_id,
                            differences,
                        });
                    }
                }
                None => missing.push(*reference_id),
            }
        }
        let mut unexpected: Vec<ObjectId> = comparison_keys
            .iter()
            .filter(|(key, _)| !reference_keys.contains_key(key))
            .map(|(_, id)| *id)
            .collect();

        // snapshot order, so creates follow declaration order
        missing.sort();
        unexpected.sort();
        changed.sort_by_key(|c| c.reference);

        debug!(
            object_type = %object_type,
            missing = missing.len(),
            unexpected = unexpected.len(),
            changed = changed.len(),
            "compared objects"
        );
        result.missing.insert(object_type, missing);
        result.unexpected.insert(object_type, unexpected);
        result.changed.insert(object_type, changed);
    }
    result
}

fn keyed(snapshot: &Snapshot, object_type: ObjectType, control: &CompareControl) -> BTreeMap<ObjectKey, ObjectId> {
    snapshot
        .objects_of(object_type)
        .filter(|o| !control.skips(snapshot, o))
        .filter_map(|o| {
            snapshot
                .identity(o.id, control.case_sensitive)
                .map(|key| (key, o.id))
        })
        .collect()
}

fn compare_objects(
    reference: &Snapshot,
    reference_id: ObjectId,
    comparison: &Snapshot,
    comparison_id: ObjectId,
    control: &CompareControl,
) -> ObjectDifferences {
    let mut differences = ObjectDifferences::new();
    let (Some(a), Some(b)) = (reference.get(reference_id), comparison.get(comparison_id)) else {
        return differences;
    };
    let names = |columns: &[String]| Some(control.fold(&columns.join(", ")));

    match (&a.data, &b.data) {
        (ObjectData::Table(a), ObjectData::Table(b)) => {
            differences.compare("remarks", a.remarks.clone(), b.remarks.clone());
        }
        (ObjectData::View(a), ObjectData::View(b)) => {
            differences.compare(
                "definition",
                Some(normalize_whitespace(&a.definition)),
                Some(normalize_whitespace(&b.definition)),
            );
        }
        (ObjectData::Column(a), ObjectData::Column(b)) => {
            differences.compare("type", Some(a.data_type.to_string()), Some(b.data_type.to_string()));
            differences.compare("nullable", Some(a.nullable.to_string()), Some(b.nullable.to_string()));
            differences.compare(
                "defaultValue",
                a.default_value.as_ref().map(ToString::to_string),
                b.default_value.as_ref().map(ToString::to_string),
            );
            differences.compare(
                "autoIncrement",
                Some(a.auto_increment.is_some().to_string()),
                Some(b.auto_increment.is_some().to_string()),
            );
        }
        (ObjectData::Index(a), ObjectData::Index(b)) => {
            differences.compare("columns", names(&a.columns), names(&b.columns));
            differences.compare("unique", Some(a.unique.to_string()), Some(b.unique.to_string()));
        }
        (ObjectData::PrimaryKey(a), ObjectData::PrimaryKey(b)) => {
            differences.compare("columns", names(&a.columns), names(&b.columns));
        }
        (ObjectData::UniqueConstraint(a), ObjectData::UniqueConstraint(b)) => {
            differences.compare("columns", names(&a.columns), names(&b.columns));
        }
        (ObjectData::ForeignKey(a), ObjectData::ForeignKey(b)) => {
            differences.compare("columns", names(&a.columns), names(&b.columns));
            differences.compare(
                "referencedTable",
                Some(control.fold(&a.referenced_table)),
                Some(control.fold(&b.referenced_table)),
            );
            differences.compare(
                "referencedColumns",
                names(&a.referenced_columns),
                names(&b.referenced_columns),
            );
            differences.compare("onDelete", Some(action(a.on_delete)), Some(action(b.on_delete)));
            differences.compare("onUpdate", Some(action(a.on_update)), Some(action(b.on_update)));
        }
        (ObjectData::Sequence(a), ObjectData::Sequence(b)) => {
            let number = |v: Option<i64>| v.map(|v| v.to_string());
            differences.compare("startValue", number(a.start_value), number(b.start_value));
            differences.compare("incrementBy", number(a.increment_by), number(b.increment_by));
            differences.compare("minValue", number(a.min_value), number(b.min_value));
            differences.compare("maxValue", number(a.max_value), number(b.max_value));
            differences.compare(
                "ordered",
                a.ordered.map(|o| o.to_string()),
                b.ordered.map(|o| o.to_string()),
            );
        }
        _ => {}
    }
    differences
}

// unset and NO ACTION behave the same on every backend
fn action(action: Option<ForeignKeyAction>) -> String {
    action.unwrap_or(ForeignKeyAction::NoAction).as_sql().to_string()
}

fn normalize_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
