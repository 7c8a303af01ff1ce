//! Change generator resolution and ordering.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, trace};

use super::{ChangeGenerator, DiffKind};
use crate::database::Database;
use crate::error::{KeelError, Result};
use crate::snapshot::ObjectType;

/// Change generators keyed by object type and diff kind.
#[derive(Default)]
pub struct ChangeGeneratorRegistry {
    generators: BTreeMap<(ObjectType, DiffKind), Vec<Box<dyn ChangeGenerator>>>,
}

impl fmt::Debug for ChangeGeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.generators.iter().map(|((ty, kind), gens)| {
                (
                    format!("{kind} {ty}"),
                    gens.iter().map(|g| g.name()).collect::<Vec<_>>(),
                )
            }))
            .finish()
    }
}

impl ChangeGeneratorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a generator.
    pub fn register<G: ChangeGenerator + 'static>(&mut self, generator: G) -> &mut Self {
        trace!(
            generator = generator.name(),
            object_type = %generator.object_type(),
            kind = %generator.kind(),
            "registering change generator"
        );
        self.generators
            .entry((generator.object_type(), generator.kind()))
            .or_default()
            .push(Box::new(generator));
        self
    }

    /// Removes every generator with the given name and returns how many
    /// were removed.
    pub fn unregister(&mut self, name: &str) -> usize {
        let mut removed = 0;
        for generators in self.generators.values_mut() {
            let before = generators.len();
            generators.retain(|g| g.name() != name);
            removed += before - generators.len();
        }
        removed
    }

    /// Returns the number of registered generators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generators.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the generator to use for one object type and diff kind, or
    /// `None` if no registered generator supports the database.
    ///
    /// # Errors
    ///
    /// [`KeelError::AmbiguousChangeGenerator`] if the top priority is
    /// shared.
    pub fn resolve(
        &self,
        object_type: ObjectType,
        kind: DiffKind,
        database: &dyn Database,
    ) -> Result<Option<&dyn ChangeGenerator>> {
        let mut candidates: Vec<&dyn ChangeGenerator> = self
            .generators
            .get(&(object_type, kind))
            .into_iter()
            .flatten()
            .filter(|g| g.supports(database))
            .map(|g| g.as_ref())
            .collect();
        candidates.sort_by(|a, b| b.priority().cmp(&a.priority()));
        let Some(best) = candidates.first() else {
            return Ok(None);
        };
        let tied: Vec<String> = candidates
            .iter()
            .filter(|g| g.priority() == best.priority())
            .map(|g| g.name().to_string())
            .collect();
        if tied.len() > 1 {
            return Err(KeelError::AmbiguousChangeGenerator {
                object_type,
                kind,
                candidates: tied,
            });
        }
        Ok(Some(*best))
    }

    /// Resolves the generators of one diff kind for the given object types
    /// and sorts them so that every run-after and run-before hint holds.
    /// Types without hints between them keep dependency order.
    ///
    /// # Errors
    ///
    /// Resolution errors, or [`KeelError::ContradictoryOrdering`] if the
    /// hints form a cycle.
    pub fn ordered(
        &self,
        kind: DiffKind,
        types: &[ObjectType],
        database: &dyn Database,
    ) -> Result<Vec<&dyn ChangeGenerator>> {
        let mut resolved: BTreeMap<ObjectType, &dyn ChangeGenerator> = BTreeMap::new();
        for object_type in types {
            if let Some(generator) = self.resolve(*object_type, kind, database)? {
                resolved.insert(*object_type, generator);
            }
        }

        // edges point from the type that must run first
        let mut edges: BTreeSet<(ObjectType, ObjectType)> = BTreeSet::new();
        for (object_type, generator) in &resolved {
            for after in generator.run_after() {
                if resolved.contains_key(after) && after != object_type {
                    edges.insert((*after, *object_type));
                }
            }
            for before in generator.run_before() {
                if resolved.contains_key(before) && before != object_type {
                    edges.insert((*object_type, *before));
                }
            }
        }

        let mut pending: BTreeSet<ObjectType> = resolved.keys().copied().collect();
        let mut order = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let ready = pending
                .iter()
                .copied()
                .find(|t| !edges.iter().any(|(from, to)| to == t && pending.contains(from)));
            let Some(next) = ready else {
                return Err(KeelError::ContradictoryOrdering {
                    kind,
                    types: pending.into_iter().collect(),
                });
            };
            pending.remove(&next);
            order.push(next);
        }
        debug!(
            kind = %kind,
            order = ?order,
            "ordered change generators"
        );

        Ok(order
            .into_iter()
            .filter_map(|t| resolved.get(&t).copied())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Change;
    use crate::changelog::{DiffObject, DiffOutputControl};
    use crate::database::{DatabaseKind, GenericDatabase, SqliteDatabase};
    use crate::diff::DiffResult;
    use crate::sqlgen::Priority;

    struct Hinted {
        name: &'static str,
        object_type: ObjectType,
        priority: Priority,
        after: Vec<ObjectType>,
        before: Vec<ObjectType>,
        sqlite_only: bool,
    }

    impl Hinted {
        fn new(name: &'static str, object_type: ObjectType) -> Self {
            Self {
                name,
                object_type,
                priority: Priority::Default,
                after: Vec::new(),
                before: Vec::new(),
                sqlite_only: false,
            }
        }
    }

    impl ChangeGenerator for Hinted {
        fn name(&self) -> &str {
            self.name
        }

        fn object_type(&self) -> ObjectType {
            self.object_type
        }

        fn kind(&self) -> DiffKind {
            DiffKind::Missing
        }

        fn priority(&self) -> Priority {
            self.priority
        }

        fn supports(&self, database: &dyn Database) -> bool {
            !self.sqlite_only || database.kind() == DatabaseKind::Sqlite
        }

        fn run_after(&self) -> &[ObjectType] {
            &self.after
        }

        fn run_before(&self) -> &[ObjectType] {
            &self.before
        }

        fn fix(
            &self,
            _: DiffObject<'_>,
            _: &DiffResult<'_>,
            _: &dyn Database,
            _: &mut DiffOutputControl,
        ) -> Vec<Change> {
            Vec::new()
        }
    }

    fn names(generators: &[&dyn ChangeGenerator]) -> Vec<String> {
        generators.iter().map(|g| g.name().to_string()).collect()
    }

    #[test]
    fn hints_override_dependency_order() {
        let mut registry = ChangeGeneratorRegistry::new();
        registry
            .register(Hinted {
                after: vec![ObjectType::Index],
                ..Hinted::new("table", ObjectType::Table)
            })
            .register(Hinted::new("index", ObjectType::Index))
            .register(Hinted::new("column", ObjectType::Column));
        let ordered = registry
            .ordered(
                DiffKind::Missing,
                &[ObjectType::Table, ObjectType::Column, ObjectType::Index],
                &GenericDatabase::new(),
            )
            .unwrap();
        assert_eq!(names(&ordered), ["column", "index", "table"]);
    }

    #[test]
    fn contradictory_hints_are_an_error() {
        let mut registry = ChangeGeneratorRegistry::new();
        registry
            .register(Hinted {
                before: vec![ObjectType::Column],
                ..Hinted::new("table", ObjectType::Table)
            })
            .register(Hinted {
                before: vec![ObjectType::Table],
                ..Hinted::new("column", ObjectType::Column)
            });
        let err = registry
            .ordered(
                DiffKind::Missing,
                &[ObjectType::Table, ObjectType::Column],
                &GenericDatabase::new(),
            )
            .err()
            .unwrap();
        assert!(matches!(
            err,
            KeelError::ContradictoryOrdering { kind: DiffKind::Missing, ref types }
                if types == &[ObjectType::Table, ObjectType::Column]
        ));
    }

    #[test]
    fn hints_to_unregistered_types_are_ignored() {
        let mut registry = ChangeGeneratorRegistry::new();
        registry.register(Hinted {
            after: vec![ObjectType::Sequence],
            ..Hinted::new("table", ObjectType::Table)
        });
        let ordered = registry
            .ordered(DiffKind::Missing, &[ObjectType::Table], &GenericDatabase::new())
            .unwrap();
        assert_eq!(names(&ordered), ["table"]);
    }

    #[test]
    fn database_specific_generator_wins() {
        let mut registry = ChangeGeneratorRegistry::new();
        registry
            .register(Hinted::new("generic", ObjectType::Table))
            .register(Hinted {
                priority: Priority::Database,
                sqlite_only: true,
                ..Hinted::new("sqlite", ObjectType::Table)
            });
        let pick = |db: &dyn Database| {
            registry
                .resolve(ObjectType::Table, DiffKind::Missing, db)
                .unwrap()
                .map(|g| g.name().to_string())
        };
        assert_eq!(pick(&SqliteDatabase::new()).as_deref(), Some("sqlite"));
        assert_eq!(pick(&GenericDatabase::new()).as_deref(), Some("generic"));
        assert_eq!(
            registry
                .resolve(ObjectType::View, DiffKind::Missing, &GenericDatabase::new())
                .unwrap()
                .map(|g| g.name().to_string()),
            None
        );
    }

    #[test]
    fn tied_generators_are_ambiguous() {
        let mut registry = ChangeGeneratorRegistry::new();
        registry
            .register(Hinted::new("a", ObjectType::Table))
            .register(Hinted::new("b", ObjectType::Table));
        let err = registry
            .resolve(ObjectType::Table, DiffKind::Missing, &GenericDatabase::new())
            .err()
            .unwrap();
        assert!(matches!(err, KeelError::AmbiguousChangeGenerator { ref candidates, .. } if candidates.len() == 2));
        assert_eq!(registry.unregister("b"), 1);
        assert!(registry
            .resolve(ObjectType::Table, DiffKind::Missing, &GenericDatabase::new())
            .is_ok());
    }
}
