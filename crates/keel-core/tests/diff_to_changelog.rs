//! Integration tests for turning a schema diff into changes.
//!
//! Each test builds a reference and a comparison snapshot, diffs them and
//! checks the ordered change list, and in places the SQL it renders to.

mod common;

use common::{changes, descriptions, names, shop, shop_indexed_on};
use keel_core::prelude::*;
use pretty_assertions::assert_eq;

// =============================================================================
// Missing objects
// =============================================================================

#[test]
fn primary_key_does_not_emit_its_backing_index() {
    let mut reference = Snapshot::new();
    let t = reference.add_table(Table::new("t"));
    reference.add_column(t, Column::new("id", DataType::Int).not_null());
    let index = reference.add_index(t, Index::new("IX_T_PK", ["id"]).unique());
    reference.add_primary_key(t, PrimaryKey::new(["id"]).backed_by(index));

    // the key is created explicitly where ALTER TABLE can add it
    let postgres = changes(&reference, &Snapshot::new(), &PostgresDatabase::new());
    assert_eq!(names(&postgres), ["createTable", "addPrimaryKey"]);

    // and inline where it cannot
    let sqlite = changes(&reference, &Snapshot::new(), &SqliteDatabase::new());
    assert_eq!(names(&sqlite), ["createTable"]);
    let Change::CreateTable { columns, .. } = &sqlite[0] else {
        panic!("Expected createTable, got {:?}", sqlite[0]);
    };
    assert!(columns[0].primary_key);
}

#[test]
fn auto_increment_key_is_declared_inline() {
    let mut reference = Snapshot::new();
    let users = reference.add_table(Table::new("users"));
    reference.add_column(users, Column::new("id", DataType::BigInt).not_null().auto_increment());
    reference.add_column(users, Column::new("name", DataType::Text));
    reference.add_primary_key(users, PrimaryKey::new(["id"]).named("pk_users"));

    let changes = changes(&reference, &Snapshot::new(), &PostgresDatabase::new());
    assert_eq!(names(&changes), ["createTable"]);
    let Change::CreateTable { columns, .. } = &changes[0] else {
        panic!("Expected createTable, got {:?}", changes[0]);
    };
    assert!(columns[0].primary_key && columns[0].auto_increment);
    assert_eq!(columns[0].primary_key_name.as_deref(), Some("pk_users"));
    assert!(!columns[1].primary_key);
}

#[test]
fn tables_are_created_before_foreign_keys() {
    let changes = changes(&shop(), &Snapshot::new(), &PostgresDatabase::new());
    assert_eq!(
        descriptions(&changes),
        [
            "Create table 'customers'",
            "Create table 'orders'",
            "Add primary key to table 'customers'",
            "Add primary key to table 'orders'",
            "Add foreign key 'fk_orders_customer' to table 'orders'",
            "Create index 'ix_orders_placed' on table 'orders'",
        ]
    );
}

#[test]
fn missing_column_on_existing_table() {
    let mut reference = Snapshot::new();
    let customers = reference.add_table(Table::new("customers"));
    reference.add_column(customers, Column::new("id", DataType::Int).not_null());
    reference.add_column(customers, Column::new("email", DataType::Varchar(Some(255))));

    let mut comparison = Snapshot::new();
    let customers = comparison.add_table(Table::new("customers"));
    comparison.add_column(customers, Column::new("id", DataType::Int).not_null());

    let changes = changes(&reference, &comparison, &SqliteDatabase::new());
    assert_eq!(descriptions(&changes), ["Add column 'email' to table 'customers'"]);
}

#[test]
fn view_columns_are_not_added() {
    let mut reference = Snapshot::new();
    let view = reference.add_view(View::new("active_users", "SELECT id FROM users"));
    reference.add_column(view, Column::new("id", DataType::Int));

    let changes = changes(&reference, &Snapshot::new(), &SqliteDatabase::new());
    assert_eq!(names(&changes), ["createView"]);
}

#[test]
fn generated_changes_render_on_postgres() {
    let registry = build_default_registry();
    let database = PostgresDatabase::new();
    let sql: Vec<String> = changes(&shop(), &Snapshot::new(), &database)
        .iter()
        .flat_map(|change| change.generate_statements(&database))
        .flat_map(|statement| registry.generate_sql(&statement, &database).unwrap())
        .map(|sql| sql.text().to_string())
        .collect();
    assert_eq!(
        sql,
        [
            "CREATE TABLE customers (id INTEGER NOT NULL, email VARCHAR(255) NOT NULL)",
            "CREATE TABLE orders (id INTEGER NOT NULL, customer_id INTEGER NOT NULL, placed_at TIMESTAMP)",
            "ALTER TABLE customers ADD CONSTRAINT pk_customers PRIMARY KEY (id)",
            "ALTER TABLE orders ADD CONSTRAINT pk_orders PRIMARY KEY (id)",
            "ALTER TABLE orders ADD CONSTRAINT fk_orders_customer FOREIGN KEY (customer_id) \
             REFERENCES customers (id) ON DELETE CASCADE",
            "CREATE INDEX ix_orders_placed ON orders (placed_at)",
        ]
    );
}

// =============================================================================
// Unexpected objects
// =============================================================================

#[test]
fn dropped_table_subsumes_its_children() {
    let mut comparison = shop();
    let legacy = comparison.add_table(Table::new("legacy_orders"));
    comparison.add_column(legacy, Column::new("id", DataType::Int).not_null());
    comparison.add_column(legacy, Column::new("customer_id", DataType::Int));
    comparison.add_primary_key(legacy, PrimaryKey::new(["id"]).named("pk_legacy"));
    comparison.add_index(legacy, Index::new("ix_legacy_customer", ["customer_id"]));
    comparison.add_foreign_key(
        legacy,
        ForeignKey::new(["customer_id"], "customers", ["id"]).named("fk_legacy_customer"),
    );

    let changes = changes(&shop(), &comparison, &PostgresDatabase::new());
    assert_eq!(
        descriptions(&changes),
        [
            "Drop foreign key 'fk_legacy_customer' from table 'legacy_orders'",
            "Drop table 'legacy_orders'",
        ]
    );
}

#[test]
fn drops_run_in_reverse_dependency_order() {
    let changes = changes(&Snapshot::new(), &shop(), &PostgresDatabase::new());
    assert_eq!(
        names(&changes),
        ["dropForeignKeyConstraint", "dropTable", "dropTable"]
    );
}

#[test]
fn foreign_key_drops_come_first() {
    let build = |linked: bool| {
        let mut snapshot = Snapshot::new();
        let teams = snapshot.add_table(Table::new("teams"));
        snapshot.add_column(teams, Column::new("id", DataType::Int).not_null());
        let members = snapshot.add_table(Table::new("members"));
        snapshot.add_column(members, Column::new("id", DataType::Int).not_null());
        snapshot.add_column(members, Column::new("team_id", DataType::Int));
        if linked {
            snapshot.add_foreign_key(
                members,
                ForeignKey::new(["team_id"], "teams", ["id"]).named("fk_members_team"),
            );
        }
        snapshot
    };
    let mut reference = build(false);
    let fresh = reference.add_table(Table::new("fresh"));
    reference.add_column(fresh, Column::new("id", DataType::Int));

    let changes = changes(&reference, &build(true), &PostgresDatabase::new());
    assert_eq!(
        descriptions(&changes),
        [
            "Drop foreign key 'fk_members_team' from table 'members'",
            "Create table 'fresh'",
        ]
    );
}

#[test]
fn creates_come_before_drops() {
    let mut reference = Snapshot::new();
    let fresh = reference.add_table(Table::new("fresh"));
    reference.add_column(fresh, Column::new("id", DataType::Int));

    let mut comparison = Snapshot::new();
    let stale = comparison.add_table(Table::new("stale"));
    comparison.add_column(stale, Column::new("id", DataType::Int));

    let changes = changes(&reference, &comparison, &SqliteDatabase::new());
    assert_eq!(
        descriptions(&changes),
        ["Create table 'fresh'", "Drop table 'stale'"]
    );
}

// =============================================================================
// Changed objects
// =============================================================================

#[test]
fn changed_column_attributes() {
    let mut reference = Snapshot::new();
    let users = reference.add_table(Table::new("users"));
    reference.add_column(
        users,
        Column::new("status", DataType::Varchar(Some(50)))
            .not_null()
            .default_value(LiteralValue::Text("active".into())),
    );

    let mut comparison = Snapshot::new();
    let users = comparison.add_table(Table::new("users"));
    comparison.add_column(users, Column::new("status", DataType::Varchar(Some(20))));

    let changes = changes(&reference, &comparison, &PostgresDatabase::new());
    assert_eq!(
        descriptions(&changes),
        [
            "Change type of 'users.status' to VARCHAR(50)",
            "Add not null constraint to 'users.status'",
            "Add default value to 'users.status'",
        ]
    );
    let Change::AddDefaultValue { default_value, .. } = &changes[2] else {
        panic!("Expected addDefaultValue, got {:?}", changes[2]);
    };
    assert_eq!(default_value, &DefaultValue::Text("active".into()));
}

#[test]
fn changed_primary_key_is_replaced_once() {
    let build = |columns: &[&str]| {
        let mut snapshot = Snapshot::new();
        let t = snapshot.add_table(Table::new("memberships"));
        snapshot.add_column(t, Column::new("user_id", DataType::Int).not_null());
        snapshot.add_column(t, Column::new("group_id", DataType::Int).not_null());
        let index = snapshot.add_index(t, Index::new("pk_memberships", columns.iter().copied()).unique());
        snapshot.add_primary_key(
            t,
            PrimaryKey::new(columns.iter().copied())
                .named("pk_memberships")
                .backed_by(index),
        );
        snapshot
    };

    let changes = changes(
        &build(&["user_id", "group_id"]),
        &build(&["user_id"]),
        &PostgresDatabase::new(),
    );
    assert_eq!(names(&changes), ["dropPrimaryKey", "addPrimaryKey"]);
    let Change::AddPrimaryKey { column_names, .. } = &changes[1] else {
        panic!("Expected addPrimaryKey, got {:?}", changes[1]);
    };
    assert_eq!(column_names, &["user_id", "group_id"]);
}

#[test]
fn changed_index_is_dropped_and_recreated() {
    let changes = changes(
        &shop(),
        &shop_indexed_on(&["customer_id", "placed_at"]),
        &PostgresDatabase::new(),
    );
    assert_eq!(
        descriptions(&changes),
        [
            "Drop index 'ix_orders_placed'",
            "Create index 'ix_orders_placed' on table 'orders'",
        ]
    );
}

#[test]
fn changed_sequence_alters_each_attribute() {
    let mut reference = Snapshot::new();
    reference.add_sequence(Sequence::new("order_seq").increment_by(5).max_value(1000).start_value(1));
    let mut comparison = Snapshot::new();
    comparison.add_sequence(Sequence::new("order_seq").increment_by(1).max_value(500).start_value(1));

    let changes = changes(&reference, &comparison, &PostgresDatabase::new());
    assert_eq!(
        changes,
        [
            Change::AlterSequence {
                schema_name: None,
                sequence_name: "order_seq".into(),
                increment_by: Some(5),
                min_value: None,
                max_value: None,
                ordered: None,
            },
            Change::AlterSequence {
                schema_name: None,
                sequence_name: "order_seq".into(),
                increment_by: None,
                min_value: None,
                max_value: Some(1000),
                ordered: None,
            },
        ]
    );
}

#[test]
fn changed_start_value_alone_emits_nothing() {
    let mut reference = Snapshot::new();
    reference.add_sequence(Sequence::new("order_seq").start_value(100));
    let mut comparison = Snapshot::new();
    comparison.add_sequence(Sequence::new("order_seq").start_value(1));

    let diff = compare(&reference, &comparison, &CompareControl::default());
    assert!(!diff.is_empty());
    assert!(changes(&reference, &comparison, &PostgresDatabase::new()).is_empty());
}

#[test]
fn changed_view_is_replaced() {
    let mut reference = Snapshot::new();
    reference.add_view(View::new("recent", "SELECT * FROM orders WHERE placed_at > '2024-01-01'"));
    let mut comparison = Snapshot::new();
    comparison.add_view(View::new("recent", "SELECT * FROM orders"));

    let changes = changes(&reference, &comparison, &SqliteDatabase::new());
    let [Change::CreateView {
        replace_if_exists,
        select_query,
        ..
    }] = changes.as_slice()
    else {
        panic!("Expected one createView, got {changes:?}");
    };
    assert!(*replace_if_exists);
    assert!(select_query.contains("placed_at"));
}

// =============================================================================
// Change sets
// =============================================================================

#[test]
fn change_sets_are_numbered_from_the_root() {
    let reference = shop();
    let target = Snapshot::new();
    let diff = compare(&reference, &target, &CompareControl::default());
    let registry = build_default_change_generators();
    let change_sets = DiffToChangeLog::new(&registry)
        .generate_change_sets(&diff, &PostgresDatabase::new(), "1700000000", "keel")
        .unwrap();

    assert_eq!(change_sets.len(), 6);
    assert_eq!(change_sets[0].id, "1700000000-1");
    assert_eq!(change_sets[5].id, "1700000000-6");
    assert!(change_sets
        .iter()
        .all(|cs| cs.author == "keel" && cs.changes.len() == 1));
}

#[test]
fn schema_names_are_written_on_request() {
    let mut reference = Snapshot::with_default_schema("app");
    let users = reference.add_table(Table::new("users"));
    reference.add_column(users, Column::new("id", DataType::Int));
    let target = Snapshot::with_default_schema("app");
    let diff = compare(&reference, &target, &CompareControl::default());
    let registry = build_default_change_generators();

    let plain = DiffToChangeLog::new(&registry)
        .generate_changes(&diff, &PostgresDatabase::new())
        .unwrap();
    assert!(matches!(&plain[0], Change::CreateTable { schema_name: None, .. }));

    let qualified = DiffToChangeLog::new(&registry)
        .with_control(DiffOutputControl::new().include_schema(true))
        .generate_changes(&diff, &PostgresDatabase::new())
        .unwrap();
    assert!(matches!(
        &qualified[0],
        Change::CreateTable { schema_name: Some(s), .. } if s == "app"
    ));
}
