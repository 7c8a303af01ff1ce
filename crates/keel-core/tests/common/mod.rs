#![allow(dead_code)]

use keel_core::prelude::*;

/// `customers` and `orders`, with keys, a foreign key between them and
/// the indexes backing each constraint.
pub fn shop() -> Snapshot {
    shop_indexed_on(&["placed_at"])
}

/// [`shop`] with `ix_orders_placed` on the given columns.
pub fn shop_indexed_on(placed_index: &[&str]) -> Snapshot {
    let mut snapshot = Snapshot::new();

    let customers = snapshot.add_table(Table::new("customers"));
    snapshot.add_column(customers, Column::new("id", DataType::Int).not_null());
    snapshot.add_column(customers, Column::new("email", DataType::Varchar(Some(255))).not_null());
    let customers_pk = snapshot.add_index(customers, Index::new("pk_customers", ["id"]).unique());
    snapshot.add_primary_key(
        customers,
        PrimaryKey::new(["id"]).named("pk_customers").backed_by(customers_pk),
    );

    let orders = snapshot.add_table(Table::new("orders"));
    snapshot.add_column(orders, Column::new("id", DataType::Int).not_null());
    snapshot.add_column(orders, Column::new("customer_id", DataType::Int).not_null());
    snapshot.add_column(orders, Column::new("placed_at", DataType::DateTime));
    let orders_pk = snapshot.add_index(orders, Index::new("pk_orders", ["id"]).unique());
    snapshot.add_primary_key(
        orders,
        PrimaryKey::new(["id"]).named("pk_orders").backed_by(orders_pk),
    );
    let customer_index = snapshot.add_index(orders, Index::new("ix_orders_customer", ["customer_id"]));
    snapshot.add_foreign_key(
        orders,
        ForeignKey::new(["customer_id"], "customers", ["id"])
            .named("fk_orders_customer")
            .on_delete(ForeignKeyAction::Cascade)
            .backed_by(customer_index),
    );
    snapshot.add_index(orders, Index::new("ix_orders_placed", placed_index.iter().copied()));

    snapshot
}

/// Generates the changes that turn `comparison` into `reference`.
pub fn changes(reference: &Snapshot, comparison: &Snapshot, database: &dyn Database) -> Vec<Change> {
    let diff = compare(reference, comparison, &CompareControl::default());
    let registry = build_default_change_generators();
    DiffToChangeLog::new(&registry)
        .generate_changes(&diff, database)
        .unwrap_or_else(|e| panic!("Failed to generate changes: {e}"))
}

pub fn names(changes: &[Change]) -> Vec<&'static str> {
    changes.iter().map(Change::name).collect()
}

pub fn descriptions(changes: &[Change]) -> Vec<String> {
    changes.iter().map(Change::description).collect()
}
