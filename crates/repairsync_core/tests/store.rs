//! Store behaviour across restarts and under arbitrary edit sequences.

use proptest::prelude::*;
use repairsync_core::{
    EntityKind, FileBackend, ManualClock, Millis, Record, RecordStore, StoreError,
};
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn file_store_survives_restart() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));

    let (customer_id, order_id) = {
        let backend = Arc::new(FileBackend::open(dir.path()).unwrap());
        let store = RecordStore::open(backend, clock.clone()).unwrap();

        let customer = store
            .save(EntityKind::Customer, Record::new().with("name", "Marta"))
            .unwrap();
        let order = store
            .save(
                EntityKind::RepairOrder,
                Record::new()
                    .with("customer_id", customer.id().unwrap())
                    .with("device", "laptop"),
            )
            .unwrap();
        store
            .delete(EntityKind::Customer, customer.id().unwrap())
            .unwrap();

        (customer.id.unwrap(), order.id.unwrap())
    };

    let backend = Arc::new(FileBackend::open(dir.path()).unwrap());
    let store = RecordStore::open(backend, clock).unwrap();

    let customer = store.get(EntityKind::Customer, &customer_id).unwrap();
    assert!(customer.is_deleted());
    assert_eq!(customer.get_str("name"), Some("Marta"));

    let order = store.get(EntityKind::RepairOrder, &order_id).unwrap();
    assert!(order.is_deleted());
    assert_eq!(order.get_str("device"), Some("laptop"));
}

#[test]
fn store_directory_is_exclusive() {
    let dir = tempdir().unwrap();
    let _held = FileBackend::open(dir.path()).unwrap();
    assert!(matches!(
        FileBackend::open(dir.path()),
        Err(StoreError::Locked)
    ));
}

#[derive(Debug, Clone)]
enum Step {
    Save,
    Delete,
    ClockJump(i64),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::Save),
        1 => Just(Step::Delete),
        2 => (-5_000i64..5_000).prop_map(Step::ClockJump),
    ]
}

proptest! {
    #[test]
    fn modified_at_strictly_increases(steps in prop::collection::vec(step(), 1..40)) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = RecordStore::builder().clock(clock.clone()).build().unwrap();

        let first = store.save(EntityKind::Invoice, Record::new()).unwrap();
        let id = first.id.clone().unwrap();
        let mut last: Millis = first.modified_millis().unwrap();

        for step in steps {
            match step {
                Step::Save => {
                    let current = store.get(EntityKind::Invoice, &id).unwrap();
                    store.save(EntityKind::Invoice, current).unwrap();
                }
                Step::Delete => {
                    store.delete(EntityKind::Invoice, &id).unwrap();
                }
                Step::ClockJump(delta) => {
                    clock.set(clock_now(&clock) + delta);
                    continue;
                }
            }

            let now = store.get(EntityKind::Invoice, &id).unwrap();
            let modified = now.modified_millis().unwrap();
            prop_assert!(modified > last, "{modified} <= {last}");
            prop_assert_eq!(now.id.as_deref(), Some(id.as_str()));
            prop_assert_eq!(now.created_at.clone(), first.created_at.clone());
            last = modified;
        }
    }
}

fn clock_now(clock: &ManualClock) -> Millis {
    use repairsync_core::Clock;
    clock.now_millis()
}
