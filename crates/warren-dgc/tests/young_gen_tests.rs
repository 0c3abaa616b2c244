//! Young-generation cycles: restricted scope, remembered set, no pause.

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::{InMemoryObjectManager, RecordingListener, TestClientStateManager, id, ids};
use warren_dgc::{GcConfig, MarkAndSweepCollector};
use warren_object::{ObjectId, ObjectManager};

fn collector_over(manager: Arc<InMemoryObjectManager>) -> MarkAndSweepCollector {
    let gc = MarkAndSweepCollector::new(
        manager,
        Arc::new(TestClientStateManager::new()),
        GcConfig::default(),
    );
    gc.start();
    gc
}

/// Create a young object: stored in the manager and announced to the
/// collector the way the transaction pipeline would.
fn create_young(
    manager: &InMemoryObjectManager,
    gc: &MarkAndSweepCollector,
    object_id: ObjectId,
    targets: &[ObjectId],
) {
    gc.notify_object_created(object_id);
    manager.create(object_id, targets);
    gc.notify_object_initialized(object_id);
}

#[test]
fn self_contained_young_garbage_is_collected_without_pausing() {
    let manager = Arc::new(InMemoryObjectManager::new());
    manager.create(id(1), &[id(2)]);
    manager.create(id(2), &[]);
    manager.add_root("root", id(1));

    let gc = collector_over(manager.clone());
    let listener = Arc::new(RecordingListener::new());
    gc.add_listener(listener.clone());

    // A young cycle of objects with no inward edge from the old
    // generation.
    create_young(&manager, &gc, id(10), &[id(11)]);
    create_young(&manager, &gc, id(11), &[id(10)]);

    let deleted = gc.gc_young().unwrap();
    assert_eq!(deleted, ids(&[10, 11]));
    assert!(!manager.contains(id(10)));
    assert!(!manager.contains(id(11)));

    let events = listener.event_names();
    assert!(!events.contains(&"pausing"));
    assert!(!events.contains(&"paused"));
    let completed = listener.snapshot("completed");
    assert!(!completed.is_full_cycle());
    assert_eq!(completed.paused_stage_time(), Duration::ZERO);
    assert_eq!(completed.begin_object_count(), 2);

    // Collected ids are no longer candidates.
    assert!(gc.gc_young().unwrap().is_empty());
}

#[test]
fn young_object_survives_while_old_generation_references_it() {
    let manager = Arc::new(InMemoryObjectManager::new());
    manager.create(id(1), &[id(2)]);
    manager.add_root("root", id(1));

    let gc = collector_over(manager.clone());
    create_young(&manager, &gc, id(10), &[]);
    // Old-generation object 2 holds the only edge to young 10.
    manager.create(id(2), &[id(10)]);

    assert!(gc.gc_young().unwrap().is_empty());
    assert!(manager.contains(id(10)));

    manager.set_reference(id(2), 0, ObjectId::NULL);
    assert_eq!(gc.gc_young().unwrap(), ids(&[10]));
}

/// An old-generation referrer paged out of the cache cannot be traced by
/// the restricted scope; the remembered set must keep its young target
/// alive.
#[test]
fn remembered_set_protects_targets_of_evicted_objects() {
    let manager = Arc::new(InMemoryObjectManager::new());
    manager.create(id(1), &[]);
    manager.add_root("root", id(1));

    let gc = collector_over(manager.clone());
    create_young(&manager, &gc, id(10), &[]);
    manager.create(id(2), &[id(10)]);

    let evicted = manager.evict(&ids(&[2]));
    assert_eq!(evicted.len(), 1);
    gc.notify_objects_evicted(&evicted);

    assert!(gc.gc_young().unwrap().is_empty());
    assert!(manager.contains(id(10)));
}

#[test]
fn uninitialized_objects_are_not_candidates() {
    let manager = Arc::new(InMemoryObjectManager::new());
    manager.create(id(1), &[]);
    manager.add_root("root", id(1));

    let gc = collector_over(manager.clone());
    // Creation announced, but the creating transaction has not committed.
    gc.notify_object_created(id(10));

    assert!(gc.gc_young().unwrap().is_empty());

    manager.create(id(10), &[]);
    gc.notify_object_initialized(id(10));
    assert_eq!(gc.gc_young().unwrap(), ids(&[10]));
}

/// A full cycle clears collected ids out of the young tracking, so a
/// following young cycle starts from a clean slate.
#[test]
fn full_cycle_retires_collected_young_ids() {
    let manager = Arc::new(InMemoryObjectManager::new());
    manager.create(id(1), &[id(2)]);
    manager.create(id(2), &[]);
    manager.add_root("root", id(1));

    let gc = collector_over(manager.clone());
    create_young(&manager, &gc, id(10), &[]);
    create_young(&manager, &gc, id(11), &[]);
    manager.add_reference(id(2), id(11));

    let deleted = gc.gc_full().unwrap();
    assert_eq!(deleted, ids(&[10]));

    // 11 is still young and still held by the old generation.
    assert!(gc.gc_young().unwrap().is_empty());
    assert!(manager.contains(id(11)));

    manager.set_reference(id(2), 0, ObjectId::NULL);
    assert_eq!(gc.gc_young().unwrap(), ids(&[11]));
}

#[test]
fn young_cycle_sees_only_the_young_universe() {
    let manager = Arc::new(InMemoryObjectManager::new());
    manager.create(id(1), &[id(2)]);
    manager.create(id(2), &[id(3)]);
    manager.create(id(3), &[]);
    // Old-generation garbage: only a full cycle may touch it.
    manager.create(id(4), &[]);
    manager.add_root("root", id(1));

    let gc = collector_over(manager.clone());
    create_young(&manager, &gc, id(10), &[]);

    assert_eq!(gc.gc_young().unwrap(), ids(&[10]));
    assert!(manager.contains(id(4)), "old garbage is out of scope");

    assert_eq!(gc.gc_full().unwrap(), ids(&[4]));
}
