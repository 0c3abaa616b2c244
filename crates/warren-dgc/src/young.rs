//! Young-generation change tracking.
//!
//! A young-generation cycle only considers objects created since the last
//! full cycle, so something must remember which ids those are and which of
//! them are referenced from objects that have since been paged out to the
//! old generation (the remembered set). The transaction pipeline drives
//! this tracker through the collector's `notify_*` passthroughs.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use warren_object::{ManagedObject, ObjectId, ObjectIdSet};

/// Creation lifecycle of a young id. Only initialized objects are
/// collection candidates; an uninitialized one belongs to an in-flight
/// creating transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum YoungState {
    Uninitialized,
    Initialized,
}

pub(crate) trait YoungGenChangeCollector: Send + Sync {
    fn notify_object_created(&self, id: ObjectId);
    fn notify_object_initialized(&self, id: ObjectId);
    fn notify_objects_evicted(&self, evicted: &[ManagedObject]);
    fn add_young_candidates_to(&self, out: &mut ObjectIdSet);
    fn remembered_set(&self) -> ObjectIdSet;
    fn remove_garbage(&self, garbage: &ObjectIdSet);
    fn start_monitoring_changes(&self);
    fn stop_monitoring_changes(&self);
}

/// Installed when young-generation collection is disabled.
pub(crate) struct NullYoungGenCollector;

impl YoungGenChangeCollector for NullYoungGenCollector {
    fn notify_object_created(&self, _id: ObjectId) {}
    fn notify_object_initialized(&self, _id: ObjectId) {}
    fn notify_objects_evicted(&self, _evicted: &[ManagedObject]) {}
    fn add_young_candidates_to(&self, _out: &mut ObjectIdSet) {}
    fn remembered_set(&self) -> ObjectIdSet {
        ObjectIdSet::new()
    }
    fn remove_garbage(&self, _garbage: &ObjectIdSet) {}
    fn start_monitoring_changes(&self) {}
    fn stop_monitoring_changes(&self) {}
}

struct YoungGenState {
    young: FxHashMap<ObjectId, YoungState>,
    remembered: ObjectIdSet,
    monitoring: bool,
}

impl YoungGenState {
    fn forget(&mut self, id: ObjectId) {
        self.young.remove(&id);
        if !self.monitoring {
            // While a cycle is running, an id that leaves the young table
            // (faulted out, becoming old generation) must keep its inward
            // remembered entry, or a reachable young object would look
            // unreached to the restricted scope.
            self.remembered.remove(id);
        }
    }
}

/// Tracks young ids and the remembered set between full cycles.
pub(crate) struct YoungGenTracker {
    state: Mutex<YoungGenState>,
}

impl YoungGenTracker {
    pub(crate) fn new() -> Self {
        YoungGenTracker {
            state: Mutex::new(YoungGenState {
                young: FxHashMap::default(),
                remembered: ObjectIdSet::new(),
                monitoring: false,
            }),
        }
    }
}

impl YoungGenChangeCollector for YoungGenTracker {
    fn notify_object_created(&self, id: ObjectId) {
        let mut state = self.state.lock();
        let previous = state.young.insert(id, YoungState::Uninitialized);
        assert!(
            previous.is_none(),
            "{id} created twice (was {previous:?})"
        );
    }

    fn notify_object_initialized(&self, id: ObjectId) {
        let mut state = self.state.lock();
        let previous = state.young.insert(id, YoungState::Initialized);
        assert!(
            previous == Some(YoungState::Uninitialized),
            "{id} initialized but was {previous:?}"
        );
    }

    fn notify_objects_evicted(&self, evicted: &[ManagedObject]) {
        let mut state = self.state.lock();
        for object in evicted {
            state.forget(object.id());
            let young_refs: Vec<ObjectId> = object
                .references()
                .filter(|id| state.young.contains_key(id))
                .collect();
            state.remembered.extend(young_refs);
        }
    }

    fn add_young_candidates_to(&self, out: &mut ObjectIdSet) {
        let state = self.state.lock();
        out.extend(
            state
                .young
                .iter()
                .filter(|(_, s)| **s == YoungState::Initialized)
                .map(|(id, _)| *id),
        );
    }

    fn remembered_set(&self) -> ObjectIdSet {
        self.state.lock().remembered.clone()
    }

    fn remove_garbage(&self, garbage: &ObjectIdSet) {
        let mut state = self.state.lock();
        for id in garbage.iter() {
            state.forget(id);
        }
    }

    fn start_monitoring_changes(&self) {
        let mut state = self.state.lock();
        assert!(!state.monitoring, "change monitoring already started");
        state.monitoring = true;
    }

    fn stop_monitoring_changes(&self) {
        let mut state = self.state.lock();
        assert!(state.monitoring, "change monitoring was not started");
        state.monitoring = false;
        // Drop remembered entries for ids that stopped being young while
        // the cycle ran.
        let still_young: ObjectIdSet = state
            .remembered
            .iter()
            .filter(|id| state.young.contains_key(id))
            .collect();
        state.remembered = still_young;
    }
}
