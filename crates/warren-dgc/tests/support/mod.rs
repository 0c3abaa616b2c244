//! In-memory collaborators for collector integration tests.

#![allow(dead_code)]

use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use warren_dgc::{GarbageCollectionInfo, GarbageCollectorEventListener};
use warren_object::{
    ClientStateManager, ManagedObject, MutationCheckpoint, ObjectId, ObjectIdSet, ObjectManager,
};

pub fn id(raw: u64) -> ObjectId {
    ObjectId::new(raw)
}

pub fn ids(raw: &[u64]) -> ObjectIdSet {
    raw.iter().copied().map(ObjectId::new).collect()
}

#[derive(Default)]
struct ManagerState {
    resident: FxHashMap<ObjectId, ManagedObject>,
    paged_out: FxHashMap<ObjectId, ManagedObject>,
    roots: FxHashMap<String, ObjectId>,
    mutation_log: Vec<(MutationCheckpoint, ObjectId)>,
    clock: MutationCheckpoint,
    in_flight_commits: usize,
    lookup_count: usize,
    release_count: usize,
    looked_up: ObjectIdSet,
    deleted: ObjectIdSet,
}

impl ManagerState {
    fn record_mutation(&mut self, id: ObjectId) {
        self.clock += 1;
        self.mutation_log.push((self.clock, id));
    }
}

/// Object store standing in for the server's object manager: named roots,
/// a resident/paged-out split, a mutation log, and enough accounting to
/// check the collector's borrow discipline.
#[derive(Default)]
pub struct InMemoryObjectManager {
    state: Mutex<ManagerState>,
    quiesced: Condvar,
    lookup_delay: Option<Duration>,
}

impl InMemoryObjectManager {
    pub fn new() -> Self {
        InMemoryObjectManager::default()
    }

    /// Slow every fault by `delay` so a test can interleave mutations
    /// with the mark traversal.
    pub fn with_lookup_delay(delay: Duration) -> Self {
        InMemoryObjectManager {
            lookup_delay: Some(delay),
            ..InMemoryObjectManager::default()
        }
    }

    /// Create an object whose slots reference `targets`.
    pub fn create(&self, object_id: ObjectId, targets: &[ObjectId]) {
        self.create_object(ManagedObject::new(object_id, targets.to_vec()));
    }

    pub fn add_root(&self, name: &str, root: ObjectId) {
        self.state.lock().roots.insert(name.to_string(), root);
    }

    pub fn remove_root(&self, name: &str) {
        self.state.lock().roots.remove(name);
    }

    /// Overwrite one reference slot, recording the mutation.
    pub fn set_reference(&self, object_id: ObjectId, slot: usize, target: ObjectId) {
        let mut state = self.state.lock();
        let object = state
            .resident
            .get_mut(&object_id)
            .expect("set_reference on unknown object");
        object.set_reference(slot, target);
        state.record_mutation(object_id);
    }

    /// Append a reference slot, recording the mutation.
    pub fn add_reference(&self, object_id: ObjectId, target: ObjectId) {
        let mut state = self.state.lock();
        let object = state
            .resident
            .get_mut(&object_id)
            .expect("add_reference on unknown object");
        object.add_reference(target);
        state.record_mutation(object_id);
    }

    /// A transaction commit began; the pause waits for its end.
    pub fn begin_commit(&self) {
        self.state.lock().in_flight_commits += 1;
    }

    pub fn end_commit(&self) {
        let mut state = self.state.lock();
        state.in_flight_commits -= 1;
        if state.in_flight_commits == 0 {
            self.quiesced.notify_all();
        }
    }

    pub fn contains(&self, object_id: ObjectId) -> bool {
        let state = self.state.lock();
        state.resident.contains_key(&object_id) || state.paged_out.contains_key(&object_id)
    }

    pub fn lookup_count(&self) -> usize {
        self.state.lock().lookup_count
    }

    pub fn release_count(&self) -> usize {
        self.state.lock().release_count
    }

    /// Ids the collector faulted in at least once.
    pub fn looked_up_ids(&self) -> ObjectIdSet {
        self.state.lock().looked_up.clone()
    }

    pub fn deleted_ids(&self) -> ObjectIdSet {
        self.state.lock().deleted.clone()
    }
}

impl ObjectManager for InMemoryObjectManager {
    fn lookup(&self, id: ObjectId) -> Option<ManagedObject> {
        if let Some(delay) = self.lookup_delay {
            std::thread::sleep(delay);
        }
        let mut state = self.state.lock();
        let object = state
            .resident
            .get(&id)
            .or_else(|| state.paged_out.get(&id))
            .cloned()?;
        state.lookup_count += 1;
        state.looked_up.insert(id);
        Some(object)
    }

    fn lookup_cached(&self, id: ObjectId) -> Option<ManagedObject> {
        let mut state = self.state.lock();
        let object = state.resident.get(&id).cloned()?;
        state.lookup_count += 1;
        state.looked_up.insert(id);
        Some(object)
    }

    fn release(&self, _object: ManagedObject) {
        self.state.lock().release_count += 1;
    }

    fn create_object(&self, object: ManagedObject) {
        let mut state = self.state.lock();
        let object_id = object.id();
        state.resident.insert(object_id, object);
        state.record_mutation(object_id);
    }

    fn evict(&self, ids: &ObjectIdSet) -> Vec<ManagedObject> {
        let mut state = self.state.lock();
        let mut evicted = Vec::new();
        for id in ids.iter() {
            if let Some(object) = state.resident.remove(&id) {
                state.paged_out.insert(id, object.clone());
                evicted.push(object);
            }
        }
        evicted
    }

    fn all_object_ids(&self) -> ObjectIdSet {
        let state = self.state.lock();
        state
            .resident
            .keys()
            .chain(state.paged_out.keys())
            .copied()
            .collect()
    }

    fn cached_object_ids(&self) -> ObjectIdSet {
        self.state.lock().resident.keys().copied().collect()
    }

    fn root_ids(&self) -> ObjectIdSet {
        self.state.lock().roots.values().copied().collect()
    }

    fn checkpoint(&self) -> MutationCheckpoint {
        self.state.lock().clock
    }

    fn mutated_since(&self, since: MutationCheckpoint) -> ObjectIdSet {
        let state = self.state.lock();
        state
            .mutation_log
            .iter()
            .filter(|(stamp, _)| *stamp > since)
            .map(|(_, id)| *id)
            .collect()
    }

    fn wait_until_ready_to_gc(&self) {
        let mut state = self.state.lock();
        while state.in_flight_commits > 0 {
            self.quiesced.wait(&mut state);
        }
    }

    fn delete_objects(&self, garbage: &ObjectIdSet) {
        let mut state = self.state.lock();
        for id in garbage.iter() {
            let removed = state.resident.remove(&id).or_else(|| state.paged_out.remove(&id));
            assert!(removed.is_some(), "asked to delete unknown object {id}");
            state.deleted.insert(id);
        }
    }
}

/// Client channel stand-in with a settable held-id set.
#[derive(Default)]
pub struct TestClientStateManager {
    held: Mutex<ObjectIdSet>,
}

impl TestClientStateManager {
    pub fn new() -> Self {
        TestClientStateManager::default()
    }

    pub fn set_held(&self, held: ObjectIdSet) {
        *self.held.lock() = held;
    }
}

impl ClientStateManager for TestClientStateManager {
    fn add_referenced_ids_to(&self, out: &mut ObjectIdSet) {
        out.union_with(&self.held.lock());
    }
}

/// Records every event with a snapshot of the cycle info at that moment.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<(&'static str, GarbageCollectionInfo)>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        RecordingListener::default()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|(name, _)| *name).collect()
    }

    pub fn snapshot(&self, event: &str) -> GarbageCollectionInfo {
        self.events
            .lock()
            .iter()
            .find(|(name, _)| *name == event)
            .map(|(_, info)| info.clone())
            .unwrap_or_else(|| panic!("event {event} never fired"))
    }

    fn record(&self, name: &'static str, info: &GarbageCollectionInfo) {
        self.events.lock().push((name, info.clone()));
    }
}

impl GarbageCollectorEventListener for RecordingListener {
    fn gc_start(&self, info: &GarbageCollectionInfo) {
        self.record("start", info);
    }
    fn gc_mark(&self, info: &GarbageCollectionInfo) {
        self.record("mark", info);
    }
    fn gc_mark_results(&self, info: &GarbageCollectionInfo) {
        self.record("mark_results", info);
    }
    fn gc_rescue1_complete(&self, info: &GarbageCollectionInfo) {
        self.record("rescue1_complete", info);
    }
    fn gc_pausing(&self, info: &GarbageCollectionInfo) {
        self.record("pausing", info);
    }
    fn gc_paused(&self, info: &GarbageCollectionInfo) {
        self.record("paused", info);
    }
    fn gc_rescue2_start(&self, info: &GarbageCollectionInfo) {
        self.record("rescue2_start", info);
    }
    fn gc_mark_complete(&self, info: &GarbageCollectionInfo) {
        self.record("mark_complete", info);
    }
    fn gc_delete(&self, info: &GarbageCollectionInfo) {
        self.record("delete", info);
    }
    fn gc_completed(&self, info: &GarbageCollectionInfo) {
        self.record("completed", info);
    }
    fn gc_cycle_completed(&self, info: &GarbageCollectionInfo) {
        self.record("cycle_completed", info);
    }
}
