//! Per-mode collection hooks.
//!
//! A hook tells the cycle driver what to collect: the candidate universe,
//! the roots, the traversal filter, how to read an object's references,
//! and which ids each rescue pass must re-trace. Full and young-generation
//! cycles share the driver and differ only here.

use std::sync::Arc;

use tracing::{debug, warn};
use warren_object::{
    ClientStateManager, MutationCheckpoint, ObjectId, ObjectIdSet, ObjectManager,
};

use crate::filter::{EverythingFilter, Filter, SelectiveFilter};
use crate::info::GarbageCollectionInfo;
use crate::young::YoungGenChangeCollector;

pub(crate) trait GcHook {
    fn description(&self) -> &'static str;

    fn gc_info(&self, iteration: u64) -> GarbageCollectionInfo;

    /// Snapshot of the ids this cycle may collect.
    fn candidate_ids(&self) -> ObjectIdSet;

    /// Always-live ids traversal starts from.
    fn root_ids(&self, candidates: &ObjectIdSet) -> ObjectIdSet;

    fn cycle_filter(&self, candidates: &ObjectIdSet) -> Box<dyn Filter>;

    /// Borrow the object for `id`, copy out its references, release it.
    fn object_references_from(&self, id: ObjectId) -> ObjectIdSet;

    /// Ids a rescue pass must re-trace: everything clients hold live plus
    /// everything mutated since `since`.
    fn rescue_ids(&self, since: MutationCheckpoint) -> ObjectIdSet;

    fn checkpoint(&self) -> MutationCheckpoint;

    fn wait_until_ready_to_gc(&self);

    /// Hand the final garbage set to the object manager.
    fn delete_objects(&self, garbage: &ObjectIdSet);

    /// Whether this cycle runs the pause protocol. Young-generation
    /// cycles rely on their restricted scope instead.
    fn requires_pause(&self) -> bool;

    fn start_monitoring_changes(&self);

    fn stop_monitoring_changes(&self);
}

fn client_and_mutated_ids(
    client_state: &dyn ClientStateManager,
    object_manager: &dyn ObjectManager,
    since: MutationCheckpoint,
) -> ObjectIdSet {
    let mut rescue = ObjectIdSet::new();
    client_state.add_referenced_ids_to(&mut rescue);
    let client_held = rescue.len();
    rescue.union_with(&object_manager.mutated_since(since));
    debug!(
        total = rescue.len(),
        client_held,
        mutated = rescue.len() - client_held,
        "rescue roots"
    );
    rescue
}

pub(crate) struct FullGcHook {
    object_manager: Arc<dyn ObjectManager>,
    client_state: Arc<dyn ClientStateManager>,
    young: Arc<dyn YoungGenChangeCollector>,
}

impl FullGcHook {
    pub(crate) fn new(
        object_manager: Arc<dyn ObjectManager>,
        client_state: Arc<dyn ClientStateManager>,
        young: Arc<dyn YoungGenChangeCollector>,
    ) -> Self {
        FullGcHook {
            object_manager,
            client_state,
            young,
        }
    }
}

impl GcHook for FullGcHook {
    fn description(&self) -> &'static str {
        "full"
    }

    fn gc_info(&self, iteration: u64) -> GarbageCollectionInfo {
        GarbageCollectionInfo::new(iteration, true)
    }

    fn candidate_ids(&self) -> ObjectIdSet {
        self.object_manager.all_object_ids()
    }

    fn root_ids(&self, _candidates: &ObjectIdSet) -> ObjectIdSet {
        self.object_manager.root_ids()
    }

    fn cycle_filter(&self, _candidates: &ObjectIdSet) -> Box<dyn Filter> {
        Box::new(EverythingFilter)
    }

    fn object_references_from(&self, id: ObjectId) -> ObjectIdSet {
        match self.object_manager.lookup(id) {
            Some(object) => {
                let references = object.reference_set();
                self.object_manager.release(object);
                references
            }
            None => {
                // A creating transaction has published the id but not yet
                // initialized the object; rescue will see it.
                warn!(%id, "looked up an object before it was initialized, skipping");
                ObjectIdSet::new()
            }
        }
    }

    fn rescue_ids(&self, since: MutationCheckpoint) -> ObjectIdSet {
        client_and_mutated_ids(self.client_state.as_ref(), self.object_manager.as_ref(), since)
    }

    fn checkpoint(&self) -> MutationCheckpoint {
        self.object_manager.checkpoint()
    }

    fn wait_until_ready_to_gc(&self) {
        self.object_manager.wait_until_ready_to_gc();
    }

    fn delete_objects(&self, garbage: &ObjectIdSet) {
        self.object_manager.delete_objects(garbage);
    }

    fn requires_pause(&self) -> bool {
        true
    }

    fn start_monitoring_changes(&self) {
        self.young.start_monitoring_changes();
    }

    fn stop_monitoring_changes(&self) {
        self.young.stop_monitoring_changes();
    }
}

pub(crate) struct YoungGcHook {
    object_manager: Arc<dyn ObjectManager>,
    client_state: Arc<dyn ClientStateManager>,
    young: Arc<dyn YoungGenChangeCollector>,
}

impl YoungGcHook {
    pub(crate) fn new(
        object_manager: Arc<dyn ObjectManager>,
        client_state: Arc<dyn ClientStateManager>,
        young: Arc<dyn YoungGenChangeCollector>,
    ) -> Self {
        YoungGcHook {
            object_manager,
            client_state,
            young,
        }
    }
}

impl GcHook for YoungGcHook {
    fn description(&self) -> &'static str {
        "young"
    }

    fn gc_info(&self, iteration: u64) -> GarbageCollectionInfo {
        GarbageCollectionInfo::new(iteration, false)
    }

    fn candidate_ids(&self) -> ObjectIdSet {
        let mut candidates = ObjectIdSet::new();
        self.young.add_young_candidates_to(&mut candidates);
        candidates
    }

    fn root_ids(&self, candidates: &ObjectIdSet) -> ObjectIdSet {
        // Resident old-generation objects are treated as roots: a young
        // object they reference is live even though the restricted scope
        // will not trace the old generation itself.
        let mut roots = self.object_manager.cached_object_ids();
        for candidate in candidates.iter() {
            roots.remove(candidate);
        }
        roots.union_with(&self.object_manager.root_ids());
        roots.union_with(&self.young.remembered_set());
        roots
    }

    fn cycle_filter(&self, candidates: &ObjectIdSet) -> Box<dyn Filter> {
        Box::new(SelectiveFilter::new(candidates.clone()))
    }

    fn object_references_from(&self, id: ObjectId) -> ObjectIdSet {
        match self.object_manager.lookup_cached(id) {
            Some(object) => {
                let references = object.reference_set();
                self.object_manager.release(object);
                references
            }
            // Not resident; the rescue pass covers inward references.
            None => ObjectIdSet::new(),
        }
    }

    fn rescue_ids(&self, since: MutationCheckpoint) -> ObjectIdSet {
        let mut rescue = client_and_mutated_ids(
            self.client_state.as_ref(),
            self.object_manager.as_ref(),
            since,
        );
        // The remembered set may have grown since the roots snapshot.
        rescue.union_with(&self.young.remembered_set());
        rescue
    }

    fn checkpoint(&self) -> MutationCheckpoint {
        self.object_manager.checkpoint()
    }

    fn wait_until_ready_to_gc(&self) {
        self.object_manager.wait_until_ready_to_gc();
    }

    fn delete_objects(&self, garbage: &ObjectIdSet) {
        self.object_manager.delete_objects(garbage);
    }

    fn requires_pause(&self) -> bool {
        false
    }

    fn start_monitoring_changes(&self) {
        self.young.start_monitoring_changes();
    }

    fn stop_monitoring_changes(&self) {
        self.young.stop_monitoring_changes();
    }
}

/// Hook for the test-facing [`collect`](crate::MarkAndSweepCollector::collect)
/// entry point: caller-supplied filter, roots and universe over the full
/// collection machinery.
pub(crate) struct ScopedGcHook {
    object_manager: Arc<dyn ObjectManager>,
    client_state: Arc<dyn ClientStateManager>,
    young: Arc<dyn YoungGenChangeCollector>,
    filter: Arc<dyn Filter>,
    roots: ObjectIdSet,
    universe: ObjectIdSet,
}

impl ScopedGcHook {
    pub(crate) fn new(
        object_manager: Arc<dyn ObjectManager>,
        client_state: Arc<dyn ClientStateManager>,
        young: Arc<dyn YoungGenChangeCollector>,
        filter: Arc<dyn Filter>,
        roots: ObjectIdSet,
        universe: ObjectIdSet,
    ) -> Self {
        ScopedGcHook {
            object_manager,
            client_state,
            young,
            filter,
            roots,
            universe,
        }
    }
}

impl GcHook for ScopedGcHook {
    fn description(&self) -> &'static str {
        "scoped"
    }

    fn gc_info(&self, iteration: u64) -> GarbageCollectionInfo {
        GarbageCollectionInfo::new(iteration, true)
    }

    fn candidate_ids(&self) -> ObjectIdSet {
        self.universe.clone()
    }

    fn root_ids(&self, _candidates: &ObjectIdSet) -> ObjectIdSet {
        self.roots.clone()
    }

    fn cycle_filter(&self, _candidates: &ObjectIdSet) -> Box<dyn Filter> {
        Box::new(SharedFilter(self.filter.clone()))
    }

    fn object_references_from(&self, id: ObjectId) -> ObjectIdSet {
        match self.object_manager.lookup(id) {
            Some(object) => {
                let references = object.reference_set();
                self.object_manager.release(object);
                references
            }
            None => ObjectIdSet::new(),
        }
    }

    fn rescue_ids(&self, since: MutationCheckpoint) -> ObjectIdSet {
        client_and_mutated_ids(self.client_state.as_ref(), self.object_manager.as_ref(), since)
    }

    fn checkpoint(&self) -> MutationCheckpoint {
        self.object_manager.checkpoint()
    }

    fn wait_until_ready_to_gc(&self) {
        self.object_manager.wait_until_ready_to_gc();
    }

    fn delete_objects(&self, garbage: &ObjectIdSet) {
        self.object_manager.delete_objects(garbage);
    }

    fn requires_pause(&self) -> bool {
        true
    }

    fn start_monitoring_changes(&self) {
        self.young.start_monitoring_changes();
    }

    fn stop_monitoring_changes(&self) {
        self.young.stop_monitoring_changes();
    }
}

struct SharedFilter(Arc<dyn Filter>);

impl Filter for SharedFilter {
    fn should_visit(&self, id: ObjectId) -> bool {
        self.0.should_visit(id)
    }
}
