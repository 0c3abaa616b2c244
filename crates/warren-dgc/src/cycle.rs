//! One collection cycle: mark → rescue 1 → pause → rescue 2 → delete.
//!
//! The driver owns no policy of its own; the hook supplies candidates,
//! roots, filter and rescue ids, and the collector's state machine gates
//! the phase transitions. Traversal prunes the candidate snapshot in
//! place: an id removed from the snapshot has been reached, and whatever
//! survives every pass is garbage.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, info};
use warren_object::{MutationCheckpoint, ObjectId, ObjectIdSet};

use crate::collector::MarkAndSweepCollector;
use crate::filter::Filter;
use crate::hook::GcHook;
use crate::info::GarbageCollectionInfo;
use crate::listener::GcEventPublisher;

pub(crate) struct GcCycle<'a> {
    collector: &'a MarkAndSweepCollector,
    hook: &'a dyn GcHook,
    publisher: &'a GcEventPublisher,
    iteration: u64,
}

impl<'a> GcCycle<'a> {
    pub(crate) fn new(
        collector: &'a MarkAndSweepCollector,
        hook: &'a dyn GcHook,
        publisher: &'a GcEventPublisher,
        iteration: u64,
    ) -> Self {
        GcCycle {
            collector,
            hook,
            publisher,
            iteration,
        }
    }

    /// Run the cycle to completion and return the deleted ids.
    ///
    /// The caller has already moved the collector to `Marking`; this
    /// returns with it back at `Idle`.
    pub(crate) fn run(&self) -> ObjectIdSet {
        let cycle_start = Instant::now();
        let mut gc_info = self.hook.gc_info(self.iteration);
        info!(
            iteration = self.iteration,
            mode = self.hook.description(),
            "collection cycle starting"
        );
        self.publisher.fire_start(&gc_info);
        self.hook.start_monitoring_changes();

        // Mark: trace the candidate snapshot from the roots, unpaused.
        let mark_start = Instant::now();
        let mark_checkpoint = self.hook.checkpoint();
        let mut unreached = self.hook.candidate_ids();
        let roots = self.hook.root_ids(&unreached);
        let filter = self.hook.cycle_filter(&unreached);
        gc_info.set_begin_object_count(unreached.len());
        self.publisher.fire_mark(&gc_info);

        self.trace(filter.as_ref(), &roots, &mut unreached);
        gc_info.set_pre_rescue_count(unreached.len());
        self.publisher.fire_mark_results(&gc_info);

        // Rescue 1: close over mutations that raced the mark, still
        // unpaused.
        let rescue1_checkpoint = self.hook.checkpoint();
        let rescue1_start = Instant::now();
        self.rescue(mark_checkpoint, filter.as_ref(), &mut unreached);
        gc_info.push_rescue_time(rescue1_start.elapsed());
        gc_info.set_rescue1_count(unreached.len());
        self.publisher.fire_rescue1_complete(&gc_info);
        gc_info.set_mark_stage_time(mark_start.elapsed());
        self.collector.notify_mark_complete();

        // Rescue 2: the pass that makes the unreached set exact. Full
        // cycles buy exactness with the pause window; young cycles rely
        // on their restricted scope and stay unpaused.
        if self.hook.requires_pause() {
            let pause_start = Instant::now();
            self.collector.request_gc_pause();
            self.publisher.fire_pausing(&gc_info);
            self.hook.wait_until_ready_to_gc();
            self.collector.notify_ready_to_gc();
            assert!(
                self.collector.is_paused(),
                "pause requested but not granted"
            );
            self.publisher.fire_paused(&gc_info);

            self.publisher.fire_rescue2_start(&gc_info);
            let rescue2_start = Instant::now();
            self.rescue(rescue1_checkpoint, filter.as_ref(), &mut unreached);
            gc_info.push_rescue_time(rescue2_start.elapsed());
            gc_info.set_paused_stage_time(pause_start.elapsed());
        } else {
            self.publisher.fire_rescue2_start(&gc_info);
            let rescue2_start = Instant::now();
            self.rescue(rescue1_checkpoint, filter.as_ref(), &mut unreached);
            gc_info.push_rescue_time(rescue2_start.elapsed());
            gc_info.set_paused_stage_time(std::time::Duration::ZERO);
        }
        self.hook.stop_monitoring_changes();
        gc_info.set_candidate_garbage_count(unreached.len());
        self.publisher.fire_mark_complete(&gc_info);

        let deleted = self.delete_garbage(&mut gc_info, unreached);

        gc_info.set_elapsed_time(cycle_start.elapsed());
        self.publisher.fire_completed(&gc_info);
        self.collector.notify_cycle_complete();
        self.publisher.fire_cycle_completed(&gc_info);
        self.collector.notify_gc_complete();
        info!(
            iteration = self.iteration,
            deleted = deleted.len(),
            elapsed_ms = gc_info.elapsed_time().as_millis() as u64,
            "collection cycle finished"
        );
        deleted
    }

    /// Breadth-first trace from `roots`, pruning reached ids out of
    /// `unreached`. Objects are borrowed per visit and released before
    /// the next; membership in `unreached` doubles as the visited check,
    /// so cycles in the graph terminate naturally.
    fn trace(&self, filter: &dyn Filter, roots: &ObjectIdSet, unreached: &mut ObjectIdSet) {
        let mut to_visit: VecDeque<ObjectId> = VecDeque::new();
        for root in roots.iter() {
            unreached.remove(root);
            to_visit.push_back(root);
        }
        while let Some(id) = to_visit.pop_front() {
            for reference in self.hook.object_references_from(id).iter() {
                if unreached.contains(reference) && filter.should_visit(reference) {
                    unreached.remove(reference);
                    to_visit.push_back(reference);
                }
            }
        }
    }

    /// Re-trace from everything clients hold live plus everything mutated
    /// since `since`.
    fn rescue(
        &self,
        since: MutationCheckpoint,
        filter: &dyn Filter,
        unreached: &mut ObjectIdSet,
    ) {
        let rescue_roots = self.hook.rescue_ids(since);
        self.trace(filter, &rescue_roots, unreached);
    }

    /// Hand the final garbage set to the object manager. Deletion is
    /// applied as one whole set, never streamed while recomputation is
    /// still possible, and runs with mutators already resumed.
    fn delete_garbage(
        &self,
        gc_info: &mut GarbageCollectionInfo,
        garbage: ObjectIdSet,
    ) -> ObjectIdSet {
        let delete_start = Instant::now();
        assert!(
            self.collector.request_delete_start(),
            "delete phase entered from an unexpected state"
        );
        self.collector.remove_young_garbage(&garbage);

        self.hook.delete_objects(&garbage);
        debug!(
            iteration = self.iteration,
            count = garbage.len(),
            "garbage deleted"
        );
        gc_info.set_deleted_ids(garbage.clone());
        gc_info.set_delete_stage_time(delete_start.elapsed());
        self.publisher.fire_delete(gc_info);
        garbage
    }
}
