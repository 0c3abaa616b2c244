//! Per-cycle bookkeeping record.

use std::time::Duration;

use warren_object::ObjectIdSet;

/// Timings and counts accumulated over one collection cycle.
///
/// One instance exists per cycle and is handed to every listener event.
/// Fields are write-once-per-phase: each holds a "not initialized"
/// sentinel until its phase completes. Reading a field before its phase
/// has run is a bug in the caller, not the collector, and the accessor
/// panics with the field name.
#[derive(Debug, Clone)]
pub struct GarbageCollectionInfo {
    iteration: u64,
    full_cycle: bool,
    begin_object_count: Option<usize>,
    pre_rescue_count: Option<usize>,
    rescue1_count: Option<usize>,
    mark_stage_time: Option<Duration>,
    candidate_garbage_count: Option<usize>,
    paused_stage_time: Option<Duration>,
    rescue_times: Vec<Duration>,
    deleted_ids: Option<ObjectIdSet>,
    delete_stage_time: Option<Duration>,
    elapsed_time: Option<Duration>,
}

fn read<T>(field: Option<T>, name: &str) -> T {
    match field {
        Some(value) => value,
        None => panic!("GarbageCollectionInfo::{name} read before its phase completed"),
    }
}

impl GarbageCollectionInfo {
    pub(crate) fn new(iteration: u64, full_cycle: bool) -> Self {
        GarbageCollectionInfo {
            iteration,
            full_cycle,
            begin_object_count: None,
            pre_rescue_count: None,
            rescue1_count: None,
            mark_stage_time: None,
            candidate_garbage_count: None,
            paused_stage_time: None,
            rescue_times: Vec::new(),
            deleted_ids: None,
            delete_stage_time: None,
            elapsed_time: None,
        }
    }

    /// Sequence number of this cycle, starting at 1.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// True for a full cycle, false for young-generation.
    pub fn is_full_cycle(&self) -> bool {
        self.full_cycle
    }

    /// Size of the candidate universe when the mark phase started.
    pub fn begin_object_count(&self) -> usize {
        read(self.begin_object_count, "begin_object_count")
    }

    /// Candidates still unreached after the mark traversal, before any
    /// rescue pass.
    pub fn pre_rescue_count(&self) -> usize {
        read(self.pre_rescue_count, "pre_rescue_count")
    }

    /// Candidates still unreached after rescue 1.
    pub fn rescue1_count(&self) -> usize {
        read(self.rescue1_count, "rescue1_count")
    }

    /// Wall time of the unpaused portion of the cycle (mark + rescue 1).
    pub fn mark_stage_time(&self) -> Duration {
        read(self.mark_stage_time, "mark_stage_time")
    }

    /// Final candidate garbage count, fixed after rescue 2.
    pub fn candidate_garbage_count(&self) -> usize {
        read(self.candidate_garbage_count, "candidate_garbage_count")
    }

    /// Wall time mutators were held paused. Zero for cycles that never
    /// pause (young generation).
    pub fn paused_stage_time(&self) -> Duration {
        read(self.paused_stage_time, "paused_stage_time")
    }

    /// Wall time of each rescue pass, in order.
    pub fn rescue_times(&self) -> &[Duration] {
        &self.rescue_times
    }

    /// Ids handed to the object manager for deletion.
    pub fn deleted_ids(&self) -> &ObjectIdSet {
        match &self.deleted_ids {
            Some(ids) => ids,
            None => panic!("GarbageCollectionInfo::deleted_ids read before its phase completed"),
        }
    }

    /// Wall time of the delete phase.
    pub fn delete_stage_time(&self) -> Duration {
        read(self.delete_stage_time, "delete_stage_time")
    }

    /// Wall time of the whole cycle.
    pub fn elapsed_time(&self) -> Duration {
        read(self.elapsed_time, "elapsed_time")
    }

    pub(crate) fn set_begin_object_count(&mut self, count: usize) {
        self.begin_object_count = Some(count);
    }

    pub(crate) fn set_pre_rescue_count(&mut self, count: usize) {
        self.pre_rescue_count = Some(count);
    }

    pub(crate) fn set_rescue1_count(&mut self, count: usize) {
        self.rescue1_count = Some(count);
    }

    pub(crate) fn set_mark_stage_time(&mut self, elapsed: Duration) {
        self.mark_stage_time = Some(elapsed);
    }

    pub(crate) fn set_candidate_garbage_count(&mut self, count: usize) {
        self.candidate_garbage_count = Some(count);
    }

    pub(crate) fn set_paused_stage_time(&mut self, elapsed: Duration) {
        self.paused_stage_time = Some(elapsed);
    }

    pub(crate) fn push_rescue_time(&mut self, elapsed: Duration) {
        self.rescue_times.push(elapsed);
    }

    pub(crate) fn set_deleted_ids(&mut self, ids: ObjectIdSet) {
        self.deleted_ids = Some(ids);
    }

    pub(crate) fn set_delete_stage_time(&mut self, elapsed: Duration) {
        self.delete_stage_time = Some(elapsed);
    }

    pub(crate) fn set_elapsed_time(&mut self, elapsed: Duration) {
        self.elapsed_time = Some(elapsed);
    }
}
