//! Built-in listeners: phase logging and cycle statistics.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::info::GarbageCollectionInfo;
use crate::listener::GarbageCollectorEventListener;

/// Logs one line per phase boundary. Registered by the collector at
/// construction; `verbose` raises the lines from `debug` to `info`.
pub struct GcLogListener {
    verbose: bool,
}

impl GcLogListener {
    /// Create the listener.
    pub fn new(verbose: bool) -> Self {
        GcLogListener { verbose }
    }

    fn log(&self, info: &GarbageCollectionInfo, message: std::fmt::Arguments<'_>) {
        let mode = if info.is_full_cycle() { "full" } else { "young" };
        if self.verbose {
            info!(iteration = info.iteration(), mode, "DGC: {message}");
        } else {
            debug!(iteration = info.iteration(), mode, "DGC: {message}");
        }
    }
}

impl GarbageCollectorEventListener for GcLogListener {
    fn gc_start(&self, info: &GarbageCollectionInfo) {
        self.log(info, format_args!("cycle started"));
    }

    fn gc_mark(&self, info: &GarbageCollectionInfo) {
        self.log(
            info,
            format_args!("marking, {} candidates", info.begin_object_count()),
        );
    }

    fn gc_mark_results(&self, info: &GarbageCollectionInfo) {
        self.log(
            info,
            format_args!("mark done, {} unreached", info.pre_rescue_count()),
        );
    }

    fn gc_rescue1_complete(&self, info: &GarbageCollectionInfo) {
        self.log(
            info,
            format_args!("rescue 1 done, {} unreached", info.rescue1_count()),
        );
    }

    fn gc_pausing(&self, info: &GarbageCollectionInfo) {
        self.log(info, format_args!("pausing mutators"));
    }

    fn gc_paused(&self, info: &GarbageCollectionInfo) {
        self.log(info, format_args!("paused"));
    }

    fn gc_rescue2_start(&self, info: &GarbageCollectionInfo) {
        self.log(info, format_args!("rescue 2 starting"));
    }

    fn gc_mark_complete(&self, info: &GarbageCollectionInfo) {
        self.log(
            info,
            format_args!("{} candidate garbage objects", info.candidate_garbage_count()),
        );
    }

    fn gc_delete(&self, info: &GarbageCollectionInfo) {
        self.log(
            info,
            format_args!(
                "deleted {} objects in {:?}",
                info.deleted_ids().len(),
                info.delete_stage_time()
            ),
        );
    }

    fn gc_completed(&self, info: &GarbageCollectionInfo) {
        self.log(
            info,
            format_args!("cycle complete in {:?}", info.elapsed_time()),
        );
    }
}

/// Snapshot of one completed cycle, taken at `cycle_completed`.
#[derive(Debug, Clone)]
pub struct GcCycleStats {
    /// Cycle sequence number.
    pub iteration: u64,
    /// True for a full cycle.
    pub full_cycle: bool,
    /// Candidate universe size at mark start.
    pub begin_object_count: usize,
    /// Final candidate garbage count.
    pub candidate_garbage_count: usize,
    /// Objects actually deleted.
    pub deleted_count: usize,
    /// Time mutators were held paused (zero for young cycles).
    pub paused_stage_time: Duration,
    /// Whole-cycle wall time.
    pub elapsed_time: Duration,
}

/// Listener accumulating per-cycle statistics for the management plane
/// and tests.
#[derive(Default)]
pub struct GcStatsRecorder {
    cycles: Mutex<Vec<GcCycleStats>>,
}

impl GcStatsRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        GcStatsRecorder::default()
    }

    /// All recorded cycles, oldest first.
    pub fn cycles(&self) -> Vec<GcCycleStats> {
        self.cycles.lock().clone()
    }

    /// The most recently completed cycle.
    pub fn last(&self) -> Option<GcCycleStats> {
        self.cycles.lock().last().cloned()
    }
}

impl GarbageCollectorEventListener for GcStatsRecorder {
    fn gc_cycle_completed(&self, info: &GarbageCollectionInfo) {
        self.cycles.lock().push(GcCycleStats {
            iteration: info.iteration(),
            full_cycle: info.is_full_cycle(),
            begin_object_count: info.begin_object_count(),
            candidate_garbage_count: info.candidate_garbage_count(),
            deleted_count: info.deleted_ids().len(),
            paused_stage_time: info.paused_stage_time(),
            elapsed_time: info.elapsed_time(),
        });
    }
}
