//! The collector: state machine and cycle entry points.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};
use warren_object::{
    ClientStateManager, ManagedObject, ObjectId, ObjectIdSet, ObjectManager,
};

use crate::config::GcConfig;
use crate::cycle::GcCycle;
use crate::error::GcError;
use crate::filter::Filter;
use crate::hook::{FullGcHook, GcHook, ScopedGcHook, YoungGcHook};
use crate::listener::{GarbageCollectorEventListener, GcEventPublisher};
use crate::logging::GcLogListener;
use crate::young::{NullYoungGenCollector, YoungGenChangeCollector, YoungGenTracker};

/// Observable lifecycle of the collector.
///
/// One cycle walks `Idle → Marking → MarkComplete → [Pausing → Paused] →
/// Deleting → CycleComplete → Idle`; the pausing arc is skipped by
/// young-generation cycles. `Disabled` is reachable only from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// No cycle in flight.
    Idle,
    /// Administratively disabled; cycles are refused.
    Disabled,
    /// Mark traversal and rescue 1 are running against live mutators.
    Marking,
    /// The unpaused portion is done; the candidate set awaits rescue 2.
    MarkComplete,
    /// Mutators were asked to stop admitting new commits.
    Pausing,
    /// All in-flight commits drained; rescue 2 may run.
    Paused,
    /// Garbage is final; deletion proceeds with mutators resumed.
    Deleting,
    /// Deletion finished; cycle bookkeeping is wrapping up.
    CycleComplete,
}

/// Concurrent mark-and-sweep collector over the shared object graph.
///
/// `gc_full` and `gc_young` run one cycle synchronously on the calling
/// thread; listeners observe each phase boundary. At most one cycle runs
/// at a time — concurrent requests are refused, never interleaved.
pub struct MarkAndSweepCollector {
    object_manager: Arc<dyn ObjectManager>,
    client_state: Arc<dyn ClientStateManager>,
    config: GcConfig,
    state: Mutex<CollectorState>,
    state_changed: Condvar,
    started: AtomicBool,
    iteration: AtomicU64,
    publisher: GcEventPublisher,
    young: Arc<dyn YoungGenChangeCollector>,
}

impl MarkAndSweepCollector {
    /// Create a collector over the given collaborators. A logging
    /// listener is registered up front; `config.verbose` controls its
    /// level.
    pub fn new(
        object_manager: Arc<dyn ObjectManager>,
        client_state: Arc<dyn ClientStateManager>,
        config: GcConfig,
    ) -> Self {
        let young: Arc<dyn YoungGenChangeCollector> = if config.young_enabled {
            Arc::new(YoungGenTracker::new())
        } else {
            Arc::new(NullYoungGenCollector)
        };
        let collector = MarkAndSweepCollector {
            object_manager,
            client_state,
            state: Mutex::new(CollectorState::Idle),
            state_changed: Condvar::new(),
            started: AtomicBool::new(false),
            iteration: AtomicU64::new(0),
            publisher: GcEventPublisher::new(),
            young,
            config,
        };
        collector.add_listener(Arc::new(GcLogListener::new(collector.config.verbose)));
        collector
    }

    /// Activate the collector subsystem.
    pub fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    /// Deactivate the collector. An in-flight cycle runs to completion
    /// (partial deletion would break the unreachability invariant); this
    /// waits for it, warning periodically if it takes long.
    pub fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
        let mut state = self.state.lock();
        let mut attempts = 0;
        while !matches!(*state, CollectorState::Idle | CollectorState::Disabled) {
            let timed_out = self
                .state_changed
                .wait_for(&mut state, Duration::from_secs(5))
                .timed_out();
            if timed_out {
                attempts += 1;
                warn!("collection cycle did not finish within 5s of stop()");
                if attempts >= 6 {
                    return;
                }
            }
        }
    }

    /// Whether the subsystem is active.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Register a listener; it sees every subsequent cycle's events.
    pub fn add_listener(&self, listener: Arc<dyn GarbageCollectorEventListener>) {
        self.publisher.add_listener(listener);
    }

    /// Run one full collection cycle. Returns the deleted ids.
    pub fn gc_full(&self) -> Result<ObjectIdSet, GcError> {
        let hook = FullGcHook::new(
            self.object_manager.clone(),
            self.client_state.clone(),
            self.young.clone(),
        );
        self.do_gc(&hook)
    }

    /// Run one young-generation cycle. Returns the deleted ids.
    pub fn gc_young(&self) -> Result<ObjectIdSet, GcError> {
        if !self.config.young_enabled {
            return Err(GcError::YoungGenDisabled);
        }
        let hook = YoungGcHook::new(
            self.object_manager.clone(),
            self.client_state.clone(),
            self.young.clone(),
        );
        self.do_gc(&hook)
    }

    /// Run one full cycle over a caller-supplied filter, root set and
    /// candidate universe. Returns the deleted ids. This is the
    /// test-facing entry; production triggers go through
    /// [`gc_full`](Self::gc_full) / [`gc_young`](Self::gc_young).
    pub fn collect(
        &self,
        filter: Arc<dyn Filter>,
        roots: ObjectIdSet,
        universe: ObjectIdSet,
    ) -> Result<ObjectIdSet, GcError> {
        let hook = ScopedGcHook::new(
            self.object_manager.clone(),
            self.client_state.clone(),
            self.young.clone(),
            filter,
            roots,
            universe,
        );
        self.do_gc(&hook)
    }

    fn do_gc(&self, hook: &dyn GcHook) -> Result<ObjectIdSet, GcError> {
        self.request_gc_start()?;
        let iteration = self.iteration.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GcCycle::new(self, hook, &self.publisher, iteration).run())
    }

    // --- State machine ---

    /// Admit a cycle: `Idle → Marking`. Refused while stopped, disabled,
    /// or with another cycle in flight.
    pub fn request_gc_start(&self) -> Result<(), GcError> {
        if !self.is_started() {
            debug!("collection refused: collector is stopped");
            return Err(GcError::Stopped);
        }
        let mut state = self.state.lock();
        match *state {
            CollectorState::Idle => {
                *state = CollectorState::Marking;
                Ok(())
            }
            CollectorState::Disabled => {
                debug!("collection refused: disabled");
                Err(GcError::Disabled)
            }
            current => {
                debug!(?current, "collection refused: cycle already in flight");
                Err(GcError::AlreadyRunning)
            }
        }
    }

    /// `Marking → MarkComplete`; the unpaused portion of the cycle ended.
    pub(crate) fn notify_mark_complete(&self) {
        let mut state = self.state.lock();
        assert_eq!(
            *state,
            CollectorState::Marking,
            "mark completed outside the marking state"
        );
        *state = CollectorState::MarkComplete;
    }

    /// Signal intent to pause mutators. From this point
    /// [`is_pausing_or_paused`](Self::is_pausing_or_paused) is true and
    /// the commit entry points must not admit new transactions.
    pub fn request_gc_pause(&self) {
        *self.state.lock() = CollectorState::Pausing;
    }

    /// Grant the pause once the commit pipeline has drained:
    /// `Pausing → Paused`. A no-op in any other state.
    pub fn notify_ready_to_gc(&self) {
        let mut state = self.state.lock();
        if *state == CollectorState::Pausing {
            *state = CollectorState::Paused;
        }
    }

    /// `Paused → Deleting` (or `MarkComplete → Deleting` for cycles that
    /// never pause). Leaving `Paused` is what lets mutators resume while
    /// deletion proceeds. Returns false if the cycle is not at either
    /// entry state.
    pub fn request_delete_start(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            CollectorState::Paused | CollectorState::MarkComplete => {
                *state = CollectorState::Deleting;
                true
            }
            _ => false,
        }
    }

    /// `Deleting → CycleComplete`.
    pub(crate) fn notify_cycle_complete(&self) {
        let mut state = self.state.lock();
        assert_eq!(
            *state,
            CollectorState::Deleting,
            "cycle completed outside the deleting state"
        );
        *state = CollectorState::CycleComplete;
    }

    /// Release the pause and return to `Idle`, waking anything blocked in
    /// [`stop`](Self::stop).
    pub fn notify_gc_complete(&self) {
        let mut state = self.state.lock();
        *state = CollectorState::Idle;
        self.state_changed.notify_all();
    }

    /// Disable collection: `Idle → Disabled`. Refused (returns false)
    /// while a cycle is in flight.
    pub fn disable_gc(&self) -> bool {
        let mut state = self.state.lock();
        if *state == CollectorState::Idle {
            *state = CollectorState::Disabled;
            true
        } else {
            warn!(current = ?*state, "cannot disable collection");
            false
        }
    }

    /// Re-enable collection: `Disabled → Idle`.
    pub fn enable_gc(&self) {
        let mut state = self.state.lock();
        if *state == CollectorState::Disabled {
            *state = CollectorState::Idle;
            self.state_changed.notify_all();
        } else {
            warn!(current = ?*state, "collection is already enabled");
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CollectorState {
        *self.state.lock()
    }

    /// True while mutators must not admit new transaction commits.
    /// Checked by every commit entry point.
    pub fn is_pausing_or_paused(&self) -> bool {
        matches!(
            *self.state.lock(),
            CollectorState::Pausing | CollectorState::Paused
        )
    }

    /// True once the pause has been granted.
    pub fn is_paused(&self) -> bool {
        *self.state.lock() == CollectorState::Paused
    }

    /// True while collection is administratively disabled.
    pub fn is_disabled(&self) -> bool {
        *self.state.lock() == CollectorState::Disabled
    }

    /// True while a cycle is in flight.
    pub fn is_gc_running(&self) -> bool {
        !matches!(
            *self.state.lock(),
            CollectorState::Idle | CollectorState::Disabled
        )
    }

    // --- Young-generation passthroughs (driven by the transaction pipeline) ---

    /// A transaction allocated a new shared object.
    pub fn notify_object_created(&self, id: ObjectId) {
        self.young.notify_object_created(id);
    }

    /// The creating transaction committed; the object is now a
    /// young-generation collection candidate.
    pub fn notify_object_initialized(&self, id: ObjectId) {
        self.young.notify_object_initialized(id);
    }

    /// The object manager paged these objects out to the old generation.
    pub fn notify_objects_evicted(&self, evicted: &[ManagedObject]) {
        self.young.notify_objects_evicted(evicted);
    }

    /// Collected ids stop being young-generation candidates.
    pub(crate) fn remove_young_garbage(&self, garbage: &ObjectIdSet) {
        self.young.remove_garbage(garbage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullObjectManager;

    impl ObjectManager for NullObjectManager {
        fn lookup(&self, _id: ObjectId) -> Option<ManagedObject> {
            None
        }
        fn lookup_cached(&self, _id: ObjectId) -> Option<ManagedObject> {
            None
        }
        fn release(&self, _object: ManagedObject) {}
        fn create_object(&self, _object: ManagedObject) {}
        fn evict(&self, _ids: &ObjectIdSet) -> Vec<ManagedObject> {
            Vec::new()
        }
        fn all_object_ids(&self) -> ObjectIdSet {
            ObjectIdSet::new()
        }
        fn cached_object_ids(&self) -> ObjectIdSet {
            ObjectIdSet::new()
        }
        fn root_ids(&self) -> ObjectIdSet {
            ObjectIdSet::new()
        }
        fn checkpoint(&self) -> u64 {
            0
        }
        fn mutated_since(&self, _since: u64) -> ObjectIdSet {
            ObjectIdSet::new()
        }
        fn wait_until_ready_to_gc(&self) {}
        fn delete_objects(&self, _garbage: &ObjectIdSet) {}
    }

    struct NullClientState;

    impl ClientStateManager for NullClientState {
        fn add_referenced_ids_to(&self, _out: &mut ObjectIdSet) {}
    }

    fn collector() -> MarkAndSweepCollector {
        MarkAndSweepCollector::new(
            Arc::new(NullObjectManager),
            Arc::new(NullClientState),
            GcConfig::default(),
        )
    }

    #[test]
    fn gc_refused_until_started() {
        let gc = collector();
        assert_eq!(gc.gc_full().unwrap_err(), GcError::Stopped);
        gc.start();
        assert!(gc.gc_full().is_ok());
        assert_eq!(gc.state(), CollectorState::Idle);
    }

    #[test]
    fn disable_refuses_cycles_until_enabled() {
        let gc = collector();
        gc.start();
        assert!(gc.disable_gc());
        assert!(gc.is_disabled());
        assert_eq!(gc.gc_full().unwrap_err(), GcError::Disabled);
        gc.enable_gc();
        assert!(gc.gc_full().is_ok());
    }

    #[test]
    fn disable_refused_mid_cycle() {
        let gc = collector();
        gc.start();
        gc.request_gc_start().unwrap();
        assert!(!gc.disable_gc());
        assert_eq!(gc.request_gc_start().unwrap_err(), GcError::AlreadyRunning);
        gc.notify_gc_complete();
    }

    #[test]
    fn pause_flag_follows_the_protocol() {
        let gc = collector();
        gc.start();
        assert!(!gc.is_pausing_or_paused());

        gc.request_gc_pause();
        assert!(gc.is_pausing_or_paused());
        assert!(!gc.is_paused());

        gc.notify_ready_to_gc();
        assert!(gc.is_pausing_or_paused());
        assert!(gc.is_paused());

        gc.notify_gc_complete();
        assert!(!gc.is_pausing_or_paused());
    }

    #[test]
    fn young_gc_refused_when_not_tracked() {
        let gc = MarkAndSweepCollector::new(
            Arc::new(NullObjectManager),
            Arc::new(NullClientState),
            GcConfig {
                young_enabled: false,
                ..GcConfig::default()
            },
        );
        gc.start();
        assert_eq!(gc.gc_young().unwrap_err(), GcError::YoungGenDisabled);
    }
}
