//! Phase-event listener contract and dispatch.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;

use crate::info::GarbageCollectionInfo;

/// Observer notified at each phase boundary of a collection cycle.
///
/// Every method defaults to a no-op, so implementations override only the
/// events they care about. For one cycle the callbacks fire exactly once
/// each, in canonical order: start, mark, mark_results, rescue1_complete,
/// \[pausing, paused\] (full cycles only), rescue2_start, mark_complete,
/// delete, completed, cycle_completed. A panic inside a listener is
/// contained by the publisher and never aborts the cycle.
#[allow(unused_variables)]
pub trait GarbageCollectorEventListener: Send + Sync {
    /// A cycle was admitted and is about to mark.
    fn gc_start(&self, info: &GarbageCollectionInfo) {}
    /// Root and candidate sets are snapshotted; traversal begins.
    fn gc_mark(&self, info: &GarbageCollectionInfo) {}
    /// The unpaused mark traversal finished.
    fn gc_mark_results(&self, info: &GarbageCollectionInfo) {}
    /// The first (unpaused) rescue pass finished.
    fn gc_rescue1_complete(&self, info: &GarbageCollectionInfo) {}
    /// The collector asked mutators to stop admitting new commits.
    fn gc_pausing(&self, info: &GarbageCollectionInfo) {}
    /// All in-flight commits drained; the pause is granted.
    fn gc_paused(&self, info: &GarbageCollectionInfo) {}
    /// The second rescue pass is starting.
    fn gc_rescue2_start(&self, info: &GarbageCollectionInfo) {}
    /// The candidate garbage set is final.
    fn gc_mark_complete(&self, info: &GarbageCollectionInfo) {}
    /// The garbage set was handed to the object manager for deletion.
    fn gc_delete(&self, info: &GarbageCollectionInfo) {}
    /// Deletion finished; overall cycle statistics are final.
    fn gc_completed(&self, info: &GarbageCollectionInfo) {}
    /// Cycle bookkeeping is done and the collector is back to idle.
    fn gc_cycle_completed(&self, info: &GarbageCollectionInfo) {}
}

/// Ordered fan-out of phase events to registered listeners.
///
/// Listeners are invoked in registration order. Each invocation is
/// isolated: a panicking listener is logged and the remaining listeners
/// still see the event.
#[derive(Default)]
pub(crate) struct GcEventPublisher {
    listeners: RwLock<Vec<Arc<dyn GarbageCollectorEventListener>>>,
}

macro_rules! fire {
    ($name:ident, $method:ident) => {
        pub(crate) fn $name(&self, info: &GarbageCollectionInfo) {
            self.dispatch(info, stringify!($method), |listener, info| {
                listener.$method(info)
            });
        }
    };
}

impl GcEventPublisher {
    pub(crate) fn new() -> Self {
        GcEventPublisher::default()
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn GarbageCollectorEventListener>) {
        self.listeners.write().push(listener);
    }

    fn dispatch(
        &self,
        info: &GarbageCollectionInfo,
        event: &str,
        invoke: impl Fn(&dyn GarbageCollectorEventListener, &GarbageCollectionInfo),
    ) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| invoke(listener.as_ref(), info)));
            if outcome.is_err() {
                error!(
                    event,
                    iteration = info.iteration(),
                    "collection listener panicked; continuing with remaining listeners"
                );
            }
        }
    }

    fire!(fire_start, gc_start);
    fire!(fire_mark, gc_mark);
    fire!(fire_mark_results, gc_mark_results);
    fire!(fire_rescue1_complete, gc_rescue1_complete);
    fire!(fire_pausing, gc_pausing);
    fire!(fire_paused, gc_paused);
    fire!(fire_rescue2_start, gc_rescue2_start);
    fire!(fire_mark_complete, gc_mark_complete);
    fire!(fire_delete, gc_delete);
    fire!(fire_completed, gc_completed);
    fire!(fire_cycle_completed, gc_cycle_completed);
}
