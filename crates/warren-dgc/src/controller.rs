//! Management control surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;
use warren_object::ObjectIdSet;

use crate::collector::MarkAndSweepCollector;
use crate::error::GcError;

/// Operator-facing trigger for collection cycles.
///
/// Sits between the management plane and the collector, adding the
/// cluster-role check: a passive replica receives its object deletions
/// from the active server and must never collect on its own.
pub struct GcController {
    collector: Arc<MarkAndSweepCollector>,
    active: AtomicBool,
}

impl GcController {
    /// Create a controller. The node starts passive until promoted.
    pub fn new(collector: Arc<MarkAndSweepCollector>) -> Self {
        GcController {
            collector,
            active: AtomicBool::new(false),
        }
    }

    /// Reflect the node's cluster role.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Whether this node is the active server.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Trigger one full cycle. Refused on a passive node, while disabled,
    /// or while another cycle runs.
    pub fn run_gc(&self) -> Result<ObjectIdSet, GcError> {
        self.check_role()?;
        self.collector.gc_full()
    }

    /// Trigger one young-generation cycle, with the same refusals.
    pub fn run_gc_young(&self) -> Result<ObjectIdSet, GcError> {
        self.check_role()?;
        self.collector.gc_young()
    }

    /// Whether a cycle is currently in flight.
    pub fn is_gc_running(&self) -> bool {
        self.collector.is_gc_running()
    }

    fn check_role(&self) -> Result<(), GcError> {
        if !self.is_active() {
            warn!("collection refused: this node is a passive replica");
            return Err(GcError::PassiveServer);
        }
        Ok(())
    }
}
