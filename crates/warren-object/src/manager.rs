//! Collaborator interfaces consumed by the collector.
//!
//! Both managers are implemented by the server proper (object store,
//! transaction pipeline, client channels); the collector only depends on
//! these boundaries.

use crate::id::ObjectId;
use crate::id_set::ObjectIdSet;
use crate::object::ManagedObject;

/// Position in the object manager's mutation log.
///
/// The collector takes a checkpoint at the start of the mark phase and at
/// the start of each rescue pass, and asks for the ids mutated since.
pub type MutationCheckpoint = u64;

/// The object store boundary.
///
/// Faults objects into memory by id, tracks the full live-id universe and
/// recent mutations, and performs physical deletion. Reads
/// (`all_object_ids`, `mutated_since`, lookups) must be safe to issue
/// concurrently with mutator traffic; only `delete_objects` needs
/// exclusive mutation of the store for the ids being removed.
pub trait ObjectManager: Send + Sync {
    /// Fault the object for `id` into memory and check it out.
    ///
    /// Every `Some` return must be paired with exactly one
    /// [`ObjectManager::release`]. `None` means the id is not (yet) known,
    /// e.g. an object whose creating transaction has not initialized it.
    fn lookup(&self, id: ObjectId) -> Option<ManagedObject>;

    /// Like [`ObjectManager::lookup`] but never faults from the backing
    /// store; `None` for anything not currently resident.
    fn lookup_cached(&self, id: ObjectId) -> Option<ManagedObject>;

    /// Check a borrowed object back in so the store may page it freely.
    fn release(&self, object: ManagedObject);

    /// Register a newly allocated object.
    fn create_object(&self, object: ManagedObject);

    /// Page the given resident objects out to the backing store, returning
    /// them so generational bookkeeping can observe their references.
    fn evict(&self, ids: &ObjectIdSet) -> Vec<ManagedObject>;

    /// Every live object id, resident or paged out.
    fn all_object_ids(&self) -> ObjectIdSet;

    /// Ids currently resident in memory.
    fn cached_object_ids(&self) -> ObjectIdSet;

    /// The named application roots.
    fn root_ids(&self) -> ObjectIdSet;

    /// Current position in the mutation log.
    fn checkpoint(&self) -> MutationCheckpoint;

    /// Ids created, or whose reference list changed, after `since`.
    fn mutated_since(&self, since: MutationCheckpoint) -> ObjectIdSet;

    /// Block until every in-flight transaction commit has drained.
    ///
    /// Called with the collector in its pausing state, so the commit entry
    /// points are already refusing new work; this only waits out
    /// transactions that began before the pause was requested.
    fn wait_until_ready_to_gc(&self);

    /// Physically remove the given objects.
    ///
    /// Only the collector calls this, and only with ids proven unreachable
    /// at the pause boundary. An id in `garbage` that is still referenced
    /// by a surviving object is an algorithm bug and grounds to fail fast.
    fn delete_objects(&self, garbage: &ObjectIdSet);
}

/// The client channel boundary.
///
/// Remote clients can keep objects live outside the graph itself, via
/// outstanding locks or client-local caches.
pub trait ClientStateManager: Send + Sync {
    /// Union the ids held live by connected clients into `out`.
    fn add_referenced_ids_to(&self, out: &mut ObjectIdSet);
}
