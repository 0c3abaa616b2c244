//! In-memory representation of one graph node.

use crate::id::ObjectId;
use crate::id_set::ObjectIdSet;

/// One node of the shared object graph: its identity and its outbound
/// reference slots.
///
/// Slots may hold [`ObjectId::NULL`] ("no reference"). The object manager
/// is the sole owner; the collector and transaction pipeline borrow
/// instances through lookup/release and must not retain one past release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagedObject {
    id: ObjectId,
    slots: Vec<ObjectId>,
}

impl ManagedObject {
    /// Create an object with the given reference slots.
    pub fn new(id: ObjectId, slots: Vec<ObjectId>) -> Self {
        ManagedObject { id, slots }
    }

    /// Identity of this object.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Raw reference slots, NULL entries included.
    pub fn reference_slots(&self) -> &[ObjectId] {
        &self.slots
    }

    /// Outbound references, NULL slots skipped.
    pub fn references(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.slots.iter().copied().filter(|id| !id.is_null())
    }

    /// Outbound references collected into a set.
    pub fn reference_set(&self) -> ObjectIdSet {
        self.references().collect()
    }

    /// Overwrite the reference in `slot`, returning the previous value.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of bounds.
    pub fn set_reference(&mut self, slot: usize, target: ObjectId) -> ObjectId {
        std::mem::replace(&mut self.slots[slot], target)
    }

    /// Append a reference slot.
    pub fn add_reference(&mut self, target: ObjectId) {
        self.slots.push(target);
    }
}
