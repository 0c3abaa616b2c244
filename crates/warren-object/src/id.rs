//! Object identity

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one object in the shared graph.
///
/// Opaque and totally ordered. Identity only — resolving an id to an
/// object always goes through the object manager.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Distinguished "no reference" id. Reference slots holding `NULL`
    /// are skipped by graph traversal.
    pub const NULL: ObjectId = ObjectId(u64::MAX);

    /// Create an id from its raw value.
    ///
    /// `u64::MAX` is reserved for [`ObjectId::NULL`].
    pub const fn new(raw: u64) -> Self {
        ObjectId(raw)
    }

    /// Raw value of the id.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is the distinguished "no reference" id.
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "ObjectId(NULL)")
        } else {
            write!(f, "ObjectId({})", self.0)
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
