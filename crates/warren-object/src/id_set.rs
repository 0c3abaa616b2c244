//! Compact object-id sets.
//!
//! The collector keeps several whole-population sets alive at once
//! (candidate universe, rescue roots, deleted ids), so the representation
//! is a bitset split into 64-bit words keyed by their aligned base value
//! rather than a general hash set. Densely allocated id ranges cost one
//! bit per id; sparse ids degrade to one map entry per 64-id span.

use std::collections::BTreeMap;
use std::fmt;

use crate::id::ObjectId;

const WORD_BITS: u64 = 64;

/// Unordered, duplicate-free set of [`ObjectId`]s with cheap membership
/// tests and removal.
///
/// Iteration yields ids in ascending order. [`ObjectId::NULL`] is not a
/// member of any set; inserting it is a caller bug.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ObjectIdSet {
    words: BTreeMap<u64, u64>,
    len: usize,
}

impl ObjectIdSet {
    /// Create an empty set.
    pub fn new() -> Self {
        ObjectIdSet::default()
    }

    fn slot(id: ObjectId) -> (u64, u64) {
        let raw = id.raw();
        (raw / WORD_BITS, 1u64 << (raw % WORD_BITS))
    }

    /// Add `id` to the set. Returns true if it was not already present.
    ///
    /// # Panics
    ///
    /// Panics if `id` is [`ObjectId::NULL`].
    pub fn insert(&mut self, id: ObjectId) -> bool {
        assert!(!id.is_null(), "NULL id cannot be a set member");
        let (base, bit) = Self::slot(id);
        let word = self.words.entry(base).or_insert(0);
        if *word & bit != 0 {
            return false;
        }
        *word |= bit;
        self.len += 1;
        true
    }

    /// Remove `id` from the set. Returns true if it was present.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let (base, bit) = Self::slot(id);
        match self.words.get_mut(&base) {
            Some(word) if *word & bit != 0 => {
                *word &= !bit;
                if *word == 0 {
                    self.words.remove(&base);
                }
                self.len -= 1;
                true
            }
            _ => false,
        }
    }

    /// Membership test.
    pub fn contains(&self, id: ObjectId) -> bool {
        let (base, bit) = Self::slot(id);
        self.words.get(&base).is_some_and(|word| word & bit != 0)
    }

    /// Number of ids in the set.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove all ids.
    pub fn clear(&mut self) {
        self.words.clear();
        self.len = 0;
    }

    /// Add every id of `other` to this set.
    pub fn union_with(&mut self, other: &ObjectIdSet) {
        for (&base, &word) in &other.words {
            let entry = self.words.entry(base).or_insert(0);
            self.len += (word & !*entry).count_ones() as usize;
            *entry |= word;
        }
    }

    /// Iterate ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.words.iter().flat_map(|(&base, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as u64;
                rest &= rest - 1;
                Some(ObjectId::new(base * WORD_BITS + bit))
            })
        })
    }
}

impl fmt::Debug for ObjectIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Extend<ObjectId> for ObjectIdSet {
    fn extend<T: IntoIterator<Item = ObjectId>>(&mut self, iter: T) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl FromIterator<ObjectId> for ObjectIdSet {
    fn from_iter<T: IntoIterator<Item = ObjectId>>(iter: T) -> Self {
        let mut set = ObjectIdSet::new();
        set.extend(iter);
        set
    }
}
