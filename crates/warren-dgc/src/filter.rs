//! Traversal predicates.

use warren_object::{ObjectId, ObjectIdSet};

/// Decides whether traversal descends into a referenced object.
///
/// Full cycles visit everything; young-generation cycles use a
/// [`SelectiveFilter`] so traversal never descends past the young
/// population. Tests install custom filters for selective collection.
pub trait Filter: Send + Sync {
    /// Return true to visit `id` during this cycle.
    fn should_visit(&self, id: ObjectId) -> bool;
}

/// Visits every reference; the full-cycle filter.
pub struct EverythingFilter;

impl Filter for EverythingFilter {
    fn should_visit(&self, _id: ObjectId) -> bool {
        true
    }
}

/// Visits only ids inside a fixed candidate set.
pub struct SelectiveFilter {
    candidates: ObjectIdSet,
}

impl SelectiveFilter {
    /// Restrict traversal to `candidates`.
    pub fn new(candidates: ObjectIdSet) -> Self {
        SelectiveFilter { candidates }
    }
}

impl Filter for SelectiveFilter {
    fn should_visit(&self, id: ObjectId) -> bool {
        self.candidates.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selective_filter_scopes_visits() {
        let candidates: ObjectIdSet = [ObjectId::new(1), ObjectId::new(2)].into_iter().collect();
        let filter = SelectiveFilter::new(candidates);
        assert!(filter.should_visit(ObjectId::new(1)));
        assert!(!filter.should_visit(ObjectId::new(3)));
        assert!(EverythingFilter.should_visit(ObjectId::new(3)));
    }
}
