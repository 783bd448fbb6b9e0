//! Identity-keyed original → clone map for one deep clone call

use facsimile_heap::ObjRef;
use rustc_hash::FxHashMap;

/// Original → clone associations, keyed by object identity
///
/// Originals are held alongside their clones so no address is freed and
/// reused while the map is alive.
#[derive(Default)]
pub struct CloneTracker {
    clones: FxHashMap<usize, (ObjRef, ObjRef)>,
}

impl CloneTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone already recorded for `original`
    pub fn get(&self, original: &ObjRef) -> Option<&ObjRef> {
        self.clones.get(&original.addr()).map(|(_, clone)| clone)
    }

    /// Record `clone` as the copy of `original`
    pub fn put(&mut self, original: &ObjRef, clone: ObjRef) {
        self.clones.insert(original.addr(), (original.clone(), clone));
    }

    /// Number of recorded originals
    pub fn len(&self) -> usize {
        self.clones.len()
    }

    /// `true` when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.clones.is_empty()
    }
}
