//! Per-slot overrides for the generic copy

use facsimile_heap::ObjRef;

use crate::introspect::Slot;

/// What to do with one slot of a generic object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAction {
    /// No override; the slot is handled normally
    Clone,
    /// Leave the slot at its zero value in the copy
    Null,
    /// Copy the original's value by reference
    Share,
}

/// Decides per slot whether the normal copy is overridden
///
/// Policies run in registration order; the first one that returns anything
/// other than [`FieldAction::Clone`] wins.
pub trait FieldPolicy: Send + Sync {
    /// Action for `slot` of `original`
    fn action_for(&self, original: &ObjRef, slot: &Slot) -> FieldAction;
}

impl<F> FieldPolicy for F
where
    F: Fn(&ObjRef, &Slot) -> FieldAction + Send + Sync,
{
    fn action_for(&self, original: &ObjRef, slot: &Slot) -> FieldAction {
        self(original, slot)
    }
}
