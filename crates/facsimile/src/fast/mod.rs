//! Fast-path cloners
//!
//! A fast cloner rebuilds a container directly from its observable contents
//! instead of copying its storage slot by slot. The registry maps an exact
//! runtime type to its cloner; subclasses are not matched.

mod calendar;
mod collections;

pub use calendar::CalendarCloner;
pub use collections::{
    DequeCloner, HashMapCloner, HashSetCloner, LinkedMapCloner, ListCloner, SortedCloner,
};

use facsimile_heap::{Class, ClassId, ClassRef, ObjRef, Value, builtins};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{CloneError, CloneResult};

/// Callback handed to fast cloners for copying contained values
///
/// During a deep clone this recurses through the engine with the call's
/// identity tracker; during a shallow clone it returns values unchanged.
pub trait DeepCloner {
    /// Copy `value`. When this returns, the copy is fully populated except
    /// for parts that cycle back into objects still being cloned.
    fn clone_value(&mut self, value: &Value) -> CloneResult<Value>;

    /// Copy `value`, allowing the copy to be populated after this call
    /// returns but before the clone call completes
    ///
    /// Use this when the container only needs the copy's identity, for
    /// example a list or an identity-hashed set. Deferred copies keep nested
    /// object graphs off the call stack.
    fn defer_value(&mut self, value: &Value) -> CloneResult<Value> {
        self.clone_value(value)
    }

    /// Record `clone` as the copy of `original` so later references to
    /// `original` resolve to it. Call before populating a container that
    /// may be reachable from its own elements.
    fn remember(&mut self, original: &ObjRef, clone: &ObjRef);
}

/// Specialized duplication routine for one container type
pub trait FastCloner: Send + Sync {
    /// Build a new container of the same class as `original` holding the
    /// copies of its elements
    fn fast_clone(&self, original: &ObjRef, cloner: &mut dyn DeepCloner) -> CloneResult<ObjRef>;
}

/// Default fast cloners for the built-in containers
pub fn default_fast_cloners() -> Vec<(ClassRef, Arc<dyn FastCloner>)> {
    vec![
        (builtins::array_list_class(), Arc::new(ListCloner)),
        (builtins::linked_list_class(), Arc::new(DequeCloner)),
        (builtins::concurrent_linked_queue_class(), Arc::new(DequeCloner)),
        (builtins::hash_set_class(), Arc::new(HashSetCloner)),
        (builtins::hash_map_class(), Arc::new(HashMapCloner)),
        (builtins::concurrent_hash_map_class(), Arc::new(HashMapCloner)),
        (builtins::linked_hash_map_class(), Arc::new(LinkedMapCloner)),
        (builtins::tree_map_class(), Arc::new(SortedCloner)),
        (builtins::tree_set_class(), Arc::new(SortedCloner)),
        (builtins::calendar_class(), Arc::new(CalendarCloner)),
    ]
}

/// Exact-type → fast cloner table
#[derive(Default)]
pub struct FastClonerRegistry {
    cloners: RwLock<FxHashMap<ClassId, Arc<dyn FastCloner>>>,
}

impl FastClonerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with [`default_fast_cloners`]
    pub fn with_defaults() -> Self {
        let cloners = default_fast_cloners()
            .into_iter()
            .map(|(class, cloner)| (class.id(), cloner))
            .collect();
        Self {
            cloners: RwLock::new(cloners),
        }
    }

    /// Cloner registered for exactly `class`
    pub fn lookup(&self, class: &Class) -> Option<Arc<dyn FastCloner>> {
        self.cloners.read().get(&class.id()).cloned()
    }

    /// Whether a cloner is registered for exactly `class`
    pub fn contains(&self, class: &Class) -> bool {
        self.cloners.read().contains_key(&class.id())
    }

    /// Register a cloner; fails if `class` already has one
    pub fn register(&self, class: &ClassRef, cloner: Arc<dyn FastCloner>) -> CloneResult<()> {
        let mut cloners = self.cloners.write();
        if cloners.contains_key(&class.id()) {
            return Err(CloneError::configuration(format!(
                "{} already has a fast cloner",
                class.name()
            )));
        }
        cloners.insert(class.id(), cloner);
        debug!(target: "facsimile::registry", class = %class.name(), "Registered fast cloner");
        Ok(())
    }

    /// Register a cloner, replacing any existing one
    pub fn replace(
        &self,
        class: &ClassRef,
        cloner: Arc<dyn FastCloner>,
    ) -> Option<Arc<dyn FastCloner>> {
        let previous = self.cloners.write().insert(class.id(), cloner);
        debug!(
            target: "facsimile::registry",
            class = %class.name(),
            replaced = previous.is_some(),
            "Replaced fast cloner"
        );
        previous
    }

    /// Remove the cloner for `class`
    pub fn unregister(&self, class: &ClassRef) -> Option<Arc<dyn FastCloner>> {
        let removed = self.cloners.write().remove(&class.id());
        if removed.is_some() {
            debug!(
                target: "facsimile::registry",
                class = %class.name(),
                "Unregistered fast cloner"
            );
        }
        removed
    }

    /// Number of registered cloners
    pub fn len(&self) -> usize {
        self.cloners.read().len()
    }

    /// `true` when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.cloners.read().is_empty()
    }
}
