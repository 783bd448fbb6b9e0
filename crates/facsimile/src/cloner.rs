//! The clone engine
//!
//! [`Cloner`] resolves a [`Strategy`] once per runtime type and drives the
//! copy. Deep copies walk the graph with an explicit worklist: a generic
//! object or reference array is allocated, recorded in the tracker and
//! queued, and its slots are filled when the queue is drained. Long chains
//! of plain objects therefore never deepen the call stack, and neither do
//! objects nested through list or hash container fast paths, which queue
//! their elements the same way.

use dashmap::DashMap;
use facsimile_heap::{
    Annotation, ArrayData, Body, Class, ClassId, ClassRef, Component, ObjRef, Value,
};
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::CloneConfig;
use crate::error::{CloneError, CloneResult};
use crate::fast::{DeepCloner, FastCloner, FastClonerRegistry};
use crate::immutables::{ImmutablePredicate, known_immutables};
use crate::instantiate::{InstantiationStrategy, ZeroedInstantiation};
use crate::introspect::{Introspector, Slot};
use crate::policy::{FieldAction, FieldPolicy};
use crate::strategy::{Strategy, StrategyKind};
use crate::tracker::CloneTracker;

/// Deep and shallow copy engine
///
/// One engine may be shared by many threads; each call works on a graph
/// owned by the calling thread. Configuration is expected to happen before
/// the first clone: a class's strategy is cached on first use and later
/// configuration does not change it.
pub struct Cloner {
    config: RwLock<CloneConfig>,
    instantiation: Arc<dyn InstantiationStrategy>,
    immutables: RwLock<FxHashSet<ClassId>>,
    ignored: RwLock<FxHashSet<ClassId>>,
    ignored_instance_of: RwLock<Vec<ClassRef>>,
    immutable_predicate: RwLock<Option<ImmutablePredicate>>,
    field_policies: RwLock<Vec<Arc<dyn FieldPolicy>>>,
    fast_cloners: FastClonerRegistry,
    introspector: Introspector,
    strategies: DashMap<ClassId, Strategy>,
}

impl Default for Cloner {
    fn default() -> Self {
        Self::new()
    }
}

impl Cloner {
    /// Engine with the default configuration, the known immutable types and
    /// the default fast cloners
    pub fn new() -> Self {
        Self::with_config(CloneConfig::default())
    }

    /// Engine with a custom configuration
    pub fn with_config(config: CloneConfig) -> Self {
        Self::build(config, Arc::new(ZeroedInstantiation))
    }

    /// Engine that allocates generic copies through `instantiation`
    pub fn with_instantiation(instantiation: impl InstantiationStrategy + 'static) -> Self {
        Self::build(CloneConfig::default(), Arc::new(instantiation))
    }

    fn build(config: CloneConfig, instantiation: Arc<dyn InstantiationStrategy>) -> Self {
        let immutables = known_immutables().iter().map(|c| c.id()).collect();
        Self {
            config: RwLock::new(config),
            instantiation,
            immutables: RwLock::new(immutables),
            ignored: RwLock::new(FxHashSet::default()),
            ignored_instance_of: RwLock::new(Vec::new()),
            immutable_predicate: RwLock::new(None),
            field_policies: RwLock::new(Vec::new()),
            fast_cloners: FastClonerRegistry::with_defaults(),
            introspector: Introspector::new(),
            strategies: DashMap::new(),
        }
    }

    // =========================================================================
    // Cloning
    // =========================================================================

    /// Deep copy of `value`
    ///
    /// Non-reference values are returned as they are. The result shares no
    /// mutable object with `value` and reproduces its identity graph: shared
    /// references stay shared and cycles stay cycles.
    ///
    /// Objects are reference counted, so a copied cycle is itself a cycle of
    /// strong handles and is never freed on its own. Break the cycle in the
    /// copy (clear one of its references) before dropping it.
    pub fn deep_clone(&self, value: &Value) -> CloneResult<Value> {
        match value {
            Value::Ref(obj) => self.deep_clone_ref(obj).map(Value::Ref),
            other => Ok(other.clone()),
        }
    }

    /// Deep copy of one object
    pub fn deep_clone_ref(&self, obj: &ObjRef) -> CloneResult<ObjRef> {
        let config = self.config.read().clone();
        if !config.cloning_enabled {
            return Ok(obj.clone());
        }
        let policies = self.field_policies.read().clone();
        let mut run = DeepRun {
            engine: self,
            config: &config,
            policies: &policies,
            tracker: CloneTracker::new(),
            pending: Vec::new(),
        };
        let clone = run.copy_object(obj)?;
        run.drain(0)?;
        debug!(
            target: "facsimile::clone",
            class = %obj.class().name(),
            objects = run.tracker.len(),
            "Deep clone complete"
        );
        Ok(clone)
    }

    /// Copy of the immediate object only
    ///
    /// Slots, array elements and container entries of the copy refer to the
    /// same objects as the original's.
    pub fn shallow_clone(&self, value: &Value) -> CloneResult<Value> {
        match value {
            Value::Ref(obj) => self.shallow_clone_ref(obj).map(Value::Ref),
            other => Ok(other.clone()),
        }
    }

    /// Shallow copy of one object
    pub fn shallow_clone_ref(&self, obj: &ObjRef) -> CloneResult<ObjRef> {
        let config = self.config.read().clone();
        if !config.cloning_enabled {
            return Ok(obj.clone());
        }
        match self.strategy_for(obj.class(), &config) {
            Strategy::Skip => Ok(obj.clone()),
            Strategy::Array => {
                let data = match &*obj.body() {
                    Body::Array(data) => data.clone(),
                    _ => return Err(CloneError::unexpected_body(obj, "array")),
                };
                Ok(ObjRef::new(obj.class().clone(), Body::Array(data)))
            }
            Strategy::FastPath(cloner) => cloner.fast_clone(obj, &mut ShallowRun),
            Strategy::Generic(slots) => {
                let policies = self.field_policies.read().clone();
                let clone = self.instantiation.new_instance(obj.class())?;
                for slot in slots.iter() {
                    let value = match slot_copy(&config, &policies, obj, slot) {
                        SlotCopy::Zero => slot.ty().zero(),
                        SlotCopy::Share | SlotCopy::Deep => slot.read(obj)?,
                    };
                    slot.write(&clone, value)?;
                }
                Ok(clone)
            }
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Treat instances of exactly these classes as immutable: clones return
    /// them unchanged
    ///
    /// An array whose declared component is immutable is copied without
    /// visiting its elements.
    pub fn register_immutable<'a>(&self, classes: impl IntoIterator<Item = &'a ClassRef>) {
        let mut immutables = self.immutables.write();
        for class in classes {
            self.warn_if_resolved(class, "register_immutable");
            immutables.insert(class.id());
        }
    }

    /// Never copy instances of exactly these classes
    pub fn dont_clone<'a>(&self, classes: impl IntoIterator<Item = &'a ClassRef>) {
        let mut ignored = self.ignored.write();
        for class in classes {
            self.warn_if_resolved(class, "dont_clone");
            ignored.insert(class.id());
        }
    }

    /// Never copy instances of any class assignable to one of `classes`
    ///
    /// Consulted after the fast-path table, so a registered fast cloner for
    /// an exact subtype still applies.
    pub fn dont_clone_instance_of<'a>(&self, classes: impl IntoIterator<Item = &'a ClassRef>) {
        let mut ignored = self.ignored_instance_of.write();
        for class in classes {
            if !self.strategies.is_empty() {
                warn!(
                    target: "facsimile::registry",
                    class = %class.name(),
                    resolved = self.strategies.len(),
                    "dont_clone_instance_of after strategies were resolved; cached decisions are kept"
                );
            }
            ignored.push(class.clone());
        }
    }

    /// Install an extra "is this class immutable" test
    pub fn set_immutable_predicate(
        &self,
        predicate: impl Fn(&Class) -> bool + Send + Sync + 'static,
    ) {
        *self.immutable_predicate.write() = Some(Arc::new(predicate));
    }

    /// Append a per-slot override for generic copies
    pub fn register_field_policy(&self, policy: impl FieldPolicy + 'static) {
        self.field_policies.write().push(Arc::new(policy));
    }

    /// Register a fast cloner for exactly `class`
    ///
    /// Fails with [`CloneError::Configuration`] if one is already
    /// registered; use [`Cloner::replace_fast_cloner`] to override.
    pub fn register_fast_cloner(
        &self,
        class: &ClassRef,
        cloner: Arc<dyn FastCloner>,
    ) -> CloneResult<()> {
        self.warn_if_resolved(class, "register_fast_cloner");
        self.fast_cloners.register(class, cloner)
    }

    /// Register a fast cloner for exactly `class`, replacing any existing one
    pub fn replace_fast_cloner(
        &self,
        class: &ClassRef,
        cloner: Arc<dyn FastCloner>,
    ) -> Option<Arc<dyn FastCloner>> {
        self.warn_if_resolved(class, "replace_fast_cloner");
        self.fast_cloners.replace(class, cloner)
    }

    /// Remove the fast cloner for `class`; returns whether one was registered
    pub fn unregister_fast_cloner(&self, class: &ClassRef) -> bool {
        self.warn_if_resolved(class, "unregister_fast_cloner");
        self.fast_cloners.unregister(class).is_some()
    }

    /// Modify the configuration in place
    pub fn update_config(&self, f: impl FnOnce(&mut CloneConfig)) {
        f(&mut *self.config.write());
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> CloneConfig {
        self.config.read().clone()
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Whether `class` counts as immutable under the current configuration
    pub fn is_immutable(&self, class: &Class) -> bool {
        let marker = self.config.read().immutable_annotation.clone();
        self.is_immutable_with(class, &marker)
    }

    /// Strategy the engine uses for `class`, resolving it if necessary
    pub fn strategy_kind(&self, class: &ClassRef) -> StrategyKind {
        let config = self.config.read().clone();
        self.strategy_for(class, &config).kind()
    }

    // =========================================================================
    // Strategy resolution
    // =========================================================================

    fn strategy_for(&self, class: &ClassRef, config: &CloneConfig) -> Strategy {
        if let Some(strategy) = self.strategies.get(&class.id()) {
            return strategy.clone();
        }
        let strategy = self.resolve(class, config);
        trace!(
            target: "facsimile::strategy",
            class = %class.name(),
            strategy = ?strategy,
            "Resolved clone strategy"
        );
        // A racing resolution of the same class computes the same decision
        self.strategies.entry(class.id()).or_insert(strategy).clone()
    }

    fn resolve(&self, class: &ClassRef, config: &CloneConfig) -> Strategy {
        if class.is_enum() {
            return Strategy::Skip;
        }
        if self.is_immutable_with(class, &config.immutable_annotation)
            || self.ignored.read().contains(&class.id())
        {
            return Strategy::Skip;
        }
        if class.is_array() {
            return Strategy::Array;
        }
        if let Some(cloner) = self.fast_cloners.lookup(class) {
            return Strategy::FastPath(cloner);
        }
        if self
            .ignored_instance_of
            .read()
            .iter()
            .any(|ignored| class.is_assignable_to(ignored))
        {
            return Strategy::Skip;
        }
        Strategy::Generic(self.introspector.slots_of(class))
    }

    fn is_immutable_with(&self, class: &Class, marker: &str) -> bool {
        if self.immutables.read().contains(&class.id()) || class.annotation(marker).is_some() {
            return true;
        }
        let inherited = class
            .ancestors()
            .skip(1)
            .filter(|c| !c.is_root())
            .any(|c| c.annotation(marker).is_some_and(Annotation::is_inherited));
        if inherited {
            return true;
        }
        self.immutable_predicate
            .read()
            .as_ref()
            .is_some_and(|predicate| predicate(class))
    }

    fn warn_if_resolved(&self, class: &ClassRef, operation: &str) {
        if self.strategies.contains_key(&class.id()) {
            warn!(
                target: "facsimile::registry",
                class = %class.name(),
                operation,
                "Class already has a cached strategy; the change will not affect it"
            );
        }
    }
}

/// How one slot of a generic object is carried into the copy
enum SlotCopy {
    Zero,
    Share,
    Deep,
}

fn slot_copy(
    config: &CloneConfig,
    policies: &[Arc<dyn FieldPolicy>],
    original: &ObjRef,
    slot: &Slot,
) -> SlotCopy {
    for policy in policies {
        match policy.action_for(original, slot) {
            FieldAction::Clone => continue,
            FieldAction::Null => return SlotCopy::Zero,
            FieldAction::Share => return SlotCopy::Share,
        }
    }
    let modifiers = slot.modifiers();
    if config.null_transient && modifiers.is_transient() {
        SlotCopy::Zero
    } else if !config.clone_synthetics && modifiers.is_synthetic() {
        SlotCopy::Share
    } else if !config.clone_outer_reference && modifiers.is_outer_reference() {
        SlotCopy::Share
    } else {
        SlotCopy::Deep
    }
}

/// Work left for the drain loop
enum Fill {
    Object {
        original: ObjRef,
        clone: ObjRef,
        slots: Arc<[Slot]>,
    },
    Array {
        original: ObjRef,
        clone: ObjRef,
    },
}

/// State of one deep clone call
struct DeepRun<'a> {
    engine: &'a Cloner,
    config: &'a CloneConfig,
    policies: &'a [Arc<dyn FieldPolicy>],
    tracker: CloneTracker,
    pending: Vec<Fill>,
}

impl DeepRun<'_> {
    /// Copy of `value`; generic objects and reference arrays come back as
    /// allocated shells whose contents are queued
    fn copy_value(&mut self, value: &Value) -> CloneResult<Value> {
        match value {
            Value::Ref(obj) => self.copy_object(obj).map(Value::Ref),
            other => Ok(other.clone()),
        }
    }

    fn copy_object(&mut self, obj: &ObjRef) -> CloneResult<ObjRef> {
        if let Some(clone) = self.tracker.get(obj) {
            return Ok(clone.clone());
        }
        match self.engine.strategy_for(obj.class(), self.config) {
            Strategy::Skip => Ok(obj.clone()),
            Strategy::Array => self.copy_array(obj),
            Strategy::FastPath(cloner) => {
                let clone = cloner.fast_clone(obj, self)?;
                self.tracker.put(obj, clone.clone());
                Ok(clone)
            }
            Strategy::Generic(slots) => {
                let clone = self.engine.instantiation.new_instance(obj.class())?;
                self.tracker.put(obj, clone.clone());
                self.pending.push(Fill::Object {
                    original: obj.clone(),
                    clone: clone.clone(),
                    slots,
                });
                Ok(clone)
            }
        }
    }

    fn copy_array(&mut self, obj: &ObjRef) -> CloneResult<ObjRef> {
        // Elements may be subtypes of the component, so only a component
        // whose whole hierarchy is left alone allows sharing them unvisited
        let bulk = match obj.class().component() {
            Some(Component::Class(component)) => {
                component.is_enum()
                    || self
                        .engine
                        .is_immutable_with(component, &self.config.immutable_annotation)
            }
            _ => true,
        };
        let (data, queued) = match &*obj.body() {
            Body::Array(ArrayData::Refs(elements)) if !bulk => {
                (ArrayData::Refs(vec![Value::Null; elements.len()]), true)
            }
            Body::Array(data) => (data.clone(), false),
            _ => return Err(CloneError::unexpected_body(obj, "array")),
        };
        let clone = ObjRef::new(obj.class().clone(), Body::Array(data));
        self.tracker.put(obj, clone.clone());
        if queued {
            self.pending.push(Fill::Array {
                original: obj.clone(),
                clone: clone.clone(),
            });
        }
        Ok(clone)
    }

    /// Process queued fills until the queue is back to `mark` entries
    fn drain(&mut self, mark: usize) -> CloneResult<()> {
        while self.pending.len() > mark {
            let Some(fill) = self.pending.pop() else {
                break;
            };
            match fill {
                Fill::Object {
                    original,
                    clone,
                    slots,
                } => self.fill_object(&original, &clone, &slots)?,
                Fill::Array { original, clone } => self.fill_array(&original, &clone)?,
            }
        }
        Ok(())
    }

    fn fill_object(
        &mut self,
        original: &ObjRef,
        clone: &ObjRef,
        slots: &[Slot],
    ) -> CloneResult<()> {
        for slot in slots {
            let value = match slot_copy(self.config, self.policies, original, slot) {
                SlotCopy::Zero => slot.ty().zero(),
                SlotCopy::Share => slot.read(original)?,
                SlotCopy::Deep => {
                    let value = slot.read(original)?;
                    self.copy_value(&value)?
                }
            };
            slot.write(clone, value)?;
        }
        Ok(())
    }

    fn fill_array(&mut self, original: &ObjRef, clone: &ObjRef) -> CloneResult<()> {
        let elements = match &*original.body() {
            Body::Array(ArrayData::Refs(elements)) => elements.clone(),
            _ => return Err(CloneError::unexpected_body(original, "reference array")),
        };
        let copied = elements
            .iter()
            .map(|element| self.copy_value(element))
            .collect::<CloneResult<Vec<_>>>()?;
        clone.replace_body(Body::Array(ArrayData::Refs(copied)));
        Ok(())
    }
}

impl DeepCloner for DeepRun<'_> {
    fn clone_value(&mut self, value: &Value) -> CloneResult<Value> {
        let mark = self.pending.len();
        let copy = self.copy_value(value)?;
        self.drain(mark)?;
        Ok(copy)
    }

    fn defer_value(&mut self, value: &Value) -> CloneResult<Value> {
        self.copy_value(value)
    }

    fn remember(&mut self, original: &ObjRef, clone: &ObjRef) {
        self.tracker.put(original, clone.clone());
    }
}

/// Element callback for shallow container copies: every value is shared
struct ShallowRun;

impl DeepCloner for ShallowRun {
    fn clone_value(&mut self, value: &Value) -> CloneResult<Value> {
        Ok(value.clone())
    }

    fn remember(&mut self, _original: &ObjRef, _clone: &ObjRef) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use facsimile_heap::{ClassBuilder, FieldType, builtins};

    fn node_class() -> ClassRef {
        ClassBuilder::new("Node")
            .field("value", FieldType::INT)
            .field("next", FieldType::Reference)
            .build()
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Cloner>();
    }

    #[test]
    fn test_resolution_order() {
        let cloner = Cloner::new();
        let color = ClassBuilder::enumeration("Color", ["RED"]).build();
        assert_eq!(cloner.strategy_kind(&color), StrategyKind::Skip);
        assert_eq!(
            cloner.strategy_kind(&builtins::big_integer_class()),
            StrategyKind::Skip
        );
        let ints = Class::array_of(Component::Primitive(facsimile_heap::Primitive::Int));
        assert_eq!(cloner.strategy_kind(&ints), StrategyKind::Array);
        assert_eq!(
            cloner.strategy_kind(&builtins::tree_map_class()),
            StrategyKind::FastPath
        );
        assert_eq!(cloner.strategy_kind(&node_class()), StrategyKind::Generic);
    }

    #[test]
    fn test_fast_path_wins_over_instance_of_exclusion() {
        let cloner = Cloner::new();
        cloner.dont_clone_instance_of([&builtins::map()]);
        assert_eq!(
            cloner.strategy_kind(&builtins::hash_map_class()),
            StrategyKind::FastPath
        );

        let custom_map = ClassBuilder::new("CustomMap")
            .implements(&builtins::map())
            .build();
        assert_eq!(cloner.strategy_kind(&custom_map), StrategyKind::Skip);
    }

    #[test]
    fn test_cached_strategy_survives_late_configuration() {
        let cloner = Cloner::new();
        let node = node_class();
        assert_eq!(cloner.strategy_kind(&node), StrategyKind::Generic);
        cloner.register_immutable([&node]);
        assert_eq!(cloner.strategy_kind(&node), StrategyKind::Generic);
        assert!(cloner.is_immutable(&node));
    }

    #[test]
    fn test_immutable_markers() {
        let cloner = Cloner::new();
        let money = ClassBuilder::new("Money")
            .annotate(Annotation::immutable())
            .build();
        let sealed_base = ClassBuilder::new("Shape")
            .annotate(Annotation::immutable_with_subclasses())
            .build();
        let circle = ClassBuilder::new("Circle").extends(&sealed_base).build();
        let plain_child = ClassBuilder::new("Cents").extends(&money).build();

        assert!(cloner.is_immutable(&money));
        assert!(cloner.is_immutable(&circle));
        assert!(!cloner.is_immutable(&plain_child));

        cloner.set_immutable_predicate(|class| class.name().ends_with("Id"));
        assert!(cloner.is_immutable(&ClassBuilder::new("UserId").build()));
    }

    #[test]
    fn test_custom_annotation_name() {
        let cloner = Cloner::new();
        cloner.update_config(|c| c.immutable_annotation = Arc::from("ValueObject"));
        let point = ClassBuilder::new("Point")
            .annotate(Annotation::new("ValueObject"))
            .build();
        let money = ClassBuilder::new("Money")
            .annotate(Annotation::immutable())
            .build();
        assert!(cloner.is_immutable(&point));
        assert!(!cloner.is_immutable(&money));
    }

    #[test]
    fn test_tracker_is_scoped_to_one_call() {
        let cloner = Cloner::new();
        let node = node_class();
        let a = ObjRef::allocate_zeroed(&node).unwrap();
        let first = cloner.deep_clone_ref(&a).unwrap();
        let second = cloner.deep_clone_ref(&a).unwrap();
        assert!(!first.ptr_eq(&second));
    }
}
