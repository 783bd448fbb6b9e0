//! Slot discovery
//!
//! For each runtime type, the ordered list of instance slots a generic copy
//! has to visit. Lists are computed once per class and cached for the life
//! of the engine.

use dashmap::DashMap;
use facsimile_heap::{ClassId, ClassRef, FieldDef, FieldType, Modifiers, ObjRef, Value};
use std::sync::Arc;

use crate::error::CloneResult;

/// One instance storage location of a type or one of its ancestors
#[derive(Debug, Clone)]
pub struct Slot {
    owner: ClassRef,
    field: FieldDef,
    offset: usize,
}

impl Slot {
    /// Class that declares the slot
    pub fn owner(&self) -> &ClassRef {
        &self.owner
    }

    /// Declared field name
    pub fn name(&self) -> &str {
        self.field.name()
    }

    /// Declared type
    pub fn ty(&self) -> FieldType {
        self.field.ty()
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.field.modifiers()
    }

    /// Physical index in the instance layout
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Read this slot of `obj`
    pub fn read(&self, obj: &ObjRef) -> CloneResult<Value> {
        Ok(obj.read_slot(self.offset)?)
    }

    /// Write this slot of `obj`
    pub fn write(&self, obj: &ObjRef, value: Value) -> CloneResult<()> {
        Ok(obj.write_slot(self.offset, value)?)
    }
}

/// Memoized slot lists, keyed by class
#[derive(Default)]
pub struct Introspector {
    cache: DashMap<ClassId, Arc<[Slot]>>,
}

impl Introspector {
    /// Create an empty introspector
    pub fn new() -> Self {
        Self::default()
    }

    /// Slots of `class`, most-derived declarations first
    pub fn slots_of(&self, class: &ClassRef) -> Arc<[Slot]> {
        if let Some(slots) = self.cache.get(&class.id()) {
            return slots.clone();
        }
        let slots: Arc<[Slot]> = Self::walk(class).into();
        // Concurrent first lookups compute identical lists; keep the first
        self.cache.entry(class.id()).or_insert(slots).clone()
    }

    /// Number of classes with a cached slot list
    pub fn cached_classes(&self) -> usize {
        self.cache.len()
    }

    fn walk(class: &ClassRef) -> Vec<Slot> {
        let mut slots = Vec::new();
        let mut current = Some(class);
        while let Some(c) = current {
            if c.is_root() {
                break;
            }
            for field in c.declared_fields() {
                if let Some(offset) = field.offset() {
                    slots.push(Slot {
                        owner: c.clone(),
                        field: field.clone(),
                        offset,
                    });
                }
            }
            current = c.superclass();
        }
        slots
    }
}
