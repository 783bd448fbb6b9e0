//! Heap objects
//!
//! An object is a class plus a body. Ordinary instances store one value per
//! layout slot; arrays, enum constants and built-in containers carry native
//! bodies.

use indexmap::IndexMap;
use num_bigint::BigInt;
use regex::Regex;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::class::{Class, ClassKind, ClassRef, Component, Primitive};
use crate::collections::{Calendar, SortedMap};
use crate::error::{HeapError, HeapResult};
use crate::value::Value;

/// Insertion-ordered map with the Fx hasher
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Unboxed array storage
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    /// `boolean[]`
    Bool(Vec<bool>),
    /// `byte[]`
    Byte(Vec<i8>),
    /// `char[]`
    Char(Vec<char>),
    /// `int[]`
    Int(Vec<i32>),
    /// `long[]`
    Long(Vec<i64>),
    /// `double[]`
    Double(Vec<f64>),
    /// Array of references
    Refs(Vec<Value>),
}

impl ArrayData {
    /// Zero-filled storage for `len` elements of `component`
    pub fn zeroed(component: &Component, len: usize) -> Self {
        match component {
            Component::Primitive(Primitive::Bool) => Self::Bool(vec![false; len]),
            Component::Primitive(Primitive::Byte) => Self::Byte(vec![0; len]),
            Component::Primitive(Primitive::Char) => Self::Char(vec!['\0'; len]),
            Component::Primitive(Primitive::Int) => Self::Int(vec![0; len]),
            Component::Primitive(Primitive::Long) => Self::Long(vec![0; len]),
            Component::Primitive(Primitive::Double) => Self::Double(vec![0.0; len]),
            Component::Class(_) => Self::Refs(vec![Value::Null; len]),
        }
    }

    /// Primitive element kind; `None` for reference arrays
    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Self::Bool(_) => Some(Primitive::Bool),
            Self::Byte(_) => Some(Primitive::Byte),
            Self::Char(_) => Some(Primitive::Char),
            Self::Int(_) => Some(Primitive::Int),
            Self::Long(_) => Some(Primitive::Long),
            Self::Double(_) => Some(Primitive::Double),
            Self::Refs(_) => None,
        }
    }

    /// Element count
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Byte(v) => v.len(),
            Self::Char(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Refs(v) => v.len(),
        }
    }

    /// `true` when there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, boxed as a [`Value`]
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Self::Bool(v) => v.get(index).map(|x| Value::Bool(*x)),
            Self::Byte(v) => v.get(index).map(|x| Value::Byte(*x)),
            Self::Char(v) => v.get(index).map(|x| Value::Char(*x)),
            Self::Int(v) => v.get(index).map(|x| Value::Int(*x)),
            Self::Long(v) => v.get(index).map(|x| Value::Long(*x)),
            Self::Double(v) => v.get(index).map(|x| Value::Double(*x)),
            Self::Refs(v) => v.get(index).cloned(),
        }
    }
}

/// Object storage
pub enum Body {
    /// Ordinary instance, one value per layout slot
    Fields(Vec<Value>),
    /// Array
    Array(ArrayData),
    /// Enum constant
    Constant {
        /// Position in the enum declaration
        ordinal: usize,
        /// Constant name
        name: Arc<str>,
    },
    /// Growable list
    List(Vec<Value>),
    /// Linked list or queue
    Deque(VecDeque<Value>),
    /// Hash set
    HashSet(FxHashSet<Value>),
    /// Hash map
    HashMap(FxHashMap<Value, Value>),
    /// Insertion-ordered map
    LinkedMap(FxIndexMap<Value, Value>),
    /// Comparator-ordered map or set
    Sorted(SortedMap),
    /// Calendar
    Calendar(Calendar),
    /// Arbitrary-precision integer
    BigInt(BigInt),
    /// Compiled regular expression
    Pattern(Regex),
}

impl Body {
    /// Short name of the storage kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Fields(_) => "fields",
            Self::Array(_) => "array",
            Self::Constant { .. } => "constant",
            Self::List(_) => "list",
            Self::Deque(_) => "deque",
            Self::HashSet(_) => "hash set",
            Self::HashMap(_) => "hash map",
            Self::LinkedMap(_) => "linked map",
            Self::Sorted(_) => "sorted map",
            Self::Calendar(_) => "calendar",
            Self::BigInt(_) => "big integer",
            Self::Pattern(_) => "pattern",
        }
    }

    /// Move every object reference out of this body
    fn drain_refs(&mut self, out: &mut Vec<ObjRef>) {
        let mut keep = |v: Value| {
            if let Value::Ref(obj) = v {
                out.push(obj);
            }
        };
        match self {
            Self::Fields(values) | Self::List(values) | Self::Array(ArrayData::Refs(values)) => {
                values.drain(..).for_each(&mut keep)
            }
            Self::Deque(values) => values.drain(..).for_each(&mut keep),
            Self::HashSet(values) => values.drain().for_each(&mut keep),
            Self::HashMap(entries) => entries.drain().for_each(|(k, v)| {
                keep(k);
                keep(v);
            }),
            Self::LinkedMap(entries) => entries.drain(..).for_each(|(k, v)| {
                keep(k);
                keep(v);
            }),
            Self::Sorted(map) => map.drain().for_each(|(k, v)| {
                keep(k);
                keep(v);
            }),
            _ => {}
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shallow on purpose: bodies may be part of a cycle
        match self {
            Self::Array(data) => write!(f, "array[{}]", data.len()),
            Self::Constant { name, .. } => write!(f, "constant {name}"),
            other => f.write_str(other.kind_name()),
        }
    }
}

/// A heap object
pub struct Obj {
    class: ClassRef,
    body: RefCell<Body>,
}

impl Drop for Obj {
    fn drop(&mut self) {
        // Unlink iteratively so dropping a long chain does not recurse
        let mut pending = Vec::new();
        self.body.get_mut().drain_refs(&mut pending);
        while let Some(child) = pending.pop() {
            if let Ok(mut obj) = Rc::try_unwrap(child.0) {
                obj.body.get_mut().drain_refs(&mut pending);
            }
        }
    }
}

/// Shared handle to a heap object; identity is the allocation address
///
/// Handles are strong reference counts. An object that reaches itself
/// through its own slots or elements stays alive until one link of the
/// cycle is cleared.
#[derive(Clone)]
pub struct ObjRef(Rc<Obj>);

impl ObjRef {
    /// Wrap a class and body into a new object
    pub fn new(class: ClassRef, body: Body) -> Self {
        Self(Rc::new(Obj {
            class,
            body: RefCell::new(body),
        }))
    }

    /// Allocate an instance with every slot at its zero value, without
    /// running any constructor. `None` if the class has no plain instances.
    pub fn allocate_zeroed(class: &ClassRef) -> Option<Self> {
        if !class.is_instantiable() {
            return None;
        }
        let slots = class.layout().iter().map(|ty| ty.zero()).collect();
        Some(Self::new(class.clone(), Body::Fields(slots)))
    }

    /// Allocate an instance and run constructor hooks, root class first
    pub fn construct(class: &ClassRef) -> HeapResult<Self> {
        let obj = Self::allocate_zeroed(class).ok_or_else(|| HeapError::NotInstantiable {
            class: class.name().to_string(),
        })?;
        let mut hooks: Vec<_> = class.ancestors().filter_map(Class::constructor).collect();
        hooks.reverse();
        for hook in hooks {
            hook(&obj);
        }
        Ok(obj)
    }

    /// The named constant of an enum class
    pub fn enum_constant(class: &ClassRef, name: &str) -> HeapResult<Self> {
        let ordinal = class
            .constant_ordinal(name)
            .ok_or_else(|| HeapError::NoSuchConstant {
                class: class.name().to_string(),
                constant: name.to_string(),
            })?;
        Ok(Self::new(
            class.clone(),
            Body::Constant {
                ordinal,
                name: Arc::from(name),
            },
        ))
    }

    /// Array object; reference data gets the root class as component
    pub fn array(data: ArrayData) -> Self {
        let component = match data.primitive() {
            Some(p) => Component::Primitive(p),
            None => Component::Class(Class::object()),
        };
        Self::new(Class::array_of(component), Body::Array(data))
    }

    /// Reference array with a declared component class
    pub fn typed_array(component: &ClassRef, elements: Vec<Value>) -> Self {
        Self::new(
            Class::array_of(Component::Class(component.clone())),
            Body::Array(ArrayData::Refs(elements)),
        )
    }

    /// Runtime type
    pub fn class(&self) -> &ClassRef {
        &self.0.class
    }

    /// Borrow the body
    pub fn body(&self) -> Ref<'_, Body> {
        self.0.body.borrow()
    }

    /// Mutably borrow the body
    pub fn body_mut(&self) -> RefMut<'_, Body> {
        self.0.body.borrow_mut()
    }

    /// Swap in a new body, returning the old one
    pub fn replace_body(&self, body: Body) -> Body {
        self.0.body.replace(body)
    }

    /// Identity key
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Whether both handles point to the same object
    pub fn ptr_eq(&self, other: &ObjRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this object, including those held by
    /// other objects' slots
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Read the instance slot at `offset`
    pub fn read_slot(&self, offset: usize) -> HeapResult<Value> {
        match &*self.body() {
            Body::Fields(slots) => slots.get(offset).cloned().ok_or_else(|| {
                HeapError::SlotOutOfBounds {
                    class: self.class().name().to_string(),
                    offset,
                }
            }),
            _ => Err(self.not_an_instance()),
        }
    }

    /// Overwrite the instance slot at `offset`
    pub fn write_slot(&self, offset: usize, value: Value) -> HeapResult<()> {
        match &mut *self.body_mut() {
            Body::Fields(slots) => match slots.get_mut(offset) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(HeapError::SlotOutOfBounds {
                    class: self.class().name().to_string(),
                    offset,
                }),
            },
            _ => Err(self.not_an_instance()),
        }
    }

    /// Read the most-derived instance field called `name`
    pub fn field(&self, name: &str) -> HeapResult<Value> {
        self.read_slot(self.offset_of(name)?)
    }

    /// Write the most-derived instance field called `name`
    pub fn set_field(&self, name: &str, value: impl Into<Value>) -> HeapResult<()> {
        self.write_slot(self.offset_of(name)?, value.into())
    }

    /// Element count of an array or container; `None` for other bodies
    pub fn len(&self) -> Option<usize> {
        Some(match &*self.body() {
            Body::Array(data) => data.len(),
            Body::List(v) => v.len(),
            Body::Deque(v) => v.len(),
            Body::HashSet(v) => v.len(),
            Body::HashMap(v) => v.len(),
            Body::LinkedMap(v) => v.len(),
            Body::Sorted(v) => v.len(),
            _ => return None,
        })
    }

    fn offset_of(&self, name: &str) -> HeapResult<usize> {
        let class = self.class();
        if !matches!(class.kind(), ClassKind::Object) {
            return Err(self.not_an_instance());
        }
        class
            .field(name)
            .and_then(|f| f.offset())
            .ok_or_else(|| HeapError::NoSuchField {
                class: class.name().to_string(),
                field: name.to_string(),
            })
    }

    fn not_an_instance(&self) -> HeapError {
        HeapError::NotAnInstance {
            class: self.class().name().to_string(),
        }
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.class().name(), self.addr())
    }
}
