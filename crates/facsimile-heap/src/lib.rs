//! # Facsimile Heap
//!
//! Runtime object model for the facsimile clone engine.
//!
//! ## Design
//!
//! - **Runtime types**: [`Class`] values describe instance layout at runtime,
//!   so any instance can be allocated zero-initialized without running its
//!   constructor
//! - **Reference semantics**: objects are shared through [`ObjRef`] handles
//!   and compared by identity
//! - **Reference counting**: handles are strong counts with no cycle
//!   collector, so a cyclic graph is freed only after one of its links is
//!   cleared
//! - **Thread confinement**: classes are `Send + Sync` and shared freely;
//!   object graphs stay on the thread that built them

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod builtins;
pub mod class;
pub mod collections;
pub mod error;
pub mod object;
pub mod value;

pub use class::{
    Annotation, Class, ClassBuilder, ClassId, ClassKind, ClassRef, Component, Constructor,
    FieldDef, FieldType, Modifiers, Primitive,
};
pub use collections::{Calendar, Comparator, SortedMap};
pub use error::{HeapError, HeapResult};
pub use object::{ArrayData, Body, FxIndexMap, ObjRef};
pub use value::Value;
