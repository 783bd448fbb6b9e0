//! # Facsimile
//!
//! Deep-copy engine for runtime object graphs.
//!
//! ## Design
//!
//! - **Per-type strategies**: each runtime type is resolved once to skip,
//!   array copy, fast path or generic slot copy, and the decision is cached
//! - **Identity preservation**: a per-call tracker keyed on object identity
//!   keeps shared references shared and makes cycles terminate
//! - **No construction**: generic copies are allocated zero-filled from the
//!   class layout; constructors never run
//! - **Iterative traversal**: generic objects and arrays are filled from an
//!   explicit worklist, so long chains do not grow the call stack
//!
//! ## Example
//!
//! ```
//! use facsimile::Cloner;
//! use facsimile_heap::{ClassBuilder, FieldType, ObjRef};
//!
//! let node = ClassBuilder::new("Node")
//!     .field("value", FieldType::INT)
//!     .field("next", FieldType::Reference)
//!     .build();
//! let a = ObjRef::allocate_zeroed(&node).unwrap();
//! a.set_field("next", &a).unwrap();
//!
//! let copy = Cloner::new().deep_clone_ref(&a).unwrap();
//! assert!(!copy.ptr_eq(&a));
//! assert!(copy.field("next").unwrap().as_object().unwrap().ptr_eq(&copy));
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod cloner;
pub mod config;
pub mod error;
pub mod fast;
pub mod immutables;
pub mod instantiate;
pub mod introspect;
pub mod policy;
pub mod strategy;
pub mod tracker;

pub use cloner::Cloner;
pub use config::CloneConfig;
pub use error::{CloneError, CloneResult};
pub use fast::{DeepCloner, FastCloner, FastClonerRegistry, default_fast_cloners};
pub use immutables::{ImmutablePredicate, known_immutables};
pub use instantiate::{InstantiationStrategy, ZeroedInstantiation};
pub use introspect::{Introspector, Slot};
pub use policy::{FieldAction, FieldPolicy};
pub use strategy::{Strategy, StrategyKind};
pub use tracker::CloneTracker;
