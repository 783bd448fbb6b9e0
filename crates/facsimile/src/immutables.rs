//! Known immutable built-ins
//!
//! Strings and primitives are plain [`Value`](facsimile_heap::Value)s and
//! never reach the engine as objects, so only boxed value types appear here.

use facsimile_heap::{Class, ClassRef, builtins};
use std::sync::Arc;

/// Caller-installed test for "instances of this class are immutable"
pub type ImmutablePredicate = Arc<dyn Fn(&Class) -> bool + Send + Sync>;

/// Classes every engine treats as immutable from construction
pub fn known_immutables() -> Vec<ClassRef> {
    vec![builtins::big_integer_class(), builtins::pattern_class()]
}
