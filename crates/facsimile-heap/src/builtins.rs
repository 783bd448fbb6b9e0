//! Built-in classes
//!
//! Containers and value types with native storage. Each class is created
//! once per process and shared, so its [`ClassId`](crate::ClassId) is a
//! stable cache key.

use num_bigint::BigInt;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::sync::LazyLock;

use crate::class::{ClassBuilder, ClassRef};
use crate::collections::{Calendar, Comparator, SortedMap};
use crate::object::{Body, FxIndexMap, ObjRef};
use crate::value::Value;

macro_rules! builtin_interface {
    ($(#[$meta:meta])* $fn:ident, $name:literal) => {
        $(#[$meta])*
        pub fn $fn() -> ClassRef {
            static CLASS: LazyLock<ClassRef> =
                LazyLock::new(|| ClassBuilder::interface($name).build());
            CLASS.clone()
        }
    };
}

macro_rules! builtin_class {
    ($(#[$meta:meta])* $fn:ident, $name:literal $(, $iface:ident)*) => {
        $(#[$meta])*
        pub fn $fn() -> ClassRef {
            static CLASS: LazyLock<ClassRef> = LazyLock::new(|| {
                ClassBuilder::native($name)
                    $(.implements(&$iface()))*
                    .build()
            });
            CLASS.clone()
        }
    };
}

builtin_interface!(
    /// `Collection` interface
    collection, "Collection"
);
builtin_interface!(
    /// `List` interface
    list, "List"
);
builtin_interface!(
    /// `Queue` interface
    queue, "Queue"
);
builtin_interface!(
    /// `Set` interface
    set, "Set"
);
builtin_interface!(
    /// `Map` interface
    map, "Map"
);

builtin_class!(
    /// `ArrayList`
    array_list_class, "ArrayList", collection, list
);
builtin_class!(
    /// `LinkedList`
    linked_list_class, "LinkedList", collection, list, queue
);
builtin_class!(
    /// `ConcurrentLinkedQueue`
    concurrent_linked_queue_class, "ConcurrentLinkedQueue", collection, queue
);
builtin_class!(
    /// `HashSet`
    hash_set_class, "HashSet", collection, set
);
builtin_class!(
    /// `TreeSet`
    tree_set_class, "TreeSet", collection, set
);
builtin_class!(
    /// `HashMap`
    hash_map_class, "HashMap", map
);
builtin_class!(
    /// `ConcurrentHashMap`
    concurrent_hash_map_class, "ConcurrentHashMap", map
);
builtin_class!(
    /// `LinkedHashMap`
    linked_hash_map_class, "LinkedHashMap", map
);
builtin_class!(
    /// `TreeMap`
    tree_map_class, "TreeMap", map
);
builtin_class!(
    /// `GregorianCalendar`
    calendar_class, "GregorianCalendar"
);
builtin_class!(
    /// `BigInteger`
    big_integer_class, "BigInteger"
);
builtin_class!(
    /// `Pattern`
    pattern_class, "Pattern"
);

/// New `ArrayList`
pub fn array_list(items: impl IntoIterator<Item = Value>) -> ObjRef {
    ObjRef::new(array_list_class(), Body::List(items.into_iter().collect()))
}

/// New `LinkedList`
pub fn linked_list(items: impl IntoIterator<Item = Value>) -> ObjRef {
    ObjRef::new(
        linked_list_class(),
        Body::Deque(items.into_iter().collect::<VecDeque<_>>()),
    )
}

/// New `ConcurrentLinkedQueue`
pub fn concurrent_linked_queue(items: impl IntoIterator<Item = Value>) -> ObjRef {
    ObjRef::new(
        concurrent_linked_queue_class(),
        Body::Deque(items.into_iter().collect::<VecDeque<_>>()),
    )
}

/// New `HashSet`
pub fn hash_set(items: impl IntoIterator<Item = Value>) -> ObjRef {
    ObjRef::new(
        hash_set_class(),
        Body::HashSet(items.into_iter().collect::<FxHashSet<_>>()),
    )
}

/// New `HashMap`
pub fn hash_map(entries: impl IntoIterator<Item = (Value, Value)>) -> ObjRef {
    ObjRef::new(
        hash_map_class(),
        Body::HashMap(entries.into_iter().collect::<FxHashMap<_, _>>()),
    )
}

/// New `ConcurrentHashMap`
pub fn concurrent_hash_map(entries: impl IntoIterator<Item = (Value, Value)>) -> ObjRef {
    ObjRef::new(
        concurrent_hash_map_class(),
        Body::HashMap(entries.into_iter().collect::<FxHashMap<_, _>>()),
    )
}

/// New `LinkedHashMap`, preserving the iteration order of `entries`
pub fn linked_hash_map(entries: impl IntoIterator<Item = (Value, Value)>) -> ObjRef {
    ObjRef::new(
        linked_hash_map_class(),
        Body::LinkedMap(entries.into_iter().collect::<FxIndexMap<_, _>>()),
    )
}

/// New `TreeMap`
pub fn tree_map(
    comparator: Option<Comparator>,
    entries: impl IntoIterator<Item = (Value, Value)>,
) -> ObjRef {
    let mut map = SortedMap::with_ordering(comparator);
    for (k, v) in entries {
        map.insert(k, v);
    }
    ObjRef::new(tree_map_class(), Body::Sorted(map))
}

/// New `TreeSet`
pub fn tree_set(comparator: Option<Comparator>, items: impl IntoIterator<Item = Value>) -> ObjRef {
    let mut map = SortedMap::with_ordering(comparator);
    for item in items {
        map.insert(item, Value::Null);
    }
    ObjRef::new(tree_set_class(), Body::Sorted(map))
}

/// New `GregorianCalendar`
pub fn calendar(calendar: Calendar) -> ObjRef {
    ObjRef::new(calendar_class(), Body::Calendar(calendar))
}

/// New `BigInteger`
pub fn big_integer(value: BigInt) -> ObjRef {
    ObjRef::new(big_integer_class(), Body::BigInt(value))
}

/// New `Pattern`
pub fn pattern(regex: Regex) -> ObjRef {
    ObjRef::new(pattern_class(), Body::Pattern(regex))
}
