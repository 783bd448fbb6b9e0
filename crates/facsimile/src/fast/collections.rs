//! Container fast paths
//!
//! Every cloner follows the same shape: allocate an empty container of the
//! original's class, publish it to the tracker, snapshot the original's
//! contents, copy each element through the engine, then install the
//! populated body.
//!
//! Lists, deques and the hash containers compare object elements by
//! identity, so they take deferred copies that the engine populates later.
//! Only sorted containers wait for fully populated keys.

use facsimile_heap::{Body, FxIndexMap, ObjRef, SortedMap, Value};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

use super::{DeepCloner, FastCloner};
use crate::error::{CloneError, CloneResult};

/// Empty container of the same class, already visible to the tracker
fn empty_like(original: &ObjRef, body: Body, cloner: &mut dyn DeepCloner) -> ObjRef {
    let clone = ObjRef::new(original.class().clone(), body);
    cloner.remember(original, &clone);
    clone
}

fn clone_all<'a>(
    values: impl IntoIterator<Item = &'a Value>,
    cloner: &mut dyn DeepCloner,
) -> CloneResult<Vec<Value>> {
    values.into_iter().map(|v| cloner.defer_value(v)).collect()
}

fn clone_entries(
    entries: &[(Value, Value)],
    cloner: &mut dyn DeepCloner,
) -> CloneResult<Vec<(Value, Value)>> {
    entries
        .iter()
        .map(|(k, v)| Ok((cloner.defer_value(k)?, cloner.defer_value(v)?)))
        .collect()
}

/// `ArrayList`
pub struct ListCloner;

impl FastCloner for ListCloner {
    fn fast_clone(&self, original: &ObjRef, cloner: &mut dyn DeepCloner) -> CloneResult<ObjRef> {
        let items = match &*original.body() {
            Body::List(items) => items.clone(),
            _ => return Err(CloneError::unexpected_body(original, "list")),
        };
        let clone = empty_like(original, Body::List(Vec::new()), cloner);
        let copied = clone_all(&items, cloner)?;
        clone.replace_body(Body::List(copied));
        Ok(clone)
    }
}

/// `LinkedList` and `ConcurrentLinkedQueue`
///
/// Elements are copied in a loop rather than by following node links, so
/// very long lists do not deepen the stack.
pub struct DequeCloner;

impl FastCloner for DequeCloner {
    fn fast_clone(&self, original: &ObjRef, cloner: &mut dyn DeepCloner) -> CloneResult<ObjRef> {
        let items: Vec<Value> = match &*original.body() {
            Body::Deque(items) => items.iter().cloned().collect(),
            _ => return Err(CloneError::unexpected_body(original, "deque")),
        };
        let clone = empty_like(original, Body::Deque(VecDeque::new()), cloner);
        let copied = clone_all(&items, cloner)?;
        clone.replace_body(Body::Deque(copied.into()));
        Ok(clone)
    }
}

/// `HashSet`
pub struct HashSetCloner;

impl FastCloner for HashSetCloner {
    fn fast_clone(&self, original: &ObjRef, cloner: &mut dyn DeepCloner) -> CloneResult<ObjRef> {
        let items: Vec<Value> = match &*original.body() {
            Body::HashSet(items) => items.iter().cloned().collect(),
            _ => return Err(CloneError::unexpected_body(original, "hash set")),
        };
        let clone = empty_like(original, Body::HashSet(FxHashSet::default()), cloner);
        let copied = clone_all(&items, cloner)?;
        clone.replace_body(Body::HashSet(copied.into_iter().collect()));
        Ok(clone)
    }
}

/// `HashMap` and `ConcurrentHashMap`
pub struct HashMapCloner;

impl FastCloner for HashMapCloner {
    fn fast_clone(&self, original: &ObjRef, cloner: &mut dyn DeepCloner) -> CloneResult<ObjRef> {
        let entries: Vec<(Value, Value)> = match &*original.body() {
            Body::HashMap(entries) => entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => return Err(CloneError::unexpected_body(original, "hash map")),
        };
        let clone = empty_like(original, Body::HashMap(FxHashMap::default()), cloner);
        let copied = clone_entries(&entries, cloner)?;
        clone.replace_body(Body::HashMap(copied.into_iter().collect()));
        Ok(clone)
    }
}

/// `LinkedHashMap`; the clone iterates in the original's insertion order
pub struct LinkedMapCloner;

impl FastCloner for LinkedMapCloner {
    fn fast_clone(&self, original: &ObjRef, cloner: &mut dyn DeepCloner) -> CloneResult<ObjRef> {
        let entries: Vec<(Value, Value)> = match &*original.body() {
            Body::LinkedMap(entries) => entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => return Err(CloneError::unexpected_body(original, "linked map")),
        };
        let clone = empty_like(original, Body::LinkedMap(FxIndexMap::default()), cloner);
        let copied = clone_entries(&entries, cloner)?;
        clone.replace_body(Body::LinkedMap(copied.into_iter().collect()));
        Ok(clone)
    }
}

/// `TreeMap` and `TreeSet`
///
/// The clone is built with the original's comparator, and each key is fully
/// copied before it is inserted so the comparator sees populated objects.
/// Values are never compared and are deferred.
pub struct SortedCloner;

impl FastCloner for SortedCloner {
    fn fast_clone(&self, original: &ObjRef, cloner: &mut dyn DeepCloner) -> CloneResult<ObjRef> {
        let (comparator, entries) = match &*original.body() {
            Body::Sorted(map) => (
                map.comparator().cloned(),
                map.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Vec<_>>(),
            ),
            _ => return Err(CloneError::unexpected_body(original, "sorted map")),
        };
        let clone = empty_like(
            original,
            Body::Sorted(SortedMap::with_ordering(comparator.clone())),
            cloner,
        );
        let mut copied = SortedMap::with_ordering(comparator);
        for (key, value) in &entries {
            let key = cloner.clone_value(key)?;
            copied.insert(key, cloner.defer_value(value)?);
        }
        clone.replace_body(Body::Sorted(copied));
        Ok(clone)
    }
}
