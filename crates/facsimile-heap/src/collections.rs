//! Native storage for sorted containers and calendars

use chrono::{DateTime, Utc, Weekday};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Ordering function of a sorted container
pub type Comparator = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// Map whose entries stay sorted by key
///
/// Keys are ordered by the comparator the map was built with, or by
/// [`Value::natural_cmp`] when there is none. A set is a map whose values
/// are all `Null`.
#[derive(Clone, Default)]
pub struct SortedMap {
    comparator: Option<Comparator>,
    entries: Vec<(Value, Value)>,
}

impl SortedMap {
    /// Empty map in natural order
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty map ordered by `comparator`
    pub fn with_comparator(comparator: Comparator) -> Self {
        Self::with_ordering(Some(comparator))
    }

    /// Empty map with an optional comparator
    pub fn with_ordering(comparator: Option<Comparator>) -> Self {
        Self {
            comparator,
            entries: Vec::new(),
        }
    }

    /// The ordering function, if the map was built with one
    pub fn comparator(&self) -> Option<&Comparator> {
        self.comparator.as_ref()
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match &self.comparator {
            Some(cmp) => cmp(a, b),
            None => a.natural_cmp(b),
        }
    }

    fn search(&self, key: &Value) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(probe, _)| self.compare(probe, key))
    }

    /// Insert or replace; returns the previous value
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.search(&key) {
            Ok(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            Err(i) => {
                self.entries.insert(i, (key, value));
                None
            }
        }
    }

    /// Value stored under a key that compares equal to `key`
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.search(key).ok().map(|i| &self.entries[i].1)
    }

    /// Whether a key comparing equal to `key` is present
    pub fn contains_key(&self, key: &Value) -> bool {
        self.search(key).is_ok()
    }

    /// Remove the entry whose key compares equal to `key`
    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.search(key).ok().map(|i| self.entries.remove(i).1)
    }

    /// Entry count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Remove and yield every entry
    pub fn drain(&mut self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.entries.drain(..)
    }
}

impl fmt::Debug for SortedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedMap")
            .field("custom_order", &self.comparator.is_some())
            .field("len", &self.entries.len())
            .finish()
    }
}

/// A point in time interpreted in a named time zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    instant: DateTime<Utc>,
    zone: Arc<str>,
    first_day_of_week: Weekday,
    lenient: bool,
}

impl Calendar {
    /// Calendar at `instant` in the IANA zone `zone`
    pub fn new(instant: DateTime<Utc>, zone: impl Into<Arc<str>>) -> Self {
        Self {
            instant,
            zone: zone.into(),
            first_day_of_week: Weekday::Sun,
            lenient: true,
        }
    }

    /// Set the first day of the week
    pub fn with_first_day_of_week(mut self, day: Weekday) -> Self {
        self.first_day_of_week = day;
        self
    }

    /// Set field-overflow leniency
    pub fn with_lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Current instant
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// Move to a new instant
    pub fn set_instant(&mut self, instant: DateTime<Utc>) {
        self.instant = instant;
    }

    /// IANA zone name
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// First day of the week
    pub fn first_day_of_week(&self) -> Weekday {
        self.first_day_of_week
    }

    /// Field-overflow leniency
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order() {
        let mut map = SortedMap::new();
        for k in [3, 1, 2] {
            map.insert(Value::Int(k), Value::Int(k * 10));
        }
        let keys: Vec<_> = map.keys().filter_map(Value::as_int).collect();
        assert_eq!(keys, [1, 2, 3]);
        assert_eq!(map.get(&Value::Int(2)), Some(&Value::Int(20)));
        assert_eq!(map.insert(Value::Int(2), Value::Int(0)), Some(Value::Int(20)));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_custom_comparator() {
        let reverse: Comparator = Arc::new(|a: &Value, b: &Value| b.natural_cmp(a));
        let mut set = SortedMap::with_comparator(reverse);
        for k in [1, 3, 2] {
            set.insert(Value::Int(k), Value::Null);
        }
        let keys: Vec<_> = set.keys().filter_map(Value::as_int).collect();
        assert_eq!(keys, [3, 2, 1]);
        assert!(set.comparator().is_some());
        assert_eq!(set.remove(&Value::Int(3)), Some(Value::Null));
        assert!(!set.contains_key(&Value::Int(3)));
    }
}
