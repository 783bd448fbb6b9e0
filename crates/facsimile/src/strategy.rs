//! Per-type clone strategies

use std::fmt;
use std::sync::Arc;

use crate::fast::FastCloner;
use crate::introspect::Slot;

/// How instances of one runtime type are duplicated
///
/// Resolved once per class and cached for the life of the engine.
#[derive(Clone)]
pub enum Strategy {
    /// Return the original unchanged
    Skip,
    /// Allocate a same-length array and copy elements
    Array,
    /// Hand the object to a registered fast cloner
    FastPath(Arc<dyn FastCloner>),
    /// Allocate a blank instance and copy these slots
    Generic(Arc<[Slot]>),
}

impl Strategy {
    /// Tag of this strategy
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Skip => StrategyKind::Skip,
            Self::Array => StrategyKind::Array,
            Self::FastPath(_) => StrategyKind::FastPath,
            Self::Generic(_) => StrategyKind::Generic,
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic(slots) => write!(f, "Generic({} slots)", slots.len()),
            other => write!(f, "{:?}", other.kind()),
        }
    }
}

/// Strategy tag, for inspection and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// See [`Strategy::Skip`]
    Skip,
    /// See [`Strategy::Array`]
    Array,
    /// See [`Strategy::FastPath`]
    FastPath,
    /// See [`Strategy::Generic`]
    Generic,
}
