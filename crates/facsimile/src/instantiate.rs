//! Construction-free allocation

use facsimile_heap::{ClassRef, ObjRef};

use crate::error::{CloneError, CloneResult};

/// Allocates blank instances for the generic copy
///
/// Implementations must not run the class's constructor hooks.
pub trait InstantiationStrategy: Send + Sync {
    /// New instance of `class` with every slot at its zero value
    fn new_instance(&self, class: &ClassRef) -> CloneResult<ObjRef>;
}

/// Zero-filled allocation from the class layout
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroedInstantiation;

impl InstantiationStrategy for ZeroedInstantiation {
    fn new_instance(&self, class: &ClassRef) -> CloneResult<ObjRef> {
        ObjRef::allocate_zeroed(class).ok_or_else(|| CloneError::instantiation(class))
    }
}
