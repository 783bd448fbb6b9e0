//! Clone error types

use facsimile_heap::{Class, HeapError, ObjRef};
use thiserror::Error;

/// Errors surfaced by the clone engine
#[derive(Debug, Error)]
pub enum CloneError {
    /// Invalid engine configuration (e.g. duplicate fast cloner)
    #[error("ConfigurationError: {0}")]
    Configuration(String),

    /// A type cannot be allocated without running its constructor. Register
    /// it as immutable or give it a fast cloner instead.
    #[error("InstantiationError: cannot instantiate {class} without construction")]
    Instantiation {
        /// Offending class
        class: String,
    },

    /// An object's storage does not match what its strategy expects
    #[error("LayoutError: {class}: expected {expected} body, found {found}")]
    Layout {
        /// Class of the object
        class: String,
        /// Body kind the strategy expected
        expected: &'static str,
        /// Body kind actually found
        found: &'static str,
    },

    /// Slot access failed
    #[error(transparent)]
    Heap(#[from] HeapError),
}

impl CloneError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an instantiation error for `class`
    pub fn instantiation(class: &Class) -> Self {
        Self::Instantiation {
            class: class.name().to_string(),
        }
    }

    /// Create a layout error for an object whose body is not `expected`
    pub fn unexpected_body(obj: &ObjRef, expected: &'static str) -> Self {
        Self::Layout {
            class: obj.class().name().to_string(),
            expected,
            found: obj.body().kind_name(),
        }
    }
}

/// Result alias for clone operations
pub type CloneResult<T> = Result<T, CloneError>;
