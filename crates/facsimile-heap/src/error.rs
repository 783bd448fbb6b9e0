//! Heap error types

use thiserror::Error;

/// Errors from object construction and field access
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HeapError {
    /// The class has no instance field with this name
    #[error("{class} has no instance field `{field}`")]
    NoSuchField {
        /// Class name
        class: String,
        /// Requested field
        field: String,
    },

    /// Field access on an object without field storage
    #[error("{class} is not a field-bearing instance")]
    NotAnInstance {
        /// Class name
        class: String,
    },

    /// Slot index past the end of the instance layout
    #[error("slot {offset} is out of bounds for {class}")]
    SlotOutOfBounds {
        /// Class name
        class: String,
        /// Requested slot
        offset: usize,
    },

    /// The class cannot be allocated as a plain instance
    #[error("{class} cannot be instantiated")]
    NotInstantiable {
        /// Class name
        class: String,
    },

    /// Unknown enum constant
    #[error("{class} has no constant `{constant}`")]
    NoSuchConstant {
        /// Enum class name
        class: String,
        /// Requested constant
        constant: String,
    },
}

/// Result alias for heap operations
pub type HeapResult<T> = Result<T, HeapError>;
