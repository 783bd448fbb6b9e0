//! Engine configuration

use facsimile_heap::Annotation;
use std::sync::Arc;

/// Clone engine configuration
#[derive(Debug, Clone)]
pub struct CloneConfig {
    /// When false every clone call returns its argument unchanged
    pub cloning_enabled: bool,
    /// Reset transient slots to their zero value instead of copying them
    pub null_transient: bool,
    /// Clone compiler-generated slots; when false they are copied by reference
    pub clone_synthetics: bool,
    /// Clone enclosing-instance back-references; when false they are copied
    /// by reference
    pub clone_outer_reference: bool,
    /// Annotation name that marks a class immutable
    pub immutable_annotation: Arc<str>,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            cloning_enabled: true,
            null_transient: false,
            clone_synthetics: true,
            clone_outer_reference: true,
            immutable_annotation: Arc::from(Annotation::IMMUTABLE),
        }
    }
}
