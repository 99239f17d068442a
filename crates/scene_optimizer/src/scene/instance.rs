//! Instance entities
//!
//! An instance is the lightweight result of the instancing pass: it shares
//! its master mesh's geometry and material but owns a transform and flags of
//! its own. Instances live in their own arena, so "is this an instance?" is
//! answered by which arena a handle points into rather than by a runtime
//! type test.

use crate::foundation::collections::TypedHandle;
use crate::foundation::math::Transform;
use crate::scene::mesh::{MeshFlags, MeshHandle};
use crate::scene::node::NodeHandle;

/// Typed handle to an instance stored in the scene graph
pub type InstanceHandle = TypedHandle<Instance>;

/// Transform-and-flags entity sharing a master mesh's buffers
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Display name, usually inherited from the source mesh
    pub name: String,
    /// The mesh whose geometry and material this instance shares
    pub master: MeshHandle,
    /// Local transform
    pub transform: Transform,
    /// Per-instance visibility/picking/collision flags
    pub flags: MeshFlags,
    /// Parent node in the hierarchy
    pub parent: Option<NodeHandle>,
    /// Opaque metadata cloned from the source mesh
    pub metadata: Option<serde_json::Value>,
}

impl Instance {
    /// Create an instance of a master mesh
    pub fn new(name: impl Into<String>, master: MeshHandle) -> Self {
        Self {
            name: name.into(),
            master,
            transform: Transform::identity(),
            flags: MeshFlags::default(),
            parent: None,
            metadata: None,
        }
    }

    /// Set the local transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Replace the flag set
    pub fn with_flags(mut self, flags: MeshFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the parent node
    pub fn with_parent(mut self, parent: NodeHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Attach opaque metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Whether the instance is rendered
    pub fn is_visible(&self) -> bool {
        self.flags.contains(MeshFlags::VISIBLE)
    }
}
