//! Transform nodes
//!
//! Named grouping nodes forming the scene hierarchy. Loaders hang imported
//! meshes off a root node; meshes and instances reference their parent node
//! by handle.

use crate::foundation::collections::TypedHandle;
use crate::foundation::math::Transform;

/// Typed handle to a transform node stored in the scene graph
pub type NodeHandle = TypedHandle<TransformNode>;

/// Named node with a local transform and optional parent
#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    /// Display name for diagnostics
    pub name: String,
    /// Local transform relative to the parent
    pub transform: Transform,
    /// Parent node, `None` for roots
    pub parent: Option<NodeHandle>,
}

impl TransformNode {
    /// Create a parentless node with an identity transform
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::identity(),
            parent: None,
        }
    }

    /// Set the local transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the parent node
    pub fn with_parent(mut self, parent: NodeHandle) -> Self {
        self.parent = Some(parent);
        self
    }
}
