//! Mesh entities
//!
//! A mesh ties together a geometry, an optional material, a local transform,
//! and the flags the optimization passes filter on. Meshes never own their
//! geometry or material directly; they reference arena slots by handle so
//! several meshes can share one buffer set.

use bitflags::bitflags;

use crate::foundation::collections::TypedHandle;
use crate::foundation::math::Transform;
use crate::scene::geometry::GeometryHandle;
use crate::scene::material::MaterialHandle;
use crate::scene::node::NodeHandle;

/// Typed handle to a mesh stored in the scene graph
pub type MeshHandle = TypedHandle<Mesh>;

bitflags! {
    /// Per-mesh state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MeshFlags: u32 {
        /// Mesh is rendered
        const VISIBLE = 1 << 0;
        /// Mesh participates in picking queries
        const PICKABLE = 1 << 1;
        /// Mesh participates in collision checks
        const COLLIDABLE = 1 << 2;
        /// Mesh is driven by an animation and must keep its own buffers
        const ANIMATED = 1 << 3;
    }
}

impl Default for MeshFlags {
    fn default() -> Self {
        MeshFlags::VISIBLE | MeshFlags::PICKABLE
    }
}

/// How a mesh entered the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshOrigin {
    /// Created by a loader or by hand
    Authored,
    /// Produced by the merge pass
    Merged,
}

impl Default for MeshOrigin {
    fn default() -> Self {
        MeshOrigin::Authored
    }
}

/// A (material, range) span inside a merged geometry
///
/// Recorded on a merged mesh only when its members carried more than one
/// distinct material, so each span can still be drawn with its own material.
/// Single-material merges carry no sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialSection {
    /// Material for this span, `None` for the no-material sentinel
    pub material: Option<MaterialHandle>,
    /// First vertex of the span
    pub vertex_start: usize,
    /// Number of vertices in the span
    pub vertex_count: usize,
    /// First index of the span (zero when the geometry is non-indexed)
    pub index_start: usize,
    /// Number of indices in the span (zero when the geometry is non-indexed)
    pub index_count: usize,
}

/// Scene entity owning a transform and referencing geometry and material
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Display name for diagnostics
    pub name: String,
    /// Geometry reference; a mesh without one has zero triangles and is
    /// skipped by every optimization pass
    pub geometry: Option<GeometryHandle>,
    /// Material reference, `None` renders with engine defaults
    pub material: Option<MaterialHandle>,
    /// Local transform
    pub transform: Transform,
    /// State flags
    pub flags: MeshFlags,
    /// Parent node in the hierarchy
    pub parent: Option<NodeHandle>,
    /// Opaque loader metadata, carried through untouched
    pub metadata: Option<serde_json::Value>,
    /// Whether this mesh was authored or produced by the merge pass
    pub origin: MeshOrigin,
    /// Material spans for mixed-material merged geometry; normally empty
    pub sections: Vec<MaterialSection>,
}

impl Mesh {
    /// Create a mesh with default flags and no geometry or material
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry: None,
            material: None,
            transform: Transform::identity(),
            flags: MeshFlags::default(),
            parent: None,
            metadata: None,
            origin: MeshOrigin::Authored,
            sections: Vec::new(),
        }
    }

    /// Set the geometry reference
    pub fn with_geometry(mut self, geometry: GeometryHandle) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Set the material reference
    pub fn with_material(mut self, material: MaterialHandle) -> Self {
        self.material = Some(material);
        self
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

    /// Whether the mesh is rendered
    pub fn is_visible(&self) -> bool {
        self.flags.contains(MeshFlags::VISIBLE)
    }

    /// Whether the mesh participates in picking
    pub fn is_pickable(&self) -> bool {
        self.flags.contains(MeshFlags::PICKABLE)
    }

    /// Whether the mesh participates in collision checks
    pub fn is_collidable(&self) -> bool {
        self.flags.contains(MeshFlags::COLLIDABLE)
    }

    /// Whether the mesh is animation-driven
    pub fn is_animated(&self) -> bool {
        self.flags.contains(MeshFlags::ANIMATED)
    }
}
