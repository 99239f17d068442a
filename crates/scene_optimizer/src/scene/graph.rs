//! The scene graph
//!
//! [`SceneGraph`] owns every scene entity in per-kind slotmap arenas and
//! hands out typed handles. Arena storage gives the optimization passes two
//! guarantees the old dispose-by-convention style could not: a stale handle
//! fails to resolve instead of dereferencing freed data, and shared resources
//! can only be released through guarded calls that refuse while references
//! remain.

use thiserror::Error;

use crate::foundation::collections::HandleMap;
use crate::scene::geometry::{Geometry, GeometryError, GeometryHandle};
use crate::scene::instance::{Instance, InstanceHandle};
use crate::scene::material::{Material, MaterialHandle};
use crate::scene::mesh::{Mesh, MeshHandle};
use crate::scene::node::{NodeHandle, TransformNode};
use crate::scene::texture::{Texture, TextureHandle};

/// Structural problems detected by [`SceneGraph::validate`]
#[derive(Debug, Error)]
pub enum SceneError {
    /// A geometry failed its buffer-consistency check
    #[error("invalid geometry ({owner}): {source}")]
    InvalidGeometry {
        /// Name of the first mesh using the geometry, or a placeholder
        owner: String,
        /// The underlying buffer defect
        #[source]
        source: GeometryError,
    },

    /// An entity holds a handle that does not resolve
    #[error("{entity} '{name}' references a missing {target}")]
    DanglingReference {
        /// Kind of the referencing entity
        entity: &'static str,
        /// Name of the referencing entity
        name: String,
        /// Kind of the missing target
        target: &'static str,
    },
}

/// Mutable in-memory scene: arenas for every entity kind plus a root node
#[derive(Debug)]
pub struct SceneGraph {
    nodes: HandleMap<TransformNode>,
    meshes: HandleMap<Mesh>,
    instances: HandleMap<Instance>,
    materials: HandleMap<Material>,
    geometries: HandleMap<Geometry>,
    textures: HandleMap<Texture>,
    root: NodeHandle,
}

impl SceneGraph {
    /// Create an empty scene with a root node
    pub fn new() -> Self {
        let mut nodes = HandleMap::new();
        let root = NodeHandle::new(nodes.insert(TransformNode::new("root")));
        Self {
            nodes,
            meshes: HandleMap::new(),
            instances: HandleMap::new(),
            materials: HandleMap::new(),
            geometries: HandleMap::new(),
            textures: HandleMap::new(),
            root,
        }
    }

    /// The root node every loader-produced subtree hangs off
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    // --- Insertion ---

    /// Add a transform node
    pub fn add_node(&mut self, node: TransformNode) -> NodeHandle {
        NodeHandle::new(self.nodes.insert(node))
    }

    /// Add a mesh
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshHandle {
        MeshHandle::new(self.meshes.insert(mesh))
    }

    /// Add an instance
    pub fn add_instance(&mut self, instance: Instance) -> InstanceHandle {
        InstanceHandle::new(self.instances.insert(instance))
    }

    /// Add a material
    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        MaterialHandle::new(self.materials.insert(material))
    }

    /// Add a geometry
    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryHandle {
        GeometryHandle::new(self.geometries.insert(geometry))
    }

    /// Add a texture
    pub fn add_texture(&mut self, texture: Texture) -> TextureHandle {
        TextureHandle::new(self.textures.insert(texture))
    }

    // --- Access ---

    /// Get a node by handle
    pub fn node(&self, handle: NodeHandle) -> Option<&TransformNode> {
        self.nodes.get(handle.key())
    }

    /// Get a node mutably
    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut TransformNode> {
        self.nodes.get_mut(handle.key())
    }

    /// Get a mesh by handle
    pub fn mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle.key())
    }

    /// Get a mesh mutably
    pub fn mesh_mut(&mut self, handle: MeshHandle) -> Option<&mut Mesh> {
        self.meshes.get_mut(handle.key())
    }

    /// Get an instance by handle
    pub fn instance(&self, handle: InstanceHandle) -> Option<&Instance> {
        self.instances.get(handle.key())
    }

    /// Get an instance mutably
    pub fn instance_mut(&mut self, handle: InstanceHandle) -> Option<&mut Instance> {
        self.instances.get_mut(handle.key())
    }

    /// Get a material by handle
    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle.key())
    }

    /// Get a material mutably
    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle.key())
    }

    /// Get a geometry by handle
    pub fn geometry(&self, handle: GeometryHandle) -> Option<&Geometry> {
        self.geometries.get(handle.key())
    }

    /// Get a geometry mutably
    pub fn geometry_mut(&mut self, handle: GeometryHandle) -> Option<&mut Geometry> {
        self.geometries.get_mut(handle.key())
    }

    /// Get a texture by handle
    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle.key())
    }

    /// Get a texture mutably
    pub fn texture_mut(&mut self, handle: TextureHandle) -> Option<&mut Texture> {
        self.textures.get_mut(handle.key())
    }

    // --- Enumeration ---

    /// Iterate all nodes with their handles
    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &TransformNode)> {
        self.nodes.iter().map(|(k, n)| (NodeHandle::new(k), n))
    }

    /// Iterate all meshes with their handles
    pub fn meshes(&self) -> impl Iterator<Item = (MeshHandle, &Mesh)> {
        self.meshes.iter().map(|(k, m)| (MeshHandle::new(k), m))
    }

    /// Iterate all instances with their handles
    pub fn instances(&self) -> impl Iterator<Item = (InstanceHandle, &Instance)> {
        self.instances.iter().map(|(k, i)| (InstanceHandle::new(k), i))
    }

    /// Iterate all materials with their handles
    pub fn materials(&self) -> impl Iterator<Item = (MaterialHandle, &Material)> {
        self.materials.iter().map(|(k, m)| (MaterialHandle::new(k), m))
    }

    /// Iterate all geometries with their handles
    pub fn geometries(&self) -> impl Iterator<Item = (GeometryHandle, &Geometry)> {
        self.geometries.iter().map(|(k, g)| (GeometryHandle::new(k), g))
    }

    /// Iterate all textures with their handles
    pub fn textures(&self) -> impl Iterator<Item = (TextureHandle, &Texture)> {
        self.textures.iter().map(|(k, t)| (TextureHandle::new(k), t))
    }

    /// Snapshot of all mesh handles, for passes that mutate while iterating
    pub fn mesh_handles(&self) -> Vec<MeshHandle> {
        self.meshes.keys().map(MeshHandle::new).collect()
    }

    /// Snapshot of all instance handles
    pub fn instance_handles(&self) -> Vec<InstanceHandle> {
        self.instances.keys().map(InstanceHandle::new).collect()
    }

    /// Snapshot of all material handles
    pub fn material_handles(&self) -> Vec<MaterialHandle> {
        self.materials.keys().map(MaterialHandle::new).collect()
    }

    // --- Counts ---

    /// Number of transform nodes (including the root)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of instances
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Number of materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Number of geometries
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Number of textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    // --- Reference counting ---

    /// How many meshes (including their material sections) use a material
    pub fn material_ref_count(&self, handle: MaterialHandle) -> usize {
        self.meshes
            .values()
            .map(|mesh| {
                let direct = usize::from(mesh.material == Some(handle));
                let sections = mesh
                    .sections
                    .iter()
                    .filter(|s| s.material == Some(handle))
                    .count();
                direct + sections
            })
            .sum()
    }

    /// How many meshes use a geometry
    pub fn geometry_ref_count(&self, handle: GeometryHandle) -> usize {
        self.meshes
            .values()
            .filter(|mesh| mesh.geometry == Some(handle))
            .count()
    }

    /// How many material texture slots bind a texture
    pub fn texture_ref_count(&self, handle: TextureHandle) -> usize {
        self.materials
            .values()
            .flat_map(|material| material.textures.slots())
            .filter(|slot| *slot == Some(handle))
            .count()
    }

    // --- Removal ---

    /// Remove a mesh, returning it. Referenced geometry and material stay
    /// in their arenas.
    pub fn remove_mesh(&mut self, handle: MeshHandle) -> Option<Mesh> {
        self.meshes.remove(handle.key())
    }

    /// Remove an instance, returning it
    pub fn remove_instance(&mut self, handle: InstanceHandle) -> Option<Instance> {
        self.instances.remove(handle.key())
    }

    /// Remove a material if nothing references it
    ///
    /// Returns `true` when the slot was removed. Returns `false` when the
    /// handle does not resolve or references remain; the caller is expected
    /// to repoint references first.
    pub fn release_material(&mut self, handle: MaterialHandle) -> bool {
        if !self.materials.contains_key(handle.key()) {
            return false;
        }
        if self.material_ref_count(handle) > 0 {
            return false;
        }
        self.materials.remove(handle.key()).is_some()
    }

    /// Remove a geometry if nothing references it
    ///
    /// Same contract as [`SceneGraph::release_material`].
    pub fn release_geometry(&mut self, handle: GeometryHandle) -> bool {
        if !self.geometries.contains_key(handle.key()) {
            return false;
        }
        if self.geometry_ref_count(handle) > 0 {
            return false;
        }
        self.geometries.remove(handle.key()).is_some()
    }

    // --- Validation ---

    /// Check structural integrity: every held handle resolves and every
    /// geometry satisfies its buffer-length invariant
    pub fn validate(&self) -> Result<(), SceneError> {
        for node in self.nodes.values() {
            if let Some(parent) = node.parent {
                if !self.nodes.contains_key(parent.key()) {
                    return Err(SceneError::DanglingReference {
                        entity: "node",
                        name: node.name.clone(),
                        target: "parent node",
                    });
                }
            }
        }

        for mesh in self.meshes.values() {
            if let Some(geometry) = mesh.geometry {
                if !self.geometries.contains_key(geometry.key()) {
                    return Err(SceneError::DanglingReference {
                        entity: "mesh",
                        name: mesh.name.clone(),
                        target: "geometry",
                    });
                }
            }
            if let Some(material) = mesh.material {
                if !self.materials.contains_key(material.key()) {
                    return Err(SceneError::DanglingReference {
                        entity: "mesh",
                        name: mesh.name.clone(),
                        target: "material",
                    });
                }
            }
            if let Some(parent) = mesh.parent {
                if !self.nodes.contains_key(parent.key()) {
                    return Err(SceneError::DanglingReference {
                        entity: "mesh",
                        name: mesh.name.clone(),
                        target: "parent node",
                    });
                }
            }
        }

        for instance in self.instances.values() {
            if !self.meshes.contains_key(instance.master.key()) {
                return Err(SceneError::DanglingReference {
                    entity: "instance",
                    name: instance.name.clone(),
                    target: "master mesh",
                });
            }
            if let Some(parent) = instance.parent {
                if !self.nodes.contains_key(parent.key()) {
                    return Err(SceneError::DanglingReference {
                        entity: "instance",
                        name: instance.name.clone(),
                        target: "parent node",
                    });
                }
            }
        }

        for material in self.materials.values() {
            for slot in material.textures.bound() {
                if !self.textures.contains_key(slot.key()) {
                    return Err(SceneError::DanglingReference {
                        entity: "material",
                        name: material.name.clone(),
                        target: "texture",
                    });
                }
            }
        }

        for (key, geometry) in &self.geometries {
            if let Err(source) = geometry.validate() {
                let handle = GeometryHandle::new(key);
                let owner = self
                    .meshes
                    .values()
                    .find(|mesh| mesh.geometry == Some(handle))
                    .map_or_else(|| String::from("<unreferenced>"), |m| m.name.clone());
                return Err(SceneError::InvalidGeometry { owner, source });
            }
        }

        Ok(())
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
