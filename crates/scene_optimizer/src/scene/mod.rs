//! Scene data model
//!
//! The mutable in-memory representation the optimization passes work on:
//! transform nodes, meshes, instances, materials, geometries, and textures,
//! all stored in per-kind arenas inside [`SceneGraph`] and identified by
//! typed handles. Loaders populate the graph; passes mutate it in place.

pub mod geometry;
pub mod graph;
pub mod instance;
pub mod material;
pub mod mesh;
pub mod node;
pub mod stats;
pub mod texture;

pub use geometry::{Geometry, GeometryError, GeometryHandle, VertexAttribute, AABB};
pub use graph::{SceneError, SceneGraph};
pub use instance::{Instance, InstanceHandle};
pub use material::{
    Material, MaterialHandle, MaterialKind, MaterialTextures, PbrMaterialParams,
    StandardMaterialParams,
};
pub use mesh::{MaterialSection, Mesh, MeshFlags, MeshHandle, MeshOrigin};
pub use node::{NodeHandle, TransformNode};
pub use stats::SceneStatistics;
pub use texture::{Texture, TextureFormat, TextureHandle};
