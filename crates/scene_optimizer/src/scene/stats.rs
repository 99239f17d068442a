//! Scene statistics
//!
//! Read-only inspection of a scene graph, run before and after optimization
//! to measure its effect. Collection never mutates the graph and has no
//! error conditions; anything absent simply counts as zero.

use std::fmt;

use crate::scene::graph::SceneGraph;
use crate::scene::material::MaterialKind;
use crate::scene::texture::TextureFormat;

/// Assumed bytes per vertex for the memory estimate: position + normal + uv
const ESTIMATED_VERTEX_STRIDE: usize = 32;

/// Bytes per index (u32 indices)
const INDEX_SIZE: usize = 4;

/// Aggregate counts and memory estimates for one scene
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneStatistics {
    /// Number of meshes
    pub mesh_count: usize,
    /// Number of instances
    pub instance_count: usize,
    /// Number of transform nodes (including the root)
    pub node_count: usize,
    /// Number of materials
    pub material_count: usize,
    /// Materials using the classic diffuse/specular variant
    pub standard_material_count: usize,
    /// Materials using the PBR variant
    pub pbr_material_count: usize,
    /// Number of geometries
    pub geometry_count: usize,
    /// Geometries with an index buffer
    pub indexed_geometry_count: usize,
    /// Geometries without an index buffer
    pub non_indexed_geometry_count: usize,
    /// Triangles summed over meshes; instances draw the master's triangles
    /// and are not re-counted
    pub triangle_count: usize,
    /// Vertices summed over the geometry arena (each shared buffer once)
    pub vertex_count: usize,
    /// Indices summed over the geometry arena
    pub index_count: usize,
    /// Number of unique textures
    pub texture_count: usize,
    /// Textures stored as 8-bit RGBA
    pub rgba8_texture_count: usize,
    /// Textures stored as 8-bit RGB
    pub rgb8_texture_count: usize,
    /// Textures stored as 8-bit grayscale
    pub gray8_texture_count: usize,
    /// Estimated vertex memory: vertex count times an assumed 32-byte stride
    pub vertex_memory_bytes: usize,
    /// Estimated index memory: index count times 4 bytes
    pub index_memory_bytes: usize,
    /// Estimated texture memory: width x height x 4 per unique texture
    pub texture_memory_bytes: usize,
}

impl SceneStatistics {
    /// Collect statistics from a graph without mutating it
    pub fn collect(graph: &SceneGraph) -> Self {
        let mut stats = Self {
            mesh_count: graph.mesh_count(),
            instance_count: graph.instance_count(),
            node_count: graph.node_count(),
            material_count: graph.material_count(),
            geometry_count: graph.geometry_count(),
            texture_count: graph.texture_count(),
            ..Self::default()
        };

        for (_, material) in graph.materials() {
            match material.kind {
                MaterialKind::Standard(_) => stats.standard_material_count += 1,
                MaterialKind::Pbr(_) => stats.pbr_material_count += 1,
            }
        }

        for (_, geometry) in graph.geometries() {
            if geometry.is_indexed() {
                stats.indexed_geometry_count += 1;
            } else {
                stats.non_indexed_geometry_count += 1;
            }
            stats.vertex_count += geometry.vertex_count();
            stats.index_count += geometry.index_count();
        }

        for (_, mesh) in graph.meshes() {
            if let Some(geometry) = mesh.geometry.and_then(|h| graph.geometry(h)) {
                stats.triangle_count += geometry.triangle_count();
            }
        }

        for (_, texture) in graph.textures() {
            match texture.format {
                TextureFormat::Rgba8 => stats.rgba8_texture_count += 1,
                TextureFormat::Rgb8 => stats.rgb8_texture_count += 1,
                TextureFormat::Gray8 => stats.gray8_texture_count += 1,
            }
            stats.texture_memory_bytes += texture.estimated_bytes();
        }

        stats.vertex_memory_bytes = stats.vertex_count * ESTIMATED_VERTEX_STRIDE;
        stats.index_memory_bytes = stats.index_count * INDEX_SIZE;
        stats
    }

    /// Total of the three memory estimates
    pub fn estimated_memory_bytes(&self) -> usize {
        self.vertex_memory_bytes + self.index_memory_bytes + self.texture_memory_bytes
    }
}

fn human_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let value = bytes as f64;
    if value >= MIB {
        format!("{:.1} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

impl fmt::Display for SceneStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "meshes: {} ({} instances), nodes: {}",
            self.mesh_count, self.instance_count, self.node_count
        )?;
        writeln!(
            f,
            "materials: {} (standard: {}, pbr: {})",
            self.material_count, self.standard_material_count, self.pbr_material_count
        )?;
        writeln!(
            f,
            "geometries: {} (indexed: {}, non-indexed: {}), triangles: {}",
            self.geometry_count,
            self.indexed_geometry_count,
            self.non_indexed_geometry_count,
            self.triangle_count
        )?;
        writeln!(
            f,
            "textures: {} (rgba8: {}, rgb8: {}, gray8: {})",
            self.texture_count,
            self.rgba8_texture_count,
            self.rgb8_texture_count,
            self.gray8_texture_count
        )?;
        write!(
            f,
            "estimated memory: {} (vertices {}, indices {}, textures {})",
            human_bytes(self.estimated_memory_bytes()),
            human_bytes(self.vertex_memory_bytes),
            human_bytes(self.index_memory_bytes),
            human_bytes(self.texture_memory_bytes)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::geometry::Geometry;
    use crate::scene::material::{Material, PbrMaterialParams, StandardMaterialParams};
    use crate::scene::mesh::Mesh;
    use crate::scene::texture::Texture;

    fn make_indexed_geometry(vertices: usize, triangles: usize) -> Geometry {
        let indices = (0..triangles * 3).map(|i| (i % vertices) as u32).collect();
        Geometry::new(vec![0.0; vertices * 3])
            .and_then(|g| g.with_indices(indices))
            .unwrap()
    }

    #[test]
    fn test_empty_scene() {
        let graph = SceneGraph::new();
        let stats = SceneStatistics::collect(&graph);
        assert_eq!(stats.mesh_count, 0);
        assert_eq!(stats.node_count, 1);
        assert_eq!(stats.triangle_count, 0);
        assert_eq!(stats.estimated_memory_bytes(), 0);
    }

    #[test]
    fn test_counts_and_memory() {
        let mut graph = SceneGraph::new();
        let geometry = graph.add_geometry(make_indexed_geometry(4, 2));
        let material = graph.add_material(Material::pbr(PbrMaterialParams::default()));
        graph.add_material(Material::standard(StandardMaterialParams::default()));
        graph.add_texture(Texture::new("t", 8, 8, TextureFormat::Rgb8));
        graph.add_mesh(
            Mesh::new("quad")
                .with_geometry(geometry)
                .with_material(material),
        );

        let stats = SceneStatistics::collect(&graph);
        assert_eq!(stats.mesh_count, 1);
        assert_eq!(stats.material_count, 2);
        assert_eq!(stats.standard_material_count, 1);
        assert_eq!(stats.pbr_material_count, 1);
        assert_eq!(stats.geometry_count, 1);
        assert_eq!(stats.indexed_geometry_count, 1);
        assert_eq!(stats.triangle_count, 2);
        assert_eq!(stats.vertex_count, 4);
        assert_eq!(stats.index_count, 6);
        assert_eq!(stats.vertex_memory_bytes, 4 * 32);
        assert_eq!(stats.index_memory_bytes, 6 * 4);
        assert_eq!(stats.texture_memory_bytes, 8 * 8 * 4);
        assert_eq!(stats.rgb8_texture_count, 1);
    }

    #[test]
    fn test_shared_geometry_counted_once_for_memory_per_mesh_for_triangles() {
        let mut graph = SceneGraph::new();
        let geometry = graph.add_geometry(make_indexed_geometry(3, 1));
        graph.add_mesh(Mesh::new("a").with_geometry(geometry));
        graph.add_mesh(Mesh::new("b").with_geometry(geometry));

        let stats = SceneStatistics::collect(&graph);
        // Buffer memory is stored once, but both meshes draw the triangle.
        assert_eq!(stats.vertex_count, 3);
        assert_eq!(stats.triangle_count, 2);
    }

    #[test]
    fn test_collect_is_idempotent() {
        let mut graph = SceneGraph::new();
        let geometry = graph.add_geometry(make_indexed_geometry(6, 3));
        graph.add_mesh(Mesh::new("m").with_geometry(geometry));
        graph.add_texture(Texture::new("t", 16, 16, TextureFormat::Rgba8));

        let first = SceneStatistics::collect(&graph);
        let second = SceneStatistics::collect(&graph);
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_indexed_geometry_contributes_no_triangles() {
        let mut graph = SceneGraph::new();
        let geometry = graph.add_geometry(Geometry::new(vec![0.0; 9]).unwrap());
        graph.add_mesh(Mesh::new("cloud").with_geometry(geometry));

        let stats = SceneStatistics::collect(&graph);
        assert_eq!(stats.non_indexed_geometry_count, 1);
        assert_eq!(stats.triangle_count, 0);
        assert_eq!(stats.vertex_count, 3);
    }

    #[test]
    fn test_display_mentions_counts() {
        let graph = SceneGraph::new();
        let rendered = SceneStatistics::collect(&graph).to_string();
        assert!(rendered.contains("meshes: 0"));
        assert!(rendered.contains("estimated memory: 0 B"));
    }
}
