//! Mesh merging pass
//!
//! Meshes drawn with the same material can share a draw call if their
//! geometry lives in one buffer set, so this pass groups eligible meshes by
//! material and concatenates each group's buffers into a single merged mesh.
//! Members rarely agree on which vertex attributes they carry; buffers are
//! normalized to the union of attribute kinds first, filling the gaps with
//! documented per-attribute defaults, because concatenating mismatched
//! layouts would corrupt every vertex after the first seam.
//!
//! Merging copies buffers and drops the sources, so it cannot be undone in
//! place. [`MeshMerger::merged_meshes`] enumerates the outputs for manual
//! deletion; restoring the original meshes means reloading the scene.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::optimize::OptimizeError;
use crate::scene::{
    Geometry, GeometryError, GeometryHandle, MaterialHandle, MaterialSection, Mesh, MeshFlags,
    MeshHandle, MeshOrigin, NodeHandle, SceneGraph, VertexAttribute,
};

/// Settings for [`MeshMerger`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Keep the source meshes alongside the merged output instead of
    /// disposing them
    pub preserve_source_meshes: bool,
    /// Largest number of meshes concatenated into one output; bigger groups
    /// are split into consecutive batches of this size
    pub merge_limit_per_group: usize,
    /// Parent each merged mesh under its first member's parent instead of
    /// leaving it at the root
    pub respect_hierarchy: bool,
    /// Allow collidable meshes into merge groups
    pub merge_collision_meshes: bool,
    /// Recompute each merged geometry's bounding box from the concatenated
    /// positions
    pub create_bounding_boxes: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            preserve_source_meshes: false,
            merge_limit_per_group: 1000,
            respect_hierarchy: true,
            merge_collision_meshes: false,
            create_bounding_boxes: true,
        }
    }
}

impl MergeConfig {
    /// Check settings sanity
    pub fn validate(&self) -> Result<(), String> {
        if self.merge_limit_per_group < 1 {
            return Err("merge_limit_per_group must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Config for MergeConfig {}

/// Errors a single merge batch can fail with
///
/// A failed batch leaves its source meshes untouched; the pass logs the
/// error, records it in the report, and moves on to the next batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// No meshes were given to merge
    #[error("no meshes given to merge")]
    EmptySelection,

    /// A mesh handle did not resolve
    #[error("a mesh handle does not resolve to a live mesh")]
    MissingMesh,

    /// A member carries no geometry, or its geometry handle dangles
    #[error("mesh '{mesh}' has no geometry to merge")]
    MissingGeometry {
        /// Name of the offending mesh
        mesh: String,
    },

    /// The combined vertex count cannot be addressed by 32-bit indices
    #[error("merged vertex count {total} exceeds the 32-bit index range")]
    VertexCountOverflow {
        /// Combined vertex count of the batch
        total: u64,
    },

    /// A member's buffers violate the geometry invariant
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// One successfully merged batch
#[derive(Debug, Clone)]
pub struct MergedBatch {
    /// The merged output mesh
    pub mesh: MeshHandle,
    /// Names of the source meshes, in concatenation order
    pub source_names: Vec<String>,
    /// Sum of the members' vertex counts
    pub vertices_before: usize,
    /// Vertex count of the merged geometry
    pub vertices_after: usize,
}

/// Outcome of one merge run
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// Mesh count before the pass
    pub original_mesh_count: usize,
    /// Mesh count after the pass
    pub merged_mesh_count: usize,
    /// Per-batch outcome, in processing order; failed batches keep their
    /// sources and do not abort the pass
    pub batches: Vec<Result<MergedBatch, MergeError>>,
    /// Vertices eliminated across successful batches. Concatenation
    /// conserves vertex counts, so this is normally zero; it is reported
    /// for symmetry with the mesh and draw-call metrics.
    pub total_vertex_reduction: usize,
}

impl MergeReport {
    /// Percentage of mesh objects removed
    pub fn mesh_reduction_percent(&self) -> f32 {
        if self.original_mesh_count == 0 {
            return 0.0;
        }
        let removed = self
            .original_mesh_count
            .saturating_sub(self.merged_mesh_count);
        removed as f32 / self.original_mesh_count as f32 * 100.0
    }

    /// Estimated draw-call reduction, assuming one draw call per mesh
    pub fn draw_call_reduction_percent(&self) -> f32 {
        self.mesh_reduction_percent()
    }

    /// The successful batches
    pub fn successes(&self) -> impl Iterator<Item = &MergedBatch> {
        self.batches.iter().filter_map(|batch| batch.as_ref().ok())
    }

    /// Number of failed batches
    pub fn failure_count(&self) -> usize {
        self.batches.iter().filter(|batch| batch.is_err()).count()
    }
}

/// Per-member data gathered before any buffer is built
struct MergeMember {
    name: String,
    material: Option<MaterialHandle>,
    parent: Option<NodeHandle>,
    flags: MeshFlags,
    geometry: GeometryHandle,
}

/// The mesh merging pass
pub struct MeshMerger {
    config: MergeConfig,
}

impl MeshMerger {
    /// Create the pass from its settings
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Merge compatible meshes in place
    ///
    /// A mesh is eligible when it owns geometry with at least one vertex, is
    /// visible, is not animated, is not collidable (unless
    /// `merge_collision_meshes`), and is not serving as an instance master.
    /// Eligible meshes are grouped by material, with material-less meshes
    /// forming their own group; groups of one are left alone, and larger
    /// groups are split into batches of `merge_limit_per_group`. Each batch
    /// becomes one merged mesh; its sources are disposed unless
    /// `preserve_source_meshes`, and source geometry no longer referenced by
    /// anything is released with them.
    pub fn run(&self, graph: &mut SceneGraph) -> Result<MergeReport, OptimizeError> {
        graph.validate()?;

        let original_mesh_count = graph.mesh_count();
        let groups = self.collect_groups(graph);
        let mut batches = Vec::new();

        for (_, members) in groups {
            for batch in members.chunks(self.config.merge_limit_per_group.max(1)) {
                let vertices_before = batch
                    .iter()
                    .filter_map(|&handle| {
                        graph
                            .mesh(handle)
                            .and_then(|mesh| mesh.geometry)
                            .and_then(|geometry| graph.geometry(geometry))
                    })
                    .map(Geometry::vertex_count)
                    .sum();

                match self.merge_meshes(graph, batch) {
                    Ok(merged) => {
                        let vertices_after = graph
                            .mesh(merged)
                            .and_then(|mesh| mesh.geometry)
                            .and_then(|geometry| graph.geometry(geometry))
                            .map_or(0, Geometry::vertex_count);
                        let source_names = batch
                            .iter()
                            .filter_map(|&handle| graph.mesh(handle).map(|m| m.name.clone()))
                            .collect();
                        if !self.config.preserve_source_meshes {
                            dispose_sources(graph, batch);
                        }
                        batches.push(Ok(MergedBatch {
                            mesh: merged,
                            source_names,
                            vertices_before,
                            vertices_after,
                        }));
                    }
                    Err(error) => {
                        let first = batch
                            .first()
                            .and_then(|&handle| graph.mesh(handle))
                            .map_or("?", |mesh| mesh.name.as_str());
                        log::warn!("skipping merge batch starting at '{first}': {error}");
                        batches.push(Err(error));
                    }
                }
            }
        }

        let merged_mesh_count = graph.mesh_count();
        let total_vertex_reduction = batches
            .iter()
            .filter_map(|batch| batch.as_ref().ok())
            .map(|batch| batch.vertices_before.saturating_sub(batch.vertices_after))
            .sum();
        let failures = batches.iter().filter(|batch| batch.is_err()).count();
        log::info!(
            "mesh merge: {original_mesh_count} -> {merged_mesh_count} meshes in {} batches ({failures} failed)",
            batches.len()
        );

        Ok(MergeReport {
            original_mesh_count,
            merged_mesh_count,
            batches,
            total_vertex_reduction,
        })
    }

    /// Preview merge groups without mutating the graph
    pub fn analyze(&self, graph: &SceneGraph) -> Vec<String> {
        self.collect_groups(graph)
            .into_iter()
            .map(|(material, members)| {
                let material_name = material
                    .and_then(|handle| graph.material(handle))
                    .map_or("<none>", |m| m.name.as_str());
                let limit = self.config.merge_limit_per_group.max(1);
                if members.len() > limit {
                    format!(
                        "merge {} meshes sharing material '{material_name}' in {} batches",
                        members.len(),
                        members.len().div_ceil(limit)
                    )
                } else {
                    format!(
                        "merge {} meshes sharing material '{material_name}'",
                        members.len()
                    )
                }
            })
            .collect()
    }

    /// Merge an explicit list of meshes into one new mesh
    ///
    /// This is the primitive `run` applies per batch. The sources are left
    /// in the graph; callers dispose them once the returned handle is
    /// accepted. Buffers are concatenated in list order after normalizing
    /// every member to the union of attribute kinds. If any member is
    /// indexed, the output is indexed and non-indexed members contribute
    /// trivial sequential indices; if none are, the output stays
    /// non-indexed. Members are concatenated in their local spaces and the
    /// merged mesh gets an identity transform. When the members carry more
    /// than one distinct material the merged mesh records per-member
    /// material sections; single-material merges carry none.
    pub fn merge_meshes(
        &self,
        graph: &mut SceneGraph,
        meshes: &[MeshHandle],
    ) -> Result<MeshHandle, MergeError> {
        if meshes.is_empty() {
            return Err(MergeError::EmptySelection);
        }

        let mut members = Vec::with_capacity(meshes.len());
        for &handle in meshes {
            let mesh = graph.mesh(handle).ok_or(MergeError::MissingMesh)?;
            let geometry_handle = mesh.geometry.ok_or_else(|| MergeError::MissingGeometry {
                mesh: mesh.name.clone(),
            })?;
            let geometry =
                graph
                    .geometry(geometry_handle)
                    .ok_or_else(|| MergeError::MissingGeometry {
                        mesh: mesh.name.clone(),
                    })?;
            geometry.validate()?;
            members.push(MergeMember {
                name: mesh.name.clone(),
                material: mesh.material,
                parent: mesh.parent,
                flags: mesh.flags,
                geometry: geometry_handle,
            });
        }

        let total_vertices: u64 = members
            .iter()
            .filter_map(|member| graph.geometry(member.geometry))
            .map(|geometry| geometry.vertex_count() as u64)
            .sum();
        if total_vertices > u64::from(u32::MAX) {
            return Err(MergeError::VertexCountOverflow {
                total: total_vertices,
            });
        }

        // Union of attribute kinds across the batch, in canonical order.
        // Every member gets normalized to this exact layout.
        let union: Vec<VertexAttribute> = VertexAttribute::ALL
            .into_iter()
            .filter(|&kind| {
                kind != VertexAttribute::Position
                    && members.iter().any(|member| {
                        graph
                            .geometry(member.geometry)
                            .is_some_and(|geometry| geometry.has_attribute(kind))
                    })
            })
            .collect();
        let output_indexed = members.iter().any(|member| {
            graph
                .geometry(member.geometry)
                .is_some_and(Geometry::is_indexed)
        });

        let mut positions = Vec::with_capacity(total_vertices as usize * 3);
        let mut buffers: Vec<(VertexAttribute, Vec<f32>)> = union
            .iter()
            .map(|&kind| {
                (
                    kind,
                    Vec::with_capacity(total_vertices as usize * kind.component_count()),
                )
            })
            .collect();
        let mut indices = Vec::new();
        let mut sections = Vec::with_capacity(members.len());
        let mut vertex_cursor = 0usize;
        let mut index_cursor = 0usize;

        for member in &members {
            let geometry = match graph.geometry(member.geometry) {
                Some(geometry) => geometry,
                None => continue,
            };
            let vertex_count = geometry.vertex_count();

            positions.extend_from_slice(geometry.positions());
            for (kind, out) in &mut buffers {
                if let Some(data) = geometry.attribute(*kind) {
                    out.extend_from_slice(data);
                } else if let Some(defaults) = kind.default_components() {
                    for _ in 0..vertex_count {
                        out.extend_from_slice(defaults);
                    }
                }
            }

            let index_count = if output_indexed {
                let offset = vertex_cursor as u32;
                if let Some(member_indices) = geometry.indices() {
                    indices.extend(member_indices.iter().map(|&index| index + offset));
                    member_indices.len()
                } else {
                    indices.extend((0..vertex_count as u32).map(|index| index + offset));
                    vertex_count
                }
            } else {
                0
            };

            sections.push(MaterialSection {
                material: member.material,
                vertex_start: vertex_cursor,
                vertex_count,
                index_start: index_cursor,
                index_count,
            });
            vertex_cursor += vertex_count;
            index_cursor += index_count;
        }

        let mut merged_geometry = Geometry::new(positions)?;
        for (kind, data) in buffers {
            merged_geometry.set_attribute(kind, data)?;
        }
        if output_indexed {
            merged_geometry.set_indices(indices)?;
        }
        if self.config.create_bounding_boxes {
            merged_geometry.recompute_bounding_box();
        }

        let distinct_materials: HashSet<Option<MaterialHandle>> =
            members.iter().map(|member| member.material).collect();
        let first = &members[0];
        let mut flags = MeshFlags::VISIBLE;
        flags.set(MeshFlags::PICKABLE, first.flags.contains(MeshFlags::PICKABLE));
        flags.set(
            MeshFlags::COLLIDABLE,
            first.flags.contains(MeshFlags::COLLIDABLE),
        );

        let geometry_handle = graph.add_geometry(merged_geometry);
        let mut merged = Mesh::new(format!("{}_merged", first.name))
            .with_geometry(geometry_handle)
            .with_flags(flags);
        merged.material = first.material;
        merged.origin = MeshOrigin::Merged;
        if self.config.respect_hierarchy {
            merged.parent = first.parent;
        }
        if distinct_materials.len() > 1 {
            merged.sections = sections;
        }

        log::debug!(
            "merged {} meshes into '{}' ({} vertices)",
            members.len(),
            merged.name,
            vertex_cursor
        );
        Ok(graph.add_mesh(merged))
    }

    /// Enumerate meshes produced by the merge pass
    ///
    /// Merging is not reversible in place: source buffers were copied and
    /// the sources dropped. This lists the merge outputs so a caller can
    /// delete them manually; recovering the source meshes means reloading
    /// the original scene.
    pub fn merged_meshes(graph: &SceneGraph) -> Vec<MeshHandle> {
        graph
            .meshes()
            .filter(|(_, mesh)| mesh.origin == MeshOrigin::Merged)
            .map(|(handle, _)| handle)
            .collect()
    }

    /// Merge groups keyed by material, in first-seen order, each holding at
    /// least two members
    fn collect_groups(
        &self,
        graph: &SceneGraph,
    ) -> Vec<(Option<MaterialHandle>, Vec<MeshHandle>)> {
        let masters: HashSet<MeshHandle> = graph
            .instances()
            .map(|(_, instance)| instance.master)
            .collect();
        let mut order: Vec<Option<MaterialHandle>> = Vec::new();
        let mut members: HashMap<Option<MaterialHandle>, Vec<MeshHandle>> = HashMap::new();

        for (handle, mesh) in graph.meshes() {
            let has_vertices = mesh
                .geometry
                .and_then(|geometry| graph.geometry(geometry))
                .is_some_and(|geometry| geometry.vertex_count() > 0);
            if !has_vertices
                || !mesh.is_visible()
                || mesh.is_animated()
                || (mesh.is_collidable() && !self.config.merge_collision_meshes)
                || masters.contains(&handle)
            {
                continue;
            }
            let key = mesh.material;
            if !members.contains_key(&key) {
                order.push(key);
            }
            members.entry(key).or_default().push(handle);
        }

        order
            .into_iter()
            .filter_map(|key| members.remove(&key).map(|group| (key, group)))
            .filter(|(_, group)| group.len() > 1)
            .collect()
    }
}

/// Remove a batch's source meshes and release any geometry that is no longer
/// referenced
fn dispose_sources(graph: &mut SceneGraph, batch: &[MeshHandle]) {
    let mut geometries: Vec<GeometryHandle> = Vec::new();
    for &handle in batch {
        if let Some(mesh) = graph.remove_mesh(handle) {
            if let Some(geometry) = mesh.geometry {
                if !geometries.contains(&geometry) {
                    geometries.push(geometry);
                }
            }
        }
    }
    for geometry in geometries {
        if graph.release_geometry(geometry) {
            log::debug!("released source geometry left orphaned by merge");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::scene::{Instance, Material, StandardMaterialParams, TransformNode};

    fn add_quad(graph: &mut SceneGraph) -> GeometryHandle {
        let geometry = Geometry::new(vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ])
        .and_then(|g| g.with_indices(vec![0, 1, 2, 0, 2, 3]))
        .unwrap();
        graph.add_geometry(geometry)
    }

    fn add_plain_triangle(graph: &mut SceneGraph) -> GeometryHandle {
        let geometry =
            Geometry::new(vec![2.0, 0.0, 0.0, 3.0, 0.0, 0.0, 2.0, 1.0, 0.0]).unwrap();
        graph.add_geometry(geometry)
    }

    fn add_material(graph: &mut SceneGraph, name: &str) -> MaterialHandle {
        graph.add_material(
            Material::standard(StandardMaterialParams::default()).with_name(name),
        )
    }

    fn make_group_scene(count: usize) -> (SceneGraph, MaterialHandle) {
        let mut graph = SceneGraph::new();
        let material = add_material(&mut graph, "shared");
        for i in 0..count {
            let geometry = add_quad(&mut graph);
            graph.add_mesh(
                Mesh::new(format!("box_{i}"))
                    .with_geometry(geometry)
                    .with_material(material),
            );
        }
        (graph, material)
    }

    #[test]
    fn test_merge_conserves_vertices() {
        let (mut graph, material) = make_group_scene(3);
        let report = MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();

        assert_eq!(report.original_mesh_count, 3);
        assert_eq!(report.merged_mesh_count, 1);
        assert_eq!(report.batches.len(), 1);
        assert_eq!(report.total_vertex_reduction, 0);

        let batch = report.successes().next().unwrap();
        assert_eq!(batch.vertices_before, 12);
        assert_eq!(batch.vertices_after, 12);
        assert_eq!(batch.source_names, vec!["box_0", "box_1", "box_2"]);

        let merged = graph.mesh(batch.mesh).unwrap();
        assert_eq!(merged.name, "box_0_merged");
        assert_eq!(merged.origin, MeshOrigin::Merged);
        assert_eq!(merged.material, Some(material));
        assert!(merged.sections.is_empty());

        let geometry = graph.geometry(merged.geometry.unwrap()).unwrap();
        assert_eq!(geometry.vertex_count(), 12);
        assert_eq!(geometry.index_count(), 18);
        assert!(geometry.indices().unwrap().iter().all(|&i| i < 12));
    }

    #[test]
    fn test_attribute_normalization_fills_defaults() {
        let mut graph = SceneGraph::new();
        let material = add_material(&mut graph, "shared");

        let rich = Geometry::new(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
            .and_then(|g| g.with_attribute(VertexAttribute::Normal, vec![0.0, 0.0, 1.0].repeat(3)))
            .and_then(|g| g.with_attribute(VertexAttribute::Uv0, vec![0.5, 0.5].repeat(3)))
            .unwrap();
        let rich = graph.add_geometry(rich);
        let plain = add_plain_triangle(&mut graph);
        graph.add_mesh(Mesh::new("a").with_geometry(rich).with_material(material));
        graph.add_mesh(Mesh::new("b").with_geometry(plain).with_material(material));

        let report = MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        let batch = report.successes().next().unwrap();
        let merged = graph.mesh(batch.mesh).unwrap();
        let geometry = graph.geometry(merged.geometry.unwrap()).unwrap();

        assert_eq!(geometry.vertex_count(), 6);
        let normals = geometry.attribute(VertexAttribute::Normal).unwrap();
        assert_eq!(normals.len(), 18);
        assert_eq!(&normals[..9], &[0.0, 0.0, 1.0].repeat(3)[..]);
        // The plain member's segment gets the documented default normal.
        assert_eq!(&normals[9..], &[0.0, 1.0, 0.0].repeat(3)[..]);

        let uvs = geometry.attribute(VertexAttribute::Uv0).unwrap();
        assert_eq!(uvs.len(), 12);
        assert_eq!(&uvs[..6], &[0.5; 6]);
        assert_eq!(&uvs[6..], &[0.0; 6]);
    }

    #[test]
    fn test_eligibility_filter() {
        let (mut graph, material) = make_group_scene(2);
        let invisible_geometry = add_quad(&mut graph);
        let mut invisible = Mesh::new("hidden")
            .with_geometry(invisible_geometry)
            .with_material(material);
        invisible.flags.remove(MeshFlags::VISIBLE);
        graph.add_mesh(invisible);

        let animated_geometry = add_quad(&mut graph);
        graph.add_mesh(
            Mesh::new("animated")
                .with_geometry(animated_geometry)
                .with_material(material)
                .with_flags(MeshFlags::default() | MeshFlags::ANIMATED),
        );

        let collidable_geometry = add_quad(&mut graph);
        graph.add_mesh(
            Mesh::new("wall")
                .with_geometry(collidable_geometry)
                .with_material(material)
                .with_flags(MeshFlags::default() | MeshFlags::COLLIDABLE),
        );

        graph.add_mesh(Mesh::new("empty").with_material(material));

        let report = MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        let batch = report.successes().next().unwrap();
        assert_eq!(batch.source_names, vec!["box_0", "box_1"]);
        // Excluded meshes survive alongside the merged output.
        assert_eq!(graph.mesh_count(), 5);
        for name in ["hidden", "animated", "wall", "empty"] {
            assert!(graph.meshes().any(|(_, m)| m.name == name));
        }
    }

    #[test]
    fn test_collidable_meshes_merge_when_allowed() {
        let mut graph = SceneGraph::new();
        let material = add_material(&mut graph, "level");
        for name in ["wall_a", "wall_b"] {
            let geometry = add_quad(&mut graph);
            graph.add_mesh(
                Mesh::new(name)
                    .with_geometry(geometry)
                    .with_material(material)
                    .with_flags(MeshFlags::default() | MeshFlags::COLLIDABLE),
            );
        }

        let report = MeshMerger::new(MergeConfig {
            merge_collision_meshes: true,
            ..MergeConfig::default()
        })
        .run(&mut graph)
        .unwrap();

        let batch = report.successes().next().unwrap();
        assert_eq!(batch.source_names.len(), 2);
        // First member's collidable flag carries over.
        assert!(graph.mesh(batch.mesh).unwrap().is_collidable());
    }

    #[test]
    fn test_groups_keyed_by_material() {
        let mut graph = SceneGraph::new();
        let red = add_material(&mut graph, "red");
        let blue = add_material(&mut graph, "blue");
        for (name, material) in [("r0", red), ("r1", red), ("b0", blue), ("b1", blue)] {
            let geometry = add_quad(&mut graph);
            graph.add_mesh(
                Mesh::new(name)
                    .with_geometry(geometry)
                    .with_material(material),
            );
        }
        // A lone mesh forms a group of one and is left alone.
        let lone_geometry = add_quad(&mut graph);
        graph.add_mesh(Mesh::new("lone").with_geometry(lone_geometry));

        let report = MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        assert_eq!(report.batches.len(), 2);
        assert_eq!(graph.mesh_count(), 3);
        assert!(graph.meshes().any(|(_, m)| m.name == "lone"));
    }

    #[test]
    fn test_material_less_meshes_form_their_own_group() {
        let mut graph = SceneGraph::new();
        for name in ["bare_a", "bare_b"] {
            let geometry = add_quad(&mut graph);
            graph.add_mesh(Mesh::new(name).with_geometry(geometry));
        }

        let report = MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        let batch = report.successes().next().unwrap();
        let merged = graph.mesh(batch.mesh).unwrap();
        assert_eq!(merged.material, None);
        assert_eq!(batch.source_names, vec!["bare_a", "bare_b"]);
    }

    #[test]
    fn test_batches_split_at_group_limit() {
        let (mut graph, _) = make_group_scene(5);
        let report = MeshMerger::new(MergeConfig {
            merge_limit_per_group: 2,
            ..MergeConfig::default()
        })
        .run(&mut graph)
        .unwrap();

        assert_eq!(report.batches.len(), 3);
        let sizes: Vec<usize> = report
            .successes()
            .map(|batch| batch.source_names.len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(graph.mesh_count(), 3);
        assert!((report.mesh_reduction_percent() - 40.0).abs() < 1e-5);
        assert!((report.draw_call_reduction_percent() - 40.0).abs() < 1e-5);

        // Each output is internally consistent.
        for batch in report.successes() {
            let merged = graph.mesh(batch.mesh).unwrap();
            let geometry = graph.geometry(merged.geometry.unwrap()).unwrap();
            assert_eq!(geometry.vertex_count(), batch.vertices_after);
            assert!(geometry
                .indices()
                .unwrap()
                .iter()
                .all(|&i| (i as usize) < geometry.vertex_count()));
        }
    }

    #[test]
    fn test_mixed_indexing_synthesizes_trivial_indices() {
        let mut graph = SceneGraph::new();
        let material = add_material(&mut graph, "shared");
        let indexed = add_quad(&mut graph);
        let plain = add_plain_triangle(&mut graph);
        graph.add_mesh(Mesh::new("a").with_geometry(indexed).with_material(material));
        graph.add_mesh(Mesh::new("b").with_geometry(plain).with_material(material));

        let report = MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        let batch = report.successes().next().unwrap();
        let merged = graph.mesh(batch.mesh).unwrap();
        let geometry = graph.geometry(merged.geometry.unwrap()).unwrap();

        assert_eq!(geometry.vertex_count(), 7);
        let indices = geometry.indices().unwrap();
        assert_eq!(indices.len(), 9);
        assert_eq!(&indices[..6], &[0, 1, 2, 0, 2, 3]);
        // The non-indexed member contributes offset sequential indices.
        assert_eq!(&indices[6..], &[4, 5, 6]);
    }

    #[test]
    fn test_all_non_indexed_output_stays_non_indexed() {
        let mut graph = SceneGraph::new();
        let material = add_material(&mut graph, "shared");
        for name in ["a", "b"] {
            let geometry = add_plain_triangle(&mut graph);
            graph.add_mesh(Mesh::new(name).with_geometry(geometry).with_material(material));
        }

        let report = MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        let batch = report.successes().next().unwrap();
        let merged = graph.mesh(batch.mesh).unwrap();
        let geometry = graph.geometry(merged.geometry.unwrap()).unwrap();
        assert!(!geometry.is_indexed());
        assert_eq!(geometry.vertex_count(), 6);
    }

    #[test]
    fn test_sections_recorded_for_mixed_materials() {
        let mut graph = SceneGraph::new();
        let red = add_material(&mut graph, "red");
        let blue = add_material(&mut graph, "blue");
        let first_geometry = add_quad(&mut graph);
        let second_geometry = add_quad(&mut graph);
        let first = graph.add_mesh(
            Mesh::new("m1")
                .with_geometry(first_geometry)
                .with_material(red),
        );
        let second = graph.add_mesh(
            Mesh::new("m2")
                .with_geometry(second_geometry)
                .with_material(blue),
        );

        let merger = MeshMerger::new(MergeConfig::default());
        let merged_handle = merger.merge_meshes(&mut graph, &[first, second]).unwrap();
        let merged = graph.mesh(merged_handle).unwrap();

        assert_eq!(merged.material, Some(red));
        assert_eq!(merged.sections.len(), 2);
        assert_eq!(
            merged.sections[0],
            MaterialSection {
                material: Some(red),
                vertex_start: 0,
                vertex_count: 4,
                index_start: 0,
                index_count: 6,
            }
        );
        assert_eq!(
            merged.sections[1],
            MaterialSection {
                material: Some(blue),
                vertex_start: 4,
                vertex_count: 4,
                index_start: 6,
                index_count: 6,
            }
        );
        // merge_meshes alone never disposes sources.
        assert!(graph.mesh(first).is_some());
        assert!(graph.mesh(second).is_some());
    }

    #[test]
    fn test_preserve_source_meshes() {
        let (mut graph, _) = make_group_scene(2);
        let report = MeshMerger::new(MergeConfig {
            preserve_source_meshes: true,
            ..MergeConfig::default()
        })
        .run(&mut graph)
        .unwrap();

        assert_eq!(report.original_mesh_count, 2);
        assert_eq!(report.merged_mesh_count, 3);
        assert_eq!(graph.geometry_count(), 3);
    }

    #[test]
    fn test_orphaned_source_geometry_released() {
        let (mut graph, _) = make_group_scene(2);
        assert_eq!(graph.geometry_count(), 2);

        MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        // Both source geometries released; only the merged one remains.
        assert_eq!(graph.geometry_count(), 1);
    }

    #[test]
    fn test_shared_source_geometry_survives_release() {
        let mut graph = SceneGraph::new();
        let material = add_material(&mut graph, "shared");
        let geometry = add_quad(&mut graph);
        graph.add_mesh(Mesh::new("a").with_geometry(geometry).with_material(material));
        graph.add_mesh(Mesh::new("b").with_geometry(geometry).with_material(material));
        // A hidden mesh keeps the shared geometry referenced after the merge.
        let mut hidden = Mesh::new("hidden").with_geometry(geometry);
        hidden.flags.remove(MeshFlags::VISIBLE);
        graph.add_mesh(hidden);

        MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        assert!(graph.geometry(geometry).is_some());
        assert_eq!(graph.geometry_count(), 2);
    }

    #[test]
    fn test_instance_masters_never_merge() {
        let (mut graph, _) = make_group_scene(2);
        let master = graph
            .meshes()
            .find(|(_, m)| m.name == "box_0")
            .map(|(h, _)| h)
            .unwrap();
        graph.add_instance(Instance::new("box_0_inst", master));

        let report = MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        // The master's exclusion shrinks the group to one, so nothing merges.
        assert!(report.batches.is_empty());
        assert_eq!(graph.mesh_count(), 2);
        graph.validate().unwrap();
    }

    #[test]
    fn test_hierarchy_respected() {
        let mut graph = SceneGraph::new();
        let material = add_material(&mut graph, "shared");
        let parent = graph.add_node(TransformNode::new("props"));
        for name in ["a", "b"] {
            let geometry = add_quad(&mut graph);
            graph.add_mesh(
                Mesh::new(name)
                    .with_geometry(geometry)
                    .with_material(material)
                    .with_parent(parent),
            );
        }

        let report = MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        let batch = report.successes().next().unwrap();
        assert_eq!(graph.mesh(batch.mesh).unwrap().parent, Some(parent));
    }

    #[test]
    fn test_hierarchy_dropped_when_disabled() {
        let mut graph = SceneGraph::new();
        let material = add_material(&mut graph, "shared");
        for name in ["a", "b"] {
            let geometry = add_quad(&mut graph);
            graph.add_mesh(
                Mesh::new(name)
                    .with_geometry(geometry)
                    .with_material(material)
                    .with_parent(graph.root()),
            );
        }

        let report = MeshMerger::new(MergeConfig {
            respect_hierarchy: false,
            ..MergeConfig::default()
        })
        .run(&mut graph)
        .unwrap();
        let batch = report.successes().next().unwrap();
        assert_eq!(graph.mesh(batch.mesh).unwrap().parent, None);
    }

    #[test]
    fn test_bounding_box_recomputed() {
        let (mut graph, _) = make_group_scene(2);
        let report = MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        let batch = report.successes().next().unwrap();
        let merged = graph.mesh(batch.mesh).unwrap();
        let aabb = graph
            .geometry(merged.geometry.unwrap())
            .unwrap()
            .bounding_box()
            .copied()
            .unwrap();
        assert_eq!(aabb.min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_bounding_box_skipped_when_disabled() {
        let (mut graph, _) = make_group_scene(2);
        let report = MeshMerger::new(MergeConfig {
            create_bounding_boxes: false,
            ..MergeConfig::default()
        })
        .run(&mut graph)
        .unwrap();
        let batch = report.successes().next().unwrap();
        let merged = graph.mesh(batch.mesh).unwrap();
        assert!(graph
            .geometry(merged.geometry.unwrap())
            .unwrap()
            .bounding_box()
            .is_none());
    }

    #[test]
    fn test_merge_meshes_rejects_empty_selection() {
        let mut graph = SceneGraph::new();
        let merger = MeshMerger::new(MergeConfig::default());
        assert_eq!(
            merger.merge_meshes(&mut graph, &[]),
            Err(MergeError::EmptySelection)
        );
    }

    #[test]
    fn test_merge_meshes_reports_missing_geometry() {
        let mut graph = SceneGraph::new();
        let bare = graph.add_mesh(Mesh::new("bare"));
        let merger = MeshMerger::new(MergeConfig::default());
        let result = merger.merge_meshes(&mut graph, &[bare]);
        assert_eq!(
            result,
            Err(MergeError::MissingGeometry {
                mesh: "bare".to_string()
            })
        );
        // The failed merge leaves the scene untouched.
        assert_eq!(graph.mesh_count(), 1);
        assert_eq!(graph.geometry_count(), 0);
    }

    #[test]
    fn test_merged_meshes_enumeration() {
        let mut graph = SceneGraph::new();
        let red = add_material(&mut graph, "red");
        let blue = add_material(&mut graph, "blue");
        for (name, material) in [("r0", red), ("r1", red), ("b0", blue), ("b1", blue)] {
            let geometry = add_quad(&mut graph);
            graph.add_mesh(
                Mesh::new(name)
                    .with_geometry(geometry)
                    .with_material(material),
            );
        }
        assert!(MeshMerger::merged_meshes(&graph).is_empty());

        MeshMerger::new(MergeConfig::default())
            .run(&mut graph)
            .unwrap();
        let merged = MeshMerger::merged_meshes(&graph);
        assert_eq!(merged.len(), 2);
        for handle in merged {
            assert_eq!(graph.mesh(handle).unwrap().origin, MeshOrigin::Merged);
        }
    }

    #[test]
    fn test_analyze_mutates_nothing() {
        let (graph, _) = {
            let (mut graph, material) = make_group_scene(3);
            // Push the group over a small limit to exercise the batch hint.
            for i in 3..5 {
                let geometry = add_quad(&mut graph);
                graph.add_mesh(
                    Mesh::new(format!("box_{i}"))
                        .with_geometry(geometry)
                        .with_material(material),
                );
            }
            (graph, material)
        };

        let merger = MeshMerger::new(MergeConfig {
            merge_limit_per_group: 2,
            ..MergeConfig::default()
        });
        let suggestions = merger.analyze(&graph);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(
            suggestions[0],
            "merge 5 meshes sharing material 'shared' in 3 batches"
        );
        assert_eq!(graph.mesh_count(), 5);
    }
}
