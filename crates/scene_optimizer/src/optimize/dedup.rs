//! Material deduplication pass
//!
//! Scenes assembled from many small asset files routinely end up with dozens
//! of materials that differ only by rounding noise. This pass clusters
//! referenced materials by threshold similarity, repoints every mesh in a
//! cluster at one freshly cloned survivor, and releases the originals.
//!
//! Clustering is greedy and single-pass: each material in discovery order
//! opens a cluster and absorbs every later unclustered material similar to
//! the *opener*. Members are never re-tested against each other, so a chain
//! A~B, B~C can land A and C in one cluster even though A and C alone would
//! not match. That non-transitivity is deliberate, kept because tightening
//! it would change which materials merge.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::foundation::math::Vec3;
use crate::optimize::OptimizeError;
use crate::scene::{
    Material, MaterialHandle, MaterialKind, MeshHandle, SceneGraph, TextureHandle,
};

/// How texture slots are compared during similarity testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureIdentity {
    /// Equal handles match, and so do two textures sharing a source URL
    BySourceUrl,
    /// Only equal handles match
    ByHandle,
}

impl Default for TextureIdentity {
    fn default() -> Self {
        TextureIdentity::BySourceUrl
    }
}

/// Settings for [`MaterialDeduplicator`]
///
/// All thresholds are absolute (L1) differences. Color thresholds apply to
/// the sum of the per-channel differences across R, G, B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Maximum summed RGB difference for two colors to count as equal
    pub color_threshold: f32,
    /// Maximum alpha difference
    pub alpha_threshold: f32,
    /// Maximum metallic difference (PBR materials)
    pub metallic_threshold: f32,
    /// Maximum roughness difference (PBR materials)
    pub roughness_threshold: f32,
    /// Whether texture slots participate in the similarity test
    pub compare_textures: bool,
    /// How texture slots are compared when they do
    pub texture_identity: TextureIdentity,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            color_threshold: 0.3,
            alpha_threshold: 0.05,
            metallic_threshold: 0.1,
            roughness_threshold: 0.1,
            compare_textures: true,
            texture_identity: TextureIdentity::default(),
        }
    }
}

impl DedupConfig {
    /// Check threshold sanity
    pub fn validate(&self) -> Result<(), String> {
        let thresholds = [
            ("color_threshold", self.color_threshold),
            ("alpha_threshold", self.alpha_threshold),
            ("metallic_threshold", self.metallic_threshold),
            ("roughness_threshold", self.roughness_threshold),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        Ok(())
    }
}

impl Config for DedupConfig {}

/// One similarity cluster, kept for diagnostics
#[derive(Debug, Clone)]
pub struct MaterialCluster {
    /// The material the cluster's meshes reference after the pass: a new
    /// clone of the opener for clusters of size > 1, the untouched original
    /// for singletons
    pub survivor: MaterialHandle,
    /// Display names of the original members, opener first
    pub member_names: Vec<String>,
}

/// Outcome of one deduplication run
#[derive(Debug, Clone)]
pub struct DedupReport {
    /// Materials that entered clustering (referenced by at least one mesh)
    pub original_count: usize,
    /// Material count after collapsing, equal to the number of clusters
    pub optimized_count: usize,
    /// All clusters in discovery order, singletons included
    pub clusters: Vec<MaterialCluster>,
    /// Surviving material handles, one per cluster
    pub surviving_materials: Vec<MaterialHandle>,
}

impl DedupReport {
    /// Percentage of referenced materials removed by the pass
    pub fn reduction_percent(&self) -> f32 {
        if self.original_count == 0 {
            return 0.0;
        }
        let removed = self.original_count - self.optimized_count;
        removed as f32 / self.original_count as f32 * 100.0
    }
}

/// Summed per-channel absolute difference
fn color_distance(a: Vec3, b: Vec3) -> f32 {
    (a.x - b.x).abs() + (a.y - b.y).abs() + (a.z - b.z).abs()
}

struct ClusterScan {
    /// Referenced materials in discovery order
    discovered: Vec<MaterialHandle>,
    /// Material to the meshes referencing it
    referencing: HashMap<MaterialHandle, Vec<MeshHandle>>,
    /// Clusters as member handle lists, opener first
    clusters: Vec<Vec<MaterialHandle>>,
}

/// The material deduplication pass
pub struct MaterialDeduplicator {
    config: DedupConfig,
}

impl MaterialDeduplicator {
    /// Create the pass from its settings
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Cluster and collapse similar materials in place
    ///
    /// Meshes whose material lands in a cluster of size > 1 are repointed to
    /// a fresh clone of the cluster's opener; the originals are then
    /// released. Unreferenced materials never enter clustering and are left
    /// untouched. An empty or already-unique scene yields a zero-effect
    /// report, not an error.
    pub fn run(&self, graph: &mut SceneGraph) -> Result<DedupReport, OptimizeError> {
        graph.validate()?;

        let scan = self.scan(graph);
        let original_count = scan.discovered.len();

        // Resolve diagnostic names while every original is still alive.
        let cluster_names: Vec<Vec<String>> = scan
            .clusters
            .iter()
            .map(|members| {
                members
                    .iter()
                    .filter_map(|&m| graph.material(m).map(|mat| mat.name.clone()))
                    .collect()
            })
            .collect();

        let mut clusters = Vec::with_capacity(scan.clusters.len());
        let mut surviving_materials = Vec::with_capacity(scan.clusters.len());

        for (members, member_names) in scan.clusters.iter().zip(cluster_names) {
            let survivor = if members.len() > 1 {
                let template = match graph.material(members[0]) {
                    Some(material) => material.clone(),
                    None => continue,
                };
                log::debug!(
                    "material cluster: '{}' absorbs {} similar materials",
                    template.name,
                    members.len() - 1
                );
                let survivor = graph.add_material(template);

                for member in members {
                    if let Some(mesh_handles) = scan.referencing.get(member) {
                        for &mesh_handle in mesh_handles {
                            if let Some(mesh) = graph.mesh_mut(mesh_handle) {
                                mesh.material = Some(survivor);
                            }
                        }
                    }
                }
                for (member, name) in members.iter().zip(&member_names) {
                    if !graph.release_material(*member) {
                        log::warn!(
                            "material '{name}' is still referenced after repointing; leaving it in place"
                        );
                    }
                }
                survivor
            } else {
                members[0]
            };

            surviving_materials.push(survivor);
            clusters.push(MaterialCluster {
                survivor,
                member_names,
            });
        }

        let optimized_count = clusters.len();
        log::info!("material dedup: {original_count} -> {optimized_count} referenced materials");

        Ok(DedupReport {
            original_count,
            optimized_count,
            clusters,
            surviving_materials,
        })
    }

    /// Preview clustering without mutating the graph
    ///
    /// Returns one suggestion string per cluster that would collapse.
    pub fn analyze(&self, graph: &SceneGraph) -> Vec<String> {
        self.scan(graph)
            .clusters
            .iter()
            .filter(|members| members.len() > 1)
            .map(|members| {
                let names: Vec<&str> = members
                    .iter()
                    .filter_map(|&m| graph.material(m).map(|mat| mat.name.as_str()))
                    .collect();
                format!(
                    "deduplicate {} similar materials: {}",
                    members.len(),
                    names.join(", ")
                )
            })
            .collect()
    }

    fn scan(&self, graph: &SceneGraph) -> ClusterScan {
        let mut discovered: Vec<MaterialHandle> = Vec::new();
        let mut referencing: HashMap<MaterialHandle, Vec<MeshHandle>> = HashMap::new();

        for (mesh_handle, mesh) in graph.meshes() {
            if let Some(material) = mesh.material {
                if !referencing.contains_key(&material) {
                    discovered.push(material);
                }
                referencing.entry(material).or_default().push(mesh_handle);
            }
        }

        let mut clustered = vec![false; discovered.len()];
        let mut clusters: Vec<Vec<MaterialHandle>> = Vec::new();

        for i in 0..discovered.len() {
            if clustered[i] {
                continue;
            }
            clustered[i] = true;
            let mut members = vec![discovered[i]];

            for j in (i + 1)..discovered.len() {
                if clustered[j] {
                    continue;
                }
                let similar = match (graph.material(discovered[i]), graph.material(discovered[j]))
                {
                    (Some(opener), Some(candidate)) => {
                        self.materials_similar(graph, opener, candidate)
                    }
                    _ => false,
                };
                if similar {
                    clustered[j] = true;
                    members.push(discovered[j]);
                }
            }
            clusters.push(members);
        }

        ClusterScan {
            discovered,
            referencing,
            clusters,
        }
    }

    /// Symmetric pairwise similarity test
    fn materials_similar(&self, graph: &SceneGraph, a: &Material, b: &Material) -> bool {
        let params_similar = match (&a.kind, &b.kind) {
            (MaterialKind::Standard(pa), MaterialKind::Standard(pb)) => {
                color_distance(pa.diffuse_color, pb.diffuse_color) <= self.config.color_threshold
                    && color_distance(pa.specular_color, pb.specular_color)
                        <= self.config.color_threshold
                    && color_distance(pa.emissive_color, pb.emissive_color)
                        <= self.config.color_threshold
                    && (pa.alpha - pb.alpha).abs() <= self.config.alpha_threshold
            }
            (MaterialKind::Pbr(pa), MaterialKind::Pbr(pb)) => {
                color_distance(pa.base_color, pb.base_color) <= self.config.color_threshold
                    && (pa.metallic - pb.metallic).abs() <= self.config.metallic_threshold
                    && (pa.roughness - pb.roughness).abs() <= self.config.roughness_threshold
                    && (pa.alpha - pb.alpha).abs() <= self.config.alpha_threshold
            }
            // Different variants are never similar.
            _ => return false,
        };
        if !params_similar {
            return false;
        }
        if !self.config.compare_textures {
            return true;
        }
        a.textures
            .slots()
            .into_iter()
            .zip(b.textures.slots())
            .all(|(sa, sb)| self.slot_matches(graph, sa, sb))
    }

    /// A slot pair matches when both are empty or both resolve to the same
    /// texture identity under the configured mode
    fn slot_matches(
        &self,
        graph: &SceneGraph,
        a: Option<TextureHandle>,
        b: Option<TextureHandle>,
    ) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(ha), Some(hb)) => {
                if ha == hb {
                    return true;
                }
                match self.config.texture_identity {
                    TextureIdentity::ByHandle => false,
                    TextureIdentity::BySourceUrl => {
                        match (graph.texture(ha), graph.texture(hb)) {
                            (Some(ta), Some(tb)) => match (&ta.source_url, &tb.source_url) {
                                (Some(ua), Some(ub)) => ua == ub,
                                _ => false,
                            },
                            _ => false,
                        }
                    }
                }
            }
            _ => false,
        }
    }
}
