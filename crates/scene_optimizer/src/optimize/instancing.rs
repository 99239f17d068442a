//! Mesh instancing pass
//!
//! Meshes that share the exact same geometry and material draw identical
//! triangles and differ only by transform, so all but one can become
//! lightweight instances of a single master. Running deduplication first
//! pays off here: collapsed materials enlarge the (geometry, material)
//! clusters this pass keys on.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::optimize::OptimizeError;
use crate::scene::{
    GeometryHandle, Instance, InstanceHandle, MaterialHandle, Mesh, MeshFlags, MeshHandle,
    SceneGraph,
};

/// Settings for [`MeshInstancer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancingConfig {
    /// Smallest cluster worth instancing; smaller clusters stay untouched
    pub min_instance_count: usize,
    /// Give each instance its source mesh's parent instead of detaching it
    pub preserve_hierarchy: bool,
    /// Carried for parity with the merge settings; animated meshes are
    /// excluded from clustering regardless of this flag
    pub preserve_animations: bool,
}

impl Default for InstancingConfig {
    fn default() -> Self {
        Self {
            min_instance_count: 2,
            preserve_hierarchy: true,
            preserve_animations: false,
        }
    }
}

impl InstancingConfig {
    /// Check settings sanity
    pub fn validate(&self) -> Result<(), String> {
        if self.min_instance_count < 2 {
            return Err(format!(
                "min_instance_count must be at least 2, got {}",
                self.min_instance_count
            ));
        }
        Ok(())
    }
}

impl Config for InstancingConfig {}

/// One instancing cluster after conversion
#[derive(Debug, Clone)]
pub struct InstanceGroup {
    /// The mesh kept as the full master
    pub master: MeshHandle,
    /// Instances created from the remaining members
    pub instances: Vec<InstanceHandle>,
    /// Names of the source meshes that became instances, parallel to
    /// `instances`
    pub source_names: Vec<String>,
}

/// Outcome of one instancing run
#[derive(Debug, Clone)]
pub struct InstancingReport {
    /// Mesh count before the pass
    pub original_mesh_count: usize,
    /// Mesh count after the pass
    pub optimized_mesh_count: usize,
    /// Converted clusters in first-seen order
    pub groups: Vec<InstanceGroup>,
    /// Total instances created across all groups
    pub total_instances_created: usize,
}

impl InstancingReport {
    /// Percentage of mesh objects removed. This counts objects, not bytes;
    /// actual memory savings depend on geometry sizes.
    pub fn mesh_reduction_percent(&self) -> f32 {
        if self.original_mesh_count == 0 {
            return 0.0;
        }
        let removed = self.original_mesh_count - self.optimized_mesh_count;
        removed as f32 / self.original_mesh_count as f32 * 100.0
    }
}

type GroupKey = (GeometryHandle, Option<MaterialHandle>);

/// The mesh instancing pass
pub struct MeshInstancer {
    config: InstancingConfig,
}

impl MeshInstancer {
    /// Create the pass from its settings
    pub fn new(config: InstancingConfig) -> Self {
        Self { config }
    }

    /// Convert duplicate meshes into instances in place
    ///
    /// Candidates are meshes that own geometry, are not animated, and are
    /// not already serving as an instance master; entities in the instance
    /// arena never participate. Each retained
    /// cluster keeps its first member as the master and turns the rest into
    /// instances carrying the source's transform, visibility/picking/
    /// collision flags, parent (when `preserve_hierarchy`), and a clone of
    /// its metadata. A scene with nothing to instance yields a zero-effect
    /// report.
    pub fn run(&self, graph: &mut SceneGraph) -> Result<InstancingReport, OptimizeError> {
        graph.validate()?;

        let original_mesh_count = graph.mesh_count();
        let clusters = self.collect_clusters(graph);

        let mut groups = Vec::with_capacity(clusters.len());
        let mut total_instances_created = 0;

        for members in clusters {
            let master = members[0];
            let mut instances = Vec::with_capacity(members.len() - 1);
            let mut source_names = Vec::with_capacity(members.len() - 1);

            for &source_handle in &members[1..] {
                let source = match graph.mesh(source_handle) {
                    Some(mesh) => mesh,
                    None => continue,
                };

                let mut instance = Instance::new(source.name.clone(), master)
                    .with_transform(source.transform.clone())
                    .with_flags(
                        source.flags
                            & (MeshFlags::VISIBLE | MeshFlags::PICKABLE | MeshFlags::COLLIDABLE),
                    );
                if self.config.preserve_hierarchy {
                    if let Some(parent) = source.parent {
                        instance = instance.with_parent(parent);
                    }
                }
                if let Some(metadata) = &source.metadata {
                    instance = instance.with_metadata(metadata.clone());
                }

                source_names.push(source.name.clone());
                instances.push(graph.add_instance(instance));
                graph.remove_mesh(source_handle);
            }

            log::debug!(
                "instanced {} meshes behind master '{}'",
                instances.len(),
                graph.mesh(master).map_or("?", |m| m.name.as_str())
            );
            total_instances_created += instances.len();
            groups.push(InstanceGroup {
                master,
                instances,
                source_names,
            });
        }

        let optimized_mesh_count = graph.mesh_count();
        log::info!(
            "instancing: {original_mesh_count} -> {optimized_mesh_count} meshes, {total_instances_created} instances created"
        );

        Ok(InstancingReport {
            original_mesh_count,
            optimized_mesh_count,
            groups,
            total_instances_created,
        })
    }

    /// Preview clustering without mutating the graph
    pub fn analyze(&self, graph: &SceneGraph) -> Vec<String> {
        self.collect_clusters(graph)
            .into_iter()
            .map(|members| {
                let master_name = graph
                    .mesh(members[0])
                    .map_or("?", |m| m.name.as_str());
                format!(
                    "convert {} duplicates of '{}' into instances",
                    members.len() - 1,
                    master_name
                )
            })
            .collect()
    }

    /// Turn every instance back into a standalone mesh
    ///
    /// Best-effort reversal: each new mesh shares the master's geometry and
    /// material and takes the instance's transform, flags, parent, and
    /// metadata; the original mesh identities are not restored. Instances
    /// whose master no longer resolves are skipped with a warning. Returns
    /// the number of instances reverted.
    pub fn revert(&self, graph: &mut SceneGraph) -> Result<usize, OptimizeError> {
        let mut reverted = 0;

        for handle in graph.instance_handles() {
            let instance = match graph.instance(handle) {
                Some(instance) => instance.clone(),
                None => continue,
            };
            let (geometry, material) = match graph.mesh(instance.master) {
                Some(master) => (master.geometry, master.material),
                None => {
                    log::warn!(
                        "instance '{}' references a missing master; skipping revert",
                        instance.name
                    );
                    continue;
                }
            };

            let mut mesh = Mesh::new(instance.name)
                .with_transform(instance.transform)
                .with_flags(instance.flags);
            mesh.geometry = geometry;
            mesh.material = material;
            mesh.parent = instance.parent;
            mesh.metadata = instance.metadata;

            graph.add_mesh(mesh);
            graph.remove_instance(handle);
            reverted += 1;
        }

        log::info!("reverted {reverted} instances to standalone meshes");
        Ok(reverted)
    }

    /// Retained clusters in first-seen order, each holding at least
    /// `min_instance_count` members
    ///
    /// Meshes already serving as a master stay out: converting one would
    /// leave its existing instances pointing at nothing.
    fn collect_clusters(&self, graph: &SceneGraph) -> Vec<Vec<MeshHandle>> {
        let masters: HashSet<MeshHandle> = graph
            .instances()
            .map(|(_, instance)| instance.master)
            .collect();
        let mut order: Vec<GroupKey> = Vec::new();
        let mut members: HashMap<GroupKey, Vec<MeshHandle>> = HashMap::new();

        for (handle, mesh) in graph.meshes() {
            let geometry = match mesh.geometry {
                Some(geometry) => geometry,
                None => continue,
            };
            if mesh.is_animated() || masters.contains(&handle) {
                continue;
            }
            let key = (geometry, mesh.material);
            if !members.contains_key(&key) {
                order.push(key);
            }
            members.entry(key).or_default().push(handle);
        }

        order
            .into_iter()
            .filter_map(|key| members.remove(&key))
            .filter(|cluster| cluster.len() >= self.config.min_instance_count)
            .collect()
    }
}
