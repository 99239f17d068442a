//! Scene optimization passes
//!
//! Three passes reduce a scene's rendering cost, each invocable on its own
//! or through [`SceneOptimizer`], which runs them in a fixed order:
//!
//! 1. [`dedup::MaterialDeduplicator`] collapses near-identical materials so
//!    later passes see larger equality clusters.
//! 2. [`instancing::MeshInstancer`] converts repeated (geometry, material)
//!    meshes into instances of one master.
//! 3. [`merge::MeshMerger`] concatenates the remaining same-material meshes
//!    into fewer draw calls.
//!
//! The order matters: deduplication can only enlarge the clusters the
//! instancer and merger key on, never shrink them. Every pass validates the
//! graph before touching it and mutates it in place; reports carry the
//! numbers for logging and regression tracking.

pub mod dedup;
pub mod instancing;
pub mod merge;

pub use dedup::{DedupConfig, DedupReport, MaterialCluster, MaterialDeduplicator, TextureIdentity};
pub use instancing::{InstanceGroup, InstancingConfig, InstancingReport, MeshInstancer};
pub use merge::{MergeConfig, MergeError, MergeReport, MergedBatch, MeshMerger};

use thiserror::Error;

use crate::config::OptimizerConfig;
use crate::scene::{SceneError, SceneGraph, SceneStatistics};

/// Errors that abort an optimization pass outright
///
/// Recoverable trouble (a merge batch failing, an instance with a dangling
/// master during revert) is handled inside the passes and surfaces in their
/// reports or logs instead.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// The graph failed upfront validation; passes refuse to mutate a scene
    /// with dangling references or corrupt buffers
    #[error("scene failed validation: {0}")]
    InvalidScene(#[from] SceneError),
}

/// Combined outcome of a full pipeline run
#[derive(Debug, Clone)]
pub struct OptimizationReport {
    /// Scene statistics before any pass ran
    pub before: SceneStatistics,
    /// Scene statistics after all passes ran
    pub after: SceneStatistics,
    /// Material deduplication outcome
    pub dedup: DedupReport,
    /// Mesh instancing outcome
    pub instancing: InstancingReport,
    /// Mesh merging outcome
    pub merge: MergeReport,
}

impl OptimizationReport {
    /// Percentage of mesh objects removed across the whole pipeline
    pub fn mesh_reduction_percent(&self) -> f32 {
        if self.before.mesh_count == 0 {
            return 0.0;
        }
        let removed = self.before.mesh_count.saturating_sub(self.after.mesh_count);
        removed as f32 / self.before.mesh_count as f32 * 100.0
    }

    /// Estimated memory saved, as a percentage of the original estimate
    pub fn memory_reduction_percent(&self) -> f32 {
        let before = self.before.estimated_memory_bytes();
        if before == 0 {
            return 0.0;
        }
        let saved = before.saturating_sub(self.after.estimated_memory_bytes());
        saved as f32 / before as f32 * 100.0
    }
}

/// Runs the optimization passes in their canonical order
pub struct SceneOptimizer {
    config: OptimizerConfig,
}

impl SceneOptimizer {
    /// Create an optimizer from a full configuration
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Run deduplication, instancing, and merging against one graph
    ///
    /// Each stage hands its mutated graph to the next; statistics are taken
    /// before the first stage and after the last.
    pub fn optimize(&self, graph: &mut SceneGraph) -> Result<OptimizationReport, OptimizeError> {
        let before = SceneStatistics::collect(graph);
        log::info!(
            "optimizing scene: {} meshes, {} materials, {} geometries",
            before.mesh_count,
            before.material_count,
            before.geometry_count
        );

        let dedup = MaterialDeduplicator::new(self.config.dedup.clone()).run(graph)?;
        let instancing = MeshInstancer::new(self.config.instancing.clone()).run(graph)?;
        let merge = MeshMerger::new(self.config.merge.clone()).run(graph)?;

        let after = SceneStatistics::collect(graph);
        let report = OptimizationReport {
            before,
            after,
            dedup,
            instancing,
            merge,
        };
        log::info!(
            "scene optimized: {} -> {} meshes ({:.1}% fewer), estimated memory down {:.1}%",
            report.before.mesh_count,
            report.after.mesh_count,
            report.mesh_reduction_percent(),
            report.memory_reduction_percent()
        );
        Ok(report)
    }

    /// Describe what each pass would do, without mutating the graph
    pub fn analyze(&self, graph: &SceneGraph) -> Vec<String> {
        let mut suggestions = MaterialDeduplicator::new(self.config.dedup.clone()).analyze(graph);
        suggestions.extend(MeshInstancer::new(self.config.instancing.clone()).analyze(graph));
        suggestions.extend(MeshMerger::new(self.config.merge.clone()).analyze(graph));
        suggestions
    }
}

impl Default for SceneOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}
