//! # Scene Optimizer
//!
//! Optimization passes for loaded 3D scenes: fewer materials, fewer draw
//! calls, and a smaller memory footprint without changing what the scene
//! looks like.
//!
//! ## Features
//!
//! - **Material Deduplication**: collapses near-identical materials under
//!   tunable similarity thresholds
//! - **Mesh Instancing**: converts repeated (geometry, material) meshes into
//!   lightweight instances of one master
//! - **Mesh Merging**: concatenates same-material meshes into single draw
//!   calls, reconciling mismatched vertex layouts
//! - **Scene Inspection**: read-only statistics with memory estimates
//! - **Dry-Run Analysis**: describes what each pass would do before any
//!   mutation
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_optimizer::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut graph = SceneGraph::new();
//!     // ... load meshes, materials, and geometry into the graph ...
//!
//!     let optimizer = SceneOptimizer::new(OptimizerConfig::default());
//!     let report = optimizer.optimize(&mut graph)?;
//!     println!(
//!         "meshes: {} -> {}",
//!         report.before.mesh_count, report.after.mesh_count
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod optimize;
pub mod scene;

pub use config::{Config, ConfigError, OptimizerConfig};
pub use optimize::{OptimizationReport, OptimizeError, SceneOptimizer};

/// Common imports for optimizer users
pub mod prelude {
    pub use crate::{
        config::{Config, OptimizerConfig},
        foundation::math::{Mat4, Transform, Vec2, Vec3, Vec4},
        optimize::{
            DedupConfig, InstancingConfig, MaterialDeduplicator, MergeConfig, MeshInstancer,
            MeshMerger, OptimizationReport, OptimizeError, SceneOptimizer,
        },
        scene::{
            Geometry, Instance, Material, Mesh, MeshFlags, SceneGraph, SceneStatistics,
            StandardMaterialParams, Texture, TransformNode,
        },
    };
}
