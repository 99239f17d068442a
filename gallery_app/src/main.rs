//! Gallery demo application
//!
//! Builds a synthetic exhibition hall the way scene files tend to arrive
//! from authoring tools: pedestals that each got their own slightly-off
//! coat of paint, picture frames duplicated by hand, and a tiled floor
//! where half the tiles carry normals and UVs and half carry only
//! positions. Then runs the optimization pipeline over it and prints the
//! before/after numbers.

use rand::Rng;

use scene_optimizer::foundation::logging;
use scene_optimizer::prelude::*;
use scene_optimizer::scene::{GeometryError, PbrMaterialParams, TextureFormat, VertexAttribute};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_level(logging::LevelFilter::Info);

    let mut graph = build_gallery()?;
    let before = SceneStatistics::collect(&graph);
    log::info!("gallery before optimization:\n{before}");

    let optimizer = SceneOptimizer::new(OptimizerConfig::default());
    for suggestion in optimizer.analyze(&graph) {
        log::info!("planned: {suggestion}");
    }

    let report = optimizer.optimize(&mut graph)?;

    log::info!("gallery after optimization:\n{}", report.after);
    log::info!(
        "materials {} -> {}, meshes {} -> {} (+{} instances)",
        report.dedup.original_count,
        report.dedup.optimized_count,
        report.before.mesh_count,
        report.after.mesh_count,
        report.after.instance_count
    );
    log::info!(
        "mesh objects down {:.1}%, estimated memory down {:.1}%",
        report.mesh_reduction_percent(),
        report.memory_reduction_percent()
    );
    Ok(())
}

fn build_gallery() -> Result<SceneGraph, GeometryError> {
    let mut graph = SceneGraph::new();
    let mut rng = rand::thread_rng();
    let hall = graph.add_node(TransformNode::new("hall"));

    // Pedestal rows share one geometry, but every pedestal was "painted"
    // with its own near-white material. The deduplicator collapses the
    // paints, which lets the instancer see one cluster of twelve.
    let pedestal = graph.add_geometry(box_geometry(0.4, 1.0, 0.4)?);
    for i in 0..12 {
        let jitter: f32 = rng.gen_range(-0.02..0.02);
        let paint = graph.add_material(
            Material::standard(StandardMaterialParams {
                diffuse_color: Vec3::new(0.92 + jitter, 0.92 + jitter, 0.90),
                ..StandardMaterialParams::default()
            })
            .with_name(format!("pedestal_paint_{i}")),
        );
        let x = (i % 6) as f32 * 2.0;
        let z = (i / 6) as f32 * 4.0;
        graph.add_mesh(
            Mesh::new(format!("pedestal_{i}"))
                .with_geometry(pedestal)
                .with_material(paint)
                .with_transform(Transform::from_position(Vec3::new(x, 0.0, z)))
                .with_parent(hall),
        );
    }

    // Picture frames: shared geometry, one shared varnish texture, and PBR
    // parameters that drifted a little between copies.
    let varnish = graph.add_texture(
        Texture::new("varnish", 512, 512, TextureFormat::Rgba8)
            .with_source_url("textures/varnish_512.png"),
    );
    let frame = graph.add_geometry(box_geometry(0.6, 0.8, 0.05)?);
    for i in 0..8 {
        let gold = graph.add_material(
            Material::pbr(PbrMaterialParams {
                base_color: Vec3::new(0.83, 0.68, 0.21),
                metallic: 0.9,
                roughness: 0.35 + rng.gen_range(-0.02..0.02),
                ..PbrMaterialParams::default()
            })
            .with_name(format!("gilt_{i}"))
            .with_base_color_texture(varnish),
        );
        graph.add_mesh(
            Mesh::new(format!("frame_{i}"))
                .with_geometry(frame)
                .with_material(gold)
                .with_transform(Transform::from_position(Vec3::new(i as f32 * 1.5, 1.6, -2.0)))
                .with_parent(hall),
        );
    }

    // Floor tiles: distinct geometry per tile under one slate material, so
    // the merger folds them into a single draw call. Odd tiles carry only
    // positions; the merge has to synthesize their normals and UVs.
    let slate = graph.add_material(
        Material::standard(StandardMaterialParams {
            diffuse_color: Vec3::new(0.25, 0.26, 0.30),
            ..StandardMaterialParams::default()
        })
        .with_name("slate"),
    );
    for x in 0..4u32 {
        for z in 0..4u32 {
            let with_shading = (x + z) % 2 == 0;
            let tile = graph.add_geometry(floor_tile(
                x as f32 * 2.0,
                z as f32 * 2.0,
                with_shading,
            )?);
            graph.add_mesh(
                Mesh::new(format!("tile_{x}_{z}"))
                    .with_geometry(tile)
                    .with_material(slate)
                    .with_parent(hall),
            );
        }
    }

    // A kinetic sculpture the passes must leave alone.
    let mobile = graph.add_geometry(box_geometry(0.2, 0.2, 0.2)?);
    graph.add_mesh(
        Mesh::new("kinetic_sculpture")
            .with_geometry(mobile)
            .with_material(slate)
            .with_transform(Transform::from_position(Vec3::new(5.0, 2.5, 5.0)))
            .with_parent(hall)
            .with_flags(MeshFlags::default() | MeshFlags::ANIMATED),
    );

    Ok(graph)
}

/// Axis-aligned box centered at the origin
fn box_geometry(width: f32, height: f32, depth: f32) -> Result<Geometry, GeometryError> {
    let (w, h, d) = (width * 0.5, height * 0.5, depth * 0.5);
    let positions = vec![
        -w, -h, -d, //
        w, -h, -d, //
        w, h, -d, //
        -w, h, -d, //
        -w, -h, d, //
        w, -h, d, //
        w, h, d, //
        -w, h, d,
    ];
    let indices = vec![
        0, 1, 2, 0, 2, 3, // back
        5, 4, 7, 5, 7, 6, // front
        4, 0, 3, 4, 3, 7, // left
        1, 5, 6, 1, 6, 2, // right
        3, 2, 6, 3, 6, 7, // top
        4, 5, 1, 4, 1, 0, // bottom
    ];
    let mut geometry = Geometry::new(positions)?.with_indices(indices)?;
    geometry.recompute_bounding_box();
    Ok(geometry)
}

/// One 2x2 floor quad at the given offset, optionally with normals and UVs
fn floor_tile(x: f32, z: f32, with_shading: bool) -> Result<Geometry, GeometryError> {
    let positions = vec![
        x, 0.0, z, //
        x + 2.0, 0.0, z, //
        x + 2.0, 0.0, z + 2.0, //
        x, 0.0, z + 2.0,
    ];
    let mut geometry = Geometry::new(positions)?.with_indices(vec![0, 1, 2, 0, 2, 3])?;
    if with_shading {
        geometry.set_attribute(VertexAttribute::Normal, [0.0, 1.0, 0.0].repeat(4))?;
        geometry.set_attribute(
            VertexAttribute::Uv0,
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
        )?;
    }
    Ok(geometry)
}
