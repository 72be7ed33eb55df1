//! Polygon and subdivision meshes.

use std::sync::Arc;

use crate::attr::{decode, decode_as, reconcile, reconcile_levels, remove_conflicting, AttrScope, AttributeData, Layout, ValueType};
use crate::config::ProceduralConfig;
use crate::core::GeometryScope;
use crate::motion::{flatten_keys, smooth_normals};
use crate::scene::{MeshNode, NodeId, PropertyReader};
use crate::sink::{AttributeSink, ParamType};
use crate::topology::PrimitiveTopology;
use crate::util::{Chrono, Error, Result, Vec3};

use super::{
    extrapolates, key_times, load_samples, node_attributes, position_keys, reference_pose, sample_window,
    write_levels, write_positions, write_uints, ShapeContext, ShapeSummary,
};

/// Built-in mesh parameters user attributes may not shadow.
pub const MESH_PARAMS: [&str; 9] = [
    "nsides", "vidxs", "vlist", "nidxs", "nlist", "uvidxs", "uvlist", "subdiv_type", "shidxs",
];

/// Kind of mesh to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFlavor {
    Polygon,
    /// Catmull-Clark subdivision surface, emitted without normals
    Subdivision,
}

/// Emit a mesh node.
pub fn build_mesh(
    ctx: &ShapeContext<'_>,
    id: NodeId,
    mesh: &MeshNode,
    flavor: MeshFlavor,
    sink: &mut dyn AttributeSink,
) -> Result<ShapeSummary> {
    let config = ctx.config;
    let node = ctx
        .graph
        .node(id)
        .ok_or_else(|| Error::NodeNotFound(format!("#{id}")))?;

    let list = load_samples(&mesh.samples, &sample_window(config))?;
    let lower = list.resolve(config.render_time)?.lower;
    let sample = lower.data.as_ref();
    if sample.positions.is_empty() {
        return Err(Error::missing(format!("no positions on {}", node.path)));
    }

    let topology = PrimitiveTopology::mesh(
        &sample.face_counts,
        &sample.face_indices,
        sample.num_points(),
        config.reverse_winding,
    )?;
    let extrapolate = extrapolates(mesh.samples.topology_variance(), config);
    // a changing topology only matches the render time sample
    let attribute_time = if extrapolate {
        config.render_time
    } else {
        config.attribute_sample_time()
    };

    let mut levels = node_attributes(node, attribute_time, !extrapolate, config);
    remove_conflicting(&mut levels, &MESH_PARAMS);
    reconcile_levels(&mut levels, &topology);

    let keys = position_keys(
        &list,
        extrapolate,
        lower,
        &levels.point,
        |s| s.positions.as_slice(),
        |s| s.velocities.as_slice(),
        config,
    )?;
    if config.verbose {
        tracing::info!(
            "{} faces, {} points, {} motion keys",
            topology.primitive_count,
            topology.point_count,
            keys.len()
        );
    }

    write_uints(sink, "nsides", topology.face_counts().to_vec())?;
    write_uints(sink, "vidxs", topology.vertex_to_point().to_vec())?;
    write_positions(sink, "vlist", &keys)?;

    match flavor {
        MeshFlavor::Polygon if config.smoothing => {
            write_normals(sink, mesh.normals.as_deref(), &keys, extrapolate, &topology, config)?;
        }
        MeshFlavor::Polygon => {}
        MeshFlavor::Subdivision => {
            sink.set_scalar(
                "subdiv_type",
                ParamType::String,
                &AttributeData::String(vec![Arc::from("catclark")]),
            )?;
        }
    }

    if let Some(uvs) = mesh.uvs.as_deref() {
        if let Err(e) = write_uvs(sink, uvs, config.attribute_sample_time(), &topology) {
            tracing::warn!("Ignoring uvs: {e}");
        }
    }

    let want_normals = flavor == MeshFlavor::Polygon
        && (config.compute_reference_normals || (config.smoothing && mesh.normals.is_some()));
    let reference = reference_pose(ctx, id, &topology, want_normals, &mut levels);
    let attributes = write_levels(sink, &levels);

    Ok(ShapeSummary {
        node_type: match flavor {
            MeshFlavor::Polygon => "polymesh",
            MeshFlavor::Subdivision => "subdiv",
        },
        path: node.path.clone(),
        point_count: topology.point_count,
        keys: keys.len(),
        reference,
        attributes,
    })
}

/// Archive normals with a scope the renderer can index.
fn usable_normals(property: &dyn PropertyReader) -> bool {
    matches!(
        property.header().geometry_scope,
        Some(GeometryScope::FaceVarying | GeometryScope::Vertex | GeometryScope::Varying)
    )
}

/// Write `nlist`/`nidxs` with one block per position key.
///
/// Usable archive normals are read at every key time, or once at the render
/// time when positions are extrapolated. Without them smooth normals are
/// computed from each key's positions.
fn write_normals(
    sink: &mut dyn AttributeSink,
    normals: Option<&dyn PropertyReader>,
    keys: &[Vec<Vec3>],
    extrapolate: bool,
    topology: &PrimitiveTopology,
    config: &ProceduralConfig,
) -> Result<()> {
    if let Some(property) = normals.filter(|&p| usable_normals(p)) {
        let times = key_times(keys.len(), config);
        let nlist = if extrapolate {
            // later samples may not share this topology
            corner_normals(property, config.render_time, false, topology).map(|block| block.repeat(times.len()))
        } else {
            times
                .iter()
                .map(|&t| corner_normals(property, t, true, topology))
                .collect::<Result<Vec<_>>>()
                .map(|blocks| blocks.concat())
        };
        match nlist {
            Ok(nlist) => {
                sink.set_array("nlist", ParamType::Vector, times.len(), &AttributeData::Float(nlist))?;
                write_uints(sink, "nidxs", (0..topology.vertex_count as u32).collect())?;
            }
            Err(e) => tracing::warn!("Ignoring normals: {e}"),
        }
        return Ok(());
    }

    if normals.is_some() {
        tracing::warn!("Normals scope is not usable, computing smooth normals");
    } else if config.verbose {
        tracing::info!("Computing smooth normals");
    }
    let smooth = keys
        .iter()
        .map(|key| smooth_normals(key, topology))
        .collect::<Result<Vec<_>>>();
    match smooth {
        Ok(per_key) => {
            sink.set_array("nlist", ParamType::Vector, per_key.len(), &AttributeData::Float(flatten_keys(&per_key)))?;
            write_uints(sink, "nidxs", topology.vertex_to_point().to_vec())?;
        }
        Err(e) => tracing::warn!("Can't compute smooth normals: {e}"),
    }
    Ok(())
}

/// Per corner normals at `t` in target corner order.
///
/// Face-varying normals are expanded and reordered, point normals are
/// spread to the corners of their point.
fn corner_normals(
    property: &dyn PropertyReader,
    t: Chrono,
    interpolate: bool,
    topology: &PrimitiveTopology,
) -> Result<Vec<f32>> {
    let mut n = decode(property, t, true, interpolate)?;
    if n.value_type() != ValueType::Float || n.dim() != 3 {
        return Err(Error::unsupported(property.header().data_type, &property.header().interpretation));
    }
    n.expand_indices();
    match n.scope() {
        AttrScope::Indexed => {
            if n.element_count() != topology.vertex_count {
                return Err(Error::size_mismatch("normals", topology.vertex_count, n.element_count()));
            }
            if let Some(remap) = topology.source_to_target() {
                n.permute(remap)?;
            }
            Ok(n.floats().unwrap_or_default().to_vec())
        }
        AttrScope::Varying => {
            if n.element_count() != topology.point_count {
                return Err(Error::size_mismatch("normals", topology.point_count, n.element_count()));
            }
            let floats = n.floats().unwrap_or_default();
            let mut out = Vec::with_capacity(3 * topology.vertex_count);
            for &pi in topology.vertex_to_point() {
                let i = 3 * pi as usize;
                out.extend_from_slice(&floats[i..i + 3]);
            }
            Ok(out)
        }
        scope => Err(Error::other(format!("normals with {} scope", scope.as_str()))),
    }
}

fn write_uvs(sink: &mut dyn AttributeSink, property: &dyn PropertyReader, t: Chrono, topology: &PrimitiveTopology) -> Result<()> {
    let mut uv = decode_as(property, t, true, false, Layout::UV)?;
    if uv.scope() != AttrScope::Indexed {
        return Err(Error::other("uvs are not face-varying"));
    }
    reconcile("uv", &mut uv, topology)?;
    let indices = match uv.indices() {
        Some(idx) => idx.to_vec(),
        None => (0..uv.element_count() as u32).collect(),
    };
    sink.set_array("uvlist", ParamType::Vector2, 1, uv.data())?;
    write_uints(sink, "uvidxs", indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProceduralConfig;
    use crate::core::{GeometryScope, TimeSampling, TopologyVariance};
    use crate::motion::ReferenceOrigin;
    use crate::scene::{MemoryProperty, MeshSample, NodeKind, SceneGraph, SchemaSamples};
    use crate::sink::MemorySink;
    use crate::util::{DataType, Vec3};

    fn tri_quad(offset: f32, velocities: bool) -> MeshSample {
        // tri 0,1,2 and quad 1,3,4,2
        let positions: Vec<Vec3> = [
            (0.0, 0.0),
            (1.0, 0.0),
            (0.0, 1.0),
            (2.0, 0.0),
            (2.0, 1.0),
        ]
        .iter()
        .map(|&(x, y)| Vec3::new(x + offset, y, 0.0))
        .collect();
        MeshSample {
            velocities: if velocities { vec![Vec3::X; 5] } else { Vec::new() },
            positions,
            face_counts: vec![3, 4],
            face_indices: vec![0, 1, 2, 1, 3, 4, 2],
        }
    }

    fn graph(mesh: MeshNode) -> (SceneGraph, NodeId) {
        let mut g = SceneGraph::new("mesh.abc");
        let id = g.add(SceneGraph::ROOT, "mesh", NodeKind::PolyMesh(mesh)).unwrap();
        (g, id)
    }

    fn node_mesh(g: &SceneGraph, id: NodeId) -> &MeshNode {
        match &g.node(id).unwrap().kind {
            NodeKind::PolyMesh(m) | NodeKind::SubD(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_topology_and_blended_keys() {
        let samples = SchemaSamples::new(TimeSampling::uniform(1.0, 0.0))
            .with(tri_quad(0.0, false))
            .with(tri_quad(1.0, false));
        let (g, id) = graph(MeshNode::new(samples));
        let config = ProceduralConfig {
            render_time: 0.5,
            motion_sample_times: vec![0.25, 0.75],
            ..Default::default()
        };
        let ctx = ShapeContext::new(&g, &config);
        let mut sink = MemorySink::new();
        let summary = build_mesh(&ctx, id, node_mesh(&g, id), MeshFlavor::Polygon, &mut sink).unwrap();

        assert_eq!(summary.keys, 2);
        assert_eq!(sink.param("nsides").unwrap().values, AttributeData::UInt(vec![3, 4]));
        // reversed winding keeps each face's first corner
        assert_eq!(
            sink.param("vidxs").unwrap().values,
            AttributeData::UInt(vec![0, 2, 1, 1, 2, 4, 3])
        );
        let vlist = sink.param("vlist").unwrap();
        assert_eq!(vlist.keys, 2);
        assert_eq!(vlist.elements_per_key(), 5);
        let p = vlist.floats().unwrap();
        assert!((p[0] - 0.25).abs() < 1e-6);
        assert!((p[15] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_varying_topology_extrapolates() {
        let samples = SchemaSamples::new(TimeSampling::uniform(1.0, 0.0))
            .with(tri_quad(0.0, true))
            .with(tri_quad(5.0, true))
            .variance(TopologyVariance::Heterogeneous);
        let (g, id) = graph(MeshNode::new(samples));
        let config = ProceduralConfig {
            render_time: 0.0,
            motion_sample_times: vec![-0.5, 0.5],
            reverse_winding: false,
            ..Default::default()
        };
        let ctx = ShapeContext::new(&g, &config);
        let mut sink = MemorySink::new();
        build_mesh(&ctx, id, node_mesh(&g, id), MeshFlavor::Polygon, &mut sink).unwrap();
        let p = sink.param("vlist").unwrap().floats().unwrap();
        assert_eq!(p[0], -0.5);
        assert_eq!(p[15], 0.5);
    }

    #[test]
    fn test_forced_velocity_blur() {
        let samples = || {
            SchemaSamples::new(TimeSampling::uniform(1.0, 0.0))
                .with(tri_quad(0.0, true))
                .with(tri_quad(5.0, true))
        };
        let mut config = ProceduralConfig {
            render_time: 0.0,
            motion_sample_times: vec![-0.5, 0.5],
            reverse_winding: false,
            ..Default::default()
        };

        let (g, id) = graph(MeshNode::new(samples()));
        let ctx = ShapeContext::new(&g, &config);
        let mut sink = MemorySink::new();
        build_mesh(&ctx, id, node_mesh(&g, id), MeshFlavor::Polygon, &mut sink).unwrap();
        let p = sink.param("vlist").unwrap().floats().unwrap();
        // blended between the two samples
        assert_eq!(p[0], 0.0);
        assert_eq!(p[15], 2.5);

        config.force_velocity_blur = true;
        let ctx = ShapeContext::new(&g, &config);
        let mut sink = MemorySink::new();
        build_mesh(&ctx, id, node_mesh(&g, id), MeshFlavor::Polygon, &mut sink).unwrap();
        let p = sink.param("vlist").unwrap().floats().unwrap();
        assert_eq!(p[0], -0.5);
        assert_eq!(p[15], 0.5);
    }

    #[test]
    fn test_changing_topology_reads_normals_once() {
        let tri = MeshSample {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            face_counts: vec![3],
            face_indices: vec![0, 1, 2],
            velocities: vec![Vec3::X; 3],
        };
        let samples = SchemaSamples::new(TimeSampling::uniform(1.0, 0.0))
            .with(tri_quad(0.0, true))
            .with(tri)
            .variance(TopologyVariance::Heterogeneous);
        let normals = MemoryProperty::new("N", DataType::VEC3F)
            .geom_param(GeometryScope::Varying)
            .interpretation("normal")
            .time_sampling(TimeSampling::uniform(1.0, 0.0))
            .sample::<f32>(&[
                0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 3.0, 0.0, 0.0, 4.0, 0.0, 0.0, 5.0,
            ])
            .sample::<f32>(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        let (g, id) = graph(MeshNode::new(samples).with_normals(normals));
        let config = ProceduralConfig {
            render_time: 0.9,
            motion_sample_times: vec![0.65, 1.15],
            ..Default::default()
        };
        let ctx = ShapeContext::new(&g, &config);
        let mut sink = MemorySink::new();
        let summary = build_mesh(&ctx, id, node_mesh(&g, id), MeshFlavor::Polygon, &mut sink).unwrap();

        assert_eq!(summary.keys, 2);
        let nlist = sink.param("nlist").unwrap();
        assert_eq!(nlist.keys, 2);
        let z: Vec<f32> = nlist.floats().unwrap().chunks(3).map(|n| n[2]).collect();
        let block = [1.0f32, 3.0, 2.0, 2.0, 3.0, 5.0, 4.0];
        assert_eq!(z, [block, block].concat());
    }

    #[test]
    fn test_smooth_normals_without_archive_normals() {
        let samples = SchemaSamples::new(TimeSampling::uniform(1.0, 0.0))
            .with(tri_quad(0.0, false))
            .with(tri_quad(1.0, false));
        let (g, id) = graph(MeshNode::new(samples));
        let mut config = ProceduralConfig {
            render_time: 0.5,
            motion_sample_times: vec![0.25, 0.75],
            ..Default::default()
        };
        let ctx = ShapeContext::new(&g, &config);
        let mut sink = MemorySink::new();
        build_mesh(&ctx, id, node_mesh(&g, id), MeshFlavor::Polygon, &mut sink).unwrap();

        let nlist = sink.param("nlist").unwrap();
        assert_eq!(nlist.keys, 2);
        assert_eq!(nlist.elements_per_key(), 5);
        let normals = nlist.floats().unwrap();
        let z0 = normals[2];
        assert!((z0.abs() - 1.0).abs() < 1e-6);
        for n in normals.chunks(3) {
            assert!(n[0].abs() < 1e-6 && n[1].abs() < 1e-6);
            assert!((n[2] - z0).abs() < 1e-6);
        }
        // per point normals indexed like the vertices
        assert_eq!(sink.param("nidxs").unwrap().values, sink.param("vidxs").unwrap().values);

        config.smoothing = false;
        let ctx = ShapeContext::new(&g, &config);
        let mut sink = MemorySink::new();
        build_mesh(&ctx, id, node_mesh(&g, id), MeshFlavor::Polygon, &mut sink).unwrap();
        assert!(!sink.has_param("nlist"));
    }

    #[test]
    fn test_normals_and_uvs_follow_winding() {
        let uvs = MemoryProperty::new("uv", DataType::VEC2F)
            .geom_param(GeometryScope::FaceVarying)
            .indexed_sample::<f32>(&[0.0, 0.0, 1.0, 1.0], &[0, 1, 1, 0, 1, 1, 0]);
        let normals = MemoryProperty::new("N", DataType::VEC3F)
            .geom_param(GeometryScope::Varying)
            .interpretation("normal")
            .sample::<f32>(&[
                0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 3.0, 0.0, 0.0, 4.0, 0.0, 0.0, 5.0,
            ]);
        let mesh = MeshNode::new(SchemaSamples::constant(tri_quad(0.0, false)))
            .with_normals(normals)
            .with_uvs(uvs);
        let (g, id) = graph(mesh);
        let config = ProceduralConfig::default();
        let ctx = ShapeContext::new(&g, &config);
        let mut sink = MemorySink::new();
        build_mesh(&ctx, id, node_mesh(&g, id), MeshFlavor::Polygon, &mut sink).unwrap();

        let nlist = sink.param("nlist").unwrap().floats().unwrap();
        let z: Vec<f32> = nlist.chunks(3).map(|n| n[2]).collect();
        // point normals spread to corners in target order (0,2,1 | 1,2,4,3)
        assert_eq!(z, vec![1.0, 3.0, 2.0, 2.0, 3.0, 5.0, 4.0]);
        assert_eq!(
            sink.param("nidxs").unwrap().values,
            AttributeData::UInt((0..7).collect())
        );
        assert_eq!(
            sink.param("uvidxs").unwrap().values,
            AttributeData::UInt(vec![0, 1, 1, 0, 0, 1, 1])
        );
        assert_eq!(sink.param("uvlist").unwrap().param_type, ParamType::Vector2);
    }

    #[test]
    fn test_subdivision_and_reference() {
        let (g, id) = {
            let mut g = SceneGraph::new("subd.abc");
            let id = g
                .add(
                    SceneGraph::ROOT,
                    "subd",
                    NodeKind::SubD(MeshNode::new(SchemaSamples::constant(tri_quad(0.0, false)))),
                )
                .unwrap();
            (g, id)
        };
        let config = ProceduralConfig {
            output_reference: true,
            reference_source: crate::config::ReferenceSource::Frame,
            ..Default::default()
        };
        let ctx = ShapeContext::new(&g, &config);
        let mut sink = MemorySink::new();
        let summary = build_mesh(&ctx, id, node_mesh(&g, id), MeshFlavor::Subdivision, &mut sink).unwrap();
        assert_eq!(summary.node_type, "subdiv");
        assert_eq!(summary.reference, Some(ReferenceOrigin::Frame));
        assert!(!sink.has_param("nlist"));
        assert!(sink.has_param("subdiv_type"));
        assert_eq!(sink.declaration("Pref").unwrap().to_string(), "varying POINT");
        assert!(!sink.has_param("Nref"));
    }

    #[test]
    fn test_reserved_names_dropped() {
        let mesh = MeshNode::new(SchemaSamples::constant(tri_quad(0.0, false)));
        let (mut g, id) = graph(mesh);
        g.node_mut(id).unwrap().geom_params.push(
            MemoryProperty::new("nsides", DataType::INT32)
                .geom_param(GeometryScope::Uniform)
                .sample::<i32>(&[7, 7]),
        );
        let config = ProceduralConfig::default();
        let ctx = ShapeContext::new(&g, &config);
        let mut sink = MemorySink::new();
        let summary = build_mesh(&ctx, id, node_mesh(&g, id), MeshFlavor::Polygon, &mut sink).unwrap();
        assert_eq!(summary.attributes, 0);
        assert_eq!(sink.param("nsides").unwrap().values, AttributeData::UInt(vec![3, 4]));
    }
}
