//! Shape builders.
//!
//! Each builder takes one shape node of the scene and pushes a complete
//! renderer shape into an [`AttributeSink`]: built-in parameters (topology,
//! motion keyed positions, normals, radius) followed by the user attributes
//! that survived decoding and topology checks.
//!
//! - [`mesh`] - polygon and subdivision meshes
//! - [`points`] - point clouds with changing particle sets
//! - [`curves`] - linear and cubic curves

pub mod curves;
pub mod mesh;
pub mod nurbs;
pub mod points;

pub use curves::{build_curves, curve_basis, CurveBasis, CURVES_PARAMS};
pub use mesh::{build_mesh, MeshFlavor, MESH_PARAMS};
pub use nurbs::BsplineResampler;
pub use points::{build_points, POINTS_PARAMS};

use std::path::Path;
use std::sync::Arc;

use crate::attr::{collect_user_attributes, AttributeData, AttributeLevels, UserAttributes};
use crate::config::ProceduralConfig;
use crate::core::{SampledSource, TimeSample, TimeSampleList, TopologyVariance};
use crate::motion::{
    blend_keys, extrapolate_keys, flatten_keys, motion_vectors, resolve_reference, PositionKeys, ReferenceInputs,
    ReferenceOrigin,
};
use crate::scene::{NodeId, NodeKind, SceneGraph, SceneNode, SchemaSamples};
use crate::session::{shape_key, FrameMemo, RenderSession};
use crate::sink::{write_attributes, AttributeSink, ParamType};
use crate::topology::PrimitiveTopology;
use crate::util::{Chrono, DMat4, Error, Result, Vec3};

/// Scenes and settings shared by every shape of one expansion.
#[derive(Clone, Copy)]
pub struct ShapeContext<'a> {
    pub graph: &'a SceneGraph,
    /// Secondary archive holding the reference pose
    pub reference: Option<&'a SceneGraph>,
    /// Replaces the world matrix of reference positions
    pub reference_matrix: Option<DMat4>,
    pub config: &'a ProceduralConfig,
    /// Master registry shared with other expansions of the render
    pub session: Option<&'a RenderSession>,
}

impl<'a> ShapeContext<'a> {
    pub fn new(graph: &'a SceneGraph, config: &'a ProceduralConfig) -> Self {
        Self {
            graph,
            reference: None,
            reference_matrix: None,
            config,
            session: None,
        }
    }

    pub fn with_reference(mut self, reference: &'a SceneGraph) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_session(mut self, session: &'a RenderSession) -> Self {
        self.session = Some(session);
        self
    }
}

/// What a builder emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeSummary {
    /// Renderer node type
    pub node_type: &'static str,
    pub path: String,
    pub point_count: usize,
    /// Motion keys of the positions
    pub keys: usize,
    pub reference: Option<ReferenceOrigin>,
    /// User attributes written
    pub attributes: usize,
}

/// Build the shape at `id`.
///
/// Instances are built from their source node. Invisible nodes and
/// non-shape nodes yield `Ok(None)`; a shape missing required data is an
/// error the caller logs before moving on to the next one.
pub fn build_shape(ctx: &ShapeContext<'_>, id: NodeId, sink: &mut dyn AttributeSink) -> Result<Option<ShapeSummary>> {
    let node = ctx
        .graph
        .node(id)
        .ok_or_else(|| Error::NodeNotFound(format!("#{id}")))?;
    if !ctx.graph.is_visible(id) {
        tracing::debug!("Skipping hidden shape {}", node.path);
        return Ok(None);
    }

    let source = ctx.graph.resolve_instance(id);
    let shape = ctx
        .graph
        .node(source)
        .ok_or_else(|| Error::NodeNotFound(format!("#{source}")))?;
    let _span = tracing::info_span!("shape", path = %node.path).entered();

    let summary = match &shape.kind {
        NodeKind::PolyMesh(mesh) => build_mesh(ctx, source, mesh, MeshFlavor::Polygon, sink)?,
        NodeKind::SubD(mesh) => build_mesh(ctx, source, mesh, MeshFlavor::Subdivision, sink)?,
        NodeKind::Points(samples) => build_points(ctx, source, samples, sink)?,
        NodeKind::Curves(samples) => build_curves(ctx, source, samples, sink)?,
        NodeKind::Group | NodeKind::Xform(_) => return Ok(None),
    };
    Ok(Some(ShapeSummary {
        path: node.path.clone(),
        ..summary
    }))
}

/// Outcome of [`visit_shape`].
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeVisit {
    /// Built into the sink, to be emitted as `name`
    Built { name: String, summary: ShapeSummary },
    /// Source already emitted as `master`; the sink was left untouched
    Instance { path: String, master: String },
}

/// Build the shape at `id` once per source.
///
/// Instances and repeated visits of a source already built this frame, or
/// registered by another expansion of the session, resolve to the master's
/// node name without running a builder. Otherwise the shape is built into
/// `sink` and recorded as `name`.
pub fn visit_shape(
    ctx: &ShapeContext<'_>,
    id: NodeId,
    name: &str,
    memo: &mut FrameMemo,
    sink: &mut dyn AttributeSink,
) -> Result<Option<ShapeVisit>> {
    let node = ctx
        .graph
        .node(id)
        .ok_or_else(|| Error::NodeNotFound(format!("#{id}")))?;
    if !ctx.graph.is_visible(id) {
        return Ok(None);
    }
    let source = ctx.graph.resolve_instance(id);
    let source_path = match ctx.graph.node(source) {
        Some(n) => n.path.as_str(),
        None => return Err(Error::NodeNotFound(format!("#{source}"))),
    };

    let instance = |master: String| -> Result<Option<ShapeVisit>> {
        tracing::debug!("{} instances {master}", node.path);
        Ok(Some(ShapeVisit::Instance {
            path: node.path.clone(),
            master,
        }))
    };
    if let Some(master) = memo.processed(source_path) {
        return instance(master.to_owned());
    }
    let key = shape_key(Path::new(ctx.graph.name()), source_path, ctx.config.render_time);
    if let Some(master) = ctx.session.and_then(|session| session.master_node(&key)) {
        memo.mark(source_path, &master);
        return instance(master);
    }

    let Some(summary) = build_shape(ctx, id, sink)? else {
        return Ok(None);
    };
    let name = match ctx.session {
        Some(session) => session.register_master(&key, name),
        None => name.to_owned(),
    };
    memo.mark(source_path, &name);
    Ok(Some(ShapeVisit::Built { name, summary }))
}

/// Samples of `samples` needed to answer every time in `times`.
pub(crate) fn load_samples<S>(samples: &SchemaSamples<S>, times: &[Chrono]) -> Result<TimeSampleList<Arc<S>>> {
    let lo = times.iter().copied().fold(Chrono::INFINITY, Chrono::min);
    let hi = times.iter().copied().fold(Chrono::NEG_INFINITY, Chrono::max);
    if samples.num_samples() == 0 || times.is_empty() {
        return Err(Error::missing("shape has no samples"));
    }
    let mut list = TimeSampleList::new();
    list.update(samples, lo, hi, false)?;
    Ok(list)
}

/// Motion key times plus the render time.
pub(crate) fn sample_window(config: &ProceduralConfig) -> Vec<Chrono> {
    let mut times = config.sample_times();
    times.push(config.render_time);
    times.push(config.attribute_sample_time());
    times
}

/// User attributes of a shape node.
pub(crate) fn node_attributes(
    node: &SceneNode,
    t: Chrono,
    interpolate: bool,
    config: &ProceduralConfig,
) -> AttributeLevels {
    collect_user_attributes(Some(&node.user_properties), Some(&node.geom_params), t, interpolate, config)
}

/// Whether positions come from velocities rather than sample blending.
pub(crate) fn extrapolates(variance: TopologyVariance, config: &ProceduralConfig) -> bool {
    variance.is_varying() || config.force_velocity_blur
}

/// Positions for every motion key.
///
/// Fixed topology with several samples blends the bracketing samples;
/// otherwise the `lower` sample is extrapolated with its motion vectors.
pub(crate) fn position_keys<S, P, V>(
    list: &TimeSampleList<Arc<S>>,
    extrapolate: bool,
    lower: &TimeSample<Arc<S>>,
    point_attrs: &UserAttributes,
    positions: P,
    velocities: V,
    config: &ProceduralConfig,
) -> Result<PositionKeys>
where
    P: Fn(&S) -> &[Vec3],
    V: Fn(&S) -> &[Vec3],
{
    let times = config.sample_times();
    if !extrapolate && list.len() > 1 {
        return blend_keys(list, &times, positions);
    }
    let p = positions(lower.data.as_ref());
    let motion = motion_vectors(point_attrs, velocities(lower.data.as_ref()), p.len(), config);
    Ok(extrapolate_keys(p, motion.as_ref(), lower.time, &times, config.velocity_scale))
}

/// Key times matching `keys`: every motion time, or the render time alone.
pub(crate) fn key_times(keys: usize, config: &ProceduralConfig) -> Vec<Chrono> {
    let times = config.sample_times();
    if keys == times.len() {
        times
    } else {
        vec![config.render_time]
    }
}

pub(crate) fn write_positions(sink: &mut dyn AttributeSink, name: &str, keys: &[Vec<Vec3>]) -> Result<()> {
    sink.set_array(name, ParamType::Point, keys.len(), &AttributeData::Float(flatten_keys(keys)))
}

pub(crate) fn write_uints(sink: &mut dyn AttributeSink, name: &str, values: Vec<u32>) -> Result<()> {
    sink.set_array(name, ParamType::UInt, 1, &AttributeData::UInt(values))
}

/// Resolve Pref/Nref into `levels` when reference output is on.
pub(crate) fn reference_pose(
    ctx: &ShapeContext<'_>,
    id: NodeId,
    topology: &PrimitiveTopology,
    want_normals: bool,
    levels: &mut AttributeLevels,
) -> Option<ReferenceOrigin> {
    if !ctx.config.output_reference {
        return None;
    }
    let inputs = ReferenceInputs {
        graph: ctx.graph,
        node: id,
        reference: ctx.reference,
        matrix_override: ctx.reference_matrix,
    };
    resolve_reference(&inputs, topology, want_normals, ctx.config, levels).map(|pose| pose.origin)
}

/// Write every collected user attribute and UV set.
pub(crate) fn write_levels(sink: &mut dyn AttributeSink, levels: &AttributeLevels) -> usize {
    let all = levels
        .object
        .iter()
        .chain(&levels.primitive)
        .chain(&levels.point)
        .chain(&levels.vertex)
        .chain(&levels.uv_sets);
    write_attributes(sink, all, None)
}
