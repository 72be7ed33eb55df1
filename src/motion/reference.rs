//! Reference pose (Pref / Nref).
//!
//! Sources are tried in order and the first that fits the shape wins:
//!
//! 1. a Pref attribute already collected on the shape
//! 2. a Pref attribute on the same path in the reference archive
//! 3. raw positions of the same path in the reference archive
//! 4. raw positions of the shape itself at the reference frame
//!
//! Archive positions are moved to world space with the shape's transform
//! ancestry (or an explicit override). Reference normals follow the same
//! source when one is available and are otherwise computed as smooth
//! normals of the reference positions.

use crate::attr::{decode, reconcile, AttrScope, AttributeLevels, TypedValueVector, Usage, ValueType};
use crate::config::ProceduralConfig;
use crate::core::{GeometryScope, SampledSource};
use crate::scene::{NodeId, NodeKind, SceneGraph, SchemaSamples};
use crate::topology::PrimitiveTopology;
use crate::util::{flat_from_vec3s, transform_normals, transform_points, Chrono, DMat4, Result, Vec3};

use super::normals::smooth_normals;

/// Where the reference positions came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceOrigin {
    /// Pref attribute on the shape
    Attribute,
    /// Pref attribute in the reference archive
    ReferenceAttribute,
    /// Positions in the reference archive
    ReferenceArchive,
    /// Positions of the shape at the reference frame
    Frame,
}

/// Scenes the reference pose may be read from.
#[derive(Clone, Copy)]
pub struct ReferenceInputs<'a> {
    pub graph: &'a SceneGraph,
    pub node: NodeId,
    /// Secondary archive holding the reference pose
    pub reference: Option<&'a SceneGraph>,
    /// Replaces the world matrix of archive positions
    pub matrix_override: Option<DMat4>,
}

/// Resolved reference pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReferencePose {
    pub origin: ReferenceOrigin,
    /// Matrix applied to archive positions (identity for attributes)
    pub matrix: DMat4,
}

/// Point-level float3 vector.
pub(crate) fn point_vector(values: &[Vec3], usage: Usage) -> Result<TypedValueVector> {
    Ok(TypedValueVector::from_floats(flat_from_vec3s(values), 3)?
        .with_usage(usage)
        .with_scope(AttrScope::Varying)
        .with_array(true))
}

/// Validate a collected Pref, reshaping a flat float array into float3.
fn checked_pref(vector: &TypedValueVector, point_count: usize) -> Option<TypedValueVector> {
    if vector.value_type() != ValueType::Float || vector.scope() != AttrScope::Varying {
        return None;
    }
    let floats = vector.floats()?;
    let fits = match vector.dim() {
        3 => vector.element_count() == point_count,
        1 => floats.len() == 3 * point_count,
        _ => false,
    };
    if !fits {
        return None;
    }
    TypedValueVector::from_floats(floats.to_vec(), 3)
        .ok()
        .map(|v| v.with_usage(Usage::Point).with_scope(AttrScope::Varying).with_array(true))
}

fn sample_positions<S>(
    samples: &SchemaSamples<S>,
    time: Option<Chrono>,
    positions: impl Fn(&S) -> &[Vec3],
) -> Option<(Vec<Vec3>, Chrono)> {
    let n = samples.num_samples();
    if n == 0 {
        return None;
    }
    let ts = samples.time_sampling();
    let (index, t) = match time {
        Some(time) => ts.floor_index(time, n),
        None => (0, ts.sample_time(0)),
    };
    samples.get(index).map(|s| (positions(s).to_vec(), t))
}

/// Positions of a shape node at `time` (clamped), or its first sample.
pub fn shape_positions(graph: &SceneGraph, id: NodeId, time: Option<Chrono>) -> Option<(Vec<Vec3>, Chrono)> {
    match &graph.node(id)?.kind {
        NodeKind::PolyMesh(m) | NodeKind::SubD(m) => sample_positions(&m.samples, time, |s| s.positions.as_slice()),
        NodeKind::Points(s) => sample_positions(s, time, |s| s.positions.as_slice()),
        NodeKind::Curves(s) => sample_positions(s, time, |s| s.positions.as_slice()),
        NodeKind::Group | NodeKind::Xform(_) => None,
    }
}

/// Pref geometry parameter of `id`, decoded at its first sample.
fn archive_pref(graph: &SceneGraph, id: NodeId, point_count: usize, config: &ProceduralConfig) -> Option<TypedValueVector> {
    let prop = graph.node(id)?.geom_params.get(&config.pref_name)?;
    if !matches!(prop.header().geometry_scope, Some(GeometryScope::Varying | GeometryScope::Vertex)) {
        return None;
    }
    let t = prop.time_sampling().sample_time(0);
    match decode(prop, t, true, false) {
        Ok(v) => checked_pref(&v, point_count),
        Err(e) => {
            tracing::warn!("Could not read reference '{}': {e}", config.pref_name);
            None
        }
    }
}

/// Positions read from an archive node, moved to world space.
fn archive_positions(
    graph: &SceneGraph,
    id: NodeId,
    time: Option<Chrono>,
    point_count: usize,
    matrix_override: Option<DMat4>,
) -> Option<(Vec<Vec3>, DMat4, Chrono)> {
    let (mut positions, t) = shape_positions(graph, id, time)?;
    if positions.len() != point_count {
        tracing::warn!(
            "Reference positions count doesn't match ({} for {point_count})",
            positions.len()
        );
        return None;
    }
    let matrix = match matrix_override {
        Some(m) => m,
        None => graph.world_matrix(id, t).ok()?,
    };
    transform_points(&mut positions, &matrix);
    Some((positions, matrix, t))
}

/// Resolve Pref into `levels.point`, and Nref when `want_normals`.
///
/// Returns `None` when no source fits; any invalid Pref is removed.
pub fn resolve_reference(
    inputs: &ReferenceInputs<'_>,
    topology: &PrimitiveTopology,
    want_normals: bool,
    config: &ProceduralConfig,
    levels: &mut AttributeLevels,
) -> Option<ReferencePose> {
    let point_count = topology.point_count;
    let source = config.reference_source;
    let pref = config.pref_name.clone();

    // 1. attribute on the shape
    if source.uses_attributes() {
        if let Some(existing) = levels.point.remove(&pref) {
            match checked_pref(&existing, point_count) {
                Some(v) => {
                    if config.verbose {
                        tracing::info!("Reference positions read from attribute '{pref}'");
                    }
                    levels.point.insert(pref, v);
                    if want_normals {
                        resolve_attribute_normals(topology, config, levels);
                    }
                    return Some(ReferencePose {
                        origin: ReferenceOrigin::Attribute,
                        matrix: DMat4::IDENTITY,
                    });
                }
                None => tracing::warn!("Ignoring '{pref}': not a per-point float3 attribute"),
            }
        }
    }

    let mut found: Option<(ReferencePose, &SceneGraph, NodeId, Chrono)> = None;

    // 2 and 3. reference archive
    if source.uses_file() {
        let path = inputs.graph.node(inputs.node).map(|n| n.path.as_str());
        match (inputs.reference, path) {
            (Some(reference), Some(path)) => match reference.find(path) {
                Some(ref_id) => {
                    if let Some(v) = archive_pref(reference, ref_id, point_count, config) {
                        if config.verbose {
                            tracing::info!("Reference positions read from reference archive attribute '{pref}'");
                        }
                        levels.point.insert(pref.clone(), v);
                        if want_normals {
                            compute_normals(topology, config, levels);
                        }
                        return Some(ReferencePose {
                            origin: ReferenceOrigin::ReferenceAttribute,
                            matrix: DMat4::IDENTITY,
                        });
                    }
                    if let Some((positions, matrix, t)) =
                        archive_positions(reference, ref_id, None, point_count, inputs.matrix_override)
                    {
                        store_pref(&positions, &pref, levels);
                        let pose = ReferencePose {
                            origin: ReferenceOrigin::ReferenceArchive,
                            matrix,
                        };
                        found = Some((pose, reference, ref_id, t));
                    }
                }
                None => tracing::warn!("No '{path}' in reference archive '{}'", reference.name()),
            },
            (None, _) => tracing::warn!("Reference archive requested but none is loaded"),
            (_, None) => {}
        }
    }

    // 4. shape at the reference frame
    if found.is_none() && source == crate::config::ReferenceSource::Frame {
        let time = config.reference_time();
        if let Some((positions, matrix, t)) =
            archive_positions(inputs.graph, inputs.node, time, point_count, inputs.matrix_override)
        {
            if config.verbose {
                tracing::info!("Reference positions read at t={t}");
            }
            store_pref(&positions, &pref, levels);
            let pose = ReferencePose {
                origin: ReferenceOrigin::Frame,
                matrix,
            };
            found = Some((pose, inputs.graph, inputs.node, t));
        }
    }

    let Some((pose, graph, id, t)) = found else {
        tracing::warn!("No valid reference for this shape");
        return None;
    };
    if want_normals && !archive_normals(graph, id, t, &pose.matrix, topology, config, levels) {
        compute_normals(topology, config, levels);
    }
    Some(pose)
}

fn store_pref(positions: &[Vec3], name: &str, levels: &mut AttributeLevels) {
    match point_vector(positions, Usage::Point) {
        Ok(v) => {
            levels.point.insert(name.to_owned(), v);
        }
        Err(e) => tracing::warn!("Could not build '{name}': {e}"),
    }
}

/// Keep a valid collected Nref (corner level first) or compute one.
fn resolve_attribute_normals(topology: &PrimitiveTopology, config: &ProceduralConfig, levels: &mut AttributeLevels) {
    let nref = &config.nref_name;

    if let Some(v) = levels.vertex.get(nref) {
        let count = v.indices().map_or(v.element_count(), <[u32]>::len);
        if v.value_type() == ValueType::Float && v.dim() == 3 && count == topology.vertex_count {
            levels.point.remove(nref);
            return;
        }
        levels.vertex.remove(nref);
    }
    if let Some(v) = levels.point.get(nref) {
        if v.value_type() == ValueType::Float
            && v.dim() == 3
            && v.scope() == AttrScope::Varying
            && v.element_count() == topology.point_count
        {
            return;
        }
        levels.point.remove(nref);
    }
    compute_normals(topology, config, levels);
}

/// Replace any Nref with smooth normals of the stored Pref.
fn compute_normals(topology: &PrimitiveTopology, config: &ProceduralConfig, levels: &mut AttributeLevels) {
    let nref = &config.nref_name;
    levels.vertex.remove(nref);
    levels.point.remove(nref);
    if topology.face_counts().is_empty() || topology.vertex_count == 0 {
        return;
    }
    let Some(positions) = levels.point.get(&config.pref_name).and_then(TypedValueVector::to_vec3s) else {
        return;
    };
    if config.verbose {
        tracing::info!("Compute smooth '{nref}' from '{}'", config.pref_name);
    }
    let normals = smooth_normals(&positions, topology).and_then(|n| point_vector(&n, Usage::Normal));
    match normals {
        Ok(v) => {
            levels.point.insert(nref.clone(), v);
        }
        Err(e) => tracing::warn!("Could not compute '{nref}': {e}"),
    }
}

/// Read the built-in normals of a reference mesh as Nref.
fn archive_normals(
    graph: &SceneGraph,
    id: NodeId,
    t: Chrono,
    matrix: &DMat4,
    topology: &PrimitiveTopology,
    config: &ProceduralConfig,
    levels: &mut AttributeLevels,
) -> bool {
    let Some(NodeKind::PolyMesh(mesh)) = graph.node(id).map(|n| &n.kind) else {
        return false;
    };
    let Some(prop) = mesh.normals.as_deref() else {
        return false;
    };
    if !matches!(
        prop.header().geometry_scope,
        Some(GeometryScope::FaceVarying | GeometryScope::Varying | GeometryScope::Vertex)
    ) {
        return false;
    }

    let read = || -> Result<TypedValueVector> {
        let v = decode(prop, t, true, false)?;
        let mut normals = v.to_vec3s().unwrap_or_default();
        transform_normals(&mut normals, matrix);
        let mut out = TypedValueVector::from_floats(flat_from_vec3s(&normals), 3)?
            .with_usage(Usage::Normal)
            .with_scope(v.scope())
            .with_array(true);
        out.set_indices(v.indices().map(<[u32]>::to_vec))?;
        reconcile(&config.nref_name, &mut out, topology)?;
        Ok(out)
    };
    match read() {
        Ok(v) => {
            let nref = config.nref_name.clone();
            levels.vertex.remove(&nref);
            levels.point.remove(&nref);
            if v.scope() == AttrScope::Indexed {
                levels.vertex.insert(nref, v);
            } else {
                levels.point.insert(nref, v);
            }
            true
        }
        Err(e) => {
            tracing::debug!("Reference normals unusable: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceSource;
    use crate::core::TimeSampling;
    use crate::scene::{MemoryProperty, MeshNode, MeshSample, XformSample};
    use crate::util::{DataType, DVec3};

    fn quad(z: f32) -> MeshSample {
        MeshSample {
            positions: vec![
                Vec3::new(0.0, 0.0, z),
                Vec3::new(0.0, 1.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(1.0, 0.0, z),
            ],
            face_counts: vec![4],
            face_indices: vec![0, 1, 2, 3],
            velocities: Vec::new(),
        }
    }

    /// `/xf/mesh`, translated by +10 x, two samples at t=0 and t=1.
    fn scene(with_normals: bool) -> (SceneGraph, NodeId) {
        let mut g = SceneGraph::new("anim.abc");
        let xf = g
            .add(
                SceneGraph::ROOT,
                "xf",
                NodeKind::Xform(SchemaSamples::constant(XformSample {
                    matrix: DMat4::from_translation(DVec3::new(10.0, 0.0, 0.0)),
                    inherits: true,
                })),
            )
            .unwrap();
        let samples = SchemaSamples::new(TimeSampling::uniform(1.0, 0.0))
            .with(quad(0.0))
            .with(quad(5.0));
        let mut mesh = MeshNode::new(samples);
        if with_normals {
            mesh = mesh.with_normals(
                MemoryProperty::new("N", DataType::VEC3F)
                    .geom_param(GeometryScope::Varying)
                    .interpretation("normal")
                    .sample::<f32>(&[0.0, 0.0, 2.0, 0.0, 0.0, 2.0, 0.0, 0.0, 2.0, 0.0, 0.0, 2.0]),
            );
        }
        let id = g.add(xf, "mesh", NodeKind::PolyMesh(mesh)).unwrap();
        (g, id)
    }

    fn topo() -> PrimitiveTopology {
        PrimitiveTopology::mesh(&[4], &[0, 1, 2, 3], 4, true).unwrap()
    }

    #[test]
    fn test_pref_from_attribute() {
        let (g, id) = scene(false);
        let config = ProceduralConfig {
            output_reference: true,
            ..Default::default()
        };
        let mut levels = AttributeLevels::default();
        // flat float array of 3 * point count is accepted
        levels.point.insert(
            "Pref".into(),
            TypedValueVector::from_floats(vec![1.0; 12], 1)
                .unwrap()
                .with_scope(AttrScope::Varying),
        );
        let inputs = ReferenceInputs {
            graph: &g,
            node: id,
            reference: None,
            matrix_override: None,
        };
        let pose = resolve_reference(&inputs, &topo(), true, &config, &mut levels).unwrap();
        assert_eq!(pose.origin, ReferenceOrigin::Attribute);
        let pref = &levels.point["Pref"];
        assert_eq!(pref.dim(), 3);
        assert_eq!(pref.element_count(), 4);
        // smooth normals computed from the Pref
        assert_eq!(levels.point["Nref"].element_count(), 4);
    }

    #[test]
    fn test_invalid_pref_removed() {
        let (g, id) = scene(false);
        let config = ProceduralConfig::default();
        let mut levels = AttributeLevels::default();
        levels.point.insert(
            "Pref".into(),
            TypedValueVector::from_floats(vec![1.0; 9], 3)
                .unwrap()
                .with_scope(AttrScope::Varying),
        );
        let inputs = ReferenceInputs {
            graph: &g,
            node: id,
            reference: None,
            matrix_override: None,
        };
        assert!(resolve_reference(&inputs, &topo(), false, &config, &mut levels).is_none());
        assert!(levels.point.is_empty());
    }

    #[test]
    fn test_pref_from_frame_in_world_space() {
        let (g, id) = scene(true);
        let config = ProceduralConfig {
            output_reference: true,
            reference_source: ReferenceSource::Frame,
            reference_frame: Some(24.0),
            fps: 24.0,
            ..Default::default()
        };
        let mut levels = AttributeLevels::default();
        let inputs = ReferenceInputs {
            graph: &g,
            node: id,
            reference: None,
            matrix_override: None,
        };
        let pose = resolve_reference(&inputs, &topo(), true, &config, &mut levels).unwrap();
        assert_eq!(pose.origin, ReferenceOrigin::Frame);
        let pref = levels.point["Pref"].to_vec3s().unwrap();
        // frame 24 at 24 fps is t=1, the z=5 sample, moved +10 in x
        assert_eq!(pref[0], Vec3::new(10.0, 0.0, 5.0));
        // archive normals are normalized after the transform
        let nref = levels.point["Nref"].to_vec3s().unwrap();
        assert!((nref[0] - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_pref_from_reference_archive() {
        let (g, id) = scene(false);
        let (reference, _) = scene(false);
        let config = ProceduralConfig {
            output_reference: true,
            reference_source: ReferenceSource::File,
            ..Default::default()
        };
        let mut levels = AttributeLevels::default();
        let inputs = ReferenceInputs {
            graph: &g,
            node: id,
            reference: Some(&reference),
            matrix_override: Some(DMat4::IDENTITY),
        };
        let pose = resolve_reference(&inputs, &topo(), true, &config, &mut levels).unwrap();
        assert_eq!(pose.origin, ReferenceOrigin::ReferenceArchive);
        // first sample, override matrix
        assert_eq!(levels.point["Pref"].to_vec3s().unwrap()[2], Vec3::new(1.0, 1.0, 0.0));
        assert!(levels.point.contains_key("Nref"));

        // no reference archive loaded
        let mut levels = AttributeLevels::default();
        let inputs = ReferenceInputs { reference: None, ..inputs };
        assert!(resolve_reference(&inputs, &topo(), false, &config, &mut levels).is_none());
    }

    #[test]
    fn test_collected_nref_kept() {
        let (g, id) = scene(false);
        let config = ProceduralConfig::default();
        let mut levels = AttributeLevels::default();
        levels.point.insert("Pref".into(), point_vector(&[Vec3::ZERO; 4], Usage::Point).unwrap());
        levels.point.insert("Nref".into(), point_vector(&[Vec3::X; 4], Usage::Normal).unwrap());
        let inputs = ReferenceInputs {
            graph: &g,
            node: id,
            reference: None,
            matrix_override: None,
        };
        resolve_reference(&inputs, &topo(), true, &config, &mut levels).unwrap();
        assert_eq!(levels.point["Nref"].to_vec3s().unwrap()[0], Vec3::X);
    }
}
