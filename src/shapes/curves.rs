//! Curves.

use std::sync::Arc;

use crate::attr::{reconcile_levels, remove_conflicting, AttributeData};
use crate::config::ProceduralConfig;
use crate::core::SampleBracket;
use crate::scene::{BasisType, CurveType, CurvesSample, NodeId, SchemaSamples};
use crate::sink::{AttributeSink, ParamType};
use crate::topology::PrimitiveTopology;
use crate::util::{Error, Result, Vec3};

use super::{
    extrapolates, load_samples, node_attributes, position_keys, reference_pose, sample_window, write_levels,
    write_positions, write_uints, BsplineResampler, ShapeContext, ShapeSummary,
};

/// Built-in curves parameters user attributes may not shadow.
pub const CURVES_PARAMS: [&str; 5] = ["points", "num_points", "radius", "basis", "mode"];

/// Renderer curve basis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveBasis {
    Linear,
    Bezier,
    CatmullRom,
    /// Resampled along the curve and emitted as catmull-rom
    Bspline,
}

impl CurveBasis {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Bezier => "bezier",
            Self::CatmullRom | Self::Bspline => "catmull-rom",
        }
    }

    /// Cubic curves get their end points doubled.
    pub fn is_cubic(self) -> bool {
        !matches!(self, Self::Linear)
    }
}

/// Basis a curves sample is emitted with.
pub fn curve_basis(sample: &CurvesSample) -> Result<CurveBasis> {
    match (sample.curve_type, sample.basis) {
        (CurveType::VariableOrder, _) => Err(Error::other("variable order curves are not supported")),
        (CurveType::Linear, _) | (CurveType::Cubic, BasisType::NoBasis) => Ok(CurveBasis::Linear),
        (CurveType::Cubic, BasisType::Bezier) => Ok(CurveBasis::Bezier),
        (CurveType::Cubic, BasisType::CatmullRom) => Ok(CurveBasis::CatmullRom),
        (CurveType::Cubic, BasisType::Bspline) => Ok(CurveBasis::Bspline),
        (CurveType::Cubic, basis) => Err(Error::other(format!("curve basis {basis:?} is not supported"))),
    }
}

/// Repeat the first and last point of every curve.
fn duplicate_ends(points: &[Vec3], topology: &PrimitiveTopology) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(points.len() + 2 * topology.primitive_count);
    for (&start, &nv) in topology.face_starts().iter().zip(topology.face_counts()) {
        let curve = &points[start..start + nv as usize];
        if let (Some(&first), Some(&last)) = (curve.first(), curve.last()) {
            out.push(first);
            out.extend_from_slice(curve);
            out.push(last);
        }
    }
    out
}

/// Per point radius from the widths at the render time bracket.
fn widths_radius(
    bracket: &SampleBracket<'_, Arc<CurvesSample>>,
    topology: &PrimitiveTopology,
    config: &ProceduralConfig,
) -> Option<Vec<f32>> {
    let w0 = &bracket.lower.data.widths;
    let count = w0.len();
    if count != 1 && count != topology.primitive_count && count != topology.point_count {
        if count != 0 {
            tracing::warn!("Widths count {count} matches neither curves nor points");
        }
        return None;
    }
    let w1 = bracket
        .upper_if_blending()
        .map(|up| &up.data.widths)
        .filter(|w1| w1.len() == count);
    let width = |wi: usize| match w1 {
        Some(w1) => ((1.0 - bracket.blend) * w0[wi] as f64 + bracket.blend * w1[wi] as f64) as f32,
        None => w0[wi],
    };

    let mut radius = Vec::with_capacity(topology.point_count);
    let mut pi = 0usize;
    for (ci, &nv) in topology.face_counts().iter().enumerate() {
        for _ in 0..nv {
            let wi = if count == 1 {
                0
            } else if count == topology.primitive_count {
                ci
            } else {
                pi
            };
            radius.push(0.5 * config.adjust_width(width(wi)));
            pi += 1;
        }
    }
    Some(radius)
}

/// Emit a curves node.
pub fn build_curves(
    ctx: &ShapeContext<'_>,
    id: NodeId,
    samples: &SchemaSamples<CurvesSample>,
    sink: &mut dyn AttributeSink,
) -> Result<ShapeSummary> {
    let config = ctx.config;
    let node = ctx
        .graph
        .node(id)
        .ok_or_else(|| Error::NodeNotFound(format!("#{id}")))?;

    let list = load_samples(samples, &sample_window(config))?;
    let bracket = list.resolve(config.render_time)?;
    let sample = bracket.lower.data.as_ref();
    let basis = curve_basis(sample)?;
    if sample.positions.is_empty() {
        return Err(Error::missing(format!("no positions on {}", node.path)));
    }
    let topology = PrimitiveTopology::curves(&sample.num_vertices, sample.positions.len())?;
    let extrapolate = extrapolates(samples.topology_variance(), config);
    let attribute_time = if extrapolate {
        config.render_time
    } else {
        config.attribute_sample_time()
    };

    let mut levels = node_attributes(node, attribute_time, !extrapolate, config);
    remove_conflicting(&mut levels, &CURVES_PARAMS);
    reconcile_levels(&mut levels, &topology);

    let mut keys = position_keys(
        &list,
        extrapolate,
        bracket.lower,
        &levels.point,
        |s| s.positions.as_slice(),
        |s| s.velocities.as_slice(),
        config,
    )?;
    let radius = widths_radius(&bracket, &topology, config);
    let reference = reference_pose(ctx, id, &topology, false, &mut levels);

    // everything above is per control point
    let (topology, radius) = if basis == CurveBasis::Bspline {
        let resampler = BsplineResampler::new(
            topology.face_counts(),
            &sample.knots,
            &sample.position_weights,
            config.nurbs_sample_rate,
        )?;
        if config.verbose {
            tracing::info!(
                "Resampled {} control points into {} points",
                resampler.cv_count(),
                resampler.point_count()
            );
        }
        for key in keys.iter_mut() {
            *key = resampler.points(key)?;
        }
        resampler.resample_attributes(&mut levels.point);
        resampler.resample_attributes(&mut levels.vertex);
        let radius = radius.map(|r| resampler.floats(&r, 1)).transpose()?;
        let counts: Vec<i32> = resampler.counts().iter().map(|&n| n as i32).collect();
        (PrimitiveTopology::curves(&counts, resampler.point_count())?, radius)
    } else {
        (topology, radius)
    };

    let extra = if basis.is_cubic() {
        for key in keys.iter_mut() {
            *key = duplicate_ends(key, &topology);
        }
        2
    } else {
        0
    };

    write_uints(sink, "num_points", topology.face_counts().iter().map(|&n| n + extra).collect())?;
    write_positions(sink, "points", &keys)?;
    sink.set_scalar(
        "basis",
        ParamType::String,
        &AttributeData::String(vec![Arc::from(basis.as_str())]),
    )?;
    sink.set_scalar("mode", ParamType::String, &AttributeData::String(vec![Arc::from("ribbon")]))?;

    let radius = radius.unwrap_or_else(|| {
        tracing::warn!("Defaulting curve width to minimum width {}", config.width_min);
        vec![0.5 * config.width_min; topology.point_count]
    });
    sink.set_array("radius", ParamType::Float, 1, &AttributeData::Float(radius))?;

    let attributes = write_levels(sink, &levels);

    Ok(ShapeSummary {
        node_type: "curves",
        path: node.path.clone(),
        point_count: topology.point_count,
        keys: keys.len(),
        reference,
        attributes,
    })
}
