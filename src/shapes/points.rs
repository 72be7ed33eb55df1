//! Point clouds.
//!
//! Particles may be born or die between the samples bracketing the render
//! time, so positions and per-point attributes go through an ID union.

use crate::attr::{reconcile_levels, remove_conflicting, AttrScope, AttributeData, AttributeLevels, ValueType};
use crate::config::ProceduralConfig;
use crate::motion::{extend_point_attributes, motion_vectors, union_positions, IdUnion, PointSide};
use crate::scene::{NodeId, PointsSample, SchemaSamples};
use crate::sink::{AttributeSink, ParamType};
use crate::topology::PrimitiveTopology;
use crate::util::{Error, Result};

use super::{load_samples, node_attributes, reference_pose, sample_window, write_levels, write_positions, ShapeContext, ShapeSummary};

/// Built-in points parameters user attributes may not shadow.
pub const POINTS_PARAMS: [&str; 3] = ["points", "radius", "mode"];

/// User attribute names read as radius, in lookup order.
const RADIUS_NAMES: [&str; 2] = ["radius", "size"];

/// Which lower point each upper point is, when the two can be matched.
fn id_union(lower: &PointsSample, upper: &PointsSample) -> Option<IdUnion> {
    let (n0, n1) = (lower.num_points(), upper.num_points());
    if lower.ids.len() == n0 && upper.ids.len() == n1 && n0 > 0 {
        return Some(IdUnion::new(&lower.ids, &upper.ids));
    }
    if n0 == n1 {
        let ids: Vec<u64> = (0..n0 as u64).collect();
        return Some(IdUnion::new(&ids, &ids));
    }
    None
}

/// Radius from the archive widths.
fn widths_radius(
    lower: &PointsSample,
    upper: Option<(&PointsSample, f64)>,
    union: &IdUnion,
    config: &ProceduralConfig,
) -> Option<Vec<f32>> {
    let w0 = &lower.widths;
    if w0.len() == 1 {
        return Some(vec![config.adjust_radius(w0[0])]);
    }
    if w0.is_empty() || w0.len() != lower.num_points() {
        if !w0.is_empty() {
            tracing::warn!("Widths count doesn't match point count ({} for {})", w0.len(), lower.num_points());
        }
        return None;
    }
    let merged = match upper {
        Some((up, blend)) => {
            if up.widths.len() != up.num_points() {
                tracing::warn!("Widths count doesn't match point count in the next sample");
                return None;
            }
            union.merge_scalars(w0, &up.widths, blend)
        }
        None => w0.clone(),
    };
    Some(merged.into_iter().map(|r| config.adjust_radius(r)).collect())
}

/// Radius from a `radius` or `size` user attribute, removing it from `levels`.
fn attribute_radius(levels: &mut AttributeLevels, point_count: usize, config: &ProceduralConfig) -> Option<Vec<f32>> {
    let is_float = |v: &crate::attr::TypedValueVector| v.value_type() == ValueType::Float && v.dim() == 1;

    for name in RADIUS_NAMES {
        if levels.point.get(name).is_some_and(|v| is_float(v) && v.element_count() == point_count) {
            let v = levels.point.remove(name)?;
            return Some(v.floats()?.iter().map(|&r| config.adjust_radius(r)).collect());
        }
    }
    for name in RADIUS_NAMES {
        if levels.object.get(name).is_some_and(|v| is_float(v) && v.element_count() > 0) {
            let v = levels.object.remove(name)?;
            return Some(vec![config.adjust_radius(*v.floats()?.first()?)]);
        }
    }
    None
}

/// Emit a points node.
pub fn build_points(
    ctx: &ShapeContext<'_>,
    id: NodeId,
    samples: &SchemaSamples<PointsSample>,
    sink: &mut dyn AttributeSink,
) -> Result<ShapeSummary> {
    let config = ctx.config;
    let node = ctx
        .graph
        .node(id)
        .ok_or_else(|| Error::NodeNotFound(format!("#{id}")))?;

    let list = load_samples(samples, &sample_window(config))?;
    let bracket = list.resolve(config.render_time)?;
    let lower = bracket.lower;
    let p0 = lower.data.as_ref();

    let matched = bracket
        .upper_if_blending()
        .and_then(|up| match id_union(p0, &up.data) {
            Some(union) => Some((up, union)),
            None => {
                tracing::warn!("Cannot match points between samples, using t={} only", lower.time);
                None
            }
        });
    let (upper, union) = match matched {
        Some((up, union)) => (Some(up), union),
        None => (None, IdUnion::lower_only(p0.num_points())),
    };
    if union.is_empty() {
        return Err(Error::missing(format!("no points on {}", node.path)));
    }

    let mut levels = node_attributes(node, lower.time, false, config);
    let upper_levels = upper.map(|up| node_attributes(node, up.time, false, config));

    let motion0 = motion_vectors(&levels.point, &p0.velocities, p0.num_points(), config);
    let motion1 = match (upper, &upper_levels) {
        (Some(up), Some(attrs)) => motion_vectors(&attrs.point, &up.data.velocities, up.data.num_points(), config),
        _ => None,
    };
    let lower_side = PointSide {
        time: lower.time,
        positions: &p0.positions,
        motion: motion0.as_ref(),
    };
    let upper_side = upper.map(|up| {
        let side = PointSide {
            time: up.time,
            positions: &up.data.positions,
            motion: motion1.as_ref(),
        };
        (side, bracket.blend)
    });
    let keys = union_positions(
        &union,
        lower_side,
        upper_side,
        &config.sample_times(),
        config.render_time,
        config.velocity_scale,
    );
    if let Some(attrs) = &upper_levels {
        extend_point_attributes(&mut levels.point, &attrs.point, &union);
    }
    if config.verbose {
        tracing::info!(
            "{} points ({} shared, {} born), {} motion keys",
            union.len(),
            union.shared_count(),
            union.born().len(),
            keys.len()
        );
    }

    let topology = PrimitiveTopology::points(union.len());
    write_positions(sink, "points", &keys)?;

    let upper_widths = upper.map(|up| (up.data.as_ref(), bracket.blend));
    let radius = match widths_radius(p0, upper_widths, &union, config) {
        Some(r) => r,
        None => match attribute_radius(&mut levels, union.len(), config) {
            Some(r) => r,
            None => {
                tracing::info!(
                    "No radius set for points, using constant radius {} (see radius_min)",
                    config.radius_min
                );
                vec![config.radius_min]
            }
        },
    };
    sink.set_array("radius", ParamType::Float, 1, &AttributeData::Float(radius))?;

    remove_conflicting(&mut levels, &POINTS_PARAMS);
    reconcile_levels(&mut levels, &topology);
    let reference = reference_pose(ctx, id, &topology, false, &mut levels);

    // per-point data is emitted as uniform on points
    for v in levels.point.values_mut() {
        v.set_scope(AttrScope::Uniform);
    }
    let attributes = write_levels(sink, &levels);

    Ok(ShapeSummary {
        node_type: "points",
        path: node.path.clone(),
        point_count: union.len(),
        keys: keys.len(),
        reference,
        attributes,
    })
}
