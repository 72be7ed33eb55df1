//! Per motion key positions: direct blending and velocity extrapolation.

use std::sync::Arc;

use crate::attr::{AttrScope, UserAttributes, ValueType};
use crate::config::{ProceduralConfig, BUILTIN_NAME};
use crate::core::TimeSampleList;
use crate::util::{lerp_vec3, vec3s_from_flat, Chrono, DVec3, Error, Result, Vec3};

/// Conventional velocity attribute names, in lookup order.
pub const VELOCITY_NAMES: [&str; 3] = ["velocity", "vel", "v"];

/// Conventional acceleration attribute names, in lookup order.
pub const ACCELERATION_NAMES: [&str; 3] = ["acceleration", "accel", "a"];

/// Positions of every motion key, each holding the same number of points.
pub type PositionKeys = Vec<Vec<Vec3>>;

/// `p + dt * (v + 0.5 * dt * a)` in double precision.
#[inline]
pub fn extrapolate(p: Vec3, v: Vec3, a: Option<Vec3>, dt: f64) -> Vec3 {
    let a = a.map_or(DVec3::ZERO, |a| a.as_dvec3());
    (p.as_dvec3() + dt * (v.as_dvec3() + 0.5 * dt * a)).as_vec3()
}

/// Velocities and optional accelerations matching a point set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MotionVectors {
    pub velocities: Vec<Vec3>,
    pub accelerations: Option<Vec<Vec3>>,
    /// User attribute the velocities came from, `None` for built-in ones
    pub velocity_attribute: Option<String>,
    pub acceleration_attribute: Option<String>,
}

/// Per-point float3 values of a user attribute, if it is one.
fn point_vectors(attrs: &UserAttributes, name: &str, point_count: usize) -> Option<Vec<Vec3>> {
    let v = attrs.get(name)?;
    let ok = v.value_type() == ValueType::Float
        && v.dim() == 3
        && v.element_count() == point_count
        && v.scope() == AttrScope::Varying;
    if ok {
        v.floats().map(vec3s_from_flat)
    } else {
        None
    }
}

/// First usable attribute among the override name or the conventional ones.
fn find_vectors(
    attrs: &UserAttributes,
    name: Option<&str>,
    defaults: &[&str],
    point_count: usize,
) -> Option<(String, Vec<Vec3>)> {
    match name {
        Some(BUILTIN_NAME) => None,
        Some(n) => point_vectors(attrs, n, point_count).map(|v| (n.to_owned(), v)),
        None => defaults
            .iter()
            .find_map(|n| point_vectors(attrs, n, point_count).map(|v| ((*n).to_owned(), v))),
    }
}

/// Pick velocities (and accelerations) for `point_count` points.
///
/// A user attribute wins over the archive's own velocities, which are only
/// used when their count matches. Accelerations are only looked up when
/// velocities were found.
pub fn motion_vectors(
    attrs: &UserAttributes,
    builtin: &[Vec3],
    point_count: usize,
    config: &ProceduralConfig,
) -> Option<MotionVectors> {
    let (velocity_attribute, velocities) =
        match find_vectors(attrs, config.velocity_name.as_deref(), &VELOCITY_NAMES, point_count) {
            Some((name, v)) => {
                if config.verbose {
                    tracing::info!("Using user attribute '{name}' for point velocities");
                }
                (Some(name), v)
            }
            None if builtin.is_empty() => return None,
            None if builtin.len() != point_count => {
                tracing::warn!(
                    "Velocity count doesn't match point count ({} for {point_count}), ignoring it",
                    builtin.len()
                );
                return None;
            }
            None => (None, builtin.to_vec()),
        };

    let found = find_vectors(attrs, config.acceleration_name.as_deref(), &ACCELERATION_NAMES, point_count);
    let (acceleration_attribute, accelerations) = match found {
        Some((name, a)) => (Some(name), Some(a)),
        None => (None, None),
    };

    Some(MotionVectors {
        velocities,
        accelerations,
        velocity_attribute,
        acceleration_attribute,
    })
}

/// Extrapolate `positions` sampled at `base_time` to every motion time.
///
/// Without motion vectors a single key holding the positions is returned.
pub fn extrapolate_keys(
    positions: &[Vec3],
    motion: Option<&MotionVectors>,
    base_time: Chrono,
    times: &[Chrono],
    velocity_scale: f64,
) -> PositionKeys {
    let Some(motion) = motion else {
        return vec![positions.to_vec()];
    };
    times
        .iter()
        .map(|&t| {
            let dt = (t - base_time) * velocity_scale;
            positions
                .iter()
                .enumerate()
                .map(|(i, &p)| {
                    let a = motion.accelerations.as_ref().map(|a| a[i]);
                    extrapolate(p, motion.velocities[i], a, dt)
                })
                .collect()
        })
        .collect()
}

/// Blend bracketing samples at every motion time.
///
/// The point count must stay the same across keys; a bracket whose upper
/// sample has another count uses the lower sample alone.
pub fn blend_keys<S, F>(samples: &TimeSampleList<Arc<S>>, times: &[Chrono], positions: F) -> Result<PositionKeys>
where
    F: Fn(&S) -> &[Vec3],
{
    let mut keys: PositionKeys = Vec::with_capacity(times.len());
    for &t in times {
        let bracket = samples.resolve(t)?;
        let p0 = positions(bracket.lower.data.as_ref());
        let key: Vec<Vec3> = match bracket.upper_if_blending() {
            Some(up) if positions(up.data.as_ref()).len() == p0.len() => {
                let p1 = positions(up.data.as_ref());
                p0.iter().zip(p1).map(|(&a, &b)| lerp_vec3(a, b, bracket.blend)).collect()
            }
            _ => p0.to_vec(),
        };
        if let Some(first) = keys.first() {
            if first.len() != key.len() {
                return Err(Error::size_mismatch("motion key positions", first.len(), key.len()));
            }
        }
        keys.push(key);
    }
    Ok(keys)
}

/// Concatenate keys into one flat scalar buffer.
pub fn flatten_keys(keys: &[Vec<Vec3>]) -> Vec<f32> {
    keys.iter().flat_map(|k| k.iter().flat_map(|p| p.to_array())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::TypedValueVector;
    use crate::core::TimeSampling;
    use crate::scene::SchemaSamples;

    fn varying(values: Vec<f32>) -> TypedValueVector {
        TypedValueVector::from_floats(values, 3)
            .unwrap()
            .with_scope(AttrScope::Varying)
            .with_array(true)
    }

    #[test]
    fn test_extrapolate() {
        let p = Vec3::ZERO;
        let v = Vec3::X;
        assert_eq!(extrapolate(p, v, None, 2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(extrapolate(p, v, Some(Vec3::ZERO), 2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(extrapolate(p, v, Some(Vec3::new(0.0, 2.0, 0.0)), 2.0), Vec3::new(2.0, 4.0, 0.0));
        assert_eq!(extrapolate(p, Vec3::ZERO, None, 3.0), p);
    }

    #[test]
    fn test_motion_vector_lookup_order() {
        let config = ProceduralConfig::default();
        let mut attrs = UserAttributes::new();
        attrs.insert("v".into(), varying(vec![0.0, 0.0, 1.0]));
        attrs.insert("vel".into(), varying(vec![0.0, 1.0, 0.0]));
        // wrong count, skipped
        attrs.insert("velocity".into(), varying(vec![1.0; 6]));

        let mv = motion_vectors(&attrs, &[Vec3::X], 1, &config).unwrap();
        assert_eq!(mv.velocity_attribute.as_deref(), Some("vel"));
        assert_eq!(mv.velocities, vec![Vec3::Y]);
        assert!(mv.accelerations.is_none());
    }

    #[test]
    fn test_motion_vector_builtin() {
        let mut config = ProceduralConfig::default();
        config.velocity_name = Some(BUILTIN_NAME.into());
        let mut attrs = UserAttributes::new();
        attrs.insert("velocity".into(), varying(vec![0.0, 0.0, 1.0]));
        attrs.insert("accel".into(), varying(vec![0.0, 0.0, 2.0]));

        let mv = motion_vectors(&attrs, &[Vec3::X], 1, &config).unwrap();
        assert_eq!(mv.velocity_attribute, None);
        assert_eq!(mv.velocities, vec![Vec3::X]);
        assert_eq!(mv.accelerations, Some(vec![Vec3::new(0.0, 0.0, 2.0)]));

        // built-in velocities with the wrong count are ignored
        assert!(motion_vectors(&attrs, &[Vec3::X, Vec3::X], 1, &config).is_none());
        assert!(motion_vectors(&attrs, &[], 1, &config).is_none());
    }

    #[test]
    fn test_motion_vectors_need_point_scope() {
        let config = ProceduralConfig::default();
        let mut attrs = UserAttributes::new();
        attrs.insert("v".into(), varying(vec![0.0, 0.0, 1.0]).with_scope(AttrScope::Uniform));
        attrs.insert("accel".into(), varying(vec![0.0, 2.0, 0.0]).with_scope(AttrScope::Constant));

        let mv = motion_vectors(&attrs, &[Vec3::X], 1, &config).unwrap();
        assert_eq!(mv.velocity_attribute, None);
        assert_eq!(mv.velocities, vec![Vec3::X]);
        assert!(mv.accelerations.is_none());
    }

    #[test]
    fn test_extrapolate_keys() {
        let mv = MotionVectors {
            velocities: vec![Vec3::X],
            ..Default::default()
        };
        let keys = extrapolate_keys(&[Vec3::ZERO], Some(&mv), 1.0, &[0.5, 1.0, 1.5], 2.0);
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0][0], Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(keys[1][0], Vec3::ZERO);
        assert_eq!(keys[2][0], Vec3::new(1.0, 0.0, 0.0));

        let still = extrapolate_keys(&[Vec3::ONE], None, 1.0, &[0.5, 1.5], 1.0);
        assert_eq!(still, vec![vec![Vec3::ONE]]);
    }

    #[test]
    fn test_blend_keys() {
        let src = SchemaSamples::new(TimeSampling::uniform(1.0, 0.0))
            .with(vec![Vec3::ZERO])
            .with(vec![Vec3::new(10.0, 0.0, 0.0)]);
        let mut list = TimeSampleList::new();
        list.update(&src, 0.25, 0.75, false).unwrap();

        let keys = blend_keys(&list, &[0.25, 0.75], |s| s.as_slice()).unwrap();
        assert_eq!(keys[0][0], Vec3::new(2.5, 0.0, 0.0));
        assert_eq!(keys[1][0], Vec3::new(7.5, 0.0, 0.0));
        assert_eq!(flatten_keys(&keys), vec![2.5, 0.0, 0.0, 7.5, 0.0, 0.0]);
    }

    #[test]
    fn test_blend_keys_changing_count() {
        let src = SchemaSamples::new(TimeSampling::uniform(1.0, 0.0))
            .with(vec![Vec3::ZERO])
            .with(vec![Vec3::ZERO, Vec3::ONE]);
        let mut list = TimeSampleList::new();
        list.update(&src, 0.0, 1.0, false).unwrap();

        // mid-way: sizes differ, lower sample alone
        let keys = blend_keys(&list, &[0.5], |s| s.as_slice()).unwrap();
        assert_eq!(keys[0], vec![Vec3::ZERO]);
        assert!(blend_keys(&list, &[0.0, 1.0], |s| s.as_slice()).is_err());
    }
}
