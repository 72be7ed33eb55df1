//! Point identity union across two samples.
//!
//! Particles can be born or die between the samples bracketing the render
//! time. Points present in both are blended, the others are extrapolated from
//! the only sample that has them. The output keeps the lower sample's order
//! and appends points born in the upper sample by ascending ID.

use std::collections::{BTreeMap, HashMap};

use crate::attr::UserAttributes;
use crate::util::{lerp_vec3, Chrono, Vec3};

use super::positions::{extrapolate, MotionVectors, PositionKeys};

/// Where every output point comes from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdUnion {
    /// For each lower-sample point, its index in the upper sample when shared
    lower_to_upper: Vec<Option<usize>>,
    /// Points only in the upper sample: (upper index, output index)
    born: Vec<(usize, usize)>,
}

impl IdUnion {
    /// Union of two ID sets.
    pub fn new(lower_ids: &[u64], upper_ids: &[u64]) -> Self {
        let lower: HashMap<u64, usize> = lower_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let mut lower_to_upper = vec![None; lower_ids.len()];
        let mut born_by_id = BTreeMap::new();

        for (j, &id) in upper_ids.iter().enumerate() {
            match lower.get(&id) {
                Some(&i) => lower_to_upper[i] = Some(j),
                None => {
                    born_by_id.insert(id, j);
                }
            }
        }

        let base = lower_ids.len();
        let born = born_by_id
            .into_values()
            .enumerate()
            .map(|(k, j)| (j, base + k))
            .collect();
        Self { lower_to_upper, born }
    }

    /// Lower sample alone.
    pub fn lower_only(count: usize) -> Self {
        Self {
            lower_to_upper: vec![None; count],
            born: Vec::new(),
        }
    }

    /// Final point count.
    pub fn len(&self) -> usize {
        self.lower_to_upper.len() + self.born.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lower_count(&self) -> usize {
        self.lower_to_upper.len()
    }

    pub fn shared_count(&self) -> usize {
        self.lower_to_upper.iter().filter(|m| m.is_some()).count()
    }

    pub fn born(&self) -> &[(usize, usize)] {
        &self.born
    }

    /// Upper index of lower point `i`, when shared.
    pub fn upper_of(&self, i: usize) -> Option<usize> {
        self.lower_to_upper.get(i).copied().flatten()
    }

    /// Merge a per-point scalar: shared points blend, the others keep their own value.
    pub fn merge_scalars(&self, lower: &[f32], upper: &[f32], blend: f64) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len());
        for (i, &r0) in lower.iter().enumerate() {
            let r = match self.upper_of(i).and_then(|j| upper.get(j)) {
                Some(&r1) => ((1.0 - blend) * r0 as f64 + blend * r1 as f64) as f32,
                None => r0,
            };
            out.push(r);
        }
        for &(j, _) in &self.born {
            out.push(upper.get(j).copied().unwrap_or(0.0));
        }
        out
    }
}

/// One side of the bracket.
#[derive(Clone, Copy, Debug)]
pub struct PointSide<'a> {
    pub time: Chrono,
    pub positions: &'a [Vec3],
    pub motion: Option<&'a MotionVectors>,
}

impl PointSide<'_> {
    fn extrapolated(&self, i: usize, t: Chrono, velocity_scale: f64) -> Vec3 {
        let p = self.positions[i];
        match self.motion {
            Some(m) => {
                let a = m.accelerations.as_ref().map(|a| a[i]);
                extrapolate(p, m.velocities[i], a, (t - self.time) * velocity_scale)
            }
            None => p,
        }
    }
}

/// Positions of the union at every key time.
///
/// Shared points blend positions and, when both sides have them, motion
/// vectors; they are extrapolated from the render time. Points on one side
/// only are extrapolated from that side's sample time. Without lower motion
/// vectors a single key at `render_time` is produced.
pub fn union_positions(
    union: &IdUnion,
    lower: PointSide<'_>,
    upper: Option<(PointSide<'_>, f64)>,
    times: &[Chrono],
    render_time: Chrono,
    velocity_scale: f64,
) -> PositionKeys {
    let key_times: Vec<Chrono> = if lower.motion.is_some() {
        times.to_vec()
    } else {
        vec![render_time]
    };

    key_times
        .iter()
        .map(|&t| {
            let mut key = Vec::with_capacity(union.len());
            for i in 0..union.lower_count() {
                let shared = upper.and_then(|(up, b)| union.upper_of(i).map(|j| (up, b, j)));
                let p = match shared {
                    Some((up, b, j)) => {
                        let p = lerp_vec3(lower.positions[i], up.positions[j], b);
                        match (lower.motion, up.motion) {
                            (Some(m0), Some(m1)) => {
                                let dt = (t - render_time) * velocity_scale;
                                let v = lerp_vec3(m0.velocities[i], m1.velocities[j], b);
                                let a = match (&m0.accelerations, &m1.accelerations) {
                                    (Some(a0), Some(a1)) => Some(lerp_vec3(a0[i], a1[j], b)),
                                    _ => None,
                                };
                                extrapolate(p, v, a, dt)
                            }
                            _ => p,
                        }
                    }
                    None => lower.extrapolated(i, t, velocity_scale),
                };
                key.push(p);
            }
            if let Some((up, _)) = upper {
                for &(j, _) in union.born() {
                    key.push(up.extrapolated(j, t, velocity_scale));
                }
            }
            key
        })
        .collect()
}

/// Grow every point attribute to the union size and fill born points from
/// the upper sample's attribute of the same name.
pub fn extend_point_attributes(attrs: &mut UserAttributes, upper: &UserAttributes, union: &IdUnion) {
    if union.born().is_empty() {
        return;
    }
    for (name, vector) in attrs.iter_mut() {
        if let Err(e) = vector.resize(union.len()) {
            tracing::warn!("Could not extend point attribute '{name}': {e}");
            continue;
        }
        let Some(src) = upper.get(name) else {
            continue;
        };
        for &(j, dst) in union.born() {
            if let Err(e) = vector.copy_range(src, j, 1, dst) {
                tracing::warn!("Failed to copy extended point attribute '{name}': {e}");
                break;
            }
        }
    }
}
