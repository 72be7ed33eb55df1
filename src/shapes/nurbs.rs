//! Cubic B-spline curves resampled into interpolating points.
//!
//! The renderer has no B-spline basis, so every curve is evaluated at
//! `rate` points per span and emitted as catmull-rom. Evaluation is linear in
//! the control values, so one set of stencils serves positions of every
//! motion key, widths and float point attributes alike.

use smallvec::SmallVec;

use crate::attr::{AttrScope, AttributeData, UserAttributes, ValueType};
use crate::util::{Error, Result, Vec3};

const DEGREE: usize = 3;

/// Control point contributions to one output point.
type Stencil = SmallVec<[(u32, f32); 4]>;

/// Precomputed evaluation of a set of B-spline curves.
#[derive(Clone, Debug)]
pub struct BsplineResampler {
    stencils: Vec<Stencil>,
    counts: Vec<u32>,
    cv_count: usize,
}

impl BsplineResampler {
    /// Stencils for curves with `num_vertices` control points each.
    ///
    /// `knots` holds `n + 4` values per curve of `n` points and may be
    /// empty for uniform knots. `weights` may be empty for a non-rational
    /// curve.
    pub fn new(num_vertices: &[u32], knots: &[f32], weights: &[f32], rate: u32) -> Result<Self> {
        let cv_count: usize = num_vertices.iter().map(|&n| n as usize).sum();
        let knot_count: usize = num_vertices.iter().map(|&n| n as usize + DEGREE + 1).sum();
        if !knots.is_empty() && knots.len() != knot_count {
            return Err(Error::size_mismatch("curve knots", knot_count, knots.len()));
        }
        if !weights.is_empty() && weights.len() != cv_count {
            return Err(Error::size_mismatch("curve weights", cv_count, weights.len()));
        }
        let rate = rate.max(1) as usize;

        let mut stencils = Vec::new();
        let mut counts = Vec::with_capacity(num_vertices.len());
        let mut cv_offset = 0usize;
        let mut knot_offset = 0usize;
        let mut uniform = Vec::new();
        for (ci, &np) in num_vertices.iter().enumerate() {
            let np = np as usize;
            if np <= DEGREE {
                return Err(Error::other(format!("b-spline curve {ci} has {np} points, needs at least 4")));
            }
            let curve_knots = if knots.is_empty() {
                uniform.clear();
                uniform.extend((0..np + DEGREE + 1).map(|k| k as f32));
                uniform.as_slice()
            } else {
                &knots[knot_offset..knot_offset + np + DEGREE + 1]
            };
            let curve_weights = (!weights.is_empty()).then(|| &weights[cv_offset..cv_offset + np]);

            let spans = np - DEGREE;
            let samples = spans * rate;
            let (u0, u1) = (curve_knots[DEGREE], curve_knots[np]);
            if u1 <= u0 {
                return Err(Error::other(format!("b-spline curve {ci} has an empty knot domain")));
            }
            for i in 0..=samples {
                let u = if i == samples {
                    u1
                } else {
                    u0 + (u1 - u0) * i as f32 / samples as f32
                };
                stencils.push(stencil(curve_knots, curve_weights, np, u, cv_offset));
            }
            counts.push((samples + 1) as u32);
            cv_offset += np;
            knot_offset += np + DEGREE + 1;
        }

        Ok(Self {
            stencils,
            counts,
            cv_count,
        })
    }

    /// Output points per curve.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn point_count(&self) -> usize {
        self.stencils.len()
    }

    pub fn cv_count(&self) -> usize {
        self.cv_count
    }

    pub fn points(&self, cvs: &[Vec3]) -> Result<Vec<Vec3>> {
        if cvs.len() != self.cv_count {
            return Err(Error::size_mismatch("curve control points", self.cv_count, cvs.len()));
        }
        Ok(self
            .stencils
            .iter()
            .map(|st| st.iter().map(|&(i, w)| w * cvs[i as usize]).sum())
            .collect())
    }

    /// Resample `dim` wide float tuples given per control point.
    pub fn floats(&self, values: &[f32], dim: usize) -> Result<Vec<f32>> {
        if dim == 0 || values.len() != self.cv_count * dim {
            return Err(Error::size_mismatch("curve values", self.cv_count * dim, values.len()));
        }
        let mut out = vec![0.0f32; self.stencils.len() * dim];
        for (dst, st) in out.chunks_exact_mut(dim).zip(&self.stencils) {
            for &(i, w) in st {
                let src = &values[i as usize * dim..(i as usize + 1) * dim];
                for (d, s) in dst.iter_mut().zip(src) {
                    *d += w * s;
                }
            }
        }
        Ok(out)
    }

    /// Resample per control point attributes in place.
    ///
    /// Non-float attributes can't be evaluated along the curve and are
    /// dropped.
    pub fn resample_attributes(&self, attrs: &mut UserAttributes) {
        attrs.retain(|name, v| {
            if v.scope() == AttrScope::Constant || v.scope() == AttrScope::Uniform {
                return true;
            }
            v.expand_indices();
            if v.value_type() != ValueType::Float {
                tracing::warn!("Dropping non-float point attribute '{name}' on resampled curves");
                return false;
            }
            let resampled = v.floats().map(|f| self.floats(f, v.dim()));
            match resampled {
                Some(Ok(values)) => {
                    v.set_data(AttributeData::Float(values));
                    true
                }
                Some(Err(e)) => {
                    tracing::warn!("Dropping point attribute '{name}': {e}");
                    false
                }
                None => false,
            }
        });
    }
}

/// Rational cubic basis weights at `u`, offset to global control indices.
fn stencil(knots: &[f32], weights: Option<&[f32]>, np: usize, u: f32, offset: usize) -> Stencil {
    // last span whose start is <= u, within the valid domain
    let mut span = DEGREE;
    while span + 1 < np && knots[span + 1] <= u {
        span += 1;
    }
    let basis = basis_functions(knots, span, u);

    let mut st = Stencil::new();
    let mut total = 0.0f32;
    for (r, &b) in basis.iter().enumerate() {
        let cv = span - DEGREE + r;
        let w = b * weights.map_or(1.0, |w| w[cv]);
        total += w;
        st.push(((offset + cv) as u32, w));
    }
    if total != 0.0 {
        for (_, w) in st.iter_mut() {
            *w /= total;
        }
    }
    st
}

/// The four non-zero basis functions on `span`.
fn basis_functions(knots: &[f32], span: usize, u: f32) -> [f32; DEGREE + 1] {
    let mut n = [0.0f32; DEGREE + 1];
    let mut left = [0.0f32; DEGREE + 1];
    let mut right = [0.0f32; DEGREE + 1];
    n[0] = 1.0;
    for j in 1..=DEGREE {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom != 0.0 { n[r] / denom } else { 0.0 };
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }
    n
}
