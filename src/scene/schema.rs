//! Decoded schema samples for the shape kinds the converter handles.
//!
//! Optional per-point channels follow the archive convention: an empty vector
//! means the channel is absent.

use std::sync::Arc;

use crate::core::{SampledSource, TimeSampling, TopologyVariance};
use crate::util::{DMat4, Error, Result, Vec3};

/// Polygon or subdivision mesh sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshSample {
    pub positions: Vec<Vec3>,
    pub face_counts: Vec<i32>,
    pub face_indices: Vec<i32>,
    pub velocities: Vec<Vec3>,
}

impl MeshSample {
    pub fn num_points(&self) -> usize {
        self.positions.len()
    }

    pub fn num_faces(&self) -> usize {
        self.face_counts.len()
    }
}

/// Point cloud sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointsSample {
    pub positions: Vec<Vec3>,
    /// Stable per-particle identifiers
    pub ids: Vec<u64>,
    pub velocities: Vec<Vec3>,
    /// One width for all points, or one per point
    pub widths: Vec<f32>,
}

impl PointsSample {
    pub fn num_points(&self) -> usize {
        self.positions.len()
    }
}

/// Curve order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CurveType {
    #[default]
    Cubic,
    Linear,
    /// Per-curve orders; not supported by the converter
    VariableOrder,
}

/// Curve basis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BasisType {
    #[default]
    NoBasis,
    Bezier,
    Bspline,
    CatmullRom,
    Hermite,
    Power,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CurvePeriodicity {
    #[default]
    NonPeriodic,
    Periodic,
}

/// Curves sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurvesSample {
    pub positions: Vec<Vec3>,
    pub num_vertices: Vec<i32>,
    pub curve_type: CurveType,
    pub basis: BasisType,
    pub wrap: CurvePeriodicity,
    pub velocities: Vec<Vec3>,
    /// One width for all points, or one per point
    pub widths: Vec<f32>,
    /// B-spline knots, `num_vertices + 4` per curve. Empty means uniform.
    pub knots: Vec<f32>,
    /// Rational weight per control point. Empty means 1.
    pub position_weights: Vec<f32>,
}

/// Transform sample. The matrix is the node's local transform.
#[derive(Clone, Debug, PartialEq)]
pub struct XformSample {
    pub matrix: DMat4,
    /// Whether the parent's world transform applies to this node
    pub inherits: bool,
}

impl Default for XformSample {
    fn default() -> Self {
        Self {
            matrix: DMat4::IDENTITY,
            inherits: true,
        }
    }
}

/// In-memory schema samples of one kind.
#[derive(Clone, Debug)]
pub struct SchemaSamples<S> {
    time_sampling: TimeSampling,
    samples: Vec<Arc<S>>,
    variance: TopologyVariance,
}

impl<S> SchemaSamples<S> {
    pub fn new(time_sampling: TimeSampling) -> Self {
        Self {
            time_sampling,
            samples: Vec::new(),
            variance: TopologyVariance::Static,
        }
    }

    /// Single static sample.
    pub fn constant(sample: S) -> Self {
        Self::new(TimeSampling::IDENTITY).with(sample)
    }

    pub fn with(mut self, sample: S) -> Self {
        self.push(sample);
        self
    }

    /// Append a sample. Variance is promoted to homogeneous once there is more than one.
    pub fn push(&mut self, sample: S) {
        self.samples.push(Arc::new(sample));
        if self.samples.len() > 1 && self.variance == TopologyVariance::Static {
            self.variance = TopologyVariance::Homogeneous;
        }
    }

    pub fn variance(mut self, variance: TopologyVariance) -> Self {
        self.variance = variance;
        self
    }

    pub fn topology_variance(&self) -> TopologyVariance {
        self.variance
    }

    pub fn get(&self, index: usize) -> Option<&S> {
        self.samples.get(index).map(|s| s.as_ref())
    }
}

impl<S> SampledSource for SchemaSamples<S> {
    type Sample = Arc<S>;

    fn num_samples(&self) -> usize {
        self.samples.len()
    }

    fn time_sampling(&self) -> &TimeSampling {
        &self.time_sampling
    }

    fn read_sample(&self, index: usize) -> Result<Arc<S>> {
        self.samples
            .get(index)
            .cloned()
            .ok_or(Error::SampleOutOfBounds {
                index,
                count: self.samples.len(),
            })
    }
}
