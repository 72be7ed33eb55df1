//! In-memory property implementation.
//!
//! Used by embedders that already hold decoded data, and throughout the tests.

use crate::core::{GeometryScope, SampledSource, TimeSampling};
use crate::util::{AlembicPod, DataType, Error, Result};

use super::{PropertyHeader, PropertyKind, PropertyReader, PropertySample};

/// Property whose samples live in memory.
#[derive(Clone, Debug)]
pub struct MemoryProperty {
    header: PropertyHeader,
    time_sampling: TimeSampling,
    samples: Vec<PropertySample>,
}

impl MemoryProperty {
    /// Empty array property.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            header: PropertyHeader::new(name, data_type),
            time_sampling: TimeSampling::IDENTITY,
            samples: Vec::new(),
        }
    }

    /// Mark as a scalar property.
    pub fn scalar(mut self) -> Self {
        self.header.kind = PropertyKind::Scalar;
        self
    }

    /// Mark as a geometry parameter with the given scope.
    pub fn geom_param(mut self, scope: GeometryScope) -> Self {
        self.header.geometry_scope = Some(scope);
        self
    }

    pub fn interpretation(mut self, interpretation: impl Into<String>) -> Self {
        self.header.interpretation = interpretation.into();
        self
    }

    pub fn scalar_like(mut self) -> Self {
        self.header.scalar_like = true;
        self
    }

    pub fn not_uv(mut self) -> Self {
        self.header.not_uv = true;
        self
    }

    pub fn time_sampling(mut self, ts: TimeSampling) -> Self {
        self.time_sampling = ts;
        self
    }

    /// Append a numeric sample. The extent comes from the header.
    pub fn sample<T: AlembicPod>(self, values: &[T]) -> Self {
        let extent = self.header.data_type.extent;
        self.raw_sample(PropertySample::from_pod(extent, values))
    }

    /// Append an indexed numeric sample.
    pub fn indexed_sample<T: AlembicPod>(self, values: &[T], indices: &[u32]) -> Self {
        let extent = self.header.data_type.extent;
        self.raw_sample(PropertySample::from_pod(extent, values).with_indices(indices.to_vec()))
    }

    pub fn string_sample<S: AsRef<str>>(self, values: &[S]) -> Self {
        self.raw_sample(PropertySample::from_strings(values))
    }

    pub fn raw_sample(mut self, sample: PropertySample) -> Self {
        self.samples.push(sample);
        self
    }
}

impl SampledSource for MemoryProperty {
    type Sample = PropertySample;

    fn num_samples(&self) -> usize {
        self.samples.len()
    }

    fn time_sampling(&self) -> &TimeSampling {
        &self.time_sampling
    }

    fn read_sample(&self, index: usize) -> Result<PropertySample> {
        self.samples
            .get(index)
            .cloned()
            .ok_or(Error::SampleOutOfBounds {
                index,
                count: self.samples.len(),
            })
    }
}

impl PropertyReader for MemoryProperty {
    fn header(&self) -> &PropertyHeader {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let p = MemoryProperty::new("Cd", DataType::VEC3F)
            .geom_param(GeometryScope::Varying)
            .interpretation("rgb")
            .time_sampling(TimeSampling::uniform(1.0, 0.0))
            .sample::<f32>(&[1.0, 0.0, 0.0])
            .sample::<f32>(&[0.0, 1.0, 0.0]);

        assert_eq!(p.name(), "Cd");
        assert_eq!(p.num_samples(), 2);
        assert!(!p.is_constant());
        assert_eq!(p.header().geometry_scope, Some(GeometryScope::Varying));
        assert_eq!(p.read_sample(1).unwrap().num_elements(), 1);
        assert!(matches!(
            p.read_sample(2),
            Err(Error::SampleOutOfBounds { index: 2, count: 2 })
        ));
    }
}
