//! Core sampling types.
//!
//! - [`TimeSampling`] - when each stored sample was recorded
//! - [`TimeSampleList`] - decoded samples ordered by time, with bracketing lookup
//! - [`GeometryScope`] / [`TopologyVariance`] - tags carried by geometry samples

mod time_sampling;
mod sample;
mod time_sample;

pub use time_sampling::{TimeSampling, TimeSamplingType};
pub use sample::{GeometryScope, TopologyVariance};
pub use time_sample::{SampleBracket, SampledSource, TimeSample, TimeSampleList};
