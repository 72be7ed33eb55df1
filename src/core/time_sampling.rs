//! Time sampling: when each stored sample of a property was recorded.

use crate::util::{Chrono, TIME_EPSILON};

/// How sample times are laid out.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TimeSamplingType {
    /// Single static sample at time 0.
    #[default]
    Identity,

    /// `start_time + index * time_per_cycle`
    Uniform {
        time_per_cycle: Chrono,
        start_time: Chrono,
    },

    /// Repeating pattern of times, offset by `time_per_cycle` each cycle.
    Cyclic {
        time_per_cycle: Chrono,
        times: Vec<Chrono>,
    },

    /// Explicit time for each sample.
    Acyclic { times: Vec<Chrono> },
}

/// Time sampling of a property or schema.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSampling {
    pub sampling_type: TimeSamplingType,
}

impl TimeSampling {
    pub const IDENTITY: Self = Self {
        sampling_type: TimeSamplingType::Identity,
    };

    pub fn uniform(time_per_cycle: Chrono, start_time: Chrono) -> Self {
        Self {
            sampling_type: TimeSamplingType::Uniform {
                time_per_cycle,
                start_time,
            },
        }
    }

    pub fn cyclic(time_per_cycle: Chrono, times: Vec<Chrono>) -> Self {
        Self {
            sampling_type: TimeSamplingType::Cyclic {
                time_per_cycle,
                times,
            },
        }
    }

    pub fn acyclic(times: Vec<Chrono>) -> Self {
        Self {
            sampling_type: TimeSamplingType::Acyclic { times },
        }
    }

    /// Time of the sample at `index`.
    pub fn sample_time(&self, index: usize) -> Chrono {
        match &self.sampling_type {
            TimeSamplingType::Identity => 0.0,
            TimeSamplingType::Uniform {
                time_per_cycle,
                start_time,
            } => start_time + index as Chrono * time_per_cycle,
            TimeSamplingType::Cyclic {
                time_per_cycle,
                times,
            } => {
                if times.is_empty() {
                    return 0.0;
                }
                let cycle = index / times.len();
                times[index % times.len()] + cycle as Chrono * time_per_cycle
            }
            TimeSamplingType::Acyclic { times } => times
                .get(index)
                .or(times.last())
                .copied()
                .unwrap_or(0.0),
        }
    }

    /// First and last sample time for a property with `num_samples` samples.
    pub fn time_range(&self, num_samples: usize) -> (Chrono, Chrono) {
        if num_samples == 0 {
            return (0.0, 0.0);
        }
        (self.sample_time(0), self.sample_time(num_samples - 1))
    }

    /// Largest index whose time is `<= time` (within tolerance).
    ///
    /// Times before the first sample clamp to index 0.
    pub fn floor_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        if num_samples <= 1 {
            return (0, self.sample_time(0));
        }

        let idx = match &self.sampling_type {
            TimeSamplingType::Identity => 0,
            TimeSamplingType::Uniform {
                time_per_cycle,
                start_time,
            } if *time_per_cycle > 0.0 => {
                let steps = ((time - start_time + TIME_EPSILON) / time_per_cycle).floor();
                if steps <= 0.0 {
                    0
                } else {
                    (steps as usize).min(num_samples - 1)
                }
            }
            _ => {
                // first index whose time exceeds the target
                let mut lo = 0;
                let mut hi = num_samples;
                while lo < hi {
                    let mid = lo + (hi - lo) / 2;
                    if self.sample_time(mid) <= time + TIME_EPSILON {
                        lo = mid + 1;
                    } else {
                        hi = mid;
                    }
                }
                lo.saturating_sub(1)
            }
        };

        (idx, self.sample_time(idx))
    }

    /// Smallest index whose time is `>= time` (within tolerance).
    ///
    /// Times after the last sample clamp to the last index.
    pub fn ceil_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        let (floor_idx, floor_time) = self.floor_index(time, num_samples);
        if floor_time >= time - TIME_EPSILON || floor_idx + 1 >= num_samples {
            return (floor_idx, floor_time);
        }
        let idx = floor_idx + 1;
        (idx, self.sample_time(idx))
    }

    /// Index whose time is closest to `time`. Ties go to the earlier sample.
    pub fn near_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        let (floor_idx, floor_time) = self.floor_index(time, num_samples);
        let (ceil_idx, ceil_time) = self.ceil_index(time, num_samples);
        if (time - floor_time).abs() <= (ceil_time - time).abs() {
            (floor_idx, floor_time)
        } else {
            (ceil_idx, ceil_time)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sampling() {
        let ts = TimeSampling::uniform(1.0 / 24.0, 0.0);
        assert_eq!(ts.sample_time(0), 0.0);
        assert!((ts.sample_time(24) - 1.0).abs() < 1e-10);
        assert_eq!(ts.time_range(49).1, ts.sample_time(48));
    }

    #[test]
    fn test_cyclic_sampling() {
        let ts = TimeSampling::cyclic(1.0, vec![0.0, 0.25]);
        assert_eq!(ts.sample_time(1), 0.25);
        assert_eq!(ts.sample_time(2), 1.0);
        assert_eq!(ts.sample_time(3), 1.25);
    }

    #[test]
    fn test_floor_ceil_index() {
        let ts = TimeSampling::uniform(1.0, 0.0);
        assert_eq!(ts.floor_index(0.5, 10).0, 0);
        assert_eq!(ts.ceil_index(0.5, 10).0, 1);
        assert_eq!(ts.floor_index(5.0, 10).0, 5);
        assert_eq!(ts.ceil_index(5.0, 10).0, 5);
        assert_eq!(ts.floor_index(-3.0, 10).0, 0);
        assert_eq!(ts.ceil_index(42.0, 10).0, 9);
    }

    #[test]
    fn test_acyclic_lookup() {
        let ts = TimeSampling::acyclic(vec![0.0, 0.5, 1.0, 2.0]);
        assert_eq!(ts.floor_index(1.7, 4), (2, 1.0));
        assert_eq!(ts.ceil_index(1.7, 4), (3, 2.0));
        assert_eq!(ts.near_index(1.7, 4), (3, 2.0));
        assert_eq!(ts.near_index(0.6, 4), (1, 0.5));
        // within tolerance of a stored sample
        assert_eq!(ts.floor_index(0.49995, 4).0, 1);
        assert_eq!(ts.ceil_index(0.50005, 4).0, 1);
    }

    #[test]
    fn test_single_sample() {
        let ts = TimeSampling::IDENTITY;
        assert_eq!(ts.floor_index(10.0, 1), (0, 0.0));
        assert_eq!(ts.ceil_index(-10.0, 1), (0, 0.0));
    }
}
