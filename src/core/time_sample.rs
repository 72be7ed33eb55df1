//! Ordered time samples and the bracketing lookup every attribute goes through.
//!
//! A [`TimeSampleList`] caches decoded samples of one source, keyed by time.
//! [`TimeSampleList::update`] pulls in the samples bracketing a time window and
//! [`TimeSampleList::resolve`] answers "which two samples, and how far between
//! them" for a target time.

use super::TimeSampling;
use crate::util::{same_time, Chrono, Error, Result, TIME_EPSILON};

/// Anything that exposes discrete, time-stamped samples.
pub trait SampledSource {
    type Sample;

    /// Number of stored samples.
    fn num_samples(&self) -> usize;

    fn time_sampling(&self) -> &TimeSampling;

    /// Constant sources only ever contribute sample 0.
    fn is_constant(&self) -> bool {
        self.num_samples() <= 1
    }

    /// Read the sample at `index`.
    fn read_sample(&self, index: usize) -> Result<Self::Sample>;
}

/// One decoded sample and the time it was recorded at.
#[derive(Clone, Debug)]
pub struct TimeSample<T> {
    pub time: Chrono,
    /// Index of the sample in its source
    pub index: usize,
    pub data: T,
}

/// Result of [`TimeSampleList::resolve`].
///
/// `lower` and `upper` are the same sample whenever `blend == 0`.
#[derive(Debug)]
pub struct SampleBracket<'a, T> {
    pub lower: &'a TimeSample<T>,
    pub upper: &'a TimeSample<T>,
    pub blend: f64,
}

impl<'a, T> Clone for SampleBracket<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for SampleBracket<'a, T> {}

impl<'a, T> SampleBracket<'a, T> {
    fn exact(sample: &'a TimeSample<T>) -> Self {
        Self {
            lower: sample,
            upper: sample,
            blend: 0.0,
        }
    }

    /// True when only the lower sample contributes.
    #[inline]
    pub fn is_exact(&self) -> bool {
        self.blend <= 0.0
    }

    /// Upper sample if this bracket actually interpolates.
    #[inline]
    pub fn upper_if_blending(&self) -> Option<&'a TimeSample<T>> {
        if self.is_exact() {
            None
        } else {
            Some(self.upper)
        }
    }
}

/// Time-ordered list of decoded samples.
#[derive(Clone, Debug)]
pub struct TimeSampleList<T> {
    samples: Vec<TimeSample<T>>,
}

impl<T> Default for TimeSampleList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimeSampleList<T> {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeSample<T>> {
        self.samples.iter()
    }

    pub fn first(&self) -> Option<&TimeSample<T>> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&TimeSample<T>> {
        self.samples.last()
    }

    /// Earliest and latest loaded times.
    pub fn time_range(&self) -> Option<(Chrono, Chrono)> {
        Some((self.first()?.time, self.last()?.time))
    }

    /// Insert a sample, keeping time order.
    ///
    /// A sample at the same time as an existing one replaces it.
    pub fn insert(&mut self, time: Chrono, index: usize, data: T) {
        let pos = self.samples.partition_point(|s| s.time < time - TIME_EPSILON);
        let sample = TimeSample { time, index, data };
        match self.samples.get(pos) {
            Some(existing) if same_time(existing.time, time) => self.samples[pos] = sample,
            _ => self.samples.insert(pos, sample),
        }
    }

    fn contains_time(&self, time: Chrono) -> bool {
        let pos = self.samples.partition_point(|s| s.time < time - TIME_EPSILON);
        self.samples
            .get(pos)
            .is_some_and(|s| same_time(s.time, time))
    }

    /// Load the samples of `source` covering `[t_start, t_end]`.
    ///
    /// Indices from the floor sample of `t_start` to the ceil sample of `t_end`
    /// are read. Samples already in the list are reused. With `keep_existing`
    /// off, anything outside the window is dropped afterwards. Constant sources
    /// only ever load sample 0 and never accumulate.
    pub fn update<S>(&mut self, source: &S, t_start: Chrono, t_end: Chrono, keep_existing: bool) -> Result<()>
    where
        S: SampledSource<Sample = T> + ?Sized,
    {
        let num_samples = source.num_samples();
        if num_samples == 0 {
            return Err(Error::missing("source has no samples"));
        }

        let ts = source.time_sampling();
        let (first, last, keep_existing) = if source.is_constant() {
            (0, 0, false)
        } else {
            let (lo, hi) = if t_start <= t_end {
                (t_start, t_end)
            } else {
                (t_end, t_start)
            };
            let first = ts.floor_index(lo, num_samples).0;
            let last = ts.ceil_index(hi, num_samples).0;
            (first, last.max(first), keep_existing)
        };

        let mut used = Vec::with_capacity(last - first + 1);
        for index in first..=last {
            let time = ts.sample_time(index);
            used.push(time);
            if self.contains_time(time) {
                continue;
            }
            let data = source.read_sample(index)?;
            self.insert(time, index, data);
        }

        if !keep_existing {
            self.samples
                .retain(|s| used.iter().any(|&t| same_time(t, s.time)));
        }

        Ok(())
    }

    /// Find the samples bracketing `t` and the blend factor between them.
    ///
    /// Times outside the loaded range clamp to the first or last sample with
    /// a zero blend. A time within tolerance of a stored sample resolves to
    /// that sample alone.
    pub fn resolve(&self, t: Chrono) -> Result<SampleBracket<'_, T>> {
        let (first, last) = match (self.samples.first(), self.samples.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(Error::missing("no samples loaded")),
        };

        if self.samples.len() == 1 || t <= first.time {
            return Ok(SampleBracket::exact(first));
        }
        if t >= last.time {
            return Ok(SampleBracket::exact(last));
        }

        let pos = self
            .samples
            .partition_point(|s| s.time <= t + TIME_EPSILON)
            .saturating_sub(1);
        let lower = &self.samples[pos];

        match self.samples.get(pos + 1) {
            Some(upper) if t - lower.time > TIME_EPSILON => Ok(SampleBracket {
                lower,
                upper,
                blend: (t - lower.time) / (upper.time - lower.time),
            }),
            _ => Ok(SampleBracket::exact(lower)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        ts: TimeSampling,
        n: usize,
        reads: Cell<usize>,
    }

    impl SampledSource for Counter {
        type Sample = usize;

        fn num_samples(&self) -> usize {
            self.n
        }

        fn time_sampling(&self) -> &TimeSampling {
            &self.ts
        }

        fn read_sample(&self, index: usize) -> Result<usize> {
            self.reads.set(self.reads.get() + 1);
            Ok(index * 10)
        }
    }

    fn counter(times: Vec<f64>) -> Counter {
        Counter {
            n: times.len(),
            ts: TimeSampling::acyclic(times),
            reads: Cell::new(0),
        }
    }

    #[test]
    fn test_update_window() {
        let src = counter(vec![0.0, 1.0, 2.0, 3.0]);
        let mut list = TimeSampleList::new();
        list.update(&src, 1.5, 1.5, false).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.time_range(), Some((1.0, 2.0)));
        assert_eq!(src.reads.get(), 2);

        // accumulate without re-reading
        list.update(&src, 2.5, 2.5, true).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(src.reads.get(), 3);

        // drop what is outside the new window
        list.update(&src, 0.0, 0.0, false).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.first().unwrap().data, 0);
    }

    #[test]
    fn test_update_constant_source() {
        let src = counter(vec![5.0]);
        let mut list = TimeSampleList::new();
        list.update(&src, 0.0, 10.0, true).unwrap();
        assert_eq!(list.len(), 1);
        let b = list.resolve(100.0).unwrap();
        assert_eq!(b.blend, 0.0);
        assert_eq!(b.lower.index, 0);
    }

    #[test]
    fn test_update_empty_source() {
        let src = counter(vec![]);
        let mut list = TimeSampleList::new();
        assert!(list.update(&src, 0.0, 1.0, false).is_err());
        assert!(list.resolve(0.0).is_err());
    }

    #[test]
    fn test_resolve_blend() {
        let mut list = TimeSampleList::new();
        list.insert(2.0, 1, "b");
        list.insert(1.0, 0, "a");

        let b = list.resolve(1.25).unwrap();
        assert_eq!(b.lower.data, "a");
        assert_eq!(b.upper.data, "b");
        assert!((b.blend - 0.25).abs() < 1e-12);
        let t = b.lower.time * (1.0 - b.blend) + b.upper.time * b.blend;
        assert!((t - 1.25).abs() < 1e-12);

        let exact = list.resolve(2.0).unwrap();
        assert!(exact.is_exact());
        assert!(std::ptr::eq(exact.lower, exact.upper));

        let near = list.resolve(1.00005).unwrap();
        assert_eq!(near.blend, 0.0);
        assert_eq!(near.lower.index, 0);
    }

    #[test]
    fn test_resolve_clamps() {
        let mut list = TimeSampleList::new();
        list.insert(1.0, 0, 1);
        list.insert(2.0, 1, 2);
        assert_eq!(list.resolve(-5.0).unwrap().lower.data, 1);
        assert_eq!(list.resolve(7.0).unwrap().lower.data, 2);
        assert_eq!(list.resolve(7.0).unwrap().blend, 0.0);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut list = TimeSampleList::new();
        for i in 0..5 {
            list.insert(i as f64 * 0.3, i, i);
        }
        for k in 0..40 {
            let t = k as f64 * 0.031;
            let a = list.resolve(t).unwrap();
            let b = list.resolve(t).unwrap();
            assert_eq!(a.lower.index, b.lower.index);
            assert_eq!(a.upper.index, b.upper.index);
            assert_eq!(a.blend, b.blend);
            assert!((0.0..=1.0).contains(&a.blend));
            let rt = a.lower.time * (1.0 - a.blend) + a.upper.time * a.blend;
            if t <= 1.2 {
                assert!((rt - t).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_insert_replaces_same_time() {
        let mut list = TimeSampleList::new();
        list.insert(1.0, 0, 'a');
        list.insert(1.00001, 0, 'b');
        assert_eq!(list.len(), 1);
        assert_eq!(list.first().unwrap().data, 'b');
    }
}
