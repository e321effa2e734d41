use crate::{ImgprocError, Result};
use cv_runtime::Aggregate;
use rayon::prelude::*;

/// Number of distinct intensity levels in an 8-bit image.
pub const GRAY_LEVELS: usize = 256;

const CHUNK: usize = 4096;

/// A sample type that can be counted into a 256-bucket histogram.
pub trait Intensity: Copy + Send + Sync + std::fmt::Debug + 'static {
    /// The 8-bit level of this sample, or `None` if it is out of range.
    fn level(self) -> Option<u8>;
}

impl Intensity for u8 {
    #[inline]
    fn level(self) -> Option<u8> {
        Some(self)
    }
}

impl Intensity for u16 {
    #[inline]
    fn level(self) -> Option<u8> {
        u8::try_from(self).ok()
    }
}

impl Intensity for i32 {
    #[inline]
    fn level(self) -> Option<u8> {
        u8::try_from(self).ok()
    }
}

/// Per-intensity occurrence counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u64; GRAY_LEVELS],
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            counts: [0; GRAY_LEVELS],
        }
    }
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every sample exactly once.
    ///
    /// Samples outside `[0, 255]` are rejected, never clamped or skipped.
    pub fn aggregate<T: Intensity>(samples: &[T]) -> Result<Self> {
        Self::aggregate_at(samples, 0)
    }

    /// [`Histogram::aggregate`] for a partition starting at `offset` in the
    /// full dataset. The error names the lowest offending position.
    pub fn aggregate_at<T: Intensity>(samples: &[T], offset: usize) -> Result<Self> {
        samples
            .par_chunks(CHUNK)
            .try_fold(Histogram::new, |mut local, chunk| -> Option<Histogram> {
                for &sample in chunk {
                    local.counts[sample.level()? as usize] += 1;
                }
                Some(local)
            })
            .try_reduce(Histogram::new, |mut a, b| {
                a.combine(b);
                Some(a)
            })
            .ok_or_else(|| out_of_range(samples, offset))
    }

    pub fn from_counts(counts: [u64; GRAY_LEVELS]) -> Self {
        Self { counts }
    }

    pub fn get(&self, level: u8) -> u64 {
        self.counts[level as usize]
    }

    pub fn counts(&self) -> &[u64; GRAY_LEVELS] {
        &self.counts
    }

    /// Total number of samples counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

impl Aggregate for Histogram {
    fn identity() -> Self {
        Self::new()
    }

    fn combine(&mut self, other: Self) {
        for (a, b) in self.counts.iter_mut().zip(other.counts.iter()) {
            *a += b;
        }
    }
}

/// Error for the first sample of `samples` outside `[0, 255]`.
pub(crate) fn out_of_range<T: Intensity>(samples: &[T], offset: usize) -> ImgprocError {
    match samples.iter().position(|s| s.level().is_none()) {
        Some(i) => ImgprocError::DataIntegrity(format!(
            "sample {:?} at offset {} is outside [0, 255]",
            samples[i],
            offset + i
        )),
        None => ImgprocError::DataIntegrity("sample outside [0, 255]".into()),
    }
}

/// Running total of a histogram: `cdf[v] = sum(hist[0..=v])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cdf {
    cumulative: [u64; GRAY_LEVELS],
}

impl Cdf {
    /// Single left-to-right prefix sum over the 256 buckets.
    pub fn from_histogram(hist: &Histogram) -> Self {
        let mut cumulative = [0u64; GRAY_LEVELS];
        let mut running = 0u64;
        for (slot, &count) in cumulative.iter_mut().zip(hist.counts.iter()) {
            running += count;
            *slot = running;
        }
        Self { cumulative }
    }

    pub fn get(&self, level: u8) -> u64 {
        self.cumulative[level as usize]
    }

    /// Equal to the number of samples in the source histogram.
    pub fn total(&self) -> u64 {
        self.cumulative[GRAY_LEVELS - 1]
    }

    pub fn as_slice(&self) -> &[u64; GRAY_LEVELS] {
        &self.cumulative
    }
}
