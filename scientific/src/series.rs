//! Partitioned summation of the Leibniz series.
//!
//! `pi = 4 * sum_{i >= 0} (-1)^i / (2i + 1)`. The index range is split
//! across workers exactly like a pixel buffer; each worker sums its own
//! sub-range and the coordinator reduces the partial sums and applies the
//! factor of 4.

use crate::{Error, Result};
use cv_core::{partition, PartitionTable};
use cv_runtime::{reduce_reports, slowest_worker, MaxElapsed, ReduceStrategy, Sum, WorkerGroup};
use tracing::info;

/// Scaling that turns the raw series sum into an estimate of pi.
pub const LEIBNIZ_SCALE: f64 = 4.0;

/// Half-open index range `[lower, upper)`.
///
/// The number of terms always fits in both `i64` and `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesRange {
    lower: i64,
    upper: i64,
    len: usize,
}

impl SeriesRange {
    pub fn new(lower: i64, upper: i64) -> Result<Self> {
        if lower > upper {
            return Err(Error::DataIntegrity(format!(
                "summation lower limit {} exceeds upper limit {}",
                lower, upper
            )));
        }
        let len = upper
            .checked_sub(lower)
            .and_then(|span| usize::try_from(span).ok())
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "summation range [{}, {}) holds more terms than can be indexed",
                    lower, upper
                ))
            })?;
        Ok(Self { lower, upper, len })
    }

    pub fn lower(&self) -> i64 {
        self.lower
    }

    pub fn upper(&self) -> i64 {
        self.upper
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[inline]
pub fn leibniz_term(i: i64) -> f64 {
    let sign = if i.rem_euclid(2) == 0 { 1.0 } else { -1.0 };
    sign / (2.0 * i as f64 + 1.0)
}

/// `sum_{i=lower}^{upper-1} (-1)^i / (2i + 1)`, accumulated in increasing `i`.
pub fn aggregate_sum(lower: i64, upper: i64) -> Result<f64> {
    let range = SeriesRange::new(lower, upper)?;
    let mut result = 0.0;
    for i in range.lower..range.upper {
        result += leibniz_term(i);
    }
    Ok(result)
}

/// Final value reported by the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct SumReport {
    /// `LEIBNIZ_SCALE` times the reduced sum.
    pub value: f64,
    pub raw_sum: f64,
    pub partitions: PartitionTable,
    /// Slowest worker of the local summation stage.
    pub slowest: MaxElapsed,
}

/// Sum the series over `range` on every worker of `group`.
pub fn leibniz_partitioned(
    group: &WorkerGroup,
    range: SeriesRange,
    strategy: ReduceStrategy,
) -> Result<SumReport> {
    let partitions = partition(range.len(), group.workers())?;
    info!(lower = range.lower, upper = range.upper, workers = group.workers(), "summing series");

    let bounds: Vec<(i64, i64)> = partitions
        .iter()
        .map(|p| {
            let start = range.lower + p.start as i64;
            (start, start + p.len as i64)
        })
        .collect();

    let reports = group.run_stage("leibniz", bounds, |_, (lower, upper)| {
        aggregate_sum(lower, upper).map(Sum)
    })?;

    let slowest = slowest_worker(&reports);
    let raw_sum = reduce_reports(reports, strategy).0;
    info!(raw_sum, slowest_rank = slowest.rank, "series reduced");

    Ok(SumReport {
        value: raw_sum * LEIBNIZ_SCALE,
        raw_sum,
        partitions,
        slowest,
    })
}

/// Single-worker reference: `4 * aggregate_sum(lower, upper)`.
pub fn leibniz_serial(range: SeriesRange) -> Result<f64> {
    Ok(aggregate_sum(range.lower, range.upper)? * LEIBNIZ_SCALE)
}
