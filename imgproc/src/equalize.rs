//! Partitioned histogram equalization.
//!
//! Stage 1 scatters the pixels and every worker counts its own partition.
//! The coordinator waits for all counts, reduces them into the global
//! histogram, derives the CDF and remap table, and broadcasts the table.
//! Stage 2 remaps every partition independently and the coordinator gathers
//! the results back into pixel order.

use crate::histogram::{out_of_range, Cdf, Histogram, Intensity, GRAY_LEVELS};
use crate::remap::{RemapFormula, RemapTable};
use crate::{ImgprocError, Result};
use cv_core::{partition, Dataset, PartitionTable};
use cv_runtime::{
    reduce_reports, slowest_worker, Broadcast, MaxElapsed, ReduceStrategy, StageReport, WorkerGroup,
};
use image::GrayImage;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualizeOptions {
    pub formula: RemapFormula,
    pub reduce: ReduceStrategy,
    /// Number of times each worker runs its remap; output is unaffected.
    pub repeat: u32,
}

impl Default for EqualizeOptions {
    fn default() -> Self {
        Self {
            formula: RemapFormula::default(),
            reduce: ReduceStrategy::default(),
            repeat: 1,
        }
    }
}

/// Everything one equalization run produced.
#[derive(Debug, Clone)]
pub struct Equalized {
    pub pixels: Dataset<u8>,
    pub histogram: Histogram,
    pub cdf: Cdf,
    pub table: RemapTable,
    pub partitions: PartitionTable,
    /// Slowest worker of the remap stage.
    pub slowest: MaxElapsed,
}

/// Equalize `dataset` across every worker of `group`.
pub fn equalize_partitioned<T: Intensity>(
    group: &WorkerGroup,
    dataset: Dataset<T>,
    options: EqualizeOptions,
) -> Result<Equalized> {
    if options.repeat == 0 {
        return Err(ImgprocError::Configuration(
            "repeat multiplier must be >= 1".into(),
        ));
    }

    let elements = dataset.len();
    let partitions = partition(elements, group.workers())?;
    info!(elements, workers = group.workers(), "equalizing");

    let segments = dataset.scatter(&partitions)?;
    let starts: Arc<Vec<usize>> = Arc::new(partitions.iter().map(|p| p.start).collect());

    // Each worker keeps ownership of its segment across the barrier.
    let offsets = Arc::clone(&starts);
    let counted = group.run_stage("histogram", segments, move |ctx, segment: Vec<T>| {
        debug!(rank = ctx.rank, role = %ctx.role, len = segment.len(), "counting partition");
        let local = Histogram::aggregate_at(&segment, offsets[ctx.rank])?;
        Ok((segment, local))
    })?;

    let (segments, locals): (Vec<_>, Vec<_>) = counted
        .into_iter()
        .map(|report| {
            let (segment, local) = report.value;
            (
                segment,
                StageReport {
                    rank: report.rank,
                    value: local,
                    elapsed: report.elapsed,
                },
            )
        })
        .unzip();

    let histogram = reduce_reports(locals, options.reduce);
    if histogram.total() != elements as u64 {
        return Err(ImgprocError::DataIntegrity(format!(
            "global histogram counts {} samples, dataset holds {}",
            histogram.total(),
            elements
        )));
    }
    let cdf = Cdf::from_histogram(&histogram);
    let table = Broadcast::new(RemapTable::from_cdf(&cdf, options.formula));
    debug!(total = cdf.total(), "global histogram reduced");

    let shared = table.clone();
    let repeat = options.repeat;
    let remapped = group.run_stage("remap", segments, move |ctx, segment: Vec<T>| {
        let mut out = Vec::new();
        for _ in 0..repeat {
            out = remap_segment(&segment, &shared, starts[ctx.rank])?;
        }
        Ok(out)
    })?;

    let slowest = slowest_worker(&remapped);
    let outputs = remapped.into_iter().map(|r| r.value).collect();
    let pixels = Dataset::gather(outputs, &partitions)?;
    info!(slowest_rank = slowest.rank, elapsed = ?slowest.elapsed, "equalization gathered");

    Ok(Equalized {
        pixels,
        histogram,
        cdf,
        table: (*table).clone(),
        partitions,
        slowest,
    })
}

fn remap_segment<T: Intensity>(
    segment: &[T],
    table: &RemapTable,
    offset: usize,
) -> Result<Vec<u8>> {
    segment
        .par_iter()
        .map(|&sample| sample.level().map(|level| table.apply(level)))
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| out_of_range(segment, offset))
}

/// Single-pass reference equalization with no workers involved.
pub fn equalize_serial<T: Intensity>(samples: &[T], formula: RemapFormula) -> Result<Vec<u8>> {
    let levels = samples
        .iter()
        .map(|&sample| sample.level())
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| out_of_range(samples, 0))?;

    let mut counts = [0u64; GRAY_LEVELS];
    for &level in &levels {
        counts[level as usize] += 1;
    }
    let cdf = Cdf::from_histogram(&Histogram::from_counts(counts));
    let table = RemapTable::from_cdf(&cdf, formula);
    Ok(levels.into_iter().map(|level| table.apply(level)).collect())
}

/// Equalize a grayscale image on `group`, keeping its dimensions.
pub fn equalize_image(
    group: &WorkerGroup,
    image: &GrayImage,
    options: EqualizeOptions,
) -> Result<GrayImage> {
    crate::validate_image_size(image.width(), image.height())?;
    let (width, height) = image.dimensions();
    let result = equalize_partitioned(group, Dataset::new(image.as_raw().clone()), options)?;
    GrayImage::from_raw(width, height, result.pixels.into_inner()).ok_or_else(|| {
        ImgprocError::Configuration("equalized buffer does not match image dimensions".into())
    })
}
