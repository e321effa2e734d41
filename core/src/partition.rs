//! Contiguous work decomposition.
//!
//! Every worker except the last receives `n_elements / n_workers` elements;
//! the last one also absorbs the remainder. The remainder is never spread
//! over the other workers.

use crate::{Error, Result};
use std::ops::Range;

/// A contiguous `[start, start + len)` slice of a dataset owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition {
    pub rank: usize,
    pub start: usize,
    pub len: usize,
}

impl Partition {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Ordered set of partitions covering `0..total` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTable {
    parts: Vec<Partition>,
    total: usize,
}

impl PartitionTable {
    /// Number of workers (one partition per worker).
    pub fn workers(&self) -> usize {
        self.parts.len()
    }

    /// Number of elements covered by the table.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn get(&self, rank: usize) -> Option<&Partition> {
        self.parts.get(rank)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Partition> {
        self.parts.iter()
    }

    pub fn as_slice(&self) -> &[Partition] {
        &self.parts
    }
}

impl<'a> IntoIterator for &'a PartitionTable {
    type Item = &'a Partition;
    type IntoIter = std::slice::Iter<'a, Partition>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

/// Split `n_elements` into `n_workers` contiguous partitions.
///
/// Fails with [`Error::Configuration`] when `n_workers == 0` or when there are
/// fewer elements than workers, since a zero-length partition would leave a
/// worker with nothing to contribute to the reduction.
pub fn partition(n_elements: usize, n_workers: usize) -> Result<PartitionTable> {
    if n_workers == 0 {
        return Err(Error::Configuration(
            "worker count must be at least 1".into(),
        ));
    }
    if n_elements < n_workers {
        return Err(Error::Configuration(format!(
            "{} workers requested for {} elements; every worker needs a non-empty partition",
            n_workers, n_elements
        )));
    }

    let base = n_elements / n_workers;
    let remainder = n_elements % n_workers;

    let parts = (0..n_workers)
        .map(|rank| {
            let len = if rank == n_workers - 1 {
                base + remainder
            } else {
                base
            };
            Partition {
                rank,
                start: rank * base,
                len,
            }
        })
        .collect();

    Ok(PartitionTable {
        parts,
        total: n_elements,
    })
}
