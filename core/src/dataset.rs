use crate::partition::PartitionTable;
use crate::{Error, Result};

/// An ordered, fixed-length buffer owned by the coordinator until scattered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset<T> {
    elements: Vec<T>,
}

impl<T> Dataset<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    pub fn into_inner(self) -> Vec<T> {
        self.elements
    }

    /// Move each partition's elements into its own segment, indexed by rank.
    pub fn scatter(self, table: &PartitionTable) -> Result<Vec<Vec<T>>> {
        if table.total() != self.elements.len() {
            return Err(Error::Configuration(format!(
                "partition table covers {} elements but dataset holds {}",
                table.total(),
                self.elements.len()
            )));
        }

        let mut segments = Vec::with_capacity(table.workers());
        let mut rest = self.elements;
        // Split from the back so each split_off only moves the tail segment.
        for part in table.iter().rev() {
            segments.push(rest.split_off(part.start));
        }
        segments.reverse();
        Ok(segments)
    }

    /// Reassemble per-worker segments into one dataset ordered by partition.
    ///
    /// `segments[rank]` must hold exactly `table.get(rank).len` elements.
    pub fn gather(segments: Vec<Vec<T>>, table: &PartitionTable) -> Result<Self> {
        if segments.len() != table.workers() {
            return Err(Error::Configuration(format!(
                "expected {} output segments, got {}",
                table.workers(),
                segments.len()
            )));
        }

        let mut elements = Vec::with_capacity(table.total());
        for (part, segment) in table.iter().zip(segments) {
            if segment.len() != part.len {
                return Err(Error::Configuration(format!(
                    "worker {} returned {} elements for a partition of {}",
                    part.rank,
                    segment.len(),
                    part.len
                )));
            }
            debug_assert_eq!(elements.len(), part.start);
            elements.extend(segment);
        }

        Ok(Self { elements })
    }
}

impl<T> From<Vec<T>> for Dataset<T> {
    fn from(elements: Vec<T>) -> Self {
        Self::new(elements)
    }
}
