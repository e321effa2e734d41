//! Reduction and broadcast over per-worker stage results.
//!
//! All reductions run on the coordinator after the stage barrier, over
//! contributions ordered by rank, so a given worker count always combines in
//! the same order.

use crate::executor::StageReport;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

/// A per-worker partial result that can be merged into a global one.
///
/// `combine` must be associative and commutative.
pub trait Aggregate: Sized {
    fn identity() -> Self;

    fn combine(&mut self, other: Self);
}

/// How the coordinator folds local aggregates into the global one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReduceStrategy {
    /// Coordinator receives from rank 0, 1, ... in turn and accumulates.
    PointToPoint,
    /// Pairwise combine of neighbouring ranks, halving the set each round.
    #[default]
    Tree,
}

/// Fold `locals` (ordered by rank) into one aggregate.
pub fn reduce<A: Aggregate>(locals: Vec<A>, strategy: ReduceStrategy) -> A {
    match strategy {
        ReduceStrategy::PointToPoint => {
            locals.into_iter().fold(A::identity(), |mut acc, local| {
                acc.combine(local);
                acc
            })
        }
        ReduceStrategy::Tree => tree_reduce(locals),
    }
}

fn tree_reduce<A: Aggregate>(mut level: Vec<A>) -> A {
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut iter = level.into_iter();
        while let Some(mut left) = iter.next() {
            if let Some(right) = iter.next() {
                left.combine(right);
            }
            next.push(left);
        }
        level = next;
    }
    level.pop().unwrap_or_else(A::identity)
}

/// Reduce the values of a finished stage.
pub fn reduce_reports<A: Aggregate>(reports: Vec<StageReport<A>>, strategy: ReduceStrategy) -> A {
    reduce(reports.into_iter().map(|r| r.value).collect(), strategy)
}

/// Scalar floating-point sum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sum(pub f64);

impl Aggregate for Sum {
    fn identity() -> Self {
        Sum(0.0)
    }

    fn combine(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Longest elapsed time seen so far and the rank that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaxElapsed {
    pub rank: usize,
    pub elapsed: Duration,
}

impl Aggregate for MaxElapsed {
    fn identity() -> Self {
        Self::default()
    }

    fn combine(&mut self, other: Self) {
        // Ties keep the lower rank so the answer does not depend on order.
        if other.elapsed > self.elapsed
            || (other.elapsed == self.elapsed && other.rank < self.rank)
        {
            *self = other;
        }
    }
}

/// Slowest worker of a stage. Diagnostic only.
pub fn slowest_worker<R>(reports: &[StageReport<R>]) -> MaxElapsed {
    let timings = reports
        .iter()
        .map(|r| MaxElapsed {
            rank: r.rank,
            elapsed: r.elapsed,
        })
        .collect();
    reduce(timings, ReduceStrategy::Tree)
}

/// A value produced once by the coordinator and then shared read-only.
#[derive(Debug)]
pub struct Broadcast<T>(Arc<T>);

impl<T> Broadcast<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Broadcast<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}
