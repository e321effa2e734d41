use crate::worker::WorkerContext;
use crate::{Error, Result};
use cv_core::RunConfig;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What one worker handed back from a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport<R> {
    pub rank: usize,
    pub value: R,
    pub elapsed: Duration,
}

type Delivery<R> = (usize, Result<R>, Duration);

/// A fixed set of workers backed by a private thread pool.
///
/// The group size is chosen once at construction and never changes. Each
/// stage runs one job per worker and only returns once every worker has
/// reported, which makes [`WorkerGroup::run_stage`] the barrier between stages.
///
/// Rayon loops inside a stage run on the pool of the calling thread. With
/// [`WorkerGroup::with_compute_threads`] they run on a separate pool of the
/// given size instead of the group pool.
#[derive(Debug)]
pub struct WorkerGroup {
    workers: usize,
    barrier_timeout: Duration,
    pool: rayon::ThreadPool,
    compute: Option<Arc<rayon::ThreadPool>>,
    inflight_jobs: Arc<AtomicUsize>,
}

impl WorkerGroup {
    pub fn new(workers: usize, barrier_timeout: Duration, name: &str) -> Result<Self> {
        if workers == 0 {
            return Err(Error::Configuration(
                "a worker group needs at least one worker".into(),
            ));
        }
        if barrier_timeout.is_zero() {
            return Err(Error::Configuration("barrier timeout must be non-zero".into()));
        }

        let name_clone = name.to_string();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |idx| format!("{}-{}", name_clone, idx))
            .build()
            .map_err(|e| Error::RuntimeError(format!("Failed to build worker pool: {}", e)))?;

        Ok(Self {
            workers,
            barrier_timeout,
            pool,
            compute: None,
            inflight_jobs: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn from_config(config: &RunConfig, name: &str) -> Result<Self> {
        config.validate()?;
        let group = Self::new(config.workers, config.barrier_timeout, name)?;
        match config.cpu_threads {
            Some(threads) => group.with_compute_threads(threads),
            None => Ok(group),
        }
    }

    /// Run the parallel loops of every stage on a pool of `threads` threads.
    pub fn with_compute_threads(mut self, threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::Configuration("cpu thread count must be >= 1".into()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("cv-compute-{}", idx))
            .build()
            .map_err(|e| Error::RuntimeError(format!("Failed to build compute pool: {}", e)))?;
        self.compute = Some(Arc::new(pool));
        Ok(self)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Jobs spawned by this group that have not finished yet.
    pub fn load(&self) -> usize {
        self.inflight_jobs.load(Ordering::Relaxed)
    }

    /// Run `f` once per worker, handing `inputs[rank]` to worker `rank`.
    ///
    /// Returns the reports ordered by rank. The first worker error, a worker
    /// panic, or a worker that has not reported before the barrier timeout
    /// fails the whole stage.
    pub fn run_stage<S, R, F>(
        &self,
        stage: &str,
        inputs: Vec<S>,
        f: F,
    ) -> Result<Vec<StageReport<R>>>
    where
        S: Send + 'static,
        R: Send + 'static,
        F: Fn(&WorkerContext, S) -> Result<R> + Send + Sync + 'static,
    {
        if inputs.len() != self.workers {
            return Err(Error::Configuration(format!(
                "stage '{}' received {} inputs for {} workers",
                stage,
                inputs.len(),
                self.workers
            )));
        }

        let f = Arc::new(f);
        let (tx, rx) = mpsc::channel::<Delivery<R>>();

        for (rank, input) in inputs.into_iter().enumerate() {
            let ctx = WorkerContext::new(rank, self.workers);
            let f = f.clone();
            let tx = tx.clone();
            let compute = self.compute.clone();
            self.spawn(move || {
                let start = Instant::now();
                let body = || match &compute {
                    Some(pool) => pool.install(|| f(&ctx, input)),
                    None => f(&ctx, input),
                };
                let outcome = catch_unwind(AssertUnwindSafe(body))
                    .unwrap_or_else(|_| Err(Error::RuntimeError("worker panicked".into())));
                // The coordinator may already have given up on this stage.
                let _ = tx.send((rank, outcome, start.elapsed()));
            });
        }
        drop(tx);

        self.await_barrier(stage, rx)
    }

    fn await_barrier<R>(
        &self,
        stage: &str,
        rx: mpsc::Receiver<Delivery<R>>,
    ) -> Result<Vec<StageReport<R>>> {
        let started = Instant::now();
        let deadline = started + self.barrier_timeout;
        let mut slots: Vec<Option<StageReport<R>>> = (0..self.workers).map(|_| None).collect();
        let mut received = 0;

        while received < self.workers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((rank, Ok(value), elapsed)) => {
                    debug!(stage, rank, ?elapsed, "worker reached barrier");
                    slots[rank] = Some(StageReport { rank, value, elapsed });
                    received += 1;
                }
                Ok((rank, Err(source), _)) => {
                    warn!(stage, rank, error = %source, "worker failed");
                    return Err(Error::WorkerFailed {
                        rank,
                        source: Box::new(source),
                    });
                }
                Err(RecvTimeoutError::Timeout) => {
                    let missing = missing_ranks(&slots);
                    warn!(stage, ?missing, "barrier timed out");
                    return Err(Error::BarrierTimeout {
                        missing,
                        waited: started.elapsed(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::RuntimeError(format!(
                        "stage '{}' lost workers {:?} without a report",
                        stage,
                        missing_ranks(&slots)
                    )));
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let inflight = self.inflight_jobs.clone();
        inflight.fetch_add(1, Ordering::SeqCst);

        self.pool.spawn(move || {
            struct JobGuard(Arc<AtomicUsize>);
            impl Drop for JobGuard {
                fn drop(&mut self) {
                    self.0.fetch_sub(1, Ordering::SeqCst);
                }
            }
            let _guard = JobGuard(inflight);
            f();
        });
    }
}

fn missing_ranks<R>(slots: &[Option<StageReport<R>>]) -> Vec<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_none())
        .map(|(rank, _)| rank)
        .collect()
}
