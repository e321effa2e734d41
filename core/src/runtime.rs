use crate::{Error, Result};
use rayon::ThreadPoolBuilder;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

pub const CPU_THREADS_ENV: &str = "RUSTCV_CPU_THREADS";
pub const WORKERS_ENV: &str = "RUSTCV_WORKERS";
pub const BARRIER_TIMEOUT_ENV: &str = "RUSTCV_BARRIER_TIMEOUT_MS";

pub const DEFAULT_BARRIER_TIMEOUT: Duration = Duration::from_secs(30);

static THREAD_POOL_INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Initialize the global Rayon thread pool used by coordinator-side work.
///
/// Priority:
/// 1. `num_threads` argument
/// 2. `RUSTCV_CPU_THREADS` environment variable
/// 3. Rayon default
///
/// Repeated calls return the result of the first initialization.
pub fn init_global_thread_pool(num_threads: Option<usize>) -> Result<()> {
    let res = THREAD_POOL_INIT.get_or_init(|| {
        let configured_threads = match num_threads {
            Some(n) => Some(n),
            None => read_positive_env(CPU_THREADS_ENV).map_err(|e| e.to_string())?,
        };

        let mut builder = ThreadPoolBuilder::new();
        if let Some(n) = configured_threads {
            if n == 0 {
                return Err(format!("{CPU_THREADS_ENV} must be >= 1"));
            }
            builder = builder.num_threads(n);
        }

        builder.build_global().map_err(|e| e.to_string())
    });
    res.clone().map_err(Error::Configuration)
}

pub fn current_cpu_threads() -> usize {
    rayon::current_num_threads()
}

/// Settings fixed for the lifetime of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Number of cooperating workers, one partition each.
    pub workers: usize,
    /// Upper bound on how long the coordinator waits at a barrier.
    pub barrier_timeout: Duration,
    /// Benchmark multiplier for the per-worker transform. Never changes output.
    pub repeat: u32,
    /// Threads each worker fans out to inside a stage. `None` keeps the
    /// worker's parallel loops on the group pool.
    pub cpu_threads: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: current_cpu_threads().max(1),
            barrier_timeout: DEFAULT_BARRIER_TIMEOUT,
            repeat: 1,
            cpu_threads: None,
        }
    }
}

impl RunConfig {
    /// Defaults overridden by `RUSTCV_WORKERS`, `RUSTCV_BARRIER_TIMEOUT_MS`
    /// and `RUSTCV_CPU_THREADS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.cpu_threads = read_positive_env(CPU_THREADS_ENV)?;
        if let Some(workers) = read_positive_env(WORKERS_ENV)? {
            config.workers = workers;
        }
        if let Some(ms) = read_positive_env(BARRIER_TIMEOUT_ENV)? {
            config.barrier_timeout = Duration::from_millis(ms as u64);
        }
        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_barrier_timeout(mut self, timeout: Duration) -> Self {
        self.barrier_timeout = timeout;
        self
    }

    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_cpu_threads(mut self, threads: usize) -> Self {
        self.cpu_threads = Some(threads);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Configuration("worker count must be >= 1".into()));
        }
        if self.barrier_timeout.is_zero() {
            return Err(Error::Configuration("barrier timeout must be non-zero".into()));
        }
        if self.repeat == 0 {
            return Err(Error::Configuration("repeat multiplier must be >= 1".into()));
        }
        if self.cpu_threads == Some(0) {
            return Err(Error::Configuration("cpu thread count must be >= 1".into()));
        }
        Ok(())
    }
}

fn read_positive_env(key: &str) -> Result<Option<usize>> {
    let raw = match env::var(key) {
        Ok(v) => v,
        Err(env::VarError::NotPresent) => return Ok(None),
        Err(e) => return Err(Error::Configuration(format!("failed to read {key}: {e}"))),
    };

    let parsed: usize = raw.trim().parse().map_err(|_| {
        Error::Configuration(format!("{key} must be a positive integer, got '{raw}'"))
    })?;
    if parsed == 0 {
        return Err(Error::Configuration(format!("{key} must be >= 1")));
    }
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        RunConfig::default().validate().unwrap();
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = RunConfig::default().with_workers(0).validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_zero_repeat_rejected() {
        let err = RunConfig::default().with_repeat(0).validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_zero_cpu_threads_rejected() {
        let err = RunConfig::default().with_cpu_threads(0).validate().unwrap_err();
        assert!(err.is_configuration());
        RunConfig::default().with_cpu_threads(3).validate().unwrap();
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = RunConfig::default()
            .with_barrier_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
