pub mod dataset;
pub mod error;
pub mod partition;
pub mod runtime;

pub use dataset::Dataset;
pub use error::{Error, Result};
pub use partition::{partition, Partition, PartitionTable};
pub use runtime::{current_cpu_threads, init_global_thread_pool, RunConfig};
