pub mod collective;
pub mod executor;
pub mod worker;

pub use collective::{
    reduce, reduce_reports, slowest_worker, Aggregate, Broadcast, MaxElapsed, ReduceStrategy, Sum,
};
pub use executor::{StageReport, WorkerGroup};
pub use worker::{Role, WorkerContext, COORDINATOR_RANK};

pub use cv_core::{Error, Result};
