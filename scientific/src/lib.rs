//! Numeric workloads that share the scatter/reduce skeleton.
//!
//! - [`series`]: partitioned Leibniz summation
//!
//! ## Example
//!
//! ```rust
//! use cv_runtime::{ReduceStrategy, WorkerGroup};
//! use cv_scientific::series::{leibniz_partitioned, SeriesRange};
//! use std::time::Duration;
//!
//! let group = WorkerGroup::new(4, Duration::from_secs(5), "doc").unwrap();
//! let range = SeriesRange::new(0, 100_000).unwrap();
//! let report = leibniz_partitioned(&group, range, ReduceStrategy::Tree).unwrap();
//! assert!((report.value - std::f64::consts::PI).abs() < 1e-4);
//! ```

pub mod series;

pub use series::*;

pub use cv_core::{Error, Result};
