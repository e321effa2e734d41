pub use cv_core as core;
pub use cv_imgproc as imgproc;
pub use cv_io as io;
pub use cv_runtime as runtime;
pub use cv_scientific as scientific;

/// Initialize the global Rayon thread pool used outside worker groups.
///
/// Call this once at application startup, before building worker groups.
/// Repeated calls are idempotent and return the first initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `RUSTCV_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> cv_core::Result<()> {
    cv_core::init_global_thread_pool(num_threads)
}

/// Load `input`, equalize it on `group` and write the result to `output`.
///
/// Nothing is written unless every stage succeeded.
pub fn equalize_file(
    group: &cv_runtime::WorkerGroup,
    input: &std::path::Path,
    output: &std::path::Path,
    options: cv_imgproc::EqualizeOptions,
) -> cv_core::Result<cv_imgproc::Equalized> {
    let frame = cv_io::load_gray(input)?;
    let metadata = frame.metadata;
    let result = cv_imgproc::equalize_partitioned(group, frame.pixels, options)?;
    cv_io::store_gray(output, &metadata, result.pixels.as_slice())?;
    Ok(result)
}
