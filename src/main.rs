use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cv_scatter::core::RunConfig;
use cv_scatter::imgproc::{Cdf, EqualizeOptions, Histogram, RemapFormula};
use cv_scatter::runtime::{ReduceStrategy, WorkerGroup};
use cv_scatter::scientific::{leibniz_partitioned, SeriesRange};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Partitioned histogram equalization and series summation
#[derive(Parser)]
#[command(name = "cv-scatter", version)]
struct Cli {
    /// Enable verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Number of workers (defaults to RUSTCV_WORKERS, then the CPU count)
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Longest time to wait for all workers at a barrier, in milliseconds
    #[arg(long, global = true)]
    barrier_timeout_ms: Option<u64>,

    /// Threads each worker fans out to (defaults to RUSTCV_CPU_THREADS)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Equalize an 8-bit grayscale image
    Equalize {
        input: PathBuf,
        output: PathBuf,

        /// `legacy` truncates like the original tool for byte-identical output
        #[arg(long, value_enum, default_value = "scaled")]
        formula: FormulaArg,

        #[arg(long, value_enum, default_value = "tree")]
        reduce: ReduceArg,

        /// Run each worker's remap this many times (timing experiments only)
        #[arg(long, default_value = "1")]
        repeat: u32,
    },
    /// Estimate pi with the Leibniz series over [lower, upper)
    Sum {
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        lower: i64,

        #[arg(long)]
        upper: i64,

        #[arg(long, value_enum, default_value = "tree")]
        reduce: ReduceArg,
    },
    /// Print the 256-bucket histogram of an image
    Histogram {
        input: PathBuf,

        /// Print running totals instead of counts
        #[arg(long)]
        cumulative: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormulaArg {
    Scaled,
    Legacy,
}

impl From<FormulaArg> for RemapFormula {
    fn from(arg: FormulaArg) -> Self {
        match arg {
            FormulaArg::Scaled => RemapFormula::Scaled,
            FormulaArg::Legacy => RemapFormula::Legacy,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReduceArg {
    Tree,
    PointToPoint,
}

impl From<ReduceArg> for ReduceStrategy {
    fn from(arg: ReduceArg) -> Self {
        match arg {
            ReduceArg::Tree => ReduceStrategy::Tree,
            ReduceArg::PointToPoint => ReduceStrategy::PointToPoint,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_thread_names(verbose >= 3)
        .with_writer(std::io::stderr)
        .init();
}

fn run_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = RunConfig::from_env().context("invalid run configuration")?;
    if let Some(workers) = cli.workers {
        config = config.with_workers(workers);
    }
    if let Some(threads) = cli.threads {
        config = config.with_cpu_threads(threads);
    }
    if let Some(ms) = cli.barrier_timeout_ms {
        config = config.with_barrier_timeout(Duration::from_millis(ms));
    }
    if let Commands::Equalize { repeat, .. } = &cli.command {
        config = config.with_repeat(*repeat);
    }
    config.validate().context("invalid run configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    cv_scatter::init_thread_pool(cli.threads).context("failed to build the thread pool")?;
    let config = run_config(&cli)?;
    debug!(?config, "run configuration");

    match &cli.command {
        Commands::Equalize {
            input,
            output,
            formula,
            reduce,
            ..
        } => {
            let group = WorkerGroup::from_config(&config, "equalize")?;
            let options = EqualizeOptions {
                formula: (*formula).into(),
                reduce: (*reduce).into(),
                repeat: config.repeat,
            };
            let result = cv_scatter::equalize_file(&group, input, output, options)
                .with_context(|| format!("failed to equalize {}", input.display()))?;
            println!(
                "equalized {} pixels on {} workers -> {}",
                result.pixels.len(),
                group.workers(),
                output.display()
            );
            println!(
                "time elapsed: {:.6} sec (worker {})",
                result.slowest.elapsed.as_secs_f64(),
                result.slowest.rank
            );
        }
        Commands::Sum {
            lower,
            upper,
            reduce,
        } => {
            let group = WorkerGroup::from_config(&config, "sum")?;
            let range = SeriesRange::new(*lower, *upper).context("invalid summation bounds")?;
            let report = leibniz_partitioned(&group, range, (*reduce).into())
                .context("summation failed")?;
            println!("{:.15}", report.value);
            println!(
                "time elapsed: {:.6} sec (worker {})",
                report.slowest.elapsed.as_secs_f64(),
                report.slowest.rank
            );
        }
        Commands::Histogram { input, cumulative } => {
            let frame = cv_scatter::io::load_gray(input)
                .with_context(|| format!("failed to load {}", input.display()))?;
            let histogram = Histogram::aggregate(frame.pixels.as_slice())?;
            if *cumulative {
                let cdf = Cdf::from_histogram(&histogram);
                for (level, total) in cdf.as_slice().iter().enumerate() {
                    println!("{}: {}", level, total);
                }
            } else {
                for (level, count) in histogram.counts().iter().enumerate() {
                    println!("{}: {}", level, count);
                }
            }
        }
    }

    Ok(())
}
