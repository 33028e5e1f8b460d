use cachemark::config::BenchConfig;
use cachemark::errors::BenchError;
use cachemark::runner;
use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Clone, ValueEnum, Debug)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "cachemark")]
#[command(version = "0.1.0")]
#[command(about = "Benchmark direct CSV reads against dataframe cache build and read times", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase logging verbosity (Info -> Debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Silence logs and progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format (text or json)
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Path to a benchmark config YAML file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the dataset resolved from the local hub cache
    Dataset {
        /// Remove the dataset's hub entry instead
        #[arg(long)]
        clear: bool,
    },
    /// Single-shot cache build vs cache read comparison
    Basic,
    /// Compare direct read, cache build, and cache read times over
    /// log-spaced row-count samples
    Benchmark {
        /// Number of repetitions per sample (overrides the config file)
        #[arg(long, value_name = "N")]
        runs: Option<usize>,

        /// Write the aggregated report to a JSON file
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // CACHEMARK_LOG takes precedence over CLI verbosity
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("CACHEMARK_LOG")
        .from_env_lossy();

    let run_id = Uuid::new_v4();

    match cli.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_span_list(false)
                .with_current_span(false)
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    let _span = tracing::info_span!("root", run_id = %run_id).entered();

    let config = BenchConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Dataset { clear } => {
            if *clear {
                runner::run_dataset_clear(&config)?;
            } else {
                runner::run_dataset_summary(&config)?;
            }
        }
        Commands::Basic => {
            runner::run_basic(&config, cli.quiet)?;
        }
        Commands::Benchmark { runs, export } => {
            let runs = (*runs).unwrap_or(config.repeat).max(1);
            let report = runner::run_benchmark(&config, runs, cli.quiet)?;

            println!("\n{}", report.render()?);

            if let Some(path) = export {
                std::fs::write(path, report.to_json(run_id)?).map_err(BenchError::IoError)?;
                tracing::info!("wrote report to {:?}", path);
            }
        }
    }

    Ok(())
}
