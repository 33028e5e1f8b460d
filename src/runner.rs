//! Orchestration of the benchmark scenarios: direct read, cache build, and
//! cache read, with cache state transitions between them.

use crate::bench::{run_trials, ScenarioTiming};
use crate::cache::{CacheState, CachedReader};
use crate::config::BenchConfig;
use crate::errors::{BenchError, BenchResult};
use crate::hub;
use crate::io;
use crate::progress::{spinner, ScenarioBar};
use crate::report::{human_bytes, BenchmarkReport};
use anyhow::anyhow;
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Compare direct read, cache build, and cache read times over the dataset's
/// chunk sequence, `runs` samples per chunk.
pub fn run_benchmark(config: &BenchConfig, runs: usize, quiet: bool) -> BenchResult<BenchmarkReport> {
    let file = hub::locate_dataset(&config.hub_dir, &config.dataset)?;
    info!(
        "benchmarking {:?} ({} lines)",
        file.path(),
        file.lines()?
    );
    let chunk_count = file.chunks()?.len();

    let cache_config = config.cache();
    let cache = CachedReader::new(&cache_config, |p: &Path, n| io::read_csv(p, n));
    let state = CacheState::new(&cache_config);

    let mut scenarios: Vec<ScenarioTiming> = Vec::with_capacity(3);

    // Direct parse from the source file; the cache is not involved.
    let mut bar = ScenarioBar::new("read_data", chunk_count, quiet)?;
    scenarios.push(run_trials(
        "read_data",
        &file,
        runs,
        |rows| io::read_csv(file.path(), Some(rows as usize)).map(|_| ()),
        None,
        &mut bar,
    )?);

    cache.clear()?;

    // Every build must start cold: the setup hook hides the artifact written
    // by the previous invocation before the next one is timed. The guard
    // brings all artifacts back even if a trial errors out.
    {
        let _guard = state.restore_on_drop();
        let mut bar = ScenarioBar::new("build_cache", chunk_count, quiet)?;
        let mut setup = || state.isolate();
        scenarios.push(run_trials(
            "build_cache",
            &file,
            runs,
            |rows| cache.call(&file, Some(rows as usize)).map(|_| ()),
            Some(&mut setup),
            &mut bar,
        )?);
    }

    // Cache fully populated by the restored build artifacts.
    let mut bar = ScenarioBar::new("read_cache", chunk_count, quiet)?;
    scenarios.push(run_trials(
        "read_cache",
        &file,
        runs,
        |rows| cache.call(&file, Some(rows as usize)).map(|_| ()),
        None,
        &mut bar,
    )?);

    cache.clear()?;

    BenchmarkReport::assemble(&scenarios)
}

/// Single-shot comparison of one full cache build against one cache read.
pub fn run_basic(config: &BenchConfig, quiet: bool) -> BenchResult<()> {
    let file = hub::locate_dataset(&config.hub_dir, &config.dataset)?;
    let cache_config = config.cache();
    let cache = CachedReader::new(&cache_config, |p: &Path, n| io::read_csv(p, n));

    let sp = spinner("read cache", quiet)?;

    cache.clear()?;
    sp.println("> cache cleared");

    let clock = Instant::now();
    cache.call(&file, None)?;
    let build_seconds = clock.elapsed().as_secs_f64();
    sp.println("> cache built");

    let clock = Instant::now();
    let read = cache.call(&file, None)?;
    let read_seconds = clock.elapsed().as_secs_f64();
    sp.finish_with_message("!");

    let artifact = read
        .source_artifact
        .ok_or_else(|| BenchError::Unknown(anyhow!("cache read did not hit an artifact")))?;
    let artifact_size = std::fs::metadata(&artifact)?.len();

    let df = df!(
        "metric" => ["filename", "size", "lines", "seconds"],
        "build_cache" => [
            file_name(file.path()),
            human_bytes(file.size()?),
            file.lines()?.to_string(),
            format!("{build_seconds:.3}"),
        ],
        "read_cache" => [
            file_name(&artifact),
            human_bytes(artifact_size),
            read.data.height().to_string(),
            format!("{read_seconds:.3}"),
        ],
    )
    .map_err(BenchError::PolarsError)?;

    println!("\n{df}");
    Ok(())
}

/// Print a one-row summary of the resolved dataset file.
pub fn run_dataset_summary(config: &BenchConfig) -> BenchResult<()> {
    let file = hub::locate_dataset(&config.hub_dir, &config.dataset)?;
    let df = hub::summary_frame(&file)?;
    println!("\n{df}");
    Ok(())
}

/// Remove the dataset's hub entry.
pub fn run_dataset_clear(config: &BenchConfig) -> BenchResult<()> {
    hub::delete_dataset(&config.hub_dir, &config.dataset)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
