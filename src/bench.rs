//! Timed-trial runner.
//!
//! Executes a target read operation over the dataset's chunk sequence,
//! `repeat` wall-clock samples per chunk, and emits one structured progress
//! event per completed chunk. Measurement never renders anything itself;
//! presentation subscribes through [`ProgressSink`].

use crate::dataset::DatasetFile;
use crate::errors::BenchResult;
use chrono::{DateTime, Local};
use std::time::{Duration, Instant};
use tracing::info;

/// Emitted after all repeats for one chunk size have completed.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub chunk_index: usize,
    pub chunk_count: usize,
    /// Row-count bound used for this chunk's invocations.
    pub rows: u64,
    /// Sum of this chunk's timed samples.
    pub chunk_seconds: Duration,
    /// Projected time left for the scenario.
    pub remaining: Duration,
    pub eta: DateTime<Local>,
}

pub trait ProgressSink {
    fn chunk_done(&mut self, event: &ProgressEvent);
    fn finished(&mut self, total: Duration);
}

/// Sink that discards all events.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn chunk_done(&mut self, _event: &ProgressEvent) {}
    fn finished(&mut self, _total: Duration) {}
}

/// Raw timings for one scenario: per chunk size, `repeat` independent
/// wall-clock samples.
#[derive(Debug, Clone)]
pub struct ScenarioTiming {
    pub name: String,
    pub repeat: usize,
    pub samples: Vec<(u64, Vec<Duration>)>,
}

/// Time `target` over the file's chunk sequence.
///
/// The optional setup hook runs before every timed invocation and its cost
/// is excluded from the samples; the build scenario uses it to re-isolate
/// the artifact written by the previous repeat so each build starts cold.
/// A target error propagates immediately, aborting the remaining chunks.
pub fn run_trials(
    name: &str,
    file: &DatasetFile,
    repeat: usize,
    mut target: impl FnMut(u64) -> BenchResult<()>,
    mut setup: Option<&mut dyn FnMut() -> BenchResult<()>>,
    sink: &mut dyn ProgressSink,
) -> BenchResult<ScenarioTiming> {
    let chunks = file.chunks()?;
    let chunk_count = chunks.len();
    let total_rows: u64 = chunks.iter().sum::<u64>() * repeat as u64;

    info!(scenario = name, chunks = chunk_count, repeat, "starting trials");

    let mut samples: Vec<(u64, Vec<Duration>)> = Vec::with_capacity(chunk_count);
    let mut rows_done = 0u64;
    let mut secs_done = 0f64;
    let start = Instant::now();

    for (chunk_index, &rows) in chunks.iter().enumerate() {
        let mut timings = Vec::with_capacity(repeat);
        for _ in 0..repeat {
            if let Some(setup) = setup.as_mut() {
                setup()?;
            }
            let clock = Instant::now();
            target(rows)?;
            timings.push(clock.elapsed());
        }

        rows_done += rows * repeat as u64;
        let chunk_seconds: Duration = timings.iter().sum();
        secs_done += chunk_seconds.as_secs_f64();

        // Average over the whole scenario so far, not per-chunk, to smooth
        // out noise in the projection.
        let seconds_per_row = secs_done / rows_done as f64;
        let remaining =
            Duration::from_secs_f64((total_rows - rows_done) as f64 * seconds_per_row);

        sink.chunk_done(&ProgressEvent {
            chunk_index,
            chunk_count,
            rows,
            chunk_seconds,
            remaining,
            eta: Local::now() + chrono::Duration::milliseconds(remaining.as_millis() as i64),
        });

        samples.push((rows, timings));
    }

    sink.finished(start.elapsed());
    info!(scenario = name, "trials finished in {:.2?}", start.elapsed());

    Ok(ScenarioTiming {
        name: name.to_string(),
        repeat,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct Recorder {
        events: Vec<ProgressEvent>,
        total: Option<Duration>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                events: Vec::new(),
                total: None,
            }
        }
    }

    impl ProgressSink for Recorder {
        fn chunk_done(&mut self, event: &ProgressEvent) {
            self.events.push(event.clone());
        }

        fn finished(&mut self, total: Duration) {
            self.total = Some(total);
        }
    }

    fn dataset_with_lines(lines: usize) -> (TempDir, DatasetFile) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "x\n".repeat(lines)).unwrap();
        (dir, DatasetFile::new(path))
    }

    #[test]
    fn test_runner_invokes_target_chunks_times_repeats() {
        let (_dir, file) = dataset_with_lines(50_000);
        let mut calls = 0usize;
        let mut sink = Recorder::new();

        let timing = run_trials(
            "read_data",
            &file,
            3,
            |_rows| {
                calls += 1;
                Ok(())
            },
            None,
            &mut sink,
        )
        .unwrap();

        assert_eq!(calls, 18);
        assert_eq!(timing.samples.len(), 6);
        assert!(timing.samples.iter().all(|(_, t)| t.len() == 3));
        assert_eq!(sink.events.len(), 6);
        assert!(sink.total.is_some());
    }

    #[test]
    fn test_runner_eta_shrinks_to_zero() {
        let (_dir, file) = dataset_with_lines(50_000);
        let mut sink = Recorder::new();

        // Cost proportional to the row bound, so throughput is steady.
        run_trials(
            "read_data",
            &file,
            3,
            |rows| {
                std::thread::sleep(Duration::from_nanos(rows * 100));
                Ok(())
            },
            None,
            &mut sink,
        )
        .unwrap();

        let remaining: Vec<Duration> = sink.events.iter().map(|e| e.remaining).collect();
        assert!(
            remaining.windows(2).all(|w| w[1] <= w[0]),
            "remaining projections must not increase: {remaining:?}"
        );
        assert_eq!(*remaining.last().unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_runner_propagates_target_error() {
        let (_dir, file) = dataset_with_lines(50_000);
        let mut calls = 0usize;
        let mut sink = NullSink;

        let result = run_trials(
            "read_data",
            &file,
            3,
            |rows| {
                calls += 1;
                if rows > 10_000 {
                    return Err(anyhow::anyhow!("boom").into());
                }
                Ok(())
            },
            None,
            &mut sink,
        );

        assert!(result.is_err());
        // All repeats of the first chunk, then the first failing invocation
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_setup_hook_runs_per_invocation_and_is_not_timed() {
        let (_dir, file) = dataset_with_lines(50_000);
        let mut setups = 0usize;
        let mut setup = || -> BenchResult<()> {
            setups += 1;
            std::thread::sleep(Duration::from_millis(5));
            Ok(())
        };
        let mut sink = NullSink;

        let timing = run_trials(
            "build_cache",
            &file,
            3,
            |_rows| Ok(()),
            Some(&mut setup),
            &mut sink,
        )
        .unwrap();

        assert_eq!(setups, 18);
        for (_, timings) in &timing.samples {
            for sample in timings {
                assert!(*sample < Duration::from_millis(5), "setup cost leaked into {sample:?}");
            }
        }
    }
}
