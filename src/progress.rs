//! Terminal rendering of trial progress. Subscribes to the runner's events;
//! the measurement loop itself never touches the terminal.

use crate::bench::{ProgressEvent, ProgressSink};
use crate::errors::{BenchError, BenchResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// One progress bar per scenario: advances a tick per completed chunk and
/// carries the current ETA as a postfix.
pub struct ScenarioBar {
    bar: ProgressBar,
}

impl ScenarioBar {
    pub fn new(name: &str, chunk_count: usize, quiet: bool) -> BenchResult<Self> {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(chunk_count as u64)
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:<12}: {percent:>3}%|{bar:40}| {pos}/{len} {msg}")
                .map_err(|e| BenchError::Unknown(e.into()))?
                .progress_chars("#>-"),
        );
        bar.set_prefix(name.to_string());
        Ok(Self { bar })
    }
}

impl ProgressSink for ScenarioBar {
    fn chunk_done(&mut self, event: &ProgressEvent) {
        self.bar
            .set_message(format!("eta: {}", event.eta.format("%H:%M:%S")));
        self.bar.inc(1);
    }

    fn finished(&mut self, total: Duration) {
        self.bar.set_message(format!("total: {}", format_hms(total)));
        self.bar.finish();
    }
}

/// Spinner for the single-shot comparison flow.
pub fn spinner(text: &str, quiet: bool) -> BenchResult<ProgressBar> {
    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .map_err(|e| BenchError::Unknown(e.into()))?,
    );
    bar.set_message(text.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}

fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
