//! Reduce repeated timing samples to one scalar per chunk per scenario and
//! assemble the cross-scenario comparison.

use crate::bench::ScenarioTiming;
use crate::errors::{BenchError, BenchResult};
use polars::prelude::*;
use serde::Serialize;

/// One column per scenario over a shared row-count index. Column order
/// follows scenario submission order.
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    index: Vec<u64>,
    columns: Vec<(String, Vec<f64>)>,
}

#[derive(Serialize)]
struct ScenarioExport<'a> {
    name: &'a str,
    mean_seconds: &'a [f64],
}

#[derive(Serialize)]
struct ReportExport<'a> {
    run_id: String,
    nrows: &'a [u64],
    scenarios: Vec<ScenarioExport<'a>>,
}

impl BenchmarkReport {
    /// Join scenarios on their shared chunk-size key set, collapsing the
    /// repeated samples to a mean. Fails if any scenario was timed over a
    /// different chunk sequence.
    pub fn assemble(scenarios: &[ScenarioTiming]) -> BenchResult<Self> {
        let first = scenarios.first().ok_or_else(|| {
            BenchError::AggregationError("no scenarios submitted".to_string())
        })?;
        let index: Vec<u64> = first.samples.iter().map(|(rows, _)| *rows).collect();

        let mut columns = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let keys: Vec<u64> = scenario.samples.iter().map(|(rows, _)| *rows).collect();
            if keys != index {
                return Err(BenchError::AggregationError(format!(
                    "scenario {:?} was timed over {:?}, expected {:?}",
                    scenario.name, keys, index
                )));
            }

            let means = scenario
                .samples
                .iter()
                .map(|(_, timings)| {
                    timings.iter().map(|t| t.as_secs_f64()).sum::<f64>() / timings.len() as f64
                })
                .collect();
            columns.push((scenario.name.clone(), means));
        }

        Ok(Self { index, columns })
    }

    pub fn index(&self) -> &[u64] {
        &self.index
    }

    pub fn scenario_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, means)| means.as_slice())
    }

    /// The comparison table, indexed by row count.
    pub fn to_data_frame(&self) -> BenchResult<DataFrame> {
        let mut cols = Vec::with_capacity(self.columns.len() + 1);
        cols.push(Column::new("nrows".into(), &self.index));
        for (name, means) in &self.columns {
            cols.push(Column::new(name.as_str().into(), means));
        }
        DataFrame::new(cols).map_err(BenchError::PolarsError)
    }

    pub fn render(&self) -> BenchResult<String> {
        Ok(format!("{}", self.to_data_frame()?))
    }

    pub fn to_json(&self, run_id: uuid::Uuid) -> BenchResult<String> {
        let export = ReportExport {
            run_id: run_id.to_string(),
            nrows: &self.index,
            scenarios: self
                .columns
                .iter()
                .map(|(name, means)| ScenarioExport {
                    name,
                    mean_seconds: means,
                })
                .collect(),
        };
        serde_json::to_string_pretty(&export)
            .map_err(|e| BenchError::Unknown(e.into()))
    }
}

/// Render a byte count the way a human reads one.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
