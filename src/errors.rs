use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code("CMARK-001"),
        help("Please check your bench.yaml syntax and structure.")
    )]
    ConfigError(#[source] serde_yaml::Error),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code("CMARK-002"),
        help("Check file paths and permissions.")
    )]
    IoError(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    #[diagnostic(
        code("CMARK-003"),
        help("An error occurred within the dataframe engine.")
    )]
    PolarsError(#[from] polars::error::PolarsError),

    #[error("Dataset {dataset:?} has no CSV file(s) under {dir:?}")]
    #[diagnostic(
        code("CMARK-004"),
        help("Fetch the dataset into the hub cache directory first.")
    )]
    DatasetNotFound { dataset: String, dir: PathBuf },

    #[error("Cache isolation failed for {path:?}: {source}")]
    #[diagnostic(
        code("CMARK-005"),
        help("The cache directory could not be renamed into a consistent state.")
    )]
    CacheIsolation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Aggregation failed: {0}")]
    #[diagnostic(
        code("CMARK-006"),
        help("All scenarios must be timed over the same chunk sequence.")
    )]
    AggregationError(String),

    #[error(transparent)]
    #[diagnostic(code("CMARK-000"))]
    Unknown(#[from] anyhow::Error),
}

pub type BenchResult<T> = Result<T, BenchError>;
