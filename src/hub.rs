//! Dataset acquisition against a local hub cache.
//!
//! Resolution is offline: the hub directory is expected to be populated
//! already (`<hub_dir>/datasets/<owner>/<name>/...`); this module only
//! locates, summarizes, and deletes entries.

use crate::dataset::DatasetFile;
use crate::errors::{BenchError, BenchResult};
use crate::report::human_bytes;
use anyhow::anyhow;
use polars::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const DATASET_ID_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._-]*/[A-Za-z0-9][A-Za-z0-9._-]*$";

fn validate_dataset_id(dataset: &str) -> BenchResult<()> {
    let pattern = regex::Regex::new(DATASET_ID_PATTERN)
        .map_err(|e| BenchError::Unknown(e.into()))?;
    if !pattern.is_match(dataset) {
        return Err(BenchError::Unknown(anyhow!(
            "Invalid dataset identifier {dataset:?}, expected owner/name"
        )));
    }
    Ok(())
}

fn dataset_root(hub_dir: &Path, dataset: &str) -> PathBuf {
    hub_dir.join("datasets").join(dataset)
}

/// Locate the largest CSV file the hub holds for `dataset`.
pub fn locate_dataset(hub_dir: &Path, dataset: &str) -> BenchResult<DatasetFile> {
    validate_dataset_id(dataset)?;
    let root = dataset_root(hub_dir, dataset);

    let mut largest: Option<(u64, PathBuf)> = None;
    for entry in WalkDir::new(&root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("csv") {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if largest.as_ref().map_or(true, |(best, _)| size >= *best) {
            largest = Some((size, path.to_path_buf()));
        }
    }

    match largest {
        Some((size, path)) => {
            info!(dataset, size, "resolved {:?}", path);
            Ok(DatasetFile::with_provenance(path, dataset))
        }
        None => Err(BenchError::DatasetNotFound {
            dataset: dataset.to_string(),
            dir: root,
        }),
    }
}

/// Remove the hub entry for `dataset`. Missing entries are not an error;
/// emptied parent directories are pruned best-effort.
pub fn delete_dataset(hub_dir: &Path, dataset: &str) -> BenchResult<()> {
    validate_dataset_id(dataset)?;
    let root = dataset_root(hub_dir, dataset);

    match fs::remove_dir_all(&root) {
        Ok(()) => info!(dataset, "removed hub entry {:?}", root),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    }

    if let Some(owner) = root.parent() {
        let _ = fs::remove_dir(owner);
    }
    let _ = fs::remove_dir(hub_dir.join("datasets"));
    Ok(())
}

/// One-row summary of a resolved dataset file.
pub fn summary_frame(file: &DatasetFile) -> BenchResult<DataFrame> {
    let df = df!(
        "size" => [human_bytes(file.size()?)],
        "lines" => [file.lines()?],
        "filename" => [file.path().to_string_lossy().into_owned()],
    )
    .map_err(BenchError::PolarsError)?;
    Ok(df)
}
