//! Dataset file record and the row-count sampling derived from it.
//!
//! A `DatasetFile` is a plain value: a path plus an optional hub provenance
//! tag. Line counting and chunk generation are derived accessors; the file
//! itself is never mutated.

use crate::errors::BenchResult;
use std::cell::OnceCell;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Smallest row-count sample in a chunk sequence.
pub const CHUNK_FLOOR: u64 = 10_000;

/// Number of row-count samples per benchmark scenario.
pub const CHUNK_COUNT: usize = 6;

/// Block size for the streaming line count. Large enough that the scan is
/// I/O bound even on multi-GB files.
const LINE_COUNT_BLOCK: usize = 200 * 1024 * 1024;

/// A tabular dataset on disk, with optional provenance from the dataset hub.
#[derive(Debug, Clone)]
pub struct DatasetFile {
    path: PathBuf,
    provenance: Option<String>,
    lines: OnceCell<u64>,
}

impl DatasetFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            provenance: None,
            lines: OnceCell::new(),
        }
    }

    /// Tag the file with the `owner/name` identifier it was resolved from.
    pub fn with_provenance<P: Into<PathBuf>>(path: P, provenance: &str) -> Self {
        Self {
            path: path.into(),
            provenance: Some(provenance.to_string()),
            lines: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn provenance(&self) -> Option<&str> {
        self.provenance.as_deref()
    }

    pub fn size(&self) -> BenchResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Exact number of newline-terminated lines. Counted once per record;
    /// the file is treated as immutable after acquisition.
    pub fn lines(&self) -> BenchResult<u64> {
        if let Some(lines) = self.lines.get() {
            return Ok(*lines);
        }
        let lines = count_lines(&self.path)?;
        let _ = self.lines.set(lines);
        Ok(lines)
    }

    /// Row-count samples for this file, log-spaced between the floor and the
    /// total line count. Recomputed on request, never persisted.
    pub fn chunks(&self) -> BenchResult<Vec<u64>> {
        Ok(chunk_sequence(self.lines()?, CHUNK_FLOOR, CHUNK_COUNT))
    }
}

/// Count newline bytes by streaming the file in fixed-size blocks, bounding
/// peak memory regardless of file size.
pub fn count_lines<P: AsRef<Path>>(path: P) -> BenchResult<u64> {
    count_lines_in_blocks(path.as_ref(), LINE_COUNT_BLOCK)
}

fn count_lines_in_blocks(path: &Path, block: usize) -> BenchResult<u64> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; block];
    let mut lines = 0u64;

    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        lines += buf[..read].iter().filter(|&&b| b == b'\n').count() as u64;
    }

    Ok(lines)
}

/// Generate `count` row-count samples log-spaced between `floor` and `total`.
///
/// The endpoints are pinned to `floor` and `total` so float rounding cannot
/// shift them; interior values are integer truncations of the interpolated
/// exponents. Every value is clamped to `total` and consecutive duplicates
/// are dropped, so a file smaller than the floor still yields a valid
/// non-decreasing sequence.
pub fn chunk_sequence(total: u64, floor: u64, count: usize) -> Vec<u64> {
    if count == 0 || total == 0 {
        return Vec::new();
    }

    let lo = (floor.max(1) as f64).log10();
    let hi = (total as f64).log10();

    let mut chunks: Vec<u64> = Vec::with_capacity(count);
    for i in 0..count {
        let value = if i + 1 == count {
            total
        } else if i == 0 {
            floor
        } else {
            let t = i as f64 / (count - 1) as f64;
            10f64.powf(lo + t * (hi - lo)) as u64
        };

        let value = value.min(total);
        if chunks.last() != Some(&value) {
            chunks.push(value);
        }
    }

    chunks
}
