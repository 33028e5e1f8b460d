//! Dataframe cache: a composed caching reader plus the rename-based state
//! manager that lets build and read scenarios observe an empty or populated
//! cache on demand.

use crate::dataset::DatasetFile;
use crate::errors::{BenchError, BenchResult};
use crate::io;
use polars::prelude::DataFrame;
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffix appended to a cache artifact's full file name while it is hidden
/// from cache lookup.
const ISOLATION_SUFFIX: &str = "bak";

/// Where cache artifacts live. Threaded explicitly into the reader and the
/// state manager at construction time.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".cachemark"),
        }
    }
}

/// Result of a read through the cache: the data plus the artifact that
/// satisfied the call, if the call was served from the cache.
pub struct CachedRead {
    pub data: DataFrame,
    pub source_artifact: Option<PathBuf>,
}

/// Wraps a plain read function so identical invocations are served from a
/// Parquet artifact in the cache directory.
pub struct CachedReader<F>
where
    F: Fn(&Path, Option<usize>) -> BenchResult<DataFrame>,
{
    read: F,
    dir: PathBuf,
}

impl<F> CachedReader<F>
where
    F: Fn(&Path, Option<usize>) -> BenchResult<DataFrame>,
{
    pub fn new(config: &CacheConfig, read: F) -> Self {
        Self {
            read,
            dir: config.dir.clone(),
        }
    }

    /// Read `n_rows` of `file`, from the cache when an artifact for these
    /// inputs exists, otherwise through the wrapped function (writing the
    /// artifact for next time).
    pub fn call(&self, file: &DatasetFile, n_rows: Option<usize>) -> BenchResult<CachedRead> {
        let key = cache_key(file.path(), file.size()?, n_rows);
        let artifact = self.dir.join(format!("{key}.parquet"));

        if artifact.is_file() {
            debug!("cache hit: {:?}", artifact);
            let data = io::read_parquet(&artifact)?;
            return Ok(CachedRead {
                data,
                source_artifact: Some(artifact),
            });
        }

        debug!("cache miss, building {:?}", artifact);
        let mut data = (self.read)(file.path(), n_rows)?;
        fs::create_dir_all(&self.dir)?;
        io::write_parquet(&mut data, &artifact)?;

        Ok(CachedRead {
            data,
            source_artifact: None,
        })
    }

    /// Remove every cache entry, canonical and isolated names alike.
    pub fn clear(&self) -> BenchResult<()> {
        if !self.dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

/// Identity of a cache artifact, derived from the read operation's inputs.
fn cache_key(path: &Path, size: u64, n_rows: Option<usize>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(size.to_le_bytes());
    match n_rows {
        Some(n) => hasher.update((n as u64).to_le_bytes()),
        None => hasher.update(u64::MAX.to_le_bytes()),
    }
    let digest = hasher.finalize();
    format!("{digest:x}")[..16].to_string()
}

/// Reversibly toggles a cache directory between "empty" and "restored" by
/// renaming artifacts to and from the isolation suffix.
#[derive(Debug, Clone)]
pub struct CacheState {
    dir: PathBuf,
}

impl CacheState {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            dir: config.dir.clone(),
        }
    }

    /// Hide every canonical artifact from cache lookup. Idempotent; no-op if
    /// the cache directory does not exist.
    pub fn isolate(&self) -> BenchResult<()> {
        if !self.dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && !is_isolated(&path) {
                rename_replacing(&path, &with_isolation_suffix(&path))?;
            }
        }
        Ok(())
    }

    /// Rename every isolated artifact back to its canonical name. Idempotent;
    /// no-op if the cache directory does not exist.
    pub fn restore(&self) -> BenchResult<()> {
        if !self.dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && is_isolated(&path) {
                rename_replacing(&path, &path.with_extension(""))?;
            }
        }
        Ok(())
    }

    /// Guard that runs `restore()` when dropped, so an early return or panic
    /// inside a scenario cannot strand artifacts under the isolation suffix.
    pub fn restore_on_drop(&self) -> RestoreGuard<'_> {
        RestoreGuard { state: self }
    }
}

pub struct RestoreGuard<'a> {
    state: &'a CacheState,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.state.restore() {
            warn!("failed to restore cache state: {e}");
        }
    }
}

fn is_isolated(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(ISOLATION_SUFFIX))
}

fn with_isolation_suffix(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(ISOLATION_SUFFIX);
    PathBuf::from(name)
}

/// Rename `from` to `to`, deleting a stale `to` left behind by a previous
/// crashed run before retrying.
fn rename_replacing(from: &Path, to: &Path) -> BenchResult<()> {
    if to.exists() {
        fs::remove_file(to).map_err(|source| BenchError::CacheIsolation {
            path: to.to_path_buf(),
            source,
        })?;
    }
    fs::rename(from, to).map_err(|source| BenchError::CacheIsolation {
        path: from.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_csv;
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn names(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn seed_cache(dir: &Path, files: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for name in files {
            fs::write(dir.join(name), b"x").unwrap();
        }
    }

    #[test]
    fn test_isolate_restore_round_trip() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("cache");
        seed_cache(&dir, &["a.parquet", "b.parquet"]);
        let before = names(&dir);

        let state = CacheState::new(&CacheConfig { dir: dir.clone() });
        state.isolate().unwrap();
        assert_eq!(
            names(&dir),
            ["a.parquet.bak", "b.parquet.bak"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        );

        state.restore().unwrap();
        assert_eq!(names(&dir), before);
    }

    #[test]
    fn test_isolate_twice_then_restore() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("cache");
        seed_cache(&dir, &["a.parquet"]);
        let before = names(&dir);

        let state = CacheState::new(&CacheConfig { dir: dir.clone() });
        state.isolate().unwrap();
        state.isolate().unwrap();
        state.restore().unwrap();

        assert_eq!(names(&dir), before);
    }

    #[test]
    fn test_restore_twice_is_noop() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("cache");
        seed_cache(&dir, &["a.parquet"]);

        let state = CacheState::new(&CacheConfig { dir: dir.clone() });
        state.isolate().unwrap();
        state.restore().unwrap();
        let after_first = names(&dir);
        state.restore().unwrap();

        assert_eq!(names(&dir), after_first);
    }

    #[test]
    fn test_missing_dir_is_noop() {
        let tmp = tempdir().unwrap();
        let state = CacheState::new(&CacheConfig {
            dir: tmp.path().join("never_created"),
        });

        state.isolate().unwrap();
        state.restore().unwrap();
    }

    #[test]
    fn test_stale_isolated_name_is_replaced() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("cache");
        // Leftover from a crashed run: both names exist at once
        seed_cache(&dir, &["a.parquet", "a.parquet.bak"]);

        let state = CacheState::new(&CacheConfig { dir: dir.clone() });
        state.isolate().unwrap();
        assert_eq!(names(&dir).into_iter().collect::<Vec<_>>(), ["a.parquet.bak"]);

        state.restore().unwrap();
        assert_eq!(names(&dir).into_iter().collect::<Vec<_>>(), ["a.parquet"]);
    }

    #[test]
    fn test_restore_guard_runs_on_drop() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("cache");
        seed_cache(&dir, &["a.parquet"]);
        let before = names(&dir);

        let state = CacheState::new(&CacheConfig { dir: dir.clone() });
        {
            let _guard = state.restore_on_drop();
            state.isolate().unwrap();
        }

        assert_eq!(names(&dir), before);
    }

    #[test]
    fn test_cached_reader_miss_then_hit() {
        let tmp = tempdir().unwrap();
        let csv = tmp.path().join("data.csv");
        fs::write(&csv, "a,b\n1,2\n3,4\n").unwrap();
        let file = DatasetFile::new(&csv);

        let config = CacheConfig {
            dir: tmp.path().join("cache"),
        };
        let calls = Cell::new(0usize);
        let reader = CachedReader::new(&config, |p: &Path, n| {
            calls.set(calls.get() + 1);
            read_csv(p, n)
        });

        let first = reader.call(&file, None).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(first.source_artifact.is_none());

        let second = reader.call(&file, None).unwrap();
        assert_eq!(calls.get(), 1);
        let artifact = second.source_artifact.expect("second read is a hit");
        assert!(artifact.is_file());
        assert_eq!(second.data.shape(), first.data.shape());
    }

    #[test]
    fn test_cached_reader_keys_on_row_bound() {
        let tmp = tempdir().unwrap();
        let csv = tmp.path().join("data.csv");
        fs::write(&csv, "a,b\n1,2\n3,4\n5,6\n").unwrap();
        let file = DatasetFile::new(&csv);

        let config = CacheConfig {
            dir: tmp.path().join("cache"),
        };
        let reader = CachedReader::new(&config, |p: &Path, n| read_csv(p, n));

        let full = reader.call(&file, None).unwrap();
        let bounded = reader.call(&file, Some(1)).unwrap();

        assert!(bounded.source_artifact.is_none());
        assert_eq!(full.data.height(), 3);
        assert_eq!(bounded.data.height(), 1);
    }

    #[test]
    fn test_clear_removes_all_entries() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("cache");
        seed_cache(&dir, &["a.parquet", "b.parquet.bak"]);

        let config = CacheConfig { dir: dir.clone() };
        let reader = CachedReader::new(&config, |p: &Path, n| read_csv(p, n));
        reader.clear().unwrap();

        assert!(names(&dir).is_empty());
    }
}
