use crate::cache::CacheConfig;
use crate::errors::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hub dataset benchmarked when no config overrides it.
pub const DEFAULT_DATASET: &str = "alessandrolobello/the-ultimate-earthquake-dataset-from-1990-2023";

/// Benchmark configuration, loadable from a YAML file. Every field has a
/// default so a config file is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchConfig {
    /// Dataset identifier, `owner/name`.
    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Root of the local dataset hub cache.
    #[serde(default = "default_hub_dir")]
    pub hub_dir: PathBuf,

    /// Directory holding dataframe cache artifacts.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Number of timed samples per chunk size.
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_dataset() -> String {
    DEFAULT_DATASET.to_string()
}

fn default_hub_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache/kagglehub")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cachemark")
}

fn default_repeat() -> usize {
    1
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            hub_dir: default_hub_dir(),
            cache_dir: default_cache_dir(),
            repeat: default_repeat(),
        }
    }
}

impl BenchConfig {
    pub fn from_path(path: &Path) -> BenchResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(BenchError::ConfigError)
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> BenchResult<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn cache(&self) -> CacheConfig {
        CacheConfig {
            dir: self.cache_dir.clone(),
        }
    }
}
