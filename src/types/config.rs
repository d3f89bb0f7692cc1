//! Configuration for kcache.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{KcacheError, KcacheResult};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "kcache.toml";

/// Main configuration for kcache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Cache policy settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Trace replay settings.
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Cache policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached entries before aging kicks in.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Number of observations before a descriptor is admitted (LRU-K).
    #[serde(default = "default_k_times")]
    pub k_times: u32,

    /// Match policy used on lookup.
    #[serde(default)]
    pub match_policy: MatchPolicyKind,

    /// Aging policy used for admission and eviction.
    #[serde(default)]
    pub aging_policy: AgingPolicyKind,

    /// Occurrence table settings (LRU-K only).
    #[serde(default)]
    pub occurrence: OccurrenceConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            k_times: default_k_times(),
            match_policy: MatchPolicyKind::default(),
            aging_policy: AgingPolicyKind::default(),
            occurrence: OccurrenceConfig::default(),
        }
    }
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_k_times() -> u32 {
    2
}

impl CacheConfig {
    /// Creates a cache configuration with the given capacity and K.
    pub fn new(capacity: usize, k_times: u32) -> Self {
        Self {
            capacity,
            k_times,
            ..Self::default()
        }
    }

    /// Validates capacity and K.
    pub fn validate(&self) -> KcacheResult<()> {
        if self.capacity == 0 {
            return Err(KcacheError::config("cache.capacity must be >= 1"));
        }
        if self.k_times == 0 {
            return Err(KcacheError::config("cache.k_times must be >= 1"));
        }
        if self.occurrence.max_tracked_hashes == Some(0) {
            return Err(KcacheError::config(
                "cache.occurrence.max_tracked_hashes must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

/// Available match policies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicyKind {
    /// Hit only on structurally identical descriptors.
    #[default]
    ExactOnly,
}

/// Available aging policies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgingPolicyKind {
    /// Plain LRU: every descriptor is admitted.
    Lru,
    /// LRU with K-occurrence admission control.
    #[default]
    LruK,
}

/// Occurrence table settings.
///
/// The defaults keep every observed descriptor forever.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OccurrenceConfig {
    /// Upper bound on tracked descriptor-hash buckets. Unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tracked_hashes: Option<usize>,

    /// Forget a descriptor's count when its cache entry is evicted.
    #[serde(default)]
    pub reset_on_evict: bool,
}

/// Trace replay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Number of concurrent compiler-driver workers.
    #[serde(default = "default_replay_threads")]
    pub threads: usize,

    /// Show a progress bar while replaying.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            threads: default_replay_threads(),
            show_progress: true,
        }
    }
}

fn default_replay_threads() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> KcacheResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> KcacheResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates default configuration.
    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig::default(),
            cache: CacheConfig::default(),
            replay: ReplayConfig::default(),
        }
    }

    /// Validates every section.
    pub fn validate(&self) -> KcacheResult<()> {
        self.cache.validate()?;
        if self.replay.threads == 0 {
            return Err(KcacheError::config("replay.threads must be >= 1"));
        }
        Ok(())
    }

    /// User-level configuration path (`<config_dir>/kcache/kcache.toml`).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kcache").join(CONFIG_FILE_NAME))
    }

    /// Loads the first existing file among the current directory and the
    /// user config directory, or falls back to the default.
    ///
    /// A file that exists but fails to parse or validate is an error.
    pub fn load_or_default() -> KcacheResult<Self> {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        candidates.extend(Self::user_config_path());
        Self::load_first_existing(&candidates)
    }

    fn load_first_existing(candidates: &[PathBuf]) -> KcacheResult<Self> {
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load(path)
            }
            None => Ok(Self::default_config()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
