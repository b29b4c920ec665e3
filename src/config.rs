//! Configuration for cinesearch.
//!
//! Defaults first, then an optional TOML patch (explicit path or the
//! `CINESEARCH_CONFIG` environment variable), then individual environment
//! overrides. Patches only carry the keys they set; everything else keeps
//! its default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CineError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Rows per column and page in the interactive surface.
    pub page_size: usize,
    /// Row cap per column in the flat API surface.
    pub api_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            api_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    /// LRU entries; one entry per distinct normalized query.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 256,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    search: Option<SearchPatch>,
    cache: Option<CachePatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    page_size: Option<usize>,
    api_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    enabled: Option<bool>,
    capacity: Option<usize>,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("CINESEARCH_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| CineError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| CineError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(search) = patch.search {
            if let Some(page_size) = search.page_size {
                self.search.page_size = page_size;
            }
            if let Some(api_limit) = search.api_limit {
                self.search.api_limit = api_limit;
            }
        }
        if let Some(cache) = patch.cache {
            if let Some(enabled) = cache.enabled {
                self.cache.enabled = enabled;
            }
            if let Some(capacity) = cache.capacity {
                self.cache.capacity = capacity;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(page_size) = env_usize("CINESEARCH_PAGE_SIZE")? {
            self.search.page_size = page_size;
        }
        if let Some(api_limit) = env_usize("CINESEARCH_API_LIMIT")? {
            self.search.api_limit = api_limit;
        }
        if env_bool("CINESEARCH_CACHE_DISABLED").unwrap_or(false) {
            self.cache.enabled = false;
        }
        if let Some(capacity) = env_usize("CINESEARCH_CACHE_CAPACITY")? {
            self.cache.capacity = capacity;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.search.page_size == 0 {
            return Err(CineError::Config("search.page_size must be >= 1".to_string()));
        }
        if self.search.api_limit == 0 {
            return Err(CineError::Config("search.api_limit must be >= 1".to_string()));
        }
        Ok(())
    }
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| CineError::Config(format!("{name}={raw}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
