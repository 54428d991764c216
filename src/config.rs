//! Build configuration module.
//!
//! Handles loading, validating, and merging the optional `config.toml` at the
//! project root. This file controls *how* the site is built (where inputs live,
//! which markers delimit the analytics block, how many workers render pages).
//! *What* is published — site name, URLs, feed identity — lives in
//! `data/site.json` and is handled by [`crate::site`].
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! data = "data"             # site.json, index.json, store.json, episodes/
//! templates = "templates"   # episode.html, index.html, store.html
//! public = "public"         # copied verbatim to the output root
//! media = "media"           # audio/ and images/, copied to the output root
//!
//! [restricted]
//! analytics_start = "<!-- Google Analytics -->"
//! analytics_end = "<!-- End Google Analytics -->"
//! favicon = "favicon.ico"
//! small_favicon = "favicon_sm.ico"
//!
//! [processing]
//! max_processes = 4         # Max parallel page workers (omit for auto = CPU cores)
//! ```
//!
//! Config files are sparse — override just the values you want. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Input directory layout, relative to the project root.
    pub paths: PathsConfig,
    /// Settings for the restricted-network build variant.
    pub restricted: RestrictedConfig,
    /// Parallel rendering settings.
    pub processing: ProcessingConfig,
}

impl BuildConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.restricted.analytics_start.is_empty() || self.restricted.analytics_end.is_empty() {
            return Err(ConfigError::Validation(
                "restricted.analytics_start and restricted.analytics_end must not be empty".into(),
            ));
        }
        for (key, value) in [
            ("paths.data", &self.paths.data),
            ("paths.templates", &self.paths.templates),
            ("paths.public", &self.paths.public),
            ("paths.media", &self.paths.media),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Input directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub data: String,
    pub templates: String,
    pub public: String,
    pub media: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data: "data".to_string(),
            templates: "templates".to_string(),
            public: "public".to_string(),
            media: "media".to_string(),
        }
    }
}

/// Restricted-network variant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RestrictedConfig {
    /// Marker opening the block stripped from every template.
    pub analytics_start: String,
    /// Marker closing the block stripped from every template.
    pub analytics_end: String,
    /// Favicon filename replaced in the output root.
    pub favicon: String,
    /// Favicon moved over `favicon` when present.
    pub small_favicon: String,
}

impl Default for RestrictedConfig {
    fn default() -> Self {
        Self {
            analytics_start: "<!-- Google Analytics -->".to_string(),
            analytics_end: "<!-- End Google Analytics -->".to_string(),
            favicon: "favicon.ico".to_string(),
            small_favicon: "favicon_sm.ico".to_string(),
        }
    }
}

/// Parallel rendering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel page workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Fully resolved input locations for one project root.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub data: PathBuf,
    pub episodes: PathBuf,
    pub templates: PathBuf,
    pub public: PathBuf,
    pub media: PathBuf,
}

impl ProjectPaths {
    pub fn resolve(root: &Path, paths: &PathsConfig) -> Self {
        let data = root.join(&paths.data);
        Self {
            root: root.to_path_buf(),
            episodes: data.join("episodes"),
            data,
            templates: root.join(&paths.templates),
            public: root.join(&paths.public),
            media: root.join(&paths.media),
        }
    }

    /// `media/audio`, where episode `FILE`s live.
    pub fn audio_dir(&self) -> PathBuf {
        self.media.join("audio")
    }

    /// `media/images`, where episode and meta images live.
    pub fn images_dir(&self) -> PathBuf {
        self.media.join("images")
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BuildConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from the project root as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `config.toml` in the project root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<BuildConfig, ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# podcast-press build configuration
# =================================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# Site identity (name, URLs, feed metadata) is not configured here; it
# lives in data/site.json.

# ---------------------------------------------------------------------------
# Input layout, relative to the project root
# ---------------------------------------------------------------------------
[paths]
# site.json, index.json, store.json and one episodes/<id>/ directory per episode.
data = "data"

# episode.html, index.html and store.html (Tera templates).
templates = "templates"

# Copied verbatim into the output root.
public = "public"

# audio/ and images/, copied into the output root.
media = "media"

# ---------------------------------------------------------------------------
# Restricted-network build (build --restricted)
# ---------------------------------------------------------------------------
[restricted]
# The first block between these markers is removed from every template.
analytics_start = "<!-- Google Analytics -->"
analytics_end = "<!-- End Google Analytics -->"

# small_favicon replaces favicon in the output root when present.
favicon = "favicon.ico"
small_favicon = "favicon_sm.ico"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel page-rendering workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
