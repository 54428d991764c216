//! Site-wide data: `data/site.json`, `data/index.json`, `data/store.json`.
//!
//! [`SiteConfig`] is loaded once per build and never mutated afterwards. The
//! restricted-network variant is produced as a *new* value by
//! [`SiteConfig::restricted`] rather than by patching fields in place.
//!
//! JSON keys keep their upper-case spelling (`SITE_URL`, `META_IMAGE`, ...)
//! because templates address them by those names. Unknown keys are preserved
//! in [`SiteConfig::extra`] so templates can use arbitrary site fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{path} must contain a JSON object")]
    NotAnObject { path: PathBuf },
    #[error("site.json: {0}")]
    Validation(String),
}

/// An iTunes category, optionally with subcategories.
///
/// Accepts either a bare string (`"Technology"`) or a nested object
/// (`{"text": "Society & Culture", "subcats": [{"text": "Philosophy"}]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItunesCategory {
    Name(String),
    Nested {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        subcats: Vec<ItunesCategory>,
    },
}

impl ItunesCategory {
    pub fn text(&self) -> &str {
        match self {
            ItunesCategory::Name(text) => text,
            ItunesCategory::Nested { text, .. } => text,
        }
    }

    pub fn subcategories(&self) -> &[ItunesCategory] {
        match self {
            ItunesCategory::Name(_) => &[],
            ItunesCategory::Nested { subcats, .. } => subcats,
        }
    }
}

/// Site configuration from `data/site.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(rename = "SITE_NAME")]
    pub site_name: String,
    #[serde(rename = "SITE_URL")]
    pub site_url: String,
    #[serde(rename = "SITE_URL_TOR", default, skip_serializing_if = "Option::is_none")]
    pub site_url_tor: Option<String>,
    #[serde(rename = "META_DESCRIPTION", default)]
    pub meta_description: String,
    #[serde(rename = "META_IMAGE")]
    pub meta_image: String,
    #[serde(rename = "META_IMAGE_WIDTH", default, skip_serializing_if = "Option::is_none")]
    pub meta_image_width: Option<u32>,
    #[serde(rename = "META_IMAGE_HEIGHT", default, skip_serializing_if = "Option::is_none")]
    pub meta_image_height: Option<u32>,
    #[serde(rename = "META_IMAGE_TOR", default, skip_serializing_if = "Option::is_none")]
    pub meta_image_tor: Option<String>,
    #[serde(rename = "META_IMAGE_WIDTH_TOR", default, skip_serializing_if = "Option::is_none")]
    pub meta_image_width_tor: Option<u32>,
    #[serde(rename = "META_IMAGE_HEIGHT_TOR", default, skip_serializing_if = "Option::is_none")]
    pub meta_image_height_tor: Option<u32>,
    #[serde(rename = "ITUNES_IMAGE")]
    pub itunes_image: String,
    #[serde(rename = "AUTHOR", default)]
    pub author: String,
    #[serde(rename = "EMAIL", default)]
    pub email: String,
    #[serde(rename = "managingEditor", default, skip_serializing_if = "Option::is_none")]
    pub managing_editor: Option<String>,
    #[serde(rename = "WEBMASTER", default, skip_serializing_if = "Option::is_none")]
    pub webmaster: Option<String>,
    #[serde(rename = "COPYRIGHT", default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(rename = "LANGUAGE", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "CATEGORIES", default)]
    pub categories: Vec<String>,
    #[serde(rename = "ITUNES_CATEGORY", default)]
    pub itunes_category: Vec<ItunesCategory>,
    #[serde(rename = "EXPLICIT", default)]
    pub explicit: bool,
    /// Maximum feed size. Absent or zero means unlimited.
    #[serde(rename = "FEED_LIMIT", default, skip_serializing_if = "Option::is_none")]
    pub feed_limit: Option<usize>,
    /// Episode numbers excluded from the feed. They still get pages.
    #[serde(default)]
    pub blacklist: BTreeSet<u32>,
    /// Any other keys, passed through to templates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SiteConfig {
    /// Validate the fields every build depends on.
    pub fn validate(&self) -> Result<(), SiteError> {
        if self.site_name.trim().is_empty() {
            return Err(SiteError::Validation("SITE_NAME must not be empty".into()));
        }
        if self.site_url.trim().is_empty() {
            return Err(SiteError::Validation("SITE_URL must not be empty".into()));
        }
        if self.meta_image.trim().is_empty() {
            return Err(SiteError::Validation("META_IMAGE must not be empty".into()));
        }
        Ok(())
    }

    /// The effective feed limit: `None` when unlimited.
    pub fn effective_feed_limit(&self) -> Option<usize> {
        self.feed_limit.filter(|&n| n > 0)
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    /// `<SITE_URL>/feed.rss`
    pub fn feed_url(&self) -> String {
        format!("{}/feed.rss", self.base_url())
    }

    /// `<SITE_URL>/images/<name>`
    pub fn image_url(&self, name: &str) -> String {
        format!("{}/images/{}", self.base_url(), name)
    }

    /// `<SITE_URL>/audio/<name>`
    pub fn audio_url(&self, name: &str) -> String {
        format!("{}/audio/{}", self.base_url(), name)
    }

    /// `<SITE_URL>/<number>`
    pub fn episode_url(&self, number: u32) -> String {
        format!("{}/{}", self.base_url(), number)
    }

    /// Produce the restricted-network variant of this config.
    ///
    /// Substitutes the alternate base URL and the alternate meta-image
    /// triple (path, width, height). Both `SITE_URL_TOR` and
    /// `META_IMAGE_TOR` are required.
    pub fn restricted(&self) -> Result<SiteConfig, SiteError> {
        let url = self
            .site_url_tor
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                SiteError::Validation("SITE_URL_TOR is required for a restricted build".into())
            })?;
        let image = self
            .meta_image_tor
            .clone()
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| {
                SiteError::Validation("META_IMAGE_TOR is required for a restricted build".into())
            })?;

        let mut variant = self.clone();
        variant.site_url = url;
        variant.meta_image = image;
        variant.meta_image_width = self.meta_image_width_tor;
        variant.meta_image_height = self.meta_image_height_tor;
        Ok(variant)
    }

    /// Serialize to a JSON object for template contexts.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Read a JSON document from disk, attaching the path to any error.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SiteError> {
    let content = fs::read_to_string(path).map_err(|source| SiteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SiteError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a JSON document that must be an object (`index.json`, `store.json`).
pub fn read_object(path: &Path) -> Result<Value, SiteError> {
    let value: Value = read_json(path)?;
    if !value.is_object() {
        return Err(SiteError::NotAnObject {
            path: path.to_path_buf(),
        });
    }
    Ok(value)
}

/// Load and validate `site.json` from the data directory.
pub fn load_site(data_dir: &Path) -> Result<SiteConfig, SiteError> {
    let site: SiteConfig = read_json(&data_dir.join("site.json"))?;
    site.validate()?;
    Ok(site)
}
