//! Episode loading.
//!
//! Every episode lives in its own directory under `data/episodes/`:
//!
//! ```text
//! data/episodes/
//! ├── 001/
//! │   ├── episode.json     # NUMBER, TITLE, DESCRIPTION, CONTENT, FILE, ...
//! │   └── notes.md         # free-text show notes (markdown)
//! ├── 002/
//! │   └── ...
//! └── README.txt           # stray files are ignored
//! ```
//!
//! The directory name carries no meaning; `NUMBER` inside `episode.json` is the
//! identity, sort key, URL segment, and blacklist key. A directory missing
//! either file, or with unparseable JSON, aborts the whole load.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const METADATA_FILE: &str = "episode.json";
pub const NOTES_FILE: &str = "notes.md";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Episode directory {dir} is missing {file}")]
    MissingFile { dir: PathBuf, file: &'static str },
    #[error("Invalid episode metadata in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Duplicate episode NUMBER {number} in {first} and {second}")]
    DuplicateNumber {
        number: u32,
        first: PathBuf,
        second: PathBuf,
    },
}

/// One episode: `episode.json` merged with `notes.md`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    #[serde(rename = "NUMBER")]
    pub number: u32,
    #[serde(rename = "TITLE")]
    pub title: String,
    /// Plain-text summary, used verbatim in the feed.
    #[serde(rename = "DESCRIPTION", default)]
    pub description: String,
    /// Markdown body, rendered into the feed's `content:encoded`.
    #[serde(rename = "CONTENT", default)]
    pub content: String,
    /// Audio filename under `media/audio/`.
    #[serde(rename = "FILE")]
    pub file: String,
    #[serde(rename = "IMAGE", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "ITUNES_IMAGE", default, skip_serializing_if = "Option::is_none")]
    pub itunes_image: Option<String>,
    #[serde(rename = "GUID", default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(rename = "DATE", default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "EXPLICIT", default, skip_serializing_if = "Option::is_none")]
    pub explicit: Option<bool>,
    /// Raw `notes.md` contents.
    #[serde(rename = "NOTES", default)]
    pub notes: String,
    /// Set by feed assembly; false until then.
    #[serde(rename = "SHOW_IN_FEED", default)]
    pub show_in_feed: bool,
    /// Directory the episode was loaded from (not serialized).
    #[serde(skip)]
    pub source_dir: PathBuf,
    /// Any other keys, passed through to templates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Episode {
    /// Image filename, falling back to the site default.
    pub fn image_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_empty(self.image.as_deref()).unwrap_or(default)
    }

    /// iTunes image filename, falling back to the site default.
    pub fn itunes_image_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_empty(self.itunes_image.as_deref()).unwrap_or(default)
    }

    /// Explicit GUID, if set and non-empty.
    pub fn explicit_guid(&self) -> Option<&str> {
        non_empty(self.guid.as_deref())
    }

    /// Explicit DATE, if set and non-empty.
    pub fn explicit_date(&self) -> Option<&str> {
        non_empty(self.date.as_deref())
    }

    /// Serialize to a JSON object for template contexts.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Load a single episode directory.
pub fn load_episode(dir: &Path) -> Result<Episode, LoadError> {
    let metadata_path = dir.join(METADATA_FILE);
    let notes_path = dir.join(NOTES_FILE);

    if !metadata_path.is_file() {
        return Err(LoadError::MissingFile {
            dir: dir.to_path_buf(),
            file: METADATA_FILE,
        });
    }
    if !notes_path.is_file() {
        return Err(LoadError::MissingFile {
            dir: dir.to_path_buf(),
            file: NOTES_FILE,
        });
    }

    let raw = fs::read_to_string(&metadata_path).map_err(|source| LoadError::Io {
        path: metadata_path.clone(),
        source,
    })?;
    let mut episode: Episode = serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
        path: metadata_path.clone(),
        source,
    })?;

    episode.notes = fs::read_to_string(&notes_path).map_err(|source| LoadError::Io {
        path: notes_path.clone(),
        source,
    })?;
    episode.show_in_feed = false;
    episode.source_dir = dir.to_path_buf();
    Ok(episode)
}

/// Load every episode directory directly under `root`.
///
/// Non-directory entries are skipped. The result is in no particular
/// order; call [`sort_descending`] before display or feed assembly.
pub fn load_episodes(root: &Path) -> Result<Vec<Episode>, LoadError> {
    let entries = fs::read_dir(root).map_err(|source| LoadError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut episodes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        episodes.push(load_episode(&path)?);
    }

    check_unique_numbers(&episodes)?;
    Ok(episodes)
}

/// Reject collections in which two episodes share a `NUMBER`.
pub fn check_unique_numbers(episodes: &[Episode]) -> Result<(), LoadError> {
    let mut seen: BTreeMap<u32, &Path> = BTreeMap::new();
    for episode in episodes {
        if let Some(first) = seen.insert(episode.number, &episode.source_dir) {
            return Err(LoadError::DuplicateNumber {
                number: episode.number,
                first: first.to_path_buf(),
                second: episode.source_dir.clone(),
            });
        }
    }
    Ok(())
}

/// Sort by `NUMBER`, newest (highest) first.
pub fn sort_descending(episodes: &mut [Episode]) {
    episodes.sort_by(|a, b| b.number.cmp(&a.number));
}
