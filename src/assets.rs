//! Asset staging and probing.
//!
//! Two jobs:
//!
//! - **Staging**: copy `public/` and `media/` into the output root, preserving
//!   relative paths (`media/audio/ep1.mp3` → `dist/audio/ep1.mp3`).
//! - **Probing**: resolve facts about referenced assets — image pixel
//!   dimensions (by decoding the whole image), audio byte length, MIME type and
//!   creation time. A referenced asset that does not exist, or an image that
//!   cannot be decoded, is an [`AssetError`] and aborts the build.
//!
//! ## Creation time
//!
//! Feed items without an explicit `DATE` use the audio file's birth time.
//! This is best-effort provenance: copying or restoring media resets it, and
//! some filesystems don't record it at all, in which case the modification
//! time is used instead.

use chrono::{DateTime, FixedOffset, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    Missing(PathBuf),
    #[error("Cannot decode image {path}: {reason}")]
    Undecodable { path: PathBuf, reason: String },
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Facts about an audio file needed for a feed enclosure.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    pub path: PathBuf,
    pub length: u64,
    pub mime_type: String,
    pub created: DateTime<FixedOffset>,
}

/// Decode an image fully and report its dimensions.
///
/// The whole image is decoded, not just the header, so truncated or corrupt
/// pixel data is reported as [`AssetError::Undecodable`].
pub fn probe_image(path: &Path) -> Result<Dimensions, AssetError> {
    if !path.is_file() {
        return Err(AssetError::Missing(path.to_path_buf()));
    }
    let undecodable = |reason: String| AssetError::Undecodable {
        path: path.to_path_buf(),
        reason,
    };
    let decoded = image::ImageReader::open(path)
        .map_err(io_err(path))?
        .with_guessed_format()
        .map_err(io_err(path))?
        .decode()
        .map_err(|e| undecodable(e.to_string()))?;
    Ok(Dimensions {
        width: decoded.width(),
        height: decoded.height(),
    })
}

/// Stat an audio file for its enclosure length, MIME type and creation time.
pub fn probe_audio(path: &Path) -> Result<AudioInfo, AssetError> {
    let metadata = fs::metadata(path).map_err(|_| AssetError::Missing(path.to_path_buf()))?;
    if !metadata.is_file() {
        return Err(AssetError::Missing(path.to_path_buf()));
    }
    let created = metadata
        .created()
        .or_else(|_| metadata.modified())
        .map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(AudioInfo {
        path: path.to_path_buf(),
        length: metadata.len(),
        mime_type: mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
        created: DateTime::<Utc>::from(created).fixed_offset(),
    })
}

/// Recursively copy the contents of `src` into `dst`.
///
/// Directories are created as needed (existing ones are fine). A missing
/// `src` copies nothing. Returns the number of files copied.
pub fn stage_dir(src: &Path, dst: &Path) -> Result<usize, AssetError> {
    if !src.is_dir() {
        return Ok(0);
    }
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| AssetError::Io {
            path: e.path().unwrap_or(src).to_path_buf(),
            source: e.into(),
        })?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
            fs::copy(entry.path(), &target).map_err(io_err(entry.path()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> AssetError {
    let path = path.to_path_buf();
    move |source| AssetError::Io { path, source }
}

/// Replace `favicon` with `small_favicon` in the output root.
///
/// Returns `Ok(false)` and leaves everything untouched when the small
/// favicon was not staged.
pub fn swap_favicon(output_dir: &Path, favicon: &str, small_favicon: &str) -> Result<bool, AssetError> {
    let small = output_dir.join(small_favicon);
    if !small.is_file() {
        return Ok(false);
    }
    let target = output_dir.join(favicon);
    if target.exists() {
        fs::remove_file(&target).map_err(|source| AssetError::Io {
            path: target.clone(),
            source,
        })?;
    }
    fs::rename(&small, &target).map_err(|source| AssetError::Io {
        path: small.clone(),
        source,
    })?;
    Ok(true)
}
