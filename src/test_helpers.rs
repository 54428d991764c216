//! Shared test utilities for the podcast-press test suite.
//!
//! [`Fixture`] builds a complete project in a temp directory: the checked-in
//! `fixtures/podcast/` tree (site data, templates, public files) plus
//! generated episodes, audio files and real PNG images.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fixture = Fixture::new(&[3, 2, 1]);
//! fixture.update_episode(2, |json| json["GUID"] = "pinned".into());
//!
//! let mut episodes = fixture.sorted_episodes();
//! let feed = feed::assemble(&fixture.site(), &mut episodes, &fixture.paths(), fixture.now())?;
//! ```

use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::assets::stage_dir;
use crate::config::{PathsConfig, ProjectPaths};
use crate::episode::{self, Episode, METADATA_FILE, NOTES_FILE};
use crate::site::{self, SiteConfig};

/// Byte length of every generated audio file.
pub const AUDIO_LEN: usize = 64;

/// Write a solid-colour PNG of the given size.
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 80, 40]))
        .save(path)
        .unwrap();
}

/// An in-memory episode with the fixture's naming conventions.
pub fn episode_with(number: u32, title: &str) -> Episode {
    serde_json::from_value(serde_json::json!({
        "NUMBER": number,
        "TITLE": title,
        "FILE": format!("ep{number}.mp3"),
    }))
    .unwrap()
}

/// A self-contained project root in a temp directory.
pub struct Fixture {
    root: TempDir,
}

impl Fixture {
    /// Stage the checked-in fixture and generate the given episodes.
    pub fn new(numbers: &[u32]) -> Self {
        let root = TempDir::new().unwrap();
        let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/podcast");
        stage_dir(&source, root.path()).unwrap();

        let fixture = Self { root };
        let paths = fixture.paths();
        fs::create_dir_all(paths.audio_dir()).unwrap();
        fixture.write_image("cover.png", 16, 9);
        fixture.write_image("itunes.png", 32, 32);
        fixture.write_image("cover_tor.png", 8, 8);

        for &n in numbers {
            let dir = fixture.episode_dir(n);
            fs::create_dir_all(&dir).unwrap();
            let json = serde_json::json!({
                "NUMBER": n,
                "TITLE": format!("Episode {n}"),
                "DESCRIPTION": format!("Summary of episode {n}"),
                "CONTENT": format!("Body of **episode {n}**"),
                "FILE": format!("ep{n}.mp3"),
            });
            fs::write(dir.join(METADATA_FILE), json.to_string()).unwrap();
            fs::write(dir.join(NOTES_FILE), format!("- Show notes for {n}\n")).unwrap();
            fs::write(paths.audio_dir().join(format!("ep{n}.mp3")), [0u8; AUDIO_LEN]).unwrap();
        }
        fixture
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Default output directory inside the fixture root.
    pub fn output(&self) -> PathBuf {
        self.root().join("dist")
    }

    pub fn paths(&self) -> ProjectPaths {
        ProjectPaths::resolve(self.root(), &PathsConfig::default())
    }

    pub fn site(&self) -> SiteConfig {
        site::load_site(&self.paths().data).unwrap()
    }

    pub fn index_data(&self) -> Value {
        site::read_object(&self.paths().data.join("index.json")).unwrap()
    }

    pub fn store_data(&self) -> Value {
        site::read_object(&self.paths().data.join("store.json")).unwrap()
    }

    /// Load all episodes from disk, newest first.
    pub fn sorted_episodes(&self) -> Vec<Episode> {
        let mut episodes = episode::load_episodes(&self.paths().episodes).unwrap();
        episode::sort_descending(&mut episodes);
        episodes
    }

    /// Fixed build time for deterministic feeds.
    pub fn now(&self) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00+00:00").unwrap()
    }

    /// Edit an episode's `episode.json` in place.
    pub fn update_episode(&self, number: u32, edit: impl FnOnce(&mut Value)) {
        let path = self.episode_dir(number).join(METADATA_FILE);
        let mut json: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        edit(&mut json);
        fs::write(&path, json.to_string()).unwrap();
    }

    /// Write a PNG into `media/images/`.
    pub fn write_image(&self, name: &str, width: u32, height: u32) {
        write_png(&self.paths().images_dir().join(name), width, height);
    }

    fn episode_dir(&self, number: u32) -> PathBuf {
        self.paths().episodes.join(format!("{number:03}"))
    }
}
