//! Build driver: runs the full pipeline from project root to output tree.
//!
//! ```text
//! config.toml ─┐
//! site.json ───┼─▶ stage public/ + media/ ─▶ load + sort episodes
//! index.json   │                              │
//! store.json ──┘                              ▼
//!                                 mark inclusion + assemble feed
//!                                             │
//!                      ┌──────────────────────┼──────────────┐
//!                      ▼                      ▼              ▼
//!              <NUMBER>/index.html   index.html, store/   feed.rss
//! ```
//!
//! Phases run in order and the first error aborts the build. Only episode
//! page rendering is parallel. Anything already written stays on disk; the
//! output directory is never cleaned.
//!
//! ## Restricted builds
//!
//! With `restricted` set, the site config is swapped for its restricted
//! variant ([`SiteConfig::restricted`]), the analytics block is stripped from
//! every template before compilation, and the small favicon replaces the
//! regular one in the output root.

use crate::assets::{self, AssetError};
use crate::config::{self, BuildConfig, ConfigError, ProjectPaths};
use crate::episode::{self, Episode, LoadError};
use crate::feed::{self, Feed, FeedError};
use crate::render::{self, PageError, PageInputs, PageWritten};
use crate::site::{self, SiteConfig, SiteError};
use crate::template::{ALL_TEMPLATES, MarkerPair, RenderError, Templates};
use chrono::{DateTime, FixedOffset, Local};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

pub const FEED_FILE: &str = "feed.rss";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Site(#[from] SiteError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What to build and where.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Project root containing `data/`, `templates/`, `public/`, `media/`.
    pub root: PathBuf,
    /// Output directory. Relative paths are taken as-is (relative to the
    /// working directory), like every other CLI path.
    pub output: PathBuf,
    /// Build the restricted-network variant.
    pub restricted: bool,
}

/// Progress reported while a build runs.
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// A source directory was copied into the output root.
    Staged { label: String, files: usize },
    /// Feed assembled; `included` lists `(NUMBER, TITLE)` newest first.
    FeedAssembled {
        included: Vec<(u32, String)>,
        excluded: usize,
    },
    Page(PageWritten),
    /// A non-episode file was written (`index.html`, `feed.rss`, ...).
    Written { path: String },
    FaviconSwapped { favicon: String },
}

/// Totals for a finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub output: PathBuf,
    pub episodes: usize,
    pub feed_items: usize,
    pub pages: usize,
    pub staged_files: usize,
    pub restricted: bool,
}

/// Everything loaded from the project root before anything is written.
struct Project {
    config: BuildConfig,
    paths: ProjectPaths,
    site: SiteConfig,
    index_data: Value,
    store_data: Value,
}

fn load_project(root: &Path, restricted: bool) -> Result<Project, BuildError> {
    let config = config::load_config(root)?;
    let paths = ProjectPaths::resolve(root, &config.paths);

    let mut site = site::load_site(&paths.data)?;
    if restricted {
        site = site.restricted()?;
    }
    let index_data = site::read_object(&paths.data.join("index.json"))?;
    let store_data = site::read_object(&paths.data.join("store.json"))?;

    Ok(Project {
        config,
        paths,
        site,
        index_data,
        store_data,
    })
}

fn load_sorted_episodes(paths: &ProjectPaths) -> Result<Vec<Episode>, BuildError> {
    let mut episodes = episode::load_episodes(&paths.episodes)?;
    episode::sort_descending(&mut episodes);
    Ok(episodes)
}

fn load_templates(project: &Project, restricted: bool) -> Result<Templates, BuildError> {
    let markers = restricted.then(|| MarkerPair {
        start: project.config.restricted.analytics_start.clone(),
        end: project.config.restricted.analytics_end.clone(),
    });
    Ok(Templates::load(
        &project.paths.templates,
        ALL_TEMPLATES,
        markers.as_ref(),
    )?)
}

fn feed_event(feed: &Feed, total: usize) -> BuildEvent {
    BuildEvent::FeedAssembled {
        included: feed
            .items
            .iter()
            .map(|item| (item.number, item.title.clone()))
            .collect(),
        excluded: total - feed.items.len(),
    }
}

/// Run the full build with the current local time as the feed's build date.
pub fn build(
    options: &BuildOptions,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildSummary, BuildError> {
    build_at(options, Local::now().fixed_offset(), events)
}

/// Run the full build with an explicit build time.
pub fn build_at(
    options: &BuildOptions,
    now: DateTime<FixedOffset>,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildSummary, BuildError> {
    let emit = |event: BuildEvent| {
        if let Some(tx) = &events {
            tx.send(event).ok();
        }
    };

    let project = load_project(&options.root, options.restricted)?;
    let templates = load_templates(&project, options.restricted)?;

    let output = options.output.as_path();
    fs::create_dir_all(output).map_err(|source| BuildError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    let mut staged_files = 0;
    for (label, dir) in [
        ("public", &project.paths.public),
        ("media", &project.paths.media),
    ] {
        let files = assets::stage_dir(dir, output)?;
        staged_files += files;
        emit(BuildEvent::Staged {
            label: label.to_string(),
            files,
        });
    }

    let mut episodes = load_sorted_episodes(&project.paths)?;
    let feed = feed::assemble(&project.site, &mut episodes, &project.paths, now)?;
    emit(feed_event(&feed, episodes.len()));

    let inputs = PageInputs {
        templates: &templates,
        site: &project.site,
        paths: &project.paths,
        output_dir: output,
    };
    let threads = config::effective_threads(&project.config.processing);
    let pages = render_pages(&inputs, &episodes, threads, events.as_ref())?;

    render::render_index(&inputs, &project.index_data, &episodes)?;
    emit(BuildEvent::Written {
        path: "index.html".to_string(),
    });
    render::render_store(&inputs, &project.index_data, &project.store_data)?;
    emit(BuildEvent::Written {
        path: "store/index.html".to_string(),
    });

    let feed_path = output.join(FEED_FILE);
    fs::write(&feed_path, feed.to_xml()?).map_err(|source| BuildError::Io {
        path: feed_path.clone(),
        source,
    })?;
    emit(BuildEvent::Written {
        path: FEED_FILE.to_string(),
    });

    if options.restricted {
        let favicons = &project.config.restricted;
        if assets::swap_favicon(output, &favicons.favicon, &favicons.small_favicon)? {
            emit(BuildEvent::FaviconSwapped {
                favicon: favicons.favicon.clone(),
            });
        }
    }

    Ok(BuildSummary {
        output: output.to_path_buf(),
        episodes: episodes.len(),
        feed_items: feed.items.len(),
        pages,
        staged_files,
        restricted: options.restricted,
    })
}

/// Render episode pages, forwarding per-page progress as build events.
fn render_pages(
    inputs: &PageInputs,
    episodes: &[Episode],
    threads: usize,
    events: Option<&Sender<BuildEvent>>,
) -> Result<usize, BuildError> {
    let Some(events) = events else {
        return Ok(render::render_episode_pages(inputs, episodes, threads, None)?.len());
    };

    let (tx, rx) = std::sync::mpsc::channel::<PageWritten>();
    let forward = events.clone();
    let forwarder = std::thread::spawn(move || {
        for page in rx {
            forward.send(BuildEvent::Page(page)).ok();
        }
    });
    let result = render::render_episode_pages(inputs, episodes, threads, Some(&tx));
    drop(tx);
    forwarder.join().ok();
    Ok(result?.len())
}

/// Outcome of a dry run.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub site_name: String,
    pub site_url: String,
    pub restricted: bool,
    pub episodes: usize,
    /// `(NUMBER, TITLE)` of every feed item, newest first.
    pub feed: Vec<(u32, String)>,
    pub templates: Vec<String>,
}

/// Validate the project without writing anything.
///
/// Loads config, site data, templates and episodes, then assembles the feed,
/// which probes every included episode's audio and image.
pub fn check(options: &BuildOptions) -> Result<CheckReport, BuildError> {
    let project = load_project(&options.root, options.restricted)?;
    load_templates(&project, options.restricted)?;

    let mut episodes = load_sorted_episodes(&project.paths)?;
    let feed = feed::assemble(
        &project.site,
        &mut episodes,
        &project.paths,
        Local::now().fixed_offset(),
    )?;

    Ok(CheckReport {
        site_name: project.site.site_name.clone(),
        site_url: project.site.site_url.clone(),
        restricted: options.restricted,
        episodes: episodes.len(),
        feed: feed
            .items
            .iter()
            .map(|item| (item.number, item.title.clone()))
            .collect(),
        templates: ALL_TEMPLATES.iter().map(|t| t.to_string()).collect(),
    })
}
