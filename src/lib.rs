//! # Podcast Press
//!
//! A static site and RSS/iTunes feed generator for podcasts. Your project
//! directory is the data source: one directory per episode, a JSON file for
//! the show itself, and three HTML templates.
//!
//! # Architecture: Load → Assemble → Render
//!
//! ```text
//! 1. Load      data/, config.toml   →  SiteConfig + Vec<Episode>
//! 2. Assemble  episodes + media/    →  Feed (inclusion marked, assets probed)
//! 3. Render    templates/           →  dist/ (pages, feed.rss, staged assets)
//! ```
//!
//! Everything is a plain function of its inputs; [`build::build`] threads
//! them together and is what the CLI calls.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` loading, merging and validation (paths, restricted markers, workers) |
//! | [`site`] | `site.json` model, URL construction, restricted-network variant |
//! | [`episode`] | Loads `data/episodes/*/` into [`episode::Episode`] records |
//! | [`feed`] | Inclusion policy, GUIDs, RSS 2.0 / iTunes XML |
//! | [`template`] | Tera wrapper, `render`/`format_date` filters, analytics stripping |
//! | [`render`] | Episode, index and store pages; parallel episode rendering |
//! | [`assets`] | Copies `public/` and `media/`; probes image dimensions and audio files |
//! | [`merge`] | Layered JSON context merging for templates |
//! | [`markdown`] | Markdown → HTML |
//! | [`dates`] | Date parsing and formatting for feeds and templates |
//! | [`build`] | Build driver and dry-run check |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Templates Are Files
//!
//! The look of the site belongs to the podcast, not to this tool, so pages
//! are rendered with [Tera](https://keats.github.io/tera/) from the project's
//! own `templates/` directory. Context keys are the upper-case JSON field
//! names exactly as written in `site.json` and `episode.json`, so a new field
//! in the data is usable in templates without code changes.
//!
//! ## The Feed Is Stable
//!
//! Feed readers remember what they've seen. GUIDs derive from title and
//! number (or are pinned explicitly), and the feed window counts blacklisted
//! episodes so pulling one doesn't drag an old episode back into view.
//!
//! ## One Source, Two Sites
//!
//! `--restricted` builds the same content for a restricted network (an onion
//! mirror): alternate base URL and meta image, no analytics snippet, a
//! smaller favicon. It's a variant of the same build, not a second
//! configuration.

pub mod assets;
pub mod build;
pub mod config;
pub mod dates;
pub mod episode;
pub mod feed;
pub mod markdown;
pub mod merge;
pub mod output;
pub mod render;
pub mod site;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;
