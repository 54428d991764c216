//! HTML page rendering.
//!
//! Every episode gets a page, whether or not it made it into the feed:
//!
//! ```text
//! dist/
//! ├── index.html           # site + index.json + all episodes
//! ├── store/index.html     # site + index.json + store.json
//! ├── 12/index.html        # site + episode 12
//! └── 11/index.html
//! ```
//!
//! Episode pages are independent of each other and rendered on a bounded
//! rayon pool. Each worker probes the episode's image (for `IMAGE_WIDTH` and
//! `IMAGE_HEIGHT`) and audio file before rendering, so a missing asset fails
//! the build before that episode's page is written.

use crate::assets::{self, AssetError};
use crate::config::ProjectPaths;
use crate::episode::Episode;
use crate::merge::{fill_default, merge_layers};
use crate::site::SiteConfig;
use crate::template::{EPISODE_TEMPLATE, INDEX_TEMPLATE, RenderError, STORE_TEMPLATE, Templates};
use rayon::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Episode {number}: {source}")]
    Asset { number: u32, source: AssetError },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to build template context: {0}")]
    Context(#[from] serde_json::Error),
    #[error("Failed to start render workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Progress reported while episode pages are written.
#[derive(Debug, Clone)]
pub struct PageWritten {
    pub number: u32,
    pub title: String,
    pub in_feed: bool,
    /// Output path relative to the output root.
    pub path: String,
}

/// Shared, read-only inputs for every page.
pub struct PageInputs<'a> {
    pub templates: &'a Templates,
    pub site: &'a SiteConfig,
    pub paths: &'a ProjectPaths,
    pub output_dir: &'a Path,
}

/// Build the template context for one episode page.
///
/// Layers: site config, then the episode record (episode wins). `IMAGE` and
/// `ITUNES_IMAGE` fall back to the site's `META_IMAGE` and `ITUNES_IMAGE`;
/// `IMAGE_WIDTH`/`IMAGE_HEIGHT` come from decoding the image.
pub fn episode_context(
    site: &SiteConfig,
    episode: &Episode,
    paths: &ProjectPaths,
) -> Result<Value, PageError> {
    let number = episode.number;
    let asset_err = |source| PageError::Asset { number, source };

    let image = episode.image_or(&site.meta_image);
    let dimensions = assets::probe_image(&paths.images_dir().join(image)).map_err(asset_err)?;
    let audio = assets::probe_audio(&paths.audio_dir().join(&episode.file)).map_err(asset_err)?;

    let mut context = merge_layers([&site.to_value()?, &episode.to_value()?]);
    fill_default(&mut context, "IMAGE", json!(image));
    fill_default(&mut context, "ITUNES_IMAGE", json!(site.itunes_image));
    context["IMAGE_WIDTH"] = json!(dimensions.width);
    context["IMAGE_HEIGHT"] = json!(dimensions.height);
    context["FILE_SIZE"] = json!(audio.length);
    context["FILE_TYPE"] = json!(audio.mime_type);
    Ok(context)
}

/// Render and write a single episode page to `<output>/<NUMBER>/index.html`.
pub fn render_episode_page(inputs: &PageInputs, episode: &Episode) -> Result<PageWritten, PageError> {
    let context = episode_context(inputs.site, episode, inputs.paths)?;
    let html = inputs.templates.render(EPISODE_TEMPLATE, &context)?;

    let relative = format!("{}/index.html", episode.number);
    write_page(&inputs.output_dir.join(&relative), &html)?;

    Ok(PageWritten {
        number: episode.number,
        title: episode.title.clone(),
        in_feed: episode.show_in_feed,
        path: relative,
    })
}

/// Render every episode page on a pool of `threads` workers.
///
/// Stops at the first error. Results come back in input order.
pub fn render_episode_pages(
    inputs: &PageInputs,
    episodes: &[Episode],
    threads: usize,
    progress: Option<&Sender<PageWritten>>,
) -> Result<Vec<PageWritten>, PageError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()?;

    pool.install(|| {
        episodes
            .par_iter()
            .map(|episode| {
                let written = render_episode_page(inputs, episode)?;
                if let Some(tx) = progress {
                    tx.send(written.clone()).ok();
                }
                Ok(written)
            })
            .collect()
    })
}

/// Render `index.html` from site config, index metadata, and all episodes.
pub fn render_index(
    inputs: &PageInputs,
    index_data: &Value,
    episodes: &[Episode],
) -> Result<PathBuf, PageError> {
    let episode_values = episodes
        .iter()
        .map(Episode::to_value)
        .collect::<Result<Vec<Value>, _>>()?;
    let listing = json!({ "episodes": episode_values });
    let context = merge_layers([&inputs.site.to_value()?, index_data, &listing]);

    let html = inputs.templates.render(INDEX_TEMPLATE, &context)?;
    let path = inputs.output_dir.join("index.html");
    write_page(&path, &html)?;
    Ok(path)
}

/// Render `store/index.html` from site config, index metadata, and store data.
pub fn render_store(
    inputs: &PageInputs,
    index_data: &Value,
    store_data: &Value,
) -> Result<PathBuf, PageError> {
    let context = merge_layers([&inputs.site.to_value()?, index_data, store_data]);

    let html = inputs.templates.render(STORE_TEMPLATE, &context)?;
    let path = inputs.output_dir.join("store").join("index.html");
    write_page(&path, &html)?;
    Ok(path)
}

/// Write a page, creating its directory if needed.
fn write_page(path: &Path, html: &str) -> Result<(), PageError> {
    let write_err = |source| PageError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, html).map_err(write_err)
}
