//! RSS 2.0 / iTunes feed assembly.
//!
//! ## Inclusion policy
//!
//! Episodes arrive sorted by `NUMBER`, newest first. Each episode's position
//! `i` in that *full* list decides whether it fits under `FEED_LIMIT`:
//!
//! ```text
//! FEED_LIMIT = 3, blacklist = {4}
//!
//! i   NUMBER  blacklisted  i < 3   SHOW_IN_FEED
//! 0   5       no           yes     yes
//! 1   4       yes          yes     no   ← excluded, but still uses slot 1
//! 2   3       no           yes     yes
//! 3   2       no           no      no
//! ```
//!
//! Blacklisted episodes consume a slot even though they never appear. This
//! keeps the visible window stable when an episode is pulled from the feed
//! after publication; changing it would reshuffle which old episodes
//! subscribers see.
//!
//! ## GUIDs
//!
//! Feed readers deduplicate on `<guid>`, so an episode's GUID must never change
//! between builds. An explicit `GUID` wins; otherwise one is derived from the
//! SHA-256 of `TITLE + NUMBER` (see [`derive_guid`]). Retitling an episode
//! without pinning its GUID will make it reappear as new.
//!
//! ## Output shape
//!
//! ```text
//! <rss version="2.0" xmlns:itunes=… xmlns:content=… xmlns:atom=… xmlns:dc=…>
//!   <channel>
//!     title, description, link, image, generator, lastBuildDate, atom:link,
//!     copyright, language, managingEditor, webMaster, pubDate, category*,
//!     itunes:author, itunes:summary, itunes:owner, itunes:explicit,
//!     itunes:category*, itunes:image, itunes:new-feed-url
//!     <item>
//!       title, description, link, guid, pubDate, enclosure,
//!       content:encoded, itunes:summary, itunes:image, itunes:explicit
//!     </item>…
//! ```

use crate::assets::{self, AssetError};
use crate::config::ProjectPaths;
use crate::dates::{self, DateError};
use crate::episode::Episode;
use crate::markdown::render_markdown;
use crate::site::{ItunesCategory, SiteConfig};
use chrono::{DateTime, FixedOffset};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub const GENERATOR: &str = concat!("podcast-press ", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Episode {number}: {source}")]
    Asset { number: u32, source: AssetError },
    #[error("Episode {number}: invalid DATE: {source}")]
    InvalidDate { number: u32, source: DateError },
    #[error("Failed to write feed XML: {0}")]
    Io(#[from] io::Error),
    #[error("Feed XML is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Audio attachment of a feed item.
#[derive(Debug, Clone, PartialEq)]
pub struct Enclosure {
    pub url: String,
    /// Local file the length and type were probed from.
    pub path: PathBuf,
    pub length: u64,
    pub mime_type: String,
}

/// One `<item>` in the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub number: u32,
    pub title: String,
    pub url: String,
    pub description: String,
    pub guid: String,
    pub date: DateTime<FixedOffset>,
    pub enclosure: Enclosure,
    pub image_url: String,
    pub explicit: bool,
    /// `CONTENT` rendered from markdown.
    pub content_html: String,
}

/// The assembled channel and its items, ready to serialize.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub feed_url: String,
    pub site_url: String,
    pub image_url: String,
    pub managing_editor: Option<String>,
    pub webmaster: Option<String>,
    pub copyright: Option<String>,
    pub language: Option<String>,
    pub categories: Vec<String>,
    pub pub_date: DateTime<FixedOffset>,
    pub itunes_author: String,
    pub itunes_email: String,
    pub itunes_categories: Vec<ItunesCategory>,
    pub itunes_image: String,
    pub explicit: bool,
    pub items: Vec<FeedItem>,
}

/// Derive a stable UUID-shaped GUID from an episode's title and number.
///
/// The first 32 hex characters of `sha256(title + number)`, grouped 8-4-4-4-12.
pub fn derive_guid(title: &str, number: u32) -> String {
    let digest = Sha256::digest(format!("{title}{number}").as_bytes());
    let hex = format!("{:x}", digest);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Set `SHOW_IN_FEED` on every episode.
///
/// `episodes` must already be sorted newest first. See the module docs for
/// why blacklisted episodes still count toward the limit.
pub fn mark_feed_inclusion(
    episodes: &mut [Episode],
    limit: Option<usize>,
    blacklist: &BTreeSet<u32>,
) {
    for (i, episode) in episodes.iter_mut().enumerate() {
        episode.show_in_feed =
            !blacklist.contains(&episode.number) && limit.is_none_or(|limit| i < limit);
    }
}

/// Assemble the feed from the site config and the sorted episode list.
///
/// Marks `SHOW_IN_FEED` on the episodes as a side effect so page templates
/// can use it. Every included item's audio file must exist and its image
/// must decode; either failure aborts assembly.
pub fn assemble(
    site: &SiteConfig,
    episodes: &mut [Episode],
    paths: &ProjectPaths,
    now: DateTime<FixedOffset>,
) -> Result<Feed, FeedError> {
    mark_feed_inclusion(episodes, site.effective_feed_limit(), &site.blacklist);

    let items = episodes
        .iter()
        .filter(|episode| episode.show_in_feed)
        .map(|episode| build_item(site, episode, paths))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Feed {
        title: site.site_name.clone(),
        description: site.meta_description.clone(),
        feed_url: site.feed_url(),
        site_url: site.site_url.clone(),
        image_url: site.image_url(&site.meta_image),
        managing_editor: site.managing_editor.clone(),
        webmaster: site.webmaster.clone(),
        copyright: site.copyright.clone(),
        language: site.language.clone(),
        categories: site.categories.clone(),
        pub_date: now,
        itunes_author: site.author.clone(),
        itunes_email: site.email.clone(),
        itunes_categories: site.itunes_category.clone(),
        itunes_image: site.image_url(&site.itunes_image),
        explicit: site.explicit,
        items,
    })
}

fn build_item(
    site: &SiteConfig,
    episode: &Episode,
    paths: &ProjectPaths,
) -> Result<FeedItem, FeedError> {
    let number = episode.number;
    let asset_err = |source| FeedError::Asset { number, source };

    let audio = assets::probe_audio(&paths.audio_dir().join(&episode.file)).map_err(asset_err)?;
    let image = episode.image_or(&site.meta_image);
    assets::probe_image(&paths.images_dir().join(image)).map_err(asset_err)?;

    let date = match episode.explicit_date() {
        Some(raw) => dates::parse_date(raw)
            .map_err(|source| FeedError::InvalidDate { number, source })?,
        None => audio.created,
    };

    Ok(FeedItem {
        number,
        title: episode.title.clone(),
        url: site.episode_url(number),
        description: episode.description.clone(),
        guid: episode
            .explicit_guid()
            .map(str::to_string)
            .unwrap_or_else(|| derive_guid(&episode.title, number)),
        date,
        enclosure: Enclosure {
            url: site.audio_url(&episode.file),
            path: audio.path,
            length: audio.length,
            mime_type: audio.mime_type,
        },
        image_url: site.image_url(image),
        explicit: episode.explicit.unwrap_or(site.explicit),
        content_html: render_markdown(&episode.content),
    })
}

// ============================================================================
// XML serialization
// ============================================================================

const NAMESPACES: &[(&str, &str)] = &[
    ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
    ("xmlns:content", "http://purl.org/rss/1.0/modules/content/"),
    ("xmlns:atom", "http://www.w3.org/2005/Atom"),
    ("xmlns:itunes", "http://www.itunes.com/dtds/podcast-1.0.dtd"),
];

impl Feed {
    /// Serialize as an indented RSS 2.0 document.
    pub fn to_xml(&self) -> Result<String, FeedError> {
        let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut rss_attrs = vec![("version", "2.0")];
        rss_attrs.extend_from_slice(NAMESPACES);
        start(&mut w, "rss", &rss_attrs)?;
        start(&mut w, "channel", &[])?;

        cdata_element(&mut w, "title", &self.title)?;
        cdata_element(&mut w, "description", &self.description)?;
        text_element(&mut w, "link", &self.site_url)?;

        start(&mut w, "image", &[])?;
        text_element(&mut w, "url", &self.image_url)?;
        text_element(&mut w, "title", &self.title)?;
        text_element(&mut w, "link", &self.site_url)?;
        end(&mut w, "image")?;

        text_element(&mut w, "generator", GENERATOR)?;
        let pub_date = dates::rfc2822(&self.pub_date);
        text_element(&mut w, "lastBuildDate", &pub_date)?;
        empty(
            &mut w,
            "atom:link",
            &[
                ("href", self.feed_url.as_str()),
                ("rel", "self"),
                ("type", "application/rss+xml"),
            ],
        )?;
        optional_element(&mut w, "copyright", self.copyright.as_deref())?;
        optional_element(&mut w, "language", self.language.as_deref())?;
        optional_element(&mut w, "managingEditor", self.managing_editor.as_deref())?;
        optional_element(&mut w, "webMaster", self.webmaster.as_deref())?;
        text_element(&mut w, "pubDate", &pub_date)?;
        for category in &self.categories {
            cdata_element(&mut w, "category", category)?;
        }

        text_element(&mut w, "itunes:author", &self.itunes_author)?;
        text_element(&mut w, "itunes:summary", &self.description)?;
        start(&mut w, "itunes:owner", &[])?;
        text_element(&mut w, "itunes:name", &self.itunes_author)?;
        text_element(&mut w, "itunes:email", &self.itunes_email)?;
        end(&mut w, "itunes:owner")?;
        text_element(&mut w, "itunes:explicit", explicit_value(self.explicit))?;
        for category in &self.itunes_categories {
            itunes_category(&mut w, category)?;
        }
        empty(&mut w, "itunes:image", &[("href", self.itunes_image.as_str())])?;
        text_element(&mut w, "itunes:new-feed-url", &self.feed_url)?;

        for item in &self.items {
            write_item(&mut w, item)?;
        }

        end(&mut w, "channel")?;
        end(&mut w, "rss")?;

        Ok(String::from_utf8(w.into_inner())?)
    }
}

fn write_item(w: &mut Writer<Vec<u8>>, item: &FeedItem) -> Result<(), FeedError> {
    start(w, "item", &[])?;
    cdata_element(w, "title", &item.title)?;
    cdata_element(w, "description", &item.description)?;
    text_element(w, "link", &item.url)?;
    start(w, "guid", &[("isPermaLink", "false")])?;
    w.write_event(Event::Text(BytesText::new(&item.guid)))?;
    end(w, "guid")?;
    text_element(w, "pubDate", &dates::rfc2822(&item.date))?;
    let length = item.enclosure.length.to_string();
    empty(
        w,
        "enclosure",
        &[
            ("url", item.enclosure.url.as_str()),
            ("length", length.as_str()),
            ("type", item.enclosure.mime_type.as_str()),
        ],
    )?;
    cdata_element(w, "content:encoded", &item.content_html)?;
    text_element(w, "itunes:summary", &item.description)?;
    empty(w, "itunes:image", &[("href", item.image_url.as_str())])?;
    text_element(w, "itunes:explicit", explicit_value(item.explicit))?;
    end(w, "item")
}

fn itunes_category(w: &mut Writer<Vec<u8>>, category: &ItunesCategory) -> Result<(), FeedError> {
    let attrs = [("text", category.text())];
    if category.subcategories().is_empty() {
        return empty(w, "itunes:category", &attrs);
    }
    start(w, "itunes:category", &attrs)?;
    for sub in category.subcategories() {
        itunes_category(w, sub)?;
    }
    end(w, "itunes:category")
}

fn explicit_value(explicit: bool) -> &'static str {
    if explicit { "true" } else { "false" }
}

fn start(w: &mut Writer<Vec<u8>>, name: &str, attrs: &[(&str, &str)]) -> Result<(), FeedError> {
    let mut element = BytesStart::new(name);
    for &attr in attrs {
        element.push_attribute(attr);
    }
    w.write_event(Event::Start(element))?;
    Ok(())
}

fn end(w: &mut Writer<Vec<u8>>, name: &str) -> Result<(), FeedError> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn empty(w: &mut Writer<Vec<u8>>, name: &str, attrs: &[(&str, &str)]) -> Result<(), FeedError> {
    let mut element = BytesStart::new(name);
    for &attr in attrs {
        element.push_attribute(attr);
    }
    w.write_event(Event::Empty(element))?;
    Ok(())
}

fn text_element(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), FeedError> {
    start(w, name, &[])?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    end(w, name)
}

fn optional_element(
    w: &mut Writer<Vec<u8>>,
    name: &str,
    text: Option<&str>,
) -> Result<(), FeedError> {
    match text {
        Some(text) if !text.is_empty() => text_element(w, name, text),
        _ => Ok(()),
    }
}

/// Write `text` as CDATA. A literal `]]>` is split across two sections.
fn cdata_element(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), FeedError> {
    let safe = text.replace("]]>", "]]]]><![CDATA[>");
    start(w, name, &[])?;
    w.write_event(Event::CData(BytesCData::new(safe.as_str())))?;
    end(w, name)
}
