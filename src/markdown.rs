//! Markdown → HTML conversion.
//!
//! Used for episode `CONTENT` (embedded in the feed's `content:encoded`) and,
//! through the `render` template filter, for `NOTES`, `CONTENT` and
//! `DESCRIPTION` on pages. Raw HTML in the source passes through unchanged.

use pulldown_cmark::{Options, Parser, html as md_html};

/// Render markdown to an HTML fragment.
///
/// Tables and strikethrough are enabled; everything else is plain CommonMark.
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(source, options);
    let mut html = String::with_capacity(source.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html
}
