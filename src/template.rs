//! Template loading and rendering, wrapping Tera.
//!
//! Templates live in `templates/` and are compiled once per build:
//!
//! | Template | Output |
//! |----------|--------|
//! | `episode.html` | `<NUMBER>/index.html` for every episode |
//! | `index.html` | `index.html` |
//! | `store.html` | `store/index.html` |
//!
//! Context keys are the upper-case JSON field names (`{{ SITE_NAME }}`,
//! `{{ TITLE }}`, `{{ NOTES }}`). Two filters are registered:
//!
//! - `render` — markdown → HTML, marked safe: `{{ NOTES | render }}`
//! - `format_date` — ISO-8601 → `YYYY-MM-DD`: `{{ DATE | format_date }}`
//!
//! Undefined variables are render errors; nothing is silently substituted.
//!
//! For the restricted-network build every template source is passed through
//! [`strip_marked_block`] before compilation, removing the analytics snippet.

use crate::dates;
use crate::markdown::render_markdown;
use regex::{NoExpand, Regex};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use thiserror::Error;

pub const EPISODE_TEMPLATE: &str = "episode.html";
pub const INDEX_TEMPLATE: &str = "index.html";
pub const STORE_TEMPLATE: &str = "store.html";

pub const ALL_TEMPLATES: &[&str] = &[EPISODE_TEMPLATE, INDEX_TEMPLATE, STORE_TEMPLATE];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Template {name}: {detail}")]
    Template { name: String, detail: String },
    #[error("Cannot match marker pair {start:?} … {end:?}: {source}")]
    Markers {
        start: String,
        end: String,
        source: regex::Error,
    },
}

impl RenderError {
    /// Flatten a Tera error and its causes into one message.
    ///
    /// Tera's top-level message is usually just "Failed to render 'x'"; the
    /// useful part (which variable, which line) is in the source chain.
    fn from_tera(name: &str, err: tera::Error) -> Self {
        let mut detail = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        RenderError::Template {
            name: name.to_string(),
            detail,
        }
    }
}

/// Remove the first block delimited by `start` … `end` (markers included).
///
/// The match is non-greedy and spans newlines. Only the first block is
/// removed; a source without both markers is returned unchanged. Fails only
/// when the markers are too large to compile into a pattern.
pub fn strip_marked_block<'a>(
    source: &'a str,
    start: &str,
    end: &str,
) -> Result<Cow<'a, str>, RenderError> {
    let pattern = format!("(?s){}.*?{}", regex::escape(start), regex::escape(end));
    let re = Regex::new(&pattern).map_err(|source| RenderError::Markers {
        start: start.to_string(),
        end: end.to_string(),
        source,
    })?;
    Ok(re.replace(source, NoExpand("")))
}

/// A start/end marker pair delimiting a block to strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    pub start: String,
    pub end: String,
}

/// Compiled templates plus the registered helper filters.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Load and compile the named templates from `dir`.
    ///
    /// When `strip` is set, each source has its marked block removed first.
    pub fn load(dir: &Path, names: &[&str], strip: Option<&MarkerPair>) -> Result<Self, RenderError> {
        let mut sources = Vec::with_capacity(names.len());
        for name in names {
            let path = dir.join(name);
            let source = fs::read_to_string(&path).map_err(|source| RenderError::Io {
                path: path.clone(),
                source,
            })?;
            sources.push((name.to_string(), source));
        }
        Self::from_sources(&sources, strip)
    }

    /// Compile templates from in-memory `(name, source)` pairs.
    pub fn from_sources(
        sources: &[(String, String)],
        strip: Option<&MarkerPair>,
    ) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.register_filter("render", RenderFilter);
        tera.register_filter("format_date", format_date_filter);

        for (name, source) in sources {
            let source = match strip {
                Some(markers) => strip_marked_block(source, &markers.start, &markers.end)?,
                None => Cow::Borrowed(source.as_str()),
            };
            tera.add_raw_template(name, &source)
                .map_err(|e| RenderError::from_tera(name, e))?;
        }
        Ok(Self { tera })
    }

    /// Render `name` with a JSON object as its context.
    pub fn render(&self, name: &str, context: &Value) -> Result<String, RenderError> {
        let context = Context::from_value(context.clone()).map_err(|e| RenderError::from_tera(name, e))?;
        self.tera
            .render(name, &context)
            .map_err(|e| RenderError::from_tera(name, e))
    }
}

/// `render` filter: markdown string → HTML. Output is not re-escaped.
struct RenderFilter;

impl tera::Filter for RenderFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        match value {
            Value::String(source) => Ok(Value::String(render_markdown(source))),
            Value::Null => Ok(Value::String(String::new())),
            other => Err(tera::Error::msg(format!(
                "render expects a markdown string, got {other}"
            ))),
        }
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// `format_date` filter: ISO-8601 string → `YYYY-MM-DD`.
fn format_date_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = value
        .as_str()
        .ok_or_else(|| tera::Error::msg(format!("format_date expects a string, got {value}")))?;
    dates::format_date(raw)
        .map(Value::String)
        .map_err(|e| tera::Error::msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(name: &str, source: &str, strip: Option<&MarkerPair>) -> Templates {
        Templates::from_sources(&[(name.to_string(), source.to_string())], strip).unwrap()
    }

    fn ga_markers() -> MarkerPair {
        MarkerPair {
            start: "<!--GA-->".into(),
            end: "<!--/GA-->".into(),
        }
    }

    // =========================================================================
    // strip_marked_block
    // =========================================================================

    #[test]
    fn strip_removes_marked_block() {
        let source = "<head>\n<!--GA-->\n<script>track()</script>\n<!--/GA-->\n</head>";
        assert_eq!(
            strip_marked_block(source, "<!--GA-->", "<!--/GA-->").unwrap(),
            "<head>\n\n</head>"
        );
    }

    #[test]
    fn strip_without_marker_is_unchanged() {
        let source = "<head><title>x</title></head>";
        let stripped = strip_marked_block(source, "<!--GA-->", "<!--/GA-->").unwrap();
        assert_eq!(stripped, source);
        assert!(matches!(stripped, Cow::Borrowed(_)));
    }

    #[test]
    fn strip_removes_only_first_block() {
        let source = "a<!--GA-->1<!--/GA-->b<!--GA-->2<!--/GA-->c";
        assert_eq!(
            strip_marked_block(source, "<!--GA-->", "<!--/GA-->").unwrap(),
            "ab<!--GA-->2<!--/GA-->c"
        );
    }

    #[test]
    fn strip_is_non_greedy_across_lines() {
        let source = "<!--GA-->\nx\n<!--/GA-->\nkeep\n<!--/GA-->";
        assert_eq!(
            strip_marked_block(source, "<!--GA-->", "<!--/GA-->").unwrap(),
            "\nkeep\n<!--/GA-->"
        );
    }

    #[test]
    fn strip_requires_both_markers() {
        let source = "<!--GA--> never closed";
        assert_eq!(strip_marked_block(source, "<!--GA-->", "<!--/GA-->").unwrap(), source);
    }

    #[test]
    fn strip_treats_markers_literally() {
        let source = "[a](b) (.*) [a](b)";
        assert_eq!(strip_marked_block(source, "(.*)", "[a](b)").unwrap(), "[a](b) ");
    }

    #[test]
    fn oversized_markers_are_an_error() {
        let huge = "x".repeat(1 << 20);
        let err = strip_marked_block("<head></head>", &huge, "<!--/GA-->").unwrap_err();
        assert!(matches!(err, RenderError::Markers { .. }));
    }

    #[test]
    fn oversized_markers_fail_compilation() {
        let markers = MarkerPair {
            start: "x".repeat(1 << 20),
            end: "<!--/GA-->".into(),
        };
        let result = Templates::from_sources(
            &[("page.html".to_string(), "<head></head>".to_string())],
            Some(&markers),
        );
        assert!(matches!(result, Err(RenderError::Markers { .. })));
    }

    // =========================================================================
    // Templates
    // =========================================================================

    #[test]
    fn renders_context_values() {
        let t = compile("page.html", "<h1>{{ TITLE }}</h1>", None);
        let out = t.render("page.html", &json!({"TITLE": "Pilot"})).unwrap();
        assert_eq!(out, "<h1>Pilot</h1>");
    }

    #[test]
    fn html_templates_autoescape() {
        let t = compile("page.html", "{{ TITLE }}", None);
        let out = t.render("page.html", &json!({"TITLE": "Q&A"})).unwrap();
        assert_eq!(out, "Q&amp;A");
    }

    #[test]
    fn render_filter_outputs_unescaped_html() {
        let t = compile("page.html", "{{ NOTES | render }}", None);
        let out = t.render("page.html", &json!({"NOTES": "Hello *there*"})).unwrap();
        assert_eq!(out, "<p>Hello <em>there</em></p>\n");
    }

    #[test]
    fn format_date_filter_formats_iso_dates() {
        let t = compile("page.html", "{{ DATE | format_date }}", None);
        let out = t
            .render("page.html", &json!({"DATE": "2021-03-05T10:00:00Z"}))
            .unwrap();
        assert_eq!(out, "2021-03-05");
    }

    #[test]
    fn format_date_filter_rejects_bad_dates() {
        let t = compile("page.html", "{{ DATE | format_date }}", None);
        let err = t.render("page.html", &json!({"DATE": "soon"})).unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn undefined_variable_is_error() {
        let t = compile("page.html", "{{ MISSING_FIELD }}", None);
        let err = t.render("page.html", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Template { ref name, .. } if name == "page.html"));
        assert!(err.to_string().contains("MISSING_FIELD"));
    }

    #[test]
    fn syntax_error_fails_compilation() {
        let result = Templates::from_sources(
            &[("bad.html".to_string(), "{% if %}".to_string())],
            None,
        );
        assert!(matches!(result, Err(RenderError::Template { .. })));
    }

    #[test]
    fn strip_applies_before_compilation() {
        // The analytics block contains invalid Tera syntax; stripping must
        // happen first or compilation would fail.
        let source = "<head><!--GA-->{{ broken <!--/GA--></head>";
        let t = compile("page.html", source, Some(&ga_markers()));
        assert_eq!(t.render("page.html", &json!({})).unwrap(), "<head></head>");
    }

    #[test]
    fn no_strip_keeps_analytics() {
        let source = "<head><!--GA--><script></script><!--/GA--></head>";
        let t = compile("page.html", source, None);
        assert_eq!(t.render("page.html", &json!({})).unwrap(), source);
    }

    #[test]
    fn load_reads_named_templates() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join(INDEX_TEMPLATE), "{{ SITE_NAME }}").unwrap();
        let t = Templates::load(tmp.path(), &[INDEX_TEMPLATE], None).unwrap();
        assert_eq!(
            t.render(INDEX_TEMPLATE, &json!({"SITE_NAME": "Show"})).unwrap(),
            "Show"
        );
    }

    #[test]
    fn load_missing_template_is_io_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            Templates::load(tmp.path(), &[STORE_TEMPLATE], None),
            Err(RenderError::Io { .. })
        ));
    }
}
