//! Slug/Path Deriver: turns a canonical entry's URL and path hints into a
//! relative file path following the target generator's conventions.
//!
//! Every function here is pure: the result depends only on the entry and the
//! [`SsgType`] convention table.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::config::{PageRule, SsgType};
use crate::entry::{Entry, DIR, FILE_EXT, FILE_PATH, URL_PATH};
use crate::error::{Error, Result};

const DEFAULT_PAGE_EXT: &str = ".md";

fn posts_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^_?posts/").expect("valid posts regex"))
}

fn date_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("valid date regex"))
}

fn underscores() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").expect("valid underscore regex"))
}

/// Normalizes a `stackbit_url_path` as edited by CMS users.
///
/// - a leading `/` is stripped
/// - a trailing `index` or `_index` is stripped, but only when it is the whole
///   string or directly preceded by `/`
/// - a trailing `/` is stripped
///
/// The steps are repeated until the slug no longer changes, which makes the
/// function idempotent (`"index/index"` ends up as `""`).
///
/// ```
/// use cms_pull_core::slug::normalize_slug;
/// assert_eq!(normalize_slug("my-page/index"), "my-page");
/// assert_eq!(normalize_slug("my-page/my-index"), "my-page/my-index");
/// assert_eq!(normalize_slug("_index"), "");
/// ```
pub fn normalize_slug(url: &str) -> String {
    let mut current = url;
    loop {
        let next = normalize_once(current);
        if next == current {
            return next.to_owned();
        }
        current = next;
    }
}

fn normalize_once(url: &str) -> &str {
    let url = url.strip_prefix('/').unwrap_or(url);
    let url = strip_index(url);
    url.strip_suffix('/').unwrap_or(url)
}

fn strip_index(url: &str) -> &str {
    if let Some(head) = url.strip_suffix("index") {
        let head = head.strip_suffix('_').unwrap_or(head);
        if head.is_empty() || head.ends_with('/') {
            return head;
        }
    }
    url
}

/// Relative file path of a page entry, e.g. `content/about/_index.md` for Hugo.
pub fn page_file_path(page: &Entry, ssg: &SsgType) -> Result<String> {
    let conventions = ssg.conventions();
    let url = page.get(URL_PATH).and_then(Value::as_str).unwrap_or("");
    let mut url = url.strip_prefix('/').unwrap_or(url).to_owned();

    if url.is_empty() || url.ends_with('/') {
        url.push_str("index");
    }

    match conventions.page_rule {
        PageRule::DatedPosts if posts_prefix().is_match(&url) => {
            let name = url.split('/').nth(1).unwrap_or("");
            let name = if date_prefix().is_match(name) {
                name.to_owned()
            } else {
                format!("{}-{}", post_date(page)?, name)
            };
            url = format!("_posts/{}", underscores().replace_all(&name, "-"));
        }
        PageRule::UnderscoreIndex if url == "index" || url.ends_with("/index") => {
            url.truncate(url.len() - "index".len());
            url.push_str("_index");
        }
        _ => {}
    }

    let pages_dir = page
        .get(DIR)
        .and_then(Value::as_str)
        .unwrap_or(conventions.pages_dir);

    let ext = page
        .get(FILE_EXT)
        .and_then(Value::as_str)
        .filter(|ext| !ext.is_empty())
        .unwrap_or(DEFAULT_PAGE_EXT);

    Ok(join_path(pages_dir, &url) + ext)
}

/// Relative file path of a data entry, or `None` when the entry names no file.
///
/// An explicit `stackbit_file_path` is placed under the data directory unless it
/// already starts with it, which keeps older exports with full paths working.
pub fn data_file_path(data: &Entry, ssg: &SsgType) -> Option<String> {
    let file_path = data
        .get(FILE_PATH)
        .and_then(Value::as_str)
        .filter(|path| !path.is_empty())?;

    let data_dir = if data.contains_key(DIR) {
        data.get(DIR).and_then(Value::as_str)
    } else {
        ssg.conventions().data_dir
    };

    match data_dir {
        Some(dir) if !dir.is_empty() && !file_path.starts_with(dir) => {
            Some(join_path(dir, file_path))
        }
        _ => Some(file_path.to_owned()),
    }
}

/// Record path made relative to the output root. Leading `/` and empty or `.`
/// segments are dropped, and `..` never climbs above the root.
pub fn rooted_path(path: &str) -> String {
    join_path("", path)
        .split('/')
        .skip_while(|segment| *segment == "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Joins two relative paths with `/`, dropping empty and `.` segments and
/// resolving `..` against what precedes it.
fn join_path(dir: &str, rel: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(rel.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn post_date(page: &Entry) -> Result<String> {
    let date = match page.get("date") {
        Some(Value::String(raw)) => parse_date(raw),
        Some(Value::Number(millis)) => millis
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|date| date.date_naive()),
        _ => None,
    };
    date.map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| Error::PathDerivation {
            reason: format!(
                "post '{}' needs a valid 'date' field to build its file name",
                page.get(URL_PATH).and_then(Value::as_str).unwrap_or("")
            ),
        })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc).date_naive());
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(date.date());
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(date.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
