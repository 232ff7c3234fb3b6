//! Extension-driven serialization and parsing of output files.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::entry::Entry;
use crate::error::FormatError;

/// Key whose value becomes the body of markdown and html files.
pub const CONTENT_KEY: &str = "content";

/// File formats the materializer knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
    Toml,
    Markdown,
    Html,
}

impl FileFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "yml" | "yaml" => Some(FileFormat::Yaml),
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "md" => Some(FileFormat::Markdown),
            "html" => Some(FileFormat::Html),
            _ => None,
        }
    }

    /// Structured formats are merged into existing local files; the others
    /// replace them.
    pub fn is_structured(&self) -> bool {
        matches!(self, FileFormat::Yaml | FileFormat::Json | FileFormat::Toml)
    }

    /// Serializes an entry for a file of this format.
    pub fn serialize(&self, data: &Entry) -> Result<String, FormatError> {
        match self {
            FileFormat::Yaml => Ok(serde_yaml::to_string(data)?),
            FileFormat::Json => to_json(data),
            FileFormat::Toml => Ok(toml::to_string(&prune_nulls(data))?),
            FileFormat::Markdown => markdown(data),
            FileFormat::Html => Ok(content_of(data)),
        }
    }

    /// Parses a structured document into its top-level mapping.
    ///
    /// `Ok(None)` stands for an empty document.
    pub fn parse(&self, text: &str) -> Result<Option<Map<String, Value>>, FormatError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = match self {
            FileFormat::Yaml => serde_yaml::from_str(text)?,
            FileFormat::Json => serde_json::from_str(text)?,
            FileFormat::Toml => toml::from_str(text)?,
            FileFormat::Markdown | FileFormat::Html => {
                return Err(FormatError::Unsupported(self.extension().to_owned()))
            }
        };
        match value {
            Value::Object(map) => Ok(Some(map)),
            Value::Null => Ok(None),
            _ => Err(FormatError::NotAMapping),
        }
    }

    /// Reprints a structured document with this crate's serializer, so text
    /// produced elsewhere is written in the same bytes a later merge produces.
    /// Empty documents are kept as they are.
    pub fn normalize(&self, text: &str) -> Result<String, FormatError> {
        match self {
            FileFormat::Toml => match parse_toml(text)? {
                Some(table) => Ok(toml::to_string(&table)?),
                None => Ok(text.to_owned()),
            },
            FileFormat::Yaml | FileFormat::Json => match self.parse(text)? {
                Some(map) => self.serialize(&map),
                None => Ok(text.to_owned()),
            },
            FileFormat::Markdown | FileFormat::Html => Ok(text.to_owned()),
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            FileFormat::Yaml => "yml",
            FileFormat::Json => "json",
            FileFormat::Toml => "toml",
            FileFormat::Markdown => "md",
            FileFormat::Html => "html",
        }
    }
}

/// Parses a TOML document into its own value model, keeping datetimes intact.
///
/// `Ok(None)` stands for an empty document.
pub fn parse_toml(text: &str) -> Result<Option<toml::Table>, FormatError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(toml::from_str(text)?))
}

/// Extension of a path without the dot, or an empty string.
pub fn extension_of(path: &str) -> &str {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
}

fn to_json(data: &Entry) -> Result<String, FormatError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    data.serialize(&mut serializer)?;
    // serde_json only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn markdown(data: &Entry) -> Result<String, FormatError> {
    let frontmatter: Entry = data
        .iter()
        .filter(|(key, _)| key.as_str() != CONTENT_KEY)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let frontmatter = serde_yaml::to_string(&frontmatter)?;
    Ok(format!("---\n{frontmatter}---\n{}", content_of(data)))
}

fn content_of(data: &Entry) -> String {
    match data.get(CONTENT_KEY) {
        Some(Value::String(content)) => content.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

// TOML has no null
fn prune_nulls(data: &Entry) -> Entry {
    data.iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), prune_value(value)))
        .collect()
}

fn prune_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(prune_nulls(map)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(prune_value)
                .collect(),
        ),
        other => other.clone(),
    }
}
