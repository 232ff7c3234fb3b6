//! Canonical Entry vocabulary shared by the mappers and the materializer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A normalized, renamed, link-resolved CMS entry.
pub type Entry = Map<String, Value>;

pub const MODEL_TYPE: &str = "stackbit_model_type";
pub const URL_PATH: &str = "stackbit_url_path";
pub const DIR: &str = "stackbit_dir";
pub const FILE_PATH: &str = "stackbit_file_path";
pub const FILE_EXT: &str = "stackbit_file_ext";
pub const FIELD_NAMES: &str = "stackbit_field_names";
pub const METADATA: &str = "stackbit_metadata";
pub const REF_ID: &str = "stackbit_ref_id";

/// Role of an entry in the generated site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Page,
    Data,
    Config,
    Object,
}

impl ModelType {
    /// Model types that produce a file of their own.
    pub const ROOT: [ModelType; 3] = [ModelType::Page, ModelType::Data, ModelType::Config];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Page => "page",
            ModelType::Data => "data",
            ModelType::Config => "config",
            ModelType::Object => "object",
        }
    }

    /// Anything unknown or absent is a plain embeddable object.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("page") => ModelType::Page,
            Some("data") => ModelType::Data,
            Some("config") => ModelType::Config,
            _ => ModelType::Object,
        }
    }

    pub fn of(entry: &Entry) -> Self {
        Self::parse(entry.get(MODEL_TYPE).and_then(Value::as_str))
    }

    pub fn is_root(&self) -> bool {
        Self::ROOT.contains(self)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker left in place of a link when links are not resolved.
pub fn ref_marker(id: &str) -> Value {
    let mut marker = Map::new();
    marker.insert(REF_ID.to_owned(), Value::String(id.to_owned()));
    Value::Object(marker)
}

/// Copy of `entry` without the given bookkeeping keys.
pub fn without_keys(entry: &Entry, keys: &[&str]) -> Entry {
    entry
        .iter()
        .filter(|(key, _)| !keys.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
