//! Pull options and the per-generator path conventions.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Whether records carry serialized file text or in-memory structures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    File,
    Object,
}

/// Target static-site generator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SsgType {
    Jekyll,
    Hugo,
    Gatsby,
    #[default]
    #[serde(other)]
    Other,
}

/// Rewrite applied to a page path before the pages directory is prefixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRule {
    /// `posts/name` or `_posts/name` becomes `_posts/YYYY-MM-DD-name`.
    DatedPosts,
    /// A whole or trailing `index` segment becomes `_index`.
    UnderscoreIndex,
    None,
}

/// Directory layout a generator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsgConventions {
    pub pages_dir: &'static str,
    pub data_dir: Option<&'static str>,
    pub page_rule: PageRule,
}

const JEKYLL: SsgConventions = SsgConventions {
    pages_dir: "",
    data_dir: Some("_data"),
    page_rule: PageRule::DatedPosts,
};

const HUGO: SsgConventions = SsgConventions {
    pages_dir: "content",
    data_dir: Some("data"),
    page_rule: PageRule::UnderscoreIndex,
};

const GATSBY: SsgConventions = SsgConventions {
    pages_dir: "src/pages",
    data_dir: Some("src/data"),
    page_rule: PageRule::None,
};

const OTHER: SsgConventions = SsgConventions {
    pages_dir: "",
    data_dir: None,
    page_rule: PageRule::None,
};

impl SsgType {
    pub fn conventions(&self) -> &'static SsgConventions {
        match self {
            SsgType::Jekyll => &JEKYLL,
            SsgType::Hugo => &HUGO,
            SsgType::Gatsby => &GATSBY,
            SsgType::Other => &OTHER,
        }
    }
}

impl From<&str> for SsgType {
    fn from(s: &str) -> Self {
        match s {
            "jekyll" => SsgType::Jekyll,
            "hugo" => SsgType::Hugo,
            "gatsby" => SsgType::Gatsby,
            other => {
                tracing::warn!(ssg = other, "Unknown ssg, no directory conventions apply");
                SsgType::Other
            }
        }
    }
}

/// Options recognized by the mapping and materializing stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullOptions {
    /// Map every entry, not only page, data and config entries.
    pub all_objects: bool,
    /// Inline linked entries instead of leaving `stackbit_ref_id` markers.
    pub resolve_links: bool,
    pub data_format: DataFormat,
    /// Attach `stackbit_metadata`; only honoured with [`DataFormat::Object`].
    pub metadata: bool,
    pub ssg: SsgType,
}

impl PullOptions {
    pub fn is_object_format(&self) -> bool {
        self.data_format == DataFormat::Object
    }

    pub fn include_metadata(&self) -> bool {
        self.is_object_format() && self.metadata
    }

    pub fn trace_loaded(&self) {
        info!(
            ssg = ?self.ssg,
            data_format = ?self.data_format,
            resolve_links = self.resolve_links,
            all_objects = self.all_objects,
            "Loaded PullOptions"
        );
        debug!(?self, "PullOptions loaded (full debug)");
    }
}
