//! # contract: seams between CMS adapters, vendor mappers and the pipeline
//!
//! A [`CmsAdapter`] owns everything vendor-transport related (authentication,
//! pagination, draft overlays) and hands over a fully materialized
//! [`PullBundle`]. The bundle variant selects the vendor's [`EntryMapper`];
//! no runtime probing of record shapes happens outside the vendor modules.
//!
//! ## Mocking & Testing
//! [`CmsAdapter`] is annotated for `mockall`, so the synchronise pipeline can be
//! exercised with canned bundles.

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::entry::Entry;
use crate::error::{AdapterError, Result};

/// Supported headless CMS vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Contentful,
    Sanity,
    Datocms,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Contentful => "contentful",
            Vendor::Sanity => "sanity",
            Vendor::Datocms => "datocms",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one pull fetched from a CMS, tagged by vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "vendor", rename_all = "lowercase")]
pub enum PullBundle {
    Contentful(ContentfulBundle),
    Sanity(SanityBundle),
    Datocms(DatocmsBundle),
}

impl PullBundle {
    pub fn vendor(&self) -> Vendor {
        match self {
            PullBundle::Contentful(_) => Vendor::Contentful,
            PullBundle::Sanity(_) => Vendor::Sanity,
            PullBundle::Datocms(_) => Vendor::Datocms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentfulBundle {
    pub space_id: String,
    #[serde(default = "default_contentful_environment")]
    pub environment: String,
    #[serde(default)]
    pub entries: Vec<Value>,
    #[serde(default)]
    pub assets: Vec<Value>,
}

fn default_contentful_environment() -> String {
    "master".to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanityBundle {
    pub project_id: String,
    #[serde(default = "default_sanity_dataset")]
    pub dataset: String,
    #[serde(default)]
    pub studio_url: Option<String>,
    /// Overlay `drafts.` documents on their published counterparts.
    #[serde(default)]
    pub preview: bool,
    /// Entries and asset documents, as returned by a `*[...]` query.
    #[serde(default)]
    pub documents: Vec<Value>,
}

fn default_sanity_dataset() -> String {
    "production".to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatocmsBundle {
    pub site: DatocmsSite,
    #[serde(default)]
    pub item_types: Vec<DatocmsItemType>,
    /// Items with camelCase field keys, as the DatoCMS client returns them.
    #[serde(default)]
    pub entries: Vec<Value>,
    #[serde(default)]
    pub uploads: Vec<DatocmsUpload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatocmsSite {
    pub id: String,
    pub internal_domain: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatocmsItemType {
    pub id: String,
    pub api_key: String,
    #[serde(default)]
    pub fields: Vec<DatocmsField>,
}

/// A schema field: its snake_case api key and DatoCMS field type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatocmsField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatocmsUpload {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Source of raw CMS records for one pull.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait CmsAdapter {
    /// Fetch every record of the pull, fully paginated and flattened.
    fn fetch(&self) -> std::result::Result<PullBundle, AdapterError>;
}

/// Vendor-specific mapping of raw records into Canonical Entries.
///
/// Implementors build their read-only lookup tables once, on construction,
/// and never mutate them while mapping.
pub trait EntryMapper {
    fn vendor(&self) -> Vendor;

    /// Candidate root records, in fetch order.
    fn raw_entries(&self) -> Vec<&Value>;

    /// The record's `stackbit_model_type`, read in the vendor's own shape.
    fn root_model_type<'v>(&self, raw: &'v Value) -> Option<&'v str>;

    /// Maps one root record, resolving links and assets below it.
    fn map_entry(&self, raw: &Value) -> Result<Entry>;
}
