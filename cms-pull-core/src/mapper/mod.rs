//! Canonical Entry Mapper: the vendor-independent half of entry mapping.
//!
//! Vendor modules walk raw records with [`crate::deep_map`] and lean on the
//! helpers here for the parts every vendor shares: root filtering, field
//! renaming, the lineage block and the cycle check against the object stack.

pub mod contentful;
pub mod datocms;
pub mod sanity;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::PullOptions;
use crate::contract::{EntryMapper, PullBundle, Vendor};
use crate::deep_map::ObjectStack;
use crate::entry::{Entry, ModelType, METADATA};
use crate::error::{Error, Result};

pub use contentful::ContentfulMapper;
pub use datocms::DatocmsMapper;
pub use sanity::SanityMapper;

/// Maps every root entry of a bundle with the vendor's mapper.
pub fn map_bundle(bundle: &PullBundle, options: &PullOptions) -> Result<Vec<Entry>> {
    match bundle {
        PullBundle::Contentful(bundle) => {
            transform_entries(&ContentfulMapper::new(bundle, options), options)
        }
        PullBundle::Sanity(bundle) => transform_entries(&SanityMapper::new(bundle, options), options),
        PullBundle::Datocms(bundle) => {
            transform_entries(&DatocmsMapper::new(bundle, options), options)
        }
    }
}

/// Filters the mapper's raw entries down to roots (unless every object was
/// requested) and maps each of them. The first failure aborts the batch.
pub fn transform_entries<M>(mapper: &M, options: &PullOptions) -> Result<Vec<Entry>>
where
    M: EntryMapper,
{
    let raw_entries = mapper.raw_entries();
    let total = raw_entries.len();
    let roots: Vec<&Value> = if options.all_objects {
        raw_entries
    } else {
        filter_root_entries(raw_entries, |raw| mapper.root_model_type(raw))
    };
    info!(
        vendor = %mapper.vendor(),
        total,
        roots = roots.len(),
        "Mapping CMS entries"
    );

    roots
        .into_iter()
        .map(|raw| {
            let entry = mapper.map_entry(raw)?;
            debug!(vendor = %mapper.vendor(), model_type = %ModelType::of(&entry), "Mapped entry");
            Ok(entry)
        })
        .collect()
}

/// Keeps the records whose model type produces a file of its own.
pub fn filter_root_entries<'v, F>(entries: Vec<&'v Value>, model_type: F) -> Vec<&'v Value>
where
    F: Fn(&'v Value) -> Option<&'v str>,
{
    entries
        .into_iter()
        .filter(|raw| ModelType::parse(model_type(*raw)).is_root())
        .collect()
}

/// Reads a `stackbit_field_names` value: an object, or a JSON string holding one.
pub fn field_names(value: Option<&Value>, vendor: Vendor) -> Result<Option<Map<String, Value>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(names)) => Ok(Some(names.clone())),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(names)) => Ok(Some(names)),
            Ok(_) => Err(Error::Mapping {
                vendor: vendor.as_str(),
                reason: "'stackbit_field_names' must hold an object".to_owned(),
            }),
            Err(e) => Err(Error::Mapping {
                vendor: vendor.as_str(),
                reason: format!("'stackbit_field_names' is not valid JSON: {e}"),
            }),
        },
        Some(_) => Err(Error::Mapping {
            vendor: vendor.as_str(),
            reason: "'stackbit_field_names' must be an object or a JSON string".to_owned(),
        }),
    }
}

/// Renames every field found in `names`; other fields keep their key.
pub fn rename_fields(fields: Entry, names: &Map<String, Value>) -> Entry {
    fields
        .into_iter()
        .map(|(key, value)| match names.get(&key).and_then(Value::as_str) {
            Some(renamed) => (renamed.to_owned(), value),
            None => (key, value),
        })
        .collect()
}

/// Swaps keys and string values; non-string values are skipped.
pub fn invert(names: &Map<String, Value>) -> Map<String, Value> {
    names
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_str()
                .map(|value| (value.to_owned(), Value::String(key.clone())))
        })
        .collect()
}

/// True when an ancestor object carries the given id.
pub fn is_cyclic<F>(stack: &ObjectStack<'_>, id: &str, id_of: F) -> bool
where
    F: Fn(&Map<String, Value>) -> Option<&str>,
{
    stack.any(|object| id_of(object) == Some(id))
}

/// Lineage block stored under `stackbit_metadata`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_object_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_model_name: Option<String>,
    pub src_field_names: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub project: Option<ProjectMetadata>,
}

/// Project-level lineage, attached to root entries only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub src_type: &'static str,
    pub src_project_id: String,
    pub src_project_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_environment: Option<String>,
    pub sb_model_type: String,
    pub sb_model_name: Option<String>,
}

/// Places the lineage block in front of the mapped fields.
pub fn with_metadata(metadata: &Metadata, fields: Entry) -> Result<Entry> {
    let block = serde_json::to_value(metadata).map_err(|e| Error::Mapping {
        vendor: "metadata",
        reason: e.to_string(),
    })?;
    let mut entry = Entry::with_capacity(fields.len() + 1);
    entry.insert(METADATA.to_owned(), block);
    entry.extend(fields);
    Ok(entry)
}
