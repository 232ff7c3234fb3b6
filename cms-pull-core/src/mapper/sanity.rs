//! Sanity documents: `_type`-tagged objects, references, slugs and asset documents.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::config::PullOptions;
use crate::contract::{EntryMapper, SanityBundle, Vendor};
use crate::deep_map::{deep_map, Node, Step};
use crate::entry::{ref_marker, Entry, FIELD_NAMES, METADATA, MODEL_TYPE};
use crate::error::{Error, Result};
use crate::mapper::{
    field_names, invert, is_cyclic, rename_fields, with_metadata, Metadata, ProjectMetadata,
};

const DRAFT_PREFIX: &str = "drafts.";
const SYSTEM_PREFIX: &str = "_.";
const ASSET_TYPES: [&str; 2] = ["sanity.imageAsset", "sanity.fileAsset"];

pub struct SanityMapper<'a> {
    bundle: &'a SanityBundle,
    options: &'a PullOptions,
    entries: Vec<&'a Value>,
    entries_by_id: HashMap<&'a str, &'a Value>,
    assets_by_id: HashMap<&'a str, &'a Value>,
}

impl<'a> SanityMapper<'a> {
    pub fn new(bundle: &'a SanityBundle, options: &'a PullOptions) -> Self {
        let (assets, entries): (Vec<&Value>, Vec<&Value>) =
            select_documents(&bundle.documents, bundle.preview)
                .into_iter()
                .partition(|doc| type_of(doc).is_some_and(|t| ASSET_TYPES.contains(&t)));

        let entries_by_id = entries
            .iter()
            .copied()
            .filter_map(|doc| document_id(doc).map(|id| (canonical_id(id), doc)))
            .collect();
        let assets_by_id = assets
            .into_iter()
            .filter_map(|doc| document_id(doc).map(|id| (id, doc)))
            .collect();

        Self {
            bundle,
            options,
            entries,
            entries_by_id,
            assets_by_id,
        }
    }

    fn visit(&self, node: &Node<'_>) -> Result<Step> {
        if node.last_key() == Some(METADATA) {
            return Ok(Step::Stop);
        }

        let mut value = node.value;
        match type_of(value) {
            Some("slug") if value.get("current").is_some() => {
                return Ok(Step::Replace(value["current"].clone()));
            }
            Some("image" | "file") => return Ok(Step::Replace(self.asset_url(value))),
            Some("color") => {
                return Ok(Step::Replace(
                    value.get("hex").cloned().unwrap_or(Value::Null),
                ));
            }
            Some("reference") => {
                let target = value
                    .get("_ref")
                    .and_then(Value::as_str)
                    .and_then(|id| self.entries_by_id.get(id).map(|doc| (id, *doc)));
                let Some((id, target)) = target else {
                    return Ok(Step::Replace(Value::Null));
                };
                if !self.options.resolve_links {
                    return Ok(Step::Replace(ref_marker(id)));
                }
                if is_cyclic(&node.object_stack, id, sanity_id) {
                    return Ok(Step::Replace(Value::Null));
                }
                value = target;
            }
            _ => {}
        }

        match value {
            Value::Object(object) => {
                let mapped = self.map_object(object, node.is_root())?;
                Ok(Step::Replace(Value::Object(mapped)))
            }
            _ => Ok(Step::Keep),
        }
    }

    fn asset_url(&self, value: &Value) -> Value {
        value
            .get("asset")
            .and_then(|asset| asset.get("_ref"))
            .and_then(Value::as_str)
            .and_then(|id| self.assets_by_id.get(id))
            .and_then(|asset| asset.get("url"))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn map_object(&self, object: &Map<String, Value>, is_root: bool) -> Result<Entry> {
        let names = field_names(object.get(FIELD_NAMES), Vendor::Sanity)?;

        let mut mapped: Entry = object
            .iter()
            .filter(|(key, _)| key.as_str() != FIELD_NAMES && !key.starts_with('_'))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if !is_root {
            mapped.remove(MODEL_TYPE);
        }
        if let Some(names) = &names {
            mapped = rename_fields(mapped, names);
        }

        if !self.options.include_metadata() {
            return Ok(mapped);
        }

        let item_type = object.get("_type").and_then(Value::as_str);
        let object_id = object
            .get("_id")
            .and_then(Value::as_str)
            .map(canonical_id)
            .filter(|_| item_type.is_some());
        let studio_url = self.bundle.studio_url.as_deref();

        let metadata = Metadata {
            src_object_id: object_id.map(str::to_owned),
            src_object_url: object_id.zip(item_type).zip(studio_url).map(
                |((id, item_type), studio)| format!("{studio}/desk/{item_type};{id}"),
            ),
            src_model_name: item_type.map(str::to_owned),
            src_field_names: names.as_ref().map(invert),
            project: is_root.then(|| ProjectMetadata {
                src_type: "sanity",
                src_project_id: self.bundle.project_id.clone(),
                src_project_url: studio_url.map(str::to_owned),
                src_environment: Some(self.bundle.dataset.clone()),
                sb_model_type: object
                    .get(MODEL_TYPE)
                    .and_then(Value::as_str)
                    .unwrap_or("object")
                    .to_owned(),
                sb_model_name: item_type.map(str::to_owned),
            }),
        };
        with_metadata(&metadata, mapped)
    }
}

impl EntryMapper for SanityMapper<'_> {
    fn vendor(&self) -> Vendor {
        Vendor::Sanity
    }

    fn raw_entries(&self) -> Vec<&Value> {
        self.entries.clone()
    }

    fn root_model_type<'v>(&self, raw: &'v Value) -> Option<&'v str> {
        raw.get(MODEL_TYPE)?.as_str()
    }

    fn map_entry(&self, raw: &Value) -> Result<Entry> {
        match deep_map(raw, |node| self.visit(node))? {
            Value::Object(entry) => Ok(entry),
            _ => Err(Error::Mapping {
                vendor: Vendor::Sanity.as_str(),
                reason: format!(
                    "document '{}' is not an object",
                    document_id(raw).unwrap_or_default()
                ),
            }),
        }
    }
}

/// Picks the documents a pull works on.
///
/// System documents (`_.` ids) are always dropped. In preview mode a
/// `drafts.<id>` document takes the place of its published counterpart, or
/// is appended when nothing was published yet; otherwise drafts are dropped.
pub fn select_documents(documents: &[Value], preview: bool) -> Vec<&Value> {
    let mut selected: Vec<&Value> = Vec::with_capacity(documents.len());
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut drafts = Vec::new();

    for doc in documents {
        let id = document_id(doc).unwrap_or_default();
        if id.starts_with(SYSTEM_PREFIX) {
            continue;
        }
        if id.starts_with(DRAFT_PREFIX) {
            if preview {
                drafts.push(doc);
            }
            continue;
        }
        position.insert(id, selected.len());
        selected.push(doc);
    }

    for draft in drafts {
        let id = canonical_id(document_id(draft).unwrap_or_default());
        match position.get(id) {
            Some(&index) => selected[index] = draft,
            None => {
                position.insert(id, selected.len());
                selected.push(draft);
            }
        }
    }
    selected
}

fn type_of(value: &Value) -> Option<&str> {
    value.get("_type")?.as_str()
}

fn document_id(value: &Value) -> Option<&str> {
    value.get("_id")?.as_str()
}

fn canonical_id(id: &str) -> &str {
    id.strip_prefix(DRAFT_PREFIX).unwrap_or(id)
}

// a resolved reference sits on the stack as the reference object itself
fn sanity_id(object: &Map<String, Value>) -> Option<&str> {
    if object.get("_type").and_then(Value::as_str) == Some("reference") {
        return object.get("_ref")?.as_str();
    }
    object.get("_id").and_then(Value::as_str).map(canonical_id)
}
