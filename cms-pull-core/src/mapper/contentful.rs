//! Contentful records: `{sys, fields}` entries, `Link` markers and assets.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::config::PullOptions;
use crate::contract::{ContentfulBundle, EntryMapper, Vendor};
use crate::deep_map::{deep_map, Node, Step};
use crate::entry::{ref_marker, Entry, FIELD_NAMES, METADATA, MODEL_TYPE};
use crate::error::{Error, Result};
use crate::mapper::{
    field_names, invert, is_cyclic, rename_fields, with_metadata, Metadata, ProjectMetadata,
};

const APP_URL: &str = "https://app.contentful.com";

pub struct ContentfulMapper<'a> {
    bundle: &'a ContentfulBundle,
    options: &'a PullOptions,
    entries_by_id: HashMap<&'a str, &'a Value>,
    assets_by_id: HashMap<&'a str, &'a Value>,
}

impl<'a> ContentfulMapper<'a> {
    pub fn new(bundle: &'a ContentfulBundle, options: &'a PullOptions) -> Self {
        Self {
            bundle,
            options,
            entries_by_id: index_by_sys_id(&bundle.entries),
            assets_by_id: index_by_sys_id(&bundle.assets),
        }
    }

    fn visit(&self, node: &Node<'_>) -> Result<Step> {
        // stackbit_metadata was injected by this visitor, it is not CMS data
        if node.last_key() == Some(METADATA) {
            return Ok(Step::Stop);
        }

        let mut value = node.value;
        if sys_field(value, "type") == Some("Link") {
            let id = sys_field(value, "id").unwrap_or_default();
            match sys_field(value, "linkType") {
                Some("Entry") if self.entries_by_id.contains_key(id) => {
                    if !self.options.resolve_links {
                        return Ok(Step::Replace(ref_marker(id)));
                    }
                    if is_cyclic(&node.object_stack, id, sys_id) {
                        return Ok(Step::Replace(Value::Null));
                    }
                    value = self.entries_by_id[id];
                }
                Some("Asset") if self.assets_by_id.contains_key(id) => {
                    value = self.assets_by_id[id];
                }
                _ => return Ok(Step::Replace(Value::Null)),
            }
        }

        match sys_field(value, "type") {
            Some("Asset") => Ok(Step::Replace(asset_url(value))),
            Some("Entry") => {
                let entry = self.map_fields(value, node.is_root())?;
                Ok(Step::Replace(Value::Object(entry)))
            }
            _ => Ok(Step::Keep),
        }
    }

    fn map_fields(&self, entry: &Value, is_root: bool) -> Result<Entry> {
        let fields = entry
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let names = field_names(fields.get(FIELD_NAMES), Vendor::Contentful)?;
        let model_type = fields
            .get(MODEL_TYPE)
            .and_then(Value::as_str)
            .unwrap_or("object")
            .to_owned();

        let mut mapped = fields;
        mapped.remove(FIELD_NAMES);
        // the root keeps its model type so the materializer can pick a path rule
        if !is_root {
            mapped.remove(MODEL_TYPE);
        }
        if let Some(names) = &names {
            mapped = rename_fields(mapped, names);
        }

        if !self.options.include_metadata() {
            return Ok(mapped);
        }

        let space_id = sys_nested_id(entry, "space").unwrap_or(&self.bundle.space_id);
        let item_id = sys_field(entry, "id").unwrap_or_default();
        let content_type = sys_nested_id(entry, "contentType").map(str::to_owned);
        let metadata = Metadata {
            src_object_id: Some(item_id.to_owned()),
            src_object_url: Some(format!("{APP_URL}/spaces/{space_id}/entries/{item_id}")),
            src_model_name: content_type.clone(),
            src_field_names: names.as_ref().map(invert),
            project: is_root.then(|| ProjectMetadata {
                src_type: "contentful",
                src_project_id: space_id.to_owned(),
                src_project_url: Some(format!("{APP_URL}/spaces/{space_id}/home")),
                src_environment: Some(self.bundle.environment.clone()),
                sb_model_type: model_type,
                // the root model name is always the content type id
                sb_model_name: content_type,
            }),
        };
        with_metadata(&metadata, mapped)
    }
}

impl EntryMapper for ContentfulMapper<'_> {
    fn vendor(&self) -> Vendor {
        Vendor::Contentful
    }

    fn raw_entries(&self) -> Vec<&Value> {
        self.bundle.entries.iter().collect()
    }

    fn root_model_type<'v>(&self, raw: &'v Value) -> Option<&'v str> {
        raw.get("fields")?.get(MODEL_TYPE)?.as_str()
    }

    fn map_entry(&self, raw: &Value) -> Result<Entry> {
        match deep_map(raw, |node| self.visit(node))? {
            Value::Object(entry) => Ok(entry),
            _ => Err(Error::Mapping {
                vendor: Vendor::Contentful.as_str(),
                reason: format!(
                    "record '{}' is not an entry",
                    sys_field(raw, "id").unwrap_or_default()
                ),
            }),
        }
    }
}

fn index_by_sys_id(records: &[Value]) -> HashMap<&str, &Value> {
    records
        .iter()
        .filter_map(|record| sys_field(record, "id").map(|id| (id, record)))
        .collect()
}

fn sys_field<'v>(value: &'v Value, field: &str) -> Option<&'v str> {
    value.get("sys")?.get(field)?.as_str()
}

fn sys_nested_id<'v>(value: &'v Value, link: &str) -> Option<&'v str> {
    value.get("sys")?.get(link)?.get("sys")?.get("id")?.as_str()
}

fn sys_id(object: &Map<String, Value>) -> Option<&str> {
    object.get("sys")?.get("id")?.as_str()
}

fn asset_url(asset: &Value) -> Value {
    match asset
        .get("fields")
        .and_then(|fields| fields.get("file"))
        .and_then(|file| file.get("url"))
        .and_then(Value::as_str)
    {
        Some(url) if !url.is_empty() => match url.strip_prefix("//") {
            Some(rest) => Value::String(format!("https://{rest}")),
            None => Value::String(url.to_owned()),
        },
        _ => Value::Null,
    }
}
