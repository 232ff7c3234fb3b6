//! DatoCMS items. Which fields are emitted, and how, is driven by the item
//! type's field table rather than by the shape of the item itself.

use heck::ToSnakeCase;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::PullOptions;
use crate::contract::{DatocmsBundle, DatocmsItemType, DatocmsUpload, EntryMapper, Vendor};
use crate::deep_map::{deep_map, Node, ObjectStack, Step};
use crate::entry::{ref_marker, Entry, FIELD_NAMES, METADATA, MODEL_TYPE};
use crate::error::{Error, Result};
use crate::mapper::{field_names, invert, is_cyclic, with_metadata, Metadata, ProjectMetadata};

const REFERENCE_TYPE: &str = "stackbit_reference_type";

fn underscore_before_digit() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_(\d)").expect("valid digit regex"))
}

pub struct DatocmsMapper<'a> {
    bundle: &'a DatocmsBundle,
    options: &'a PullOptions,
    entries_by_id: HashMap<&'a str, &'a Value>,
    item_types_by_id: HashMap<&'a str, &'a DatocmsItemType>,
    uploads_by_id: HashMap<&'a str, &'a DatocmsUpload>,
}

impl<'a> DatocmsMapper<'a> {
    pub fn new(bundle: &'a DatocmsBundle, options: &'a PullOptions) -> Self {
        Self {
            bundle,
            options,
            entries_by_id: bundle
                .entries
                .iter()
                .filter_map(|item| item_id(item).map(|id| (id, item)))
                .collect(),
            item_types_by_id: bundle
                .item_types
                .iter()
                .map(|item_type| (item_type.id.as_str(), item_type))
                .collect(),
            uploads_by_id: bundle
                .uploads
                .iter()
                .map(|upload| (upload.id.as_str(), upload))
                .collect(),
        }
    }

    fn visit(&self, node: &Node<'_>) -> Result<Step> {
        if node.last_key() == Some(METADATA) {
            return Ok(Step::Stop);
        }
        let Value::Object(object) = node.value else {
            return Ok(Step::Keep);
        };
        let Some(item_type_id) = object.get("itemType").and_then(Value::as_str) else {
            return Ok(Step::Keep);
        };
        let item_type = self
            .item_types_by_id
            .get(item_type_id)
            .ok_or_else(|| Error::Mapping {
                vendor: Vendor::Datocms.as_str(),
                reason: format!("item type '{item_type_id}' is not part of the schema"),
            })?;

        let mapped = self.map_item(object, item_type, node)?;
        Ok(Step::Replace(Value::Object(mapped)))
    }

    fn map_item(
        &self,
        object: &Map<String, Value>,
        item_type: &DatocmsItemType,
        node: &Node<'_>,
    ) -> Result<Entry> {
        let is_root = node.is_root();
        let own_id = object.get("id").and_then(Value::as_str);
        let fields = snake_case_keys(object);
        let names = field_names(fields.get(FIELD_NAMES), Vendor::Datocms)?;

        let mut mapped = Entry::new();
        for field in &item_type.fields {
            if field.name == FIELD_NAMES || (!is_root && field.name == MODEL_TYPE) {
                continue;
            }
            let value = match fields.get(&field.name) {
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };
            if field.name == REFERENCE_TYPE {
                mapped.insert("type".to_owned(), value.clone());
                continue;
            }

            let coerced = match field.field_type.as_str() {
                "color" => Some(rgb_to_hex(value)?),
                "json" => Some(parse_json(value, &field.name)?),
                "file" => self.upload_url(value),
                "link" => Some(self.link(value, own_id, &node.object_stack)),
                "links" => Some(Value::Array(
                    value
                        .as_array()
                        .map(|ids| {
                            ids.iter()
                                .map(|id| self.link(id, own_id, &node.object_stack))
                                .collect()
                        })
                        .unwrap_or_default(),
                )),
                "string" | "text" if value.as_str() == Some("") => None,
                _ => Some(value.clone()),
            };

            if let Some(coerced) = coerced {
                let name = names
                    .as_ref()
                    .and_then(|names| names.get(&field.name))
                    .and_then(Value::as_str)
                    .unwrap_or(&field.name);
                mapped.insert(name.to_owned(), coerced);
            }
        }

        if !self.options.include_metadata() {
            return Ok(mapped);
        }

        let site = &self.bundle.site;
        let domain = &site.internal_domain;
        let id = own_id.unwrap_or_default();
        let api_key = item_type.api_key.as_str();
        let metadata = Metadata {
            src_object_id: Some(id.to_owned()),
            src_object_url: Some(format!(
                "https://{domain}/editor/item_types/{}/items/{id}/edit",
                item_type.id
            )),
            src_model_name: Some(api_key.to_owned()),
            src_field_names: names.as_ref().map(invert),
            project: is_root.then(|| ProjectMetadata {
                src_type: "datocms",
                src_project_id: site.id.clone(),
                src_project_url: Some(format!("https://{domain}/editor")),
                src_environment: None,
                sb_model_type: fields
                    .get(MODEL_TYPE)
                    .and_then(Value::as_str)
                    .unwrap_or("object")
                    .to_owned(),
                // root item types are named after the model with a `_model` suffix
                sb_model_name: Some(api_key.strip_suffix("_model").unwrap_or(api_key).to_owned()),
            }),
        };
        with_metadata(&metadata, mapped)
    }

    fn link(&self, id: &Value, own_id: Option<&str>, stack: &ObjectStack<'_>) -> Value {
        let Some((id, target)) = id
            .as_str()
            .and_then(|id| self.entries_by_id.get(id).map(|item| (id, *item)))
        else {
            return Value::Null;
        };
        if !self.options.resolve_links {
            return ref_marker(id);
        }
        // the item being mapped is not on the stack yet
        if own_id == Some(id) || is_cyclic(stack, id, datocms_id) {
            return Value::Null;
        }
        target.clone()
    }

    fn upload_url(&self, value: &Value) -> Option<Value> {
        let upload_id = value
            .get("uploadId")
            .or_else(|| value.get("upload_id"))
            .and_then(Value::as_str)?;
        let url = self.uploads_by_id.get(upload_id)?.url.as_ref()?;
        Some(Value::String(url.clone()))
    }
}

impl EntryMapper for DatocmsMapper<'_> {
    fn vendor(&self) -> Vendor {
        Vendor::Datocms
    }

    fn raw_entries(&self) -> Vec<&Value> {
        self.bundle.entries.iter().collect()
    }

    fn root_model_type<'v>(&self, raw: &'v Value) -> Option<&'v str> {
        raw.get("stackbitModelType")
            .or_else(|| raw.get(MODEL_TYPE))?
            .as_str()
    }

    fn map_entry(&self, raw: &Value) -> Result<Entry> {
        match deep_map(raw, |node| self.visit(node))? {
            Value::Object(entry) => Ok(entry),
            _ => Err(Error::Mapping {
                vendor: Vendor::Datocms.as_str(),
                reason: format!("item '{}' is not an object", item_id(raw).unwrap_or_default()),
            }),
        }
    }
}

/// Converts the client's camelCase keys back to the schema's snake_case api
/// keys. DatoCMS api keys never have an underscore before a digit.
fn snake_case_keys(object: &Map<String, Value>) -> Map<String, Value> {
    object
        .iter()
        .map(|(key, value)| {
            let key = key.to_snake_case();
            let key = underscore_before_digit().replace_all(&key, "$1").into_owned();
            (key, value.clone())
        })
        .collect()
}

fn item_id(value: &Value) -> Option<&str> {
    value.get("id")?.as_str()
}

fn datocms_id(object: &Map<String, Value>) -> Option<&str> {
    object.get("id")?.as_str()
}

fn rgb_to_hex(value: &Value) -> Result<Value> {
    let component = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_u64)
            .filter(|component| *component <= 255)
    };
    match (component("red"), component("green"), component("blue")) {
        (Some(red), Some(green), Some(blue)) => {
            Ok(Value::String(format!("#{red:02x}{green:02x}{blue:02x}")))
        }
        _ => Err(Error::Mapping {
            vendor: Vendor::Datocms.as_str(),
            reason: format!("color value {value} is not an rgb object"),
        }),
    }
}

fn parse_json(value: &Value, field: &str) -> Result<Value> {
    match value {
        Value::String(raw) => serde_json::from_str(raw).map_err(|e| Error::Mapping {
            vendor: Vendor::Datocms.as_str(),
            reason: format!("json field '{field}' does not hold valid JSON: {e}"),
        }),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataFormat;
    use crate::contract::{DatocmsField, DatocmsSite};
    use serde_json::json;

    fn field(name: &str, field_type: &str) -> DatocmsField {
        DatocmsField {
            name: name.into(),
            field_type: field_type.into(),
        }
    }

    fn bundle(entries: Vec<Value>) -> DatocmsBundle {
        DatocmsBundle {
            site: DatocmsSite {
                id: "site1".into(),
                internal_domain: "my-site.admin.datocms.com".into(),
            },
            item_types: vec![
                DatocmsItemType {
                    id: "10".into(),
                    api_key: "page_model".into(),
                    fields: vec![
                        field("stackbit_model_type", "string"),
                        field("title", "string"),
                        field("subtitle", "string"),
                        field("accent", "color"),
                        field("settings", "json"),
                        field("hero_image", "file"),
                        field("section2_title", "text"),
                        field("author", "link"),
                        field("related", "links"),
                    ],
                },
                DatocmsItemType {
                    id: "20".into(),
                    api_key: "person".into(),
                    fields: vec![
                        field("stackbit_model_type", "string"),
                        field("stackbit_reference_type", "string"),
                        field("name", "string"),
                    ],
                },
            ],
            entries,
            uploads: vec![DatocmsUpload {
                id: "u1".into(),
                url: Some("https://www.datocms-assets.com/1.png".into()),
            }],
        }
    }

    fn page(id: &str, extra: Value) -> Value {
        let mut page = json!({"id": id, "itemType": "10", "stackbitModelType": "page"});
        if let (Some(page), Value::Object(extra)) = (page.as_object_mut(), extra) {
            page.extend(extra);
        }
        page
    }

    fn person(id: &str) -> Value {
        json!({
            "id": id,
            "itemType": "20",
            "stackbitModelType": "data",
            "stackbitReferenceType": "author",
            "name": "Ann"
        })
    }

    #[test]
    fn emits_schema_fields_in_order_with_coercions() {
        let bundle = bundle(vec![page(
            "1",
            json!({
                "section2Title": "Two",
                "subtitle": "",
                "title": "Home",
                "settings": "{\"wide\": true}",
                "accent": {"red": 255, "green": 8, "blue": 0, "alpha": 100},
                "heroImage": {"uploadId": "u1"},
                "author": null,
                "unknownField": "dropped"
            }),
        )]);
        let options = PullOptions::default();
        let mapper = DatocmsMapper::new(&bundle, &options);
        let mapped = mapper.map_entry(&bundle.entries[0]).unwrap();
        assert_eq!(
            Value::Object(mapped),
            json!({
                "stackbit_model_type": "page",
                "title": "Home",
                "accent": "#ff0800",
                "settings": {"wide": true},
                "hero_image": "https://www.datocms-assets.com/1.png",
                "section2_title": "Two"
            })
        );
    }

    #[test]
    fn links_resolve_and_self_links_become_null() {
        let bundle = bundle(vec![
            page("1", json!({"author": "2", "related": ["1", "2", "404"]})),
            person("2"),
        ]);
        let options = PullOptions {
            resolve_links: true,
            ..Default::default()
        };
        let mapper = DatocmsMapper::new(&bundle, &options);
        let mapped = mapper.map_entry(&bundle.entries[0]).unwrap();
        assert_eq!(mapped["author"], json!({"type": "author", "name": "Ann"}));
        assert_eq!(
            mapped["related"],
            json!([null, {"type": "author", "name": "Ann"}, null])
        );
    }

    #[test]
    fn links_become_markers_without_resolution() {
        let bundle = bundle(vec![page("1", json!({"author": "2"})), person("2")]);
        let options = PullOptions::default();
        let mapper = DatocmsMapper::new(&bundle, &options);
        let mapped = mapper.map_entry(&bundle.entries[0]).unwrap();
        assert_eq!(mapped["author"], json!({"stackbit_ref_id": "2"}));
    }

    #[test]
    fn metadata_points_at_the_editor() {
        let bundle = bundle(vec![page("1", json!({"title": "Home", "author": "2"})), person("2")]);
        let options = PullOptions {
            resolve_links: true,
            metadata: true,
            data_format: DataFormat::Object,
            ..Default::default()
        };
        let mapper = DatocmsMapper::new(&bundle, &options);
        let mapped = mapper.map_entry(&bundle.entries[0]).unwrap();

        let meta = &mapped[METADATA];
        assert_eq!(
            meta["srcObjectUrl"],
            json!("https://my-site.admin.datocms.com/editor/item_types/10/items/1/edit")
        );
        assert_eq!(meta["srcProjectUrl"], json!("https://my-site.admin.datocms.com/editor"));
        assert_eq!(meta["srcModelName"], json!("page_model"));
        assert_eq!(meta["sbModelName"], json!("page"));
        assert_eq!(meta["sbModelType"], json!("page"));
        assert!(meta.get("srcEnvironment").is_none());

        let author_meta = &mapped["author"][METADATA];
        assert_eq!(author_meta["srcObjectId"], json!("2"));
        assert!(author_meta.get("srcType").is_none());
    }

    #[test]
    fn unknown_item_type_is_a_mapping_error() {
        let bundle = bundle(vec![json!({"id": "9", "itemType": "99", "stackbitModelType": "page"})]);
        let options = PullOptions::default();
        let mapper = DatocmsMapper::new(&bundle, &options);
        let err = mapper.map_entry(&bundle.entries[0]).unwrap_err();
        assert!(matches!(err, Error::Mapping { vendor: "datocms", .. }));
    }

    #[test]
    fn snake_case_keys_drop_underscores_before_digits() {
        let object = json!({"heroImage": 1, "section2Title": 2, "stackbit_model_type": 3});
        let keys: Vec<String> = snake_case_keys(object.as_object().unwrap())
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, ["hero_image", "section2_title", "stackbit_model_type"]);
    }
}
