use cms_pull_core::config::{DataFormat, PullOptions, SsgType};
use cms_pull_core::contract::{MockCmsAdapter, PullBundle};
use cms_pull_core::entry::MODEL_TYPE;
use cms_pull_core::error::{AdapterError, Error};
use cms_pull_core::mapper::map_bundle;
use cms_pull_core::materialize::FileData;
use cms_pull_core::synchronise::{synchronise, SynchroniseConfig};
use serde_json::{json, Value};
use std::fs;
use tempfile::tempdir;

fn contentful_bundle() -> PullBundle {
    serde_json::from_value(json!({
        "vendor": "contentful",
        "spaceId": "space1",
        "entries": [
            {
                "sys": {"id": "home", "type": "Entry", "contentType": {"sys": {"id": "landing"}}},
                "fields": {
                    "stackbit_model_type": "page",
                    "stackbit_url_path": "/",
                    "title": "Home",
                    "author": {"sys": {"type": "Link", "linkType": "Entry", "id": "ann"}},
                    "self": {"sys": {"type": "Link", "linkType": "Entry", "id": "home"}},
                    "content": "Welcome\n"
                }
            },
            {
                "sys": {"id": "ann", "type": "Entry", "contentType": {"sys": {"id": "person"}}},
                "fields": {
                    "stackbit_model_type": "data",
                    "stackbit_file_path": "authors/ann.json",
                    "name": "Ann",
                    "avatar": {"sys": {"type": "Link", "linkType": "Asset", "id": "img"}}
                }
            },
            {
                "sys": {"id": "cta", "type": "Entry", "contentType": {"sys": {"id": "button"}}},
                "fields": {"stackbit_model_type": "object", "label": "Go"}
            }
        ],
        "assets": [
            {"sys": {"id": "img", "type": "Asset"}, "fields": {"file": {"url": "//images.example.com/ann.png"}}}
        ]
    }))
    .expect("valid contentful bundle")
}

fn adapter_returning(bundle: PullBundle) -> MockCmsAdapter {
    let mut adapter = MockCmsAdapter::new();
    adapter.expect_fetch().returning(move || Ok(bundle.clone()));
    adapter
}

fn hugo_options() -> PullOptions {
    PullOptions {
        ssg: SsgType::Hugo,
        resolve_links: true,
        ..Default::default()
    }
}

#[test]
fn test_synchronise_writes_hugo_files() {
    let out = tempdir().unwrap();
    let adapter = adapter_returning(contentful_bundle());
    let config = SynchroniseConfig {
        options: hugo_options(),
        output_dir: out.path().to_path_buf(),
    };

    let report = synchronise(&adapter, &config).expect("pull should succeed");
    let write = report.write.expect("file mode writes files");
    assert_eq!(write.written.len(), 2, "one page and one data file");

    let page = fs::read_to_string(out.path().join("content/_index.md")).unwrap();
    assert!(page.starts_with("---\n"));
    assert!(page.contains("title: Home"));
    assert!(page.contains("self: null"), "self link must resolve to null: {page}");
    assert!(page.ends_with("---\nWelcome\n"));

    let data: Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("data/authors/ann.json")).unwrap())
            .unwrap();
    assert_eq!(
        data,
        json!({"name": "Ann", "avatar": "https://images.example.com/ann.png"})
    );
}

#[test]
fn test_second_pull_without_changes_writes_nothing() {
    let out = tempdir().unwrap();
    let config = SynchroniseConfig {
        options: hugo_options(),
        output_dir: out.path().to_path_buf(),
    };

    let first = synchronise(&adapter_returning(contentful_bundle()), &config).unwrap();
    assert_eq!(first.write.unwrap().written.len(), 2);

    let second = synchronise(&adapter_returning(contentful_bundle()), &config).unwrap();
    let second = second.write.unwrap();
    assert!(second.written.is_empty(), "unexpected writes: {:?}", second.written);
    assert_eq!(second.unchanged.len(), 2);
}

#[test]
fn test_local_keys_survive_a_pull() {
    let out = tempdir().unwrap();
    let local = out.path().join("data/authors/ann.json");
    fs::create_dir_all(local.parent().unwrap()).unwrap();
    fs::write(&local, r#"{"twitter": "@ann", "name": "Old name"}"#).unwrap();

    let config = SynchroniseConfig {
        options: hugo_options(),
        output_dir: out.path().to_path_buf(),
    };
    synchronise(&adapter_returning(contentful_bundle()), &config).unwrap();

    let merged: Value = serde_json::from_str(&fs::read_to_string(&local).unwrap()).unwrap();
    assert_eq!(
        merged,
        json!({
            "twitter": "@ann",
            "name": "Ann",
            "avatar": "https://images.example.com/ann.png"
        })
    );
}

#[test]
fn test_object_format_returns_records_without_writing() {
    let out = tempdir().unwrap();
    let config = SynchroniseConfig {
        options: PullOptions {
            data_format: DataFormat::Object,
            all_objects: true,
            ..hugo_options()
        },
        output_dir: out.path().to_path_buf(),
    };

    let report = synchronise(&adapter_returning(contentful_bundle()), &config).unwrap();
    assert!(report.write.is_none());
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.records[0].url_path.as_deref(), Some(""));
    assert_eq!(report.records[2].file_path, None);
    assert_eq!(
        report.records[2].data,
        FileData::Object(json!({"label": "Go"}).as_object().cloned().unwrap())
    );
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_root_entries_keep_their_model_type() {
    let options = hugo_options();
    let entries = map_bundle(&contentful_bundle(), &options).unwrap();
    assert_eq!(entries.len(), 2, "object entries are not roots");
    assert_eq!(entries[0].get(MODEL_TYPE), Some(&json!("page")));
    let author = entries[0]["author"].as_object().unwrap();
    assert!(!author.contains_key(MODEL_TYPE));
}

#[test]
fn test_empty_url_path_becomes_index_page() {
    let out = tempdir().unwrap();
    let bundle: PullBundle = serde_json::from_value(json!({
        "vendor": "sanity",
        "projectId": "p1",
        "documents": [
            {"_id": "home", "_type": "page", "stackbit_model_type": "page", "stackbit_url_path": "", "title": "Home"}
        ]
    }))
    .unwrap();
    let config = SynchroniseConfig {
        options: PullOptions::default(),
        output_dir: out.path().to_path_buf(),
    };

    synchronise(&adapter_returning(bundle), &config).unwrap();
    let page = fs::read_to_string(out.path().join("index.md")).unwrap();
    assert_eq!(page, "---\nstackbit_url_path: ''\ntitle: Home\n---\n");
}

#[test]
fn test_adapter_failure_aborts_the_pull() {
    let out = tempdir().unwrap();
    let mut adapter = MockCmsAdapter::new();
    adapter
        .expect_fetch()
        .return_once(|| Err(AdapterError::Other("rate limited".into())));
    let config = SynchroniseConfig {
        options: hugo_options(),
        output_dir: out.path().to_path_buf(),
    };

    let err = synchronise(&adapter, &config).unwrap_err();
    assert!(matches!(err, Error::Adapter(AdapterError::Other(_))));
}
