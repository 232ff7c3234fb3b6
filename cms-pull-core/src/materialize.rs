//! File Materializer: canonical entries to output records, and output records
//! to files on disk.
//!
//! # Responsibilities
//! - Pick the file path of every root entry ([`build_output_record`]) and
//!   serialize it by extension unless the in-memory object format was requested
//! - Write records under an explicit output root ([`write_files`]), merging into
//!   existing structured files and leaving byte-identical files untouched
//!
//! # Merge-on-write
//! Existing `yml`, `yaml`, `json` and `toml` files are parsed and the incoming
//! top-level keys are laid over the local ones. Keys that only exist locally
//! survive and existing keys keep their position. TOML is merged in its own
//! value model so local datetimes stay datetimes. Incoming structured text is
//! reprinted before the first write, so a second identical pull changes
//! nothing. Markdown and html files are replaced.
//!
//! Record paths never leave the output root: a leading `/` is dropped and `..`
//! stops at the root.
//!
//! # Atomicity
//! Every file is written to a temporary file in its target directory and then
//! renamed over the target, so readers never observe a partially written file.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::config::PullOptions;
use crate::entry::{without_keys, Entry, ModelType, DIR, FILE_EXT, FILE_PATH, MODEL_TYPE, URL_PATH};
use crate::error::{Error, Result};
use crate::format::{extension_of, parse_toml, FileFormat};
use crate::slug::{data_file_path, normalize_slug, page_file_path, rooted_path};

/// Payload of an output record: file text, or the entry itself in object mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileData {
    Text(String),
    Object(Entry),
}

/// One file to be written, or one object handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    /// `None` for objects without a file of their own; such records are never written.
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    pub data: FileData,
}

/// Paths touched by [`write_files`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

/// Builds the output records of a batch of canonical entries, in order.
///
/// Entries that produce no record (data without a file path in file mode,
/// plain objects unless requested) are skipped.
pub fn create_files(entries: Vec<Entry>, options: &PullOptions) -> Result<Vec<OutputRecord>> {
    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(record) = build_output_record(entry, options)? {
            records.push(record);
        }
    }
    info!(records = records.len(), "Created output records");
    Ok(records)
}

/// Output record of a single entry, dispatched on its `stackbit_model_type`.
pub fn build_output_record(entry: Entry, options: &PullOptions) -> Result<Option<OutputRecord>> {
    let object_format = options.is_object_format();
    match ModelType::of(&entry) {
        ModelType::Page => {
            let file_path = page_file_path(&entry, &options.ssg)?;
            let url_path = normalize_slug(entry.get(URL_PATH).and_then(Value::as_str).unwrap_or(""));
            let data = without_keys(&entry, &[MODEL_TYPE, DIR, FILE_EXT]);
            Ok(Some(OutputRecord {
                data: file_data(data, &file_path, object_format)?,
                file_path: Some(file_path),
                url_path: Some(url_path),
            }))
        }
        ModelType::Data => {
            let file_path = data_file_path(&entry, &options.ssg);
            let data = without_keys(&entry, &[MODEL_TYPE, FILE_PATH, DIR]);
            let data = match (&file_path, object_format) {
                (_, true) => FileData::Object(data),
                (Some(path), false) => FileData::Text(serialize_for(path, &data)?),
                (None, false) => {
                    // data entries of folder models have no file of their own
                    debug!("Skipping data entry without a file path");
                    return Ok(None);
                }
            };
            Ok(Some(OutputRecord {
                file_path,
                url_path: None,
                data,
            }))
        }
        ModelType::Config => {
            let file_path = entry
                .get(FILE_PATH)
                .and_then(Value::as_str)
                .filter(|path| !path.is_empty())
                .map(str::to_owned);
            let data = without_keys(&entry, &[MODEL_TYPE, FILE_PATH]);
            let data = match (&file_path, object_format) {
                (_, true) => FileData::Object(data),
                (Some(path), false) => FileData::Text(serialize_for(path, &data)?),
                (None, false) => {
                    return Err(Error::MissingFilePath {
                        model_type: ModelType::Config.to_string(),
                    })
                }
            };
            Ok(Some(OutputRecord {
                file_path,
                url_path: None,
                data,
            }))
        }
        ModelType::Object if options.all_objects && object_format => Ok(Some(OutputRecord {
            file_path: None,
            url_path: None,
            data: FileData::Object(without_keys(&entry, &[MODEL_TYPE])),
        })),
        ModelType::Object => Ok(None),
    }
}

fn file_data(data: Entry, file_path: &str, object_format: bool) -> Result<FileData> {
    if object_format {
        Ok(FileData::Object(data))
    } else {
        Ok(FileData::Text(serialize_for(file_path, &data)?))
    }
}

/// Serializes an entry for the file at `path`, picking the format by extension.
pub fn serialize_for(path: &str, data: &Entry) -> Result<String> {
    let format = format_for(path)?;
    format.serialize(data).map_err(|raw| Error::Serialize {
        path: path.to_owned(),
        raw,
    })
}

fn format_for(path: &str) -> Result<FileFormat> {
    let extension = extension_of(path);
    FileFormat::from_extension(extension).ok_or_else(|| Error::UnsupportedFormat {
        path: path.to_owned(),
        extension: extension.to_owned(),
    })
}

/// Writes every record that has a file path under `output_root`.
///
/// Record paths are always resolved inside the root, absolute ones included.
///
/// The first failure aborts the batch; files written before it stay written.
pub fn write_files(records: &[OutputRecord], output_root: &Path) -> Result<WriteReport> {
    info!(
        records = records.len(),
        output_root = %output_root.display(),
        "Writing files"
    );
    let mut report = WriteReport::default();

    for record in records {
        let Some(file_path) = record.file_path.as_deref() else {
            continue;
        };
        let full_path = output_root.join(rooted_path(file_path));
        match write_record(file_path, &full_path, &record.data) {
            Ok(true) => {
                debug!(path = %full_path.display(), "Wrote file");
                report.written.push(full_path);
            }
            Ok(false) => {
                debug!(path = %full_path.display(), "File unchanged, skipping write");
                report.unchanged.push(full_path);
            }
            Err(e) => {
                error!(path = %full_path.display(), error = %e, "Failed to write file");
                return Err(e);
            }
        }
    }

    info!(
        written = report.written.len(),
        unchanged = report.unchanged.len(),
        "Finished writing files"
    );
    Ok(report)
}

// Ok(false) when the file already holds the final bytes.
fn write_record(file_path: &str, full_path: &Path, data: &FileData) -> Result<bool> {
    let format = format_for(file_path)?;
    let incoming = match data {
        FileData::Text(text) if format.is_structured() => {
            format.normalize(text).map_err(|raw| Error::MergeFailure {
                path: full_path.to_path_buf(),
                raw,
            })?
        }
        FileData::Text(text) => text.clone(),
        FileData::Object(entry) => serialize_for(file_path, entry)?,
    };

    let existing = match fs::read_to_string(full_path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(raw) => {
            return Err(Error::FileIo {
                path: full_path.to_path_buf(),
                raw,
            })
        }
    };

    let contents = match &existing {
        Some(local) if format.is_structured() => merge_file(full_path, local, &incoming, format)?,
        _ => incoming,
    };
    if existing.as_deref() == Some(contents.as_str()) {
        return Ok(false);
    }

    write_atomic(full_path, &contents)?;
    Ok(true)
}

/// Lays the incoming document's top-level keys over the local file's.
///
/// An empty local document is simply replaced by the incoming text. TOML is
/// merged as TOML so that local datetimes survive.
pub fn merge_file(path: &Path, local: &str, incoming: &str, format: FileFormat) -> Result<String> {
    if format == FileFormat::Toml {
        return merge_toml(path, local, incoming);
    }
    let local = format.parse(local).map_err(|raw| Error::ParseFailure {
        path: path.to_path_buf(),
        raw,
    })?;
    let Some(mut merged) = local else {
        return Ok(incoming.to_owned());
    };

    let merge_failure = |raw| Error::MergeFailure {
        path: path.to_path_buf(),
        raw,
    };
    if let Some(remote) = format.parse(incoming).map_err(merge_failure)? {
        for (key, value) in remote {
            merged.insert(key, value);
        }
    }
    format.serialize(&merged).map_err(merge_failure)
}

fn merge_toml(path: &Path, local: &str, incoming: &str) -> Result<String> {
    let local = parse_toml(local).map_err(|raw| Error::ParseFailure {
        path: path.to_path_buf(),
        raw,
    })?;
    let Some(mut merged) = local else {
        return Ok(incoming.to_owned());
    };

    let merge_failure = |raw| Error::MergeFailure {
        path: path.to_path_buf(),
        raw,
    };
    if let Some(remote) = parse_toml(incoming).map_err(merge_failure)? {
        for (key, value) in remote {
            merged.insert(key, value);
        }
    }
    toml::to_string(&merged).map_err(|e| merge_failure(e.into()))
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let io_error = |raw| Error::FileIo {
        path: path.to_path_buf(),
        raw,
    };
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(io_error)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(io_error)?;
    temp.write_all(contents.as_bytes()).map_err(io_error)?;
    temp.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}
