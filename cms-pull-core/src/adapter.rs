//! Local JSON sources: exported CMS bundles and prebuilt output records.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::contract::{CmsAdapter, PullBundle};
use crate::error::{AdapterError, Error, FormatError, Result};
use crate::materialize::OutputRecord;

/// Reads a [`PullBundle`] that was exported to a JSON file beforehand.
#[derive(Debug, Clone)]
pub struct LocalExportAdapter {
    path: PathBuf,
}

impl LocalExportAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CmsAdapter for LocalExportAdapter {
    fn fetch(&self) -> std::result::Result<PullBundle, AdapterError> {
        info!(path = %self.path.display(), "Reading CMS export");
        let text = fs::read_to_string(&self.path).map_err(|raw| AdapterError::Read {
            path: self.path.clone(),
            raw,
        })?;
        let bundle: PullBundle =
            serde_json::from_str(&text).map_err(|raw| AdapterError::Decode {
                path: self.path.clone(),
                raw,
            })?;
        debug!(vendor = %bundle.vendor(), "Decoded CMS export");
        Ok(bundle)
    }
}

/// Reads a JSON array of already materialized `{filePath, data}` records.
pub fn read_records(path: &Path) -> Result<Vec<OutputRecord>> {
    let text = fs::read_to_string(path).map_err(|raw| Error::FileIo {
        path: path.to_path_buf(),
        raw,
    })?;
    let records: Vec<OutputRecord> =
        serde_json::from_str(&text).map_err(|raw| Error::ParseFailure {
            path: path.to_path_buf(),
            raw: FormatError::Json(raw),
        })?;
    info!(path = %path.display(), records = records.len(), "Read output records");
    Ok(records)
}
