//! High-level pipeline: fetch → map → materialize → write for one CMS pull.
//!
//! # Major Types
//! - [`SynchroniseConfig`]: pull options plus the output root for the write step
//! - [`SynchroniseReport`]: the records produced and, in file mode, what was written
//!
//! # Responsibilities
//! - Fail-fast orchestration: the first failing stage ends the pull
//! - Logs every stage with `tracing` events
//! - The output root is always passed in; the process working directory is never consulted
//!
//! # Callable From
//! - The CLI crate and integration tests, with any [`CmsAdapter`] implementation
//!   (the local export reader, or a `MockCmsAdapter`)
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Mapping and materializing without IO: [`pull`]

use std::path::PathBuf;
use tracing::{error, info};

use crate::config::PullOptions;
use crate::contract::{CmsAdapter, PullBundle, Vendor};
use crate::error::{Error, Result};
use crate::mapper::map_bundle;
use crate::materialize::{create_files, write_files, OutputRecord, WriteReport};

#[derive(Debug, Clone)]
pub struct SynchroniseConfig {
    pub options: PullOptions,
    pub output_dir: PathBuf,
}

#[derive(Debug)]
pub struct SynchroniseReport {
    pub vendor: Vendor,
    pub records: Vec<OutputRecord>,
    /// `None` in object mode, where nothing is written to disk.
    pub write: Option<WriteReport>,
}

/// Maps a fetched bundle into output records without touching the filesystem.
pub fn pull(bundle: &PullBundle, options: &PullOptions) -> Result<Vec<OutputRecord>> {
    let entries = map_bundle(bundle, options)?;
    create_files(entries, options)
}

/// Runs a full pull through `adapter`, writing files under `config.output_dir`
/// unless the object data format was requested.
pub fn synchronise<A>(adapter: &A, config: &SynchroniseConfig) -> Result<SynchroniseReport>
where
    A: CmsAdapter + ?Sized,
{
    info!("[SYNC] Starting CMS pull");
    config.options.trace_loaded();

    let bundle = adapter.fetch().map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Fetching CMS records failed");
        Error::from(e)
    })?;
    let vendor = bundle.vendor();
    info!(%vendor, "[SYNC] Fetched CMS records");

    let records = pull(&bundle, &config.options).map_err(|e| {
        error!(%vendor, error = %e, "[SYNC][ERROR] Mapping CMS records failed");
        e
    })?;
    info!(%vendor, records = records.len(), "[SYNC] Materialized output records");

    if config.options.is_object_format() {
        info!("[SYNC] Object data format requested, skipping file writes");
        return Ok(SynchroniseReport {
            vendor,
            records,
            write: None,
        });
    }

    let write = write_files(&records, &config.output_dir)?;
    info!(
        written = write.written.len(),
        unchanged = write.unchanged.len(),
        "[SYNC] Pull complete"
    );
    Ok(SynchroniseReport {
        vendor,
        records,
        write: Some(write),
    })
}
