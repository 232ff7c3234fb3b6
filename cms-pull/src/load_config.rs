//! `load_config` module: loads a static YAML pull config and maps it into the
//! core crate's [`SynchroniseConfig`].
//!
//! This is the only place where user-supplied YAML is parsed. Loosely typed
//! keys (the `ssg` name, the source `type`) are mapped to rich types here so the
//! core never sees raw strings.
//!
//! # Errors
//! Every failure is an `anyhow::Error` with the config path in its message,
//! surfaced at the CLI boundary.
//!
//! Accepted shape:
//!
//! ```yaml
//! source:
//!   type: local_export
//!   path: ./export.json
//! ssg: hugo
//! output_dir: .
//! options:
//!   all_objects: false
//!   resolve_links: true
//!   data_format: file
//!   metadata: false
//! ```

use anyhow::Result;
use cms_pull_core::config::{DataFormat, PullOptions, SsgType};
use cms_pull_core::synchronise::SynchroniseConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Where the records of a pull come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceSection {
    /// A bundle previously exported to a JSON file.
    LocalExport { path: PathBuf },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OptionsSection {
    pub all_objects: bool,
    pub resolve_links: bool,
    pub data_format: DataFormat,
    pub metadata: bool,
}

#[derive(Debug)]
pub struct CliConfig {
    pub source: SourceSection,
    pub synchronise: SynchroniseConfig,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    #[derive(Debug, Deserialize)]
    struct RawConfig {
        source: SourceSection,
        #[serde(default)]
        ssg: Option<String>,
        #[serde(default = "default_output_dir")]
        output_dir: PathBuf,
        #[serde(default)]
        options: OptionsSection,
    }

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let options = PullOptions {
        all_objects: raw.options.all_objects,
        resolve_links: raw.options.resolve_links,
        data_format: raw.options.data_format,
        metadata: raw.options.metadata,
        ssg: raw.ssg.as_deref().map(SsgType::from).unwrap_or_default(),
    };

    Ok(CliConfig {
        source: raw.source,
        synchronise: SynchroniseConfig {
            options,
            output_dir: raw.output_dir,
        },
    })
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
