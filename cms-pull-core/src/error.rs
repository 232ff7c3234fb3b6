//! Error handling
//!
//! Reference gaps (unknown link targets, missing assets, cyclic links) are
//! not errors: they degrade to `null` in the mapped output. Everything listed
//! here aborts the current pull.

use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error;

/// Failure raised by a [`crate::contract::CmsAdapter`] while producing a bundle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdapterError {
    /// The export could not be read
    #[error("failed to read CMS export at '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        raw: IoError,
    },
    /// The export is not a valid bundle
    #[error("failed to decode CMS export at '{path}'")]
    Decode {
        path: PathBuf,
        #[source]
        raw: serde_json::Error,
    },
    /// Anything an external adapter wants to surface
    #[error("{0}")]
    Other(String),
}

/// Failure conditions encountered while mapping and materializing a pull
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The file extension has no serializer or parser
    #[error("data file '{path}' could not be created, extension '{extension}' is not supported")]
    UnsupportedFormat { path: String, extension: String },
    /// An existing local file is malformed for its extension
    #[error("could not parse file at '{path}'")]
    ParseFailure {
        path: PathBuf,
        #[source]
        raw: FormatError,
    },
    /// The incoming payload could not be merged into the existing local file
    #[error("could not merge remote data with local file at '{path}'")]
    MergeFailure {
        path: PathBuf,
        #[source]
        raw: FormatError,
    },
    /// Serializing an entry for its target file failed
    #[error("could not serialize data for '{path}'")]
    Serialize {
        path: String,
        #[source]
        raw: FormatError,
    },
    /// A page path could not be derived from the entry
    #[error("failed to derive file path: {reason}")]
    PathDerivation { reason: String },
    /// An entry that must be written has no `stackbit_file_path`
    #[error("entry of model type '{model_type}' has no 'stackbit_file_path'")]
    MissingFilePath { model_type: String },
    /// A vendor visitor rejected a raw record
    #[error("failed to map {vendor} entry: {reason}")]
    Mapping {
        vendor: &'static str,
        reason: String,
    },
    /// The adapter could not produce a bundle
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// Arbitrary file IO error
    #[error("failed to perform file IO for path '{path}'")]
    FileIo {
        path: PathBuf,
        #[source]
        raw: IoError,
    },
}

/// Underlying parser or serializer error of one of the supported formats.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
    /// The document parsed, but its top level is not a mapping
    #[error("expected a mapping at the top level")]
    NotAMapping,
    #[error("extension '{0}' is not supported")]
    Unsupported(String),
}

/// Default return type for fallible operations
pub type Result<T> = std::result::Result<T, Error>;
