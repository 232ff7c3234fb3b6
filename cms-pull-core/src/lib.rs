#![doc = "cms-pull-core: core logic library for cms-pull."]

//! This crate turns raw records exported from a headless CMS (Contentful,
//! Sanity, DatoCMS) into files a static-site generator can consume.
//!
//! # Pipeline
//! 1. A [`contract::CmsAdapter`] hands over a [`contract::PullBundle`]
//! 2. [`mapper`] walks every root record with [`deep_map`] and produces canonical entries
//! 3. [`materialize`] derives file paths ([`slug`]) and serializes by extension ([`format`])
//! 4. [`materialize::write_files`] merges into existing files and writes atomically
//!
//! [`synchronise`] strings the stages together.

pub mod adapter;
pub mod config;
pub mod contract;
pub mod deep_map;
pub mod entry;
pub mod error;
pub mod format;
pub mod mapper;
pub mod materialize;
pub mod slug;
pub mod synchronise;

pub use error::{Error, Result};
