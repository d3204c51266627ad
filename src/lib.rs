//! Round-trip parsers and a channel merge engine for localization files.
//!
//! Supports DTD, Fluent (`.ftl`), Java-style `.properties`, Android
//! `strings.xml` and `.ini` resources. Every parser tiles its input with
//! entities, comments, whitespace and junk, so `serialize(parse(bytes))`
//! gives back `bytes`. The merge engine reconciles one resource across
//! release channels, newest first.

#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod error;
pub mod formats;
pub mod merge;
pub mod traits;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    codec::{merge_channel_resources, merge_channels, parse, parse_path, serialize},
    config::{MergeOptions, ParseOptions},
    error::Error,
    formats::Dialect,
    merge::merge_resources,
    traits::Parser,
    types::{Attribute, Comment, Entity, Entry, Junk, Offset, Position, Resource, Whitespace},
};
