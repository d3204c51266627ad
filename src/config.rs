//! Options controlling parsing and merging.
//!
//! Both structs deserialize from JSON with every field optional, so a host
//! tool can keep them in its own configuration file.

use std::collections::BTreeSet;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Options applied when decoding and tokenizing a resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// WHATWG encoding label for dialects with a configurable encoding
    /// (DTD and properties). A byte order mark in the input wins over it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    /// Keys of entities that always follow the newest channel.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub sticky_keys: BTreeSet<String>,
}

impl ParseOptions {
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    pub fn with_sticky_key(mut self, key: impl Into<String>) -> Self {
        self.sticky_keys.insert(key.into());
        self
    }

    /// Resolves the configured label, if any.
    pub fn resolve_encoding(&self) -> Result<Option<&'static Encoding>, Error> {
        match &self.encoding {
            None => Ok(None),
            Some(label) => Encoding::for_label(label.trim().as_bytes())
                .map(Some)
                .ok_or_else(|| Error::encoding_error(format!("unknown encoding label `{}`", label))),
        }
    }
}

/// Options for reconciling one resource across channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Take entity values from the newest channel that has them. When
    /// `false`, values come from the oldest channel, except for sticky
    /// entities.
    pub keep_newest: bool,

    /// Options used to parse every channel.
    pub parse: ParseOptions,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            keep_newest: true,
            parse: ParseOptions::default(),
        }
    }
}

impl MergeOptions {
    pub fn keep_oldest() -> Self {
        MergeOptions {
            keep_newest: false,
            ..MergeOptions::default()
        }
    }

    pub fn with_parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(Error::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_options_default_keeps_newest() {
        let options = MergeOptions::default();
        assert!(options.keep_newest);
        assert_eq!(options.parse, ParseOptions::default());
        assert!(!MergeOptions::keep_oldest().keep_newest);
    }

    #[test]
    fn test_merge_options_from_partial_json() {
        let options = MergeOptions::from_json(r#"{ "parse": { "sticky_keys": ["locale.version"] } }"#)
            .unwrap();
        assert!(options.keep_newest);
        assert!(options.parse.sticky_keys.contains("locale.version"));
        assert_eq!(options.parse.encoding, None);

        let options = MergeOptions::from_json(r#"{ "keep_newest": false }"#).unwrap();
        assert!(!options.keep_newest);
    }

    #[test]
    fn test_merge_options_from_invalid_json() {
        let err = MergeOptions::from_json("{ keep_newest: 1 }").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_resolve_encoding() {
        assert_eq!(ParseOptions::default().resolve_encoding().unwrap(), None);
        let latin1 = ParseOptions::default().with_encoding("ISO-8859-1");
        assert_eq!(
            latin1.resolve_encoding().unwrap(),
            Some(encoding_rs::WINDOWS_1252)
        );
        let bogus = ParseOptions::default().with_encoding("klingon");
        assert!(matches!(bogus.resolve_encoding(), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_parse_options_builder() {
        let options = ParseOptions::default()
            .with_sticky_key("a")
            .with_sticky_key("b")
            .with_sticky_key("a");
        assert_eq!(options.sticky_keys.len(), 2);
    }
}
