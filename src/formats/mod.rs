//! All supported localization dialects for l10nmerge.
//!
//! This module re-exports the parser of each dialect and provides the
//! [`Dialect`] enum, which doubles as the dispatch table from a file name or
//! tag to the [`Parser`] that handles it.

pub mod android_strings;
pub(crate) mod context;
pub mod dtd;
pub mod fluent;
pub mod ini;
pub mod properties;

use std::{
    fmt::{Display, Formatter},
    path::Path,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

// Reexporting the parsers for easier access
pub use android_strings::AndroidStringsParser;
pub use dtd::DtdParser;
pub use fluent::FluentParser;
pub use ini::IniParser;
pub use properties::PropertiesParser;

use crate::{Error, traits::Parser};

/// Represents all supported resource syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// XML DTD entity declarations (`.dtd`).
    Dtd,
    /// Project Fluent (`.ftl`).
    Fluent,
    /// Java-style `.properties`.
    Properties,
    /// Android `strings.xml`.
    AndroidStrings,
    /// `.ini` files with `[section]` headers.
    Ini,
}

/// Implements [`std::fmt::Display`] for [`Dialect`].
///
/// # Example
/// ```rust
/// use l10nmerge::formats::Dialect;
/// assert_eq!(Dialect::Dtd.to_string(), "dtd");
/// assert_eq!(Dialect::Fluent.to_string(), "ftl");
/// assert_eq!(Dialect::AndroidStrings.to_string(), "android");
/// ```
impl Display for Dialect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Dtd => write!(f, "dtd"),
            Dialect::Fluent => write!(f, "ftl"),
            Dialect::Properties => write!(f, "properties"),
            Dialect::AndroidStrings => write!(f, "android"),
            Dialect::Ini => write!(f, "ini"),
        }
    }
}

/// Implements [`std::str::FromStr`] for [`Dialect`].
///
/// Accepts case-insensitive tags; returns [`Error::UnknownDialect`] otherwise.
///
/// # Example
/// ```rust
/// use l10nmerge::formats::Dialect;
/// use std::str::FromStr;
/// assert_eq!(Dialect::from_str("fluent").unwrap(), Dialect::Fluent);
/// assert_eq!(Dialect::from_str("xml").unwrap(), Dialect::AndroidStrings);
/// assert!(Dialect::from_str("po").is_err());
/// ```
impl FromStr for Dialect {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "dtd" => Ok(Dialect::Dtd),
            "ftl" | "fluent" => Ok(Dialect::Fluent),
            "properties" => Ok(Dialect::Properties),
            "android" | "androidstrings" | "xml" => Ok(Dialect::AndroidStrings),
            "ini" => Ok(Dialect::Ini),
            other => Err(Error::UnknownDialect(other.to_string())),
        }
    }
}

static DTD: DtdParser = DtdParser;
static FLUENT: FluentParser = FluentParser;
static PROPERTIES: PropertiesParser = PropertiesParser;
static ANDROID_STRINGS: AndroidStringsParser = AndroidStringsParser;
static INI: IniParser = IniParser;

impl Dialect {
    pub const ALL: [Dialect; 5] = [
        Dialect::Dtd,
        Dialect::Fluent,
        Dialect::Properties,
        Dialect::AndroidStrings,
        Dialect::Ini,
    ];

    /// Returns the typical file extension for this dialect.
    pub fn extension(&self) -> &'static str {
        match self {
            Dialect::Dtd => "dtd",
            Dialect::Fluent => "ftl",
            Dialect::Properties => "properties",
            Dialect::AndroidStrings => "xml",
            Dialect::Ini => "ini",
        }
    }

    /// Picks the dialect for a file name by its extension.
    ///
    /// # Example
    /// ```rust
    /// use l10nmerge::formats::Dialect;
    /// assert_eq!(Dialect::from_path("browser/menubar.ftl").unwrap(), Dialect::Fluent);
    /// assert_eq!(Dialect::from_path("res/values-de/strings.xml").unwrap(), Dialect::AndroidStrings);
    /// assert!(Dialect::from_path("README.md").is_err());
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("dtd") => Ok(Dialect::Dtd),
            Some("ftl") => Ok(Dialect::Fluent),
            Some("properties") => Ok(Dialect::Properties),
            Some("xml") => Ok(Dialect::AndroidStrings),
            Some("ini") => Ok(Dialect::Ini),
            _ => Err(Error::UnknownDialect(path.display().to_string())),
        }
    }

    /// The parser and serializer registered for this dialect.
    pub fn parser(&self) -> &'static dyn Parser {
        match self {
            Dialect::Dtd => &DTD,
            Dialect::Fluent => &FLUENT,
            Dialect::Properties => &PROPERTIES,
            Dialect::AndroidStrings => &ANDROID_STRINGS,
            Dialect::Ini => &INI,
        }
    }
}
