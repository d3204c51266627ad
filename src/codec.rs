//! Entry points that pick the dialect for a file and run the parser, the
//! merge engine and the serializer.
//!
//! Everything here works on byte buffers supplied by the caller; the file
//! helpers at the bottom are thin wrappers for tools that keep resources on
//! disk.

use std::{fs::File, path::Path};

use log::debug;

use crate::{
    config::{MergeOptions, ParseOptions},
    error::Error,
    formats::Dialect,
    merge::merge_resources,
    types::Resource,
};

/// Parses `bytes` as `dialect` with default options.
///
/// # Example
/// ```rust
/// use l10nmerge::{codec, formats::Dialect};
/// let resource = codec::parse(b"\xEF\xBB\xBF<!ENTITY foo.label \"stuff\">", Dialect::Dtd)?;
/// assert_eq!(resource.get("foo.label").unwrap().val, "stuff");
/// assert!(resource.bom);
/// # Ok::<(), l10nmerge::Error>(())
/// ```
pub fn parse(bytes: &[u8], dialect: Dialect) -> Result<Resource, Error> {
    parse_with_options(bytes, dialect, &ParseOptions::default())
}

pub fn parse_with_options(
    bytes: &[u8],
    dialect: Dialect,
    options: &ParseOptions,
) -> Result<Resource, Error> {
    dialect.parser().parse(bytes, options)
}

/// Parses `bytes` with the dialect registered for the extension of `name`.
///
/// # Parameters
/// - `name`: File name or path; only its extension is looked at.
/// - `bytes`: Content of the file.
/// - `options`: Encoding and sticky keys.
///
/// # Returns
///
/// The parsed resource, [`Error::UnknownDialect`] for an unregistered
/// extension, or [`Error::Encoding`] when the bytes cannot be decoded.
pub fn parse_path<P: AsRef<Path>>(
    name: P,
    bytes: &[u8],
    options: &ParseOptions,
) -> Result<Resource, Error> {
    parse_with_options(bytes, Dialect::from_path(name)?, options)
}

/// Writes `resource` back to bytes in its dialect and encoding.
pub fn serialize(resource: &Resource) -> Result<Vec<u8>, Error> {
    resource.dialect.parser().serialize(resource)
}

/// Parses every channel of the file `name` and merges them.
///
/// # Parameters
/// - `name`: File name used to pick the dialect, checked before any parsing.
/// - `channels`: File contents, newest channel first.
/// - `options`: Merge and parse options.
///
/// # Returns
///
/// The merged resource. An empty channel list is an
/// [`Error::InvalidResource`].
pub fn merge_channel_resources<P: AsRef<Path>>(
    name: P,
    channels: &[&[u8]],
    options: &MergeOptions,
) -> Result<Resource, Error> {
    let name = name.as_ref();
    let dialect = Dialect::from_path(name)?;
    let resources = channels
        .iter()
        .map(|bytes| parse_with_options(bytes, dialect, &options.parse))
        .collect::<Result<Vec<_>, Error>>()?;
    debug!(
        "merging {} channels of {}",
        resources.len(),
        name.display()
    );
    merge_resources(&resources, options.keep_newest).ok_or_else(|| {
        Error::InvalidResource(format!("no channels to merge for {}", name.display()))
    })
}

/// Like [`merge_channel_resources`], returning the serialized merge.
///
/// # Example
/// ```rust
/// use l10nmerge::{codec::merge_channels, config::MergeOptions};
/// let newer: &[u8] = b"<!ENTITY a \"NEW\">";
/// let older: &[u8] = b"<!ENTITY a \"OLD\"><!ENTITY b \"KEEP\">";
/// let merged = merge_channels("browser.dtd", &[newer, older], &MergeOptions::default())?;
/// assert_eq!(merged, b"<!ENTITY a \"NEW\"><!ENTITY b \"KEEP\">");
/// # Ok::<(), l10nmerge::Error>(())
/// ```
pub fn merge_channels<P: AsRef<Path>>(
    name: P,
    channels: &[&[u8]],
    options: &MergeOptions,
) -> Result<Vec<u8>, Error> {
    serialize(&merge_channel_resources(name, channels, options)?)
}

/// Reads and parses a file, picking the dialect from its extension.
pub fn read_file<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Resource, Error> {
    let path = path.as_ref();
    let dialect = Dialect::from_path(path)?;
    let bytes = std::fs::read(path).map_err(Error::Io)?;
    debug!("read {} bytes from {}", bytes.len(), path.display());
    parse_with_options(&bytes, dialect, options)
}

/// Serializes `resource` into the file at `path`, replacing its content.
pub fn write_file<P: AsRef<Path>>(resource: &Resource, path: P) -> Result<(), Error> {
    let bytes = serialize(resource)?;
    std::fs::write(path, bytes).map_err(Error::Io)
}

/// Stores the parsed model of `resources` as JSON.
///
/// # Parameters
/// - `resources`: Resources to store.
/// - `path`: Destination file path for the cache.
///
/// # Returns
///
/// `Ok(())` if caching succeeds, or an `Error` if file I/O or serialization fails.
pub fn cache_to_file<P: AsRef<Path>>(resources: &[Resource], path: P) -> Result<(), Error> {
    let mut writer = File::create(path).map_err(Error::Io)?;
    serde_json::to_writer(&mut writer, resources).map_err(Error::Json)?;
    Ok(())
}

/// Loads resources stored with [`cache_to_file`].
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Resource>, Error> {
    let reader = File::open(path).map_err(Error::Io)?;
    serde_json::from_reader(reader).map_err(Error::Json)
}
