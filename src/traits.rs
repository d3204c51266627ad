//! The per-dialect parsing and serialization capability.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use log::{debug, warn};

use crate::{
    config::ParseOptions,
    error::Error,
    formats::Dialect,
    types::{Entry, Resource},
};

/// Parses bytes of one dialect into a [`Resource`] and writes it back.
///
/// Implementors only provide [`Parser::tokenize`]; decoding, byte order mark
/// handling, sticky keys and encoding are shared.
///
/// # Example
///
/// ```rust
/// use l10nmerge::formats::Dialect;
/// let parser = Dialect::Dtd.parser();
/// let resource = parser.parse(b"<!ENTITY foo.label \"stuff\">", &Default::default())?;
/// assert_eq!(resource.get("foo.label").unwrap().val, "stuff");
/// assert_eq!(parser.serialize(&resource)?, b"<!ENTITY foo.label \"stuff\">");
/// # Ok::<(), l10nmerge::Error>(())
/// ```
pub trait Parser: Sync {
    fn dialect(&self) -> Dialect;

    /// Splits decoded text into entries whose `all` texts tile `text`.
    /// Never fails: unrecognized regions become junk.
    fn tokenize(&self, text: &str) -> Vec<Entry>;

    /// Encoding used when neither a byte order mark nor the options say otherwise.
    fn default_encoding(&self) -> &'static Encoding {
        UTF_8
    }

    /// Whether [`ParseOptions::encoding`] applies to this dialect.
    fn configurable_encoding(&self) -> bool {
        false
    }

    /// Decodes and tokenizes `bytes`.
    fn parse(&self, bytes: &[u8], options: &ParseOptions) -> Result<Resource, Error> {
        let dialect = self.dialect();
        let mut encoding = match options.resolve_encoding()? {
            Some(configured) if self.configurable_encoding() => configured,
            Some(configured) => {
                debug!(
                    "ignoring encoding `{}` for {} resource",
                    configured.name(),
                    dialect
                );
                self.default_encoding()
            }
            None => self.default_encoding(),
        };

        let (body, bom) = match Encoding::for_bom(bytes) {
            Some((sniffed, bom_length)) => {
                encoding = sniffed;
                (&bytes[bom_length..], true)
            }
            None => (bytes, false),
        };

        let text = encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .map(Cow::into_owned)
            .ok_or_else(|| {
                Error::encoding_error(format!(
                    "{} resource is not valid {}",
                    dialect,
                    encoding.name()
                ))
            })?;

        let mut entries = self.tokenize(&text);
        debug_assert_eq!(
            entries.iter().map(Entry::all).collect::<String>(),
            text,
            "{} tokenizer dropped text",
            dialect
        );

        let mut junk = 0;
        for entry in &mut entries {
            match entry {
                Entry::Entity(entity) if options.sticky_keys.contains(&entity.key) => {
                    entity.sticky = true;
                }
                Entry::Junk(j) => {
                    junk += 1;
                    warn!("{}: unparsed content at {}: {:?}", dialect, j.start, preview(&j.all));
                }
                _ => {}
            }
        }
        debug!(
            "parsed {} resource: {} entries, {} junk, encoding {}",
            dialect,
            entries.len(),
            junk,
            encoding.name()
        );

        Ok(Resource::new(dialect, encoding, bom, entries))
    }

    /// Concatenates the entries and encodes them like the source was.
    fn serialize(&self, resource: &Resource) -> Result<Vec<u8>, Error> {
        if resource.dialect != self.dialect() {
            return Err(Error::InvalidResource(format!(
                "{} resource handed to the {} serializer",
                resource.dialect,
                self.dialect()
            )));
        }
        encode(&resource.to_text(), resource.encoding, resource.bom)
    }
}

fn encode(text: &str, encoding: &'static Encoding, bom: bool) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(text.len() + 3);
    if encoding == UTF_16LE || encoding == UTF_16BE {
        let little = encoding == UTF_16LE;
        if bom {
            out.extend_from_slice(if little { &[0xFF, 0xFE] } else { &[0xFE, 0xFF] });
        }
        for unit in text.encode_utf16() {
            out.extend_from_slice(&if little {
                unit.to_le_bytes()
            } else {
                unit.to_be_bytes()
            });
        }
        return Ok(out);
    }

    if bom && encoding == UTF_8 {
        out.extend_from_slice(b"\xEF\xBB\xBF");
    }
    let (bytes, _, unmappable) = encoding.encode(text);
    if unmappable {
        return Err(Error::encoding_error(format!(
            "text cannot be encoded as {}",
            encoding.name()
        )));
    }
    out.extend_from_slice(&bytes);
    Ok(out)
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 40;
    match text.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
