//! Support for XML DTD entity files (`.dtd`).
//!
//! Recognizes general entities `<!ENTITY name "value">`, parameter entity
//! references `<!ENTITY % name SYSTEM "url"> %name;` and `<!-- -->` comments.
//! Entity values resolve HTML named and numeric character references.

use lazy_static::lazy_static;
use quick_xml::escape::resolve_html5_entity;
use regex::{Captures, Regex};

use crate::{
    formats::{
        Dialect,
        context::{Context, EntitySpans},
    },
    traits::Parser,
    types::Entry,
};

// XML 1.1 NameStartChar and NameChar.
const NAME_START_CHAR: &str = r":A-Z_a-z\x{C0}-\x{D6}\x{D8}-\x{F6}\x{F8}-\x{2FF}\x{370}-\x{37D}\x{37F}-\x{1FFF}\x{200C}-\x{200D}\x{2070}-\x{218F}\x{2C00}-\x{2FEF}\x{3001}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFFD}\x{10000}-\x{EFFFF}";
const NAME_CHAR_EXTRA: &str = r"\-.0-9\x{B7}\x{300}-\x{36F}\x{203F}-\x{2040}";

lazy_static! {
    static ref NAME: String = format!("[{0}][{0}{1}]*", NAME_START_CHAR, NAME_CHAR_EXTRA);
    static ref ENTITY_REGEX: Regex = Regex::new(&format!(
        r#"^<!ENTITY\s+(?P<key>{})\s+(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')\s*>"#,
        *NAME
    ))
    .unwrap();
    static ref PARAMETER_ENTITY_REGEX: Regex = Regex::new(&format!(
        r#"^<!ENTITY\s+%\s+(?P<key>{0})\s+SYSTEM\s+(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')\s*>\s*%{0};"#,
        *NAME
    ))
    .unwrap();
    static ref CHAR_REFERENCE_REGEX: Regex =
        Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9a-fA-F]+)|([A-Za-z][A-Za-z0-9]*));").unwrap();
    static ref BOUNDARY_REGEX: Regex = Regex::new(r"<!ENTITY|<!--").unwrap();
    static ref COMMENT_END_REGEX: Regex = Regex::new(r"-->|<!--").unwrap();
}

const ENTITY_OPEN: &str = "<!ENTITY";
const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Resolves HTML named references and decimal or hex character references.
/// Unknown or invalid references are kept verbatim.
///
/// # Example
/// ```rust
/// use l10nmerge::formats::dtd::unescape;
/// assert_eq!(unescape("A&amp;B&#38;C&#x26;D"), "A&B&C&D");
/// assert_eq!(unescape("&nbsp;&brandShortName;"), "\u{a0}&brandShortName;");
/// ```
pub fn unescape(raw: &str) -> String {
    CHAR_REFERENCE_REGEX
        .replace_all(raw, |caps: &Captures| {
            let resolved = if let Some(dec) = caps.get(1) {
                dec.as_str()
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
            } else {
                caps.get(3)
                    .and_then(|name| resolve_html5_entity(name.as_str()))
                    .map(String::from)
            };
            resolved.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Parser for `.dtd` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DtdParser;

impl Parser for DtdParser {
    fn dialect(&self) -> Dialect {
        Dialect::Dtd
    }

    fn configurable_encoding(&self) -> bool {
        true
    }

    fn tokenize(&self, text: &str) -> Vec<Entry> {
        let mut ctx = Context::new(text);
        let mut offset = 0;
        while offset < ctx.len() {
            offset = next_entry(&mut ctx, offset);
        }
        ctx.finish()
    }
}

fn next_entry(ctx: &mut Context, offset: usize) -> usize {
    let rest = ctx.rest(offset);

    let space = ctx.space_run(offset, is_xml_space);
    if space > 0 {
        ctx.whitespace(offset..offset + space);
        return offset + space;
    }

    if rest.starts_with(COMMENT_OPEN) {
        let close = COMMENT_END_REGEX
            .find(&rest[COMMENT_OPEN.len()..])
            .filter(|m| m.as_str() == COMMENT_CLOSE)
            .map(|m| m.start());
        if let Some(close) = close {
            let body = &rest[COMMENT_OPEN.len()..COMMENT_OPEN.len() + close];
            if !body.contains("--") && !body.ends_with('-') {
                let end = offset + COMMENT_OPEN.len() + close + COMMENT_CLOSE.len();
                ctx.comment(offset..end, body.to_string());
                return end;
            }
        }
    }

    for regex in [&*ENTITY_REGEX, &*PARAMETER_ENTITY_REGEX] {
        if let Some(caps) = regex.captures(rest) {
            let value = caps.name("dq").or_else(|| caps.name("sq"));
            let (Some(key), Some(value), Some(all)) = (caps.name("key"), value, caps.get(0)) else {
                continue;
            };
            // An unterminated value would otherwise run into the next declaration.
            if value.as_str().contains(ENTITY_OPEN) {
                continue;
            }
            let spans = EntitySpans {
                all: offset..offset + all.end(),
                key: offset + key.start()..offset + key.end(),
                val: offset + value.start()..offset + value.end(),
            };
            return ctx.entity(
                key.as_str().to_string(),
                spans,
                unescape(value.as_str()),
                Vec::new(),
            );
        }
    }

    let first = rest.chars().next().map_or(1, char::len_utf8);
    let boundary = BOUNDARY_REGEX
        .find(&rest[first..])
        .map_or(ctx.len(), |m| offset + first + m.start());
    ctx.junk(offset, boundary)
}
