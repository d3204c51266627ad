//! Support for Java-style `.properties` files.
//!
//! Lines of the form `key = value` or `key: value`, values continued with a
//! trailing backslash, `\uXXXX` escapes, and `#` or `!` line comments.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::{
    formats::{
        Dialect,
        context::{Context, EntitySpans},
    },
    traits::Parser,
    types::Entry,
};

lazy_static! {
    static ref KEY_REGEX: Regex = Regex::new(r"^(?P<key>[^#!\s][^=:\n]*?)[ \t]*[:=][ \t]*").unwrap();
    static ref ESCAPE_REGEX: Regex =
        Regex::new(r"(?s)\\(?:u([0-9a-fA-F]{1,4})|(\r?\n[ \t]*)|(.))").unwrap();
}

fn is_properties_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0c')
}

fn is_comment_start(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('!')
}

/// Resolves `\uXXXX`, `\n`, `\r`, `\t`, `\\` and line continuations; any
/// other escaped character stands for itself.
///
/// # Example
/// ```rust
/// use l10nmerge::formats::properties::unescape;
/// assert_eq!(unescape(r"caf\u00e9\tbar"), "café\tbar");
/// assert_eq!(unescape("one \\\n    two"), "one two");
/// ```
pub fn unescape(raw: &str) -> String {
    ESCAPE_REGEX
        .replace_all(raw, |caps: &Captures| {
            if let Some(hex) = caps.get(1) {
                return u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map_or_else(|| caps[0].to_string(), String::from);
            }
            if caps.get(2).is_some() {
                return String::new();
            }
            match &caps[3] {
                "n" => "\n".to_string(),
                "r" => "\r".to_string(),
                "t" => "\t".to_string(),
                other => other.to_string(),
            }
        })
        .into_owned()
}

/// Parser for `.properties` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesParser;

impl Parser for PropertiesParser {
    fn dialect(&self) -> Dialect {
        Dialect::Properties
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
    let space = ctx.space_run(offset, is_properties_space);
    if space > 0 {
        ctx.whitespace(offset..offset + space);
        return offset + space;
    }

    let rest = ctx.rest(offset);
    if is_comment_start(rest) {
        let mut end = ctx.line_end(offset);
        let mut lines = vec![strip_marker(&ctx.text[offset..end])];
        while let Some(next) = ctx.next_line(end) {
            if !is_comment_start(ctx.rest(next)) {
                break;
            }
            end = ctx.line_end(next);
            lines.push(strip_marker(&ctx.text[next..end]));
        }
        ctx.comment(offset..end, lines.join("\n"));
        return end;
    }

    if let Some(caps) = KEY_REGEX.captures(rest) {
        let (Some(key), Some(head)) = (caps.name("key"), caps.get(0)) else {
            return ctx.junk(offset, ctx.line_end(offset));
        };
        let value_start = offset + head.end();
        let value_end = value_end(ctx, value_start);
        let raw = &ctx.text[value_start..value_end];
        let spans = EntitySpans {
            all: offset..value_end,
            key: offset + key.start()..offset + key.end(),
            val: value_start..value_end,
        };
        return ctx.entity(key.as_str().to_string(), spans, unescape(raw), Vec::new());
    }

    ctx.junk(offset, ctx.line_end(offset))
}

/// End of a value starting at `start`: follows lines ending in an odd
/// number of backslashes, then drops trailing whitespace.
fn value_end(ctx: &Context, start: usize) -> usize {
    let mut line_start = start;
    let end = loop {
        let line_end = ctx.line_end(line_start);
        let backslashes = ctx.text[line_start..line_end]
            .chars()
            .rev()
            .take_while(|&c| c == '\\')
            .count();
        match ctx.next_line(line_end) {
            Some(next) if backslashes % 2 == 1 => line_start = next,
            _ => break line_end,
        }
    };
    start + ctx.text[start..end].trim_end().len()
}

fn strip_marker(line: &str) -> String {
    let body = &line[1..];
    body.strip_prefix(' ').unwrap_or(body).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Offset, Position};
    use indoc::indoc;

    fn tokenize(text: &str) -> Vec<Entry> {
        PropertiesParser.tokenize(text)
    }

    #[test]
    fn test_parse_basic_properties() {
        let text = indoc! {r"
            # LOCALIZATION NOTE (downloads.title):
            # %S is the number of files
            downloads.title = %S Downloads
            ! legacy comment
            key2:value2
        "};
        let entries = tokenize(text);
        let kinds: Vec<_> = entries.iter().map(Entry::kind).collect();
        assert_eq!(
            kinds,
            vec!["comment", "whitespace", "entity", "whitespace", "comment", "whitespace", "entity", "whitespace"]
        );
        match &entries[0] {
            Entry::Comment(c) => {
                assert_eq!(c.val, "LOCALIZATION NOTE (downloads.title):\n%S is the number of files")
            }
            other => panic!("expected comment, got {}", other),
        }
        let title = entries[2].as_entity().unwrap();
        assert_eq!(title.key, "downloads.title");
        assert_eq!(title.val, "%S Downloads");
        assert_eq!(title.start.line, 3);
        let key2 = entries[6].as_entity().unwrap();
        assert_eq!(key2.key, "key2");
        assert_eq!(key2.val, "value2");
    }

    #[test]
    fn test_line_continuation() {
        let text = "long = first \\\n    second\nnext = n";
        let entries = tokenize(text);
        let long = entries[0].as_entity().unwrap();
        assert_eq!(long.raw_val, "first \\\n    second");
        assert_eq!(long.val, "first second");
        assert_eq!(long.value_position(Offset::End), Position { line: 2, column: 11 });
        assert_eq!(entries[2].as_entity().unwrap().key, "next");
    }

    #[test]
    fn test_even_backslashes_do_not_continue() {
        let text = "path = C:\\\\\nnext = n";
        let entries = tokenize(text);
        let path = entries[0].as_entity().unwrap();
        assert_eq!(path.val, "C:\\");
        assert_eq!(entries[2].as_entity().unwrap().key, "next");
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(unescape(r"\u00e9\u20AC\uZZ"), "é€uZZ");
        assert_eq!(unescape(r"a\=b\:c\\d"), "a=b:c\\d");
        assert_eq!(unescape(r"\n\r\t"), "\n\r\t");
    }

    #[test]
    fn test_crlf_and_trailing_spaces() {
        let text = "a = 1  \r\nb = 2\r\n";
        let entries = tokenize(text);
        assert_eq!(entries[0].all(), "a = 1");
        assert_eq!(entries[1].all(), "  \r\n");
        assert_eq!(entries[2].as_entity().unwrap().val, "2");
        assert_eq!(entries.iter().map(Entry::all).collect::<String>(), text);
    }

    #[test]
    fn test_line_without_separator_is_junk() {
        let text = "good = 1\nnot a property line\nalso = 2";
        let entries = tokenize(text);
        assert!(matches!(&entries[2], Entry::Junk(j) if j.all == "not a property line"));
        assert_eq!(entries[4].as_entity().unwrap().key, "also");
    }

    #[test]
    fn test_empty_value() {
        let entries = tokenize("empty =\n");
        let empty = entries[0].as_entity().unwrap();
        assert_eq!(empty.all, "empty =");
        assert_eq!(empty.val, "");
    }

    #[test]
    fn test_duplicate_key_is_junk() {
        let entries = tokenize("a = 1\na = 2\n");
        assert_eq!(entries[0].as_entity().unwrap().val, "1");
        assert!(matches!(&entries[2], Entry::Junk(j) if j.all == "a = 2"));
    }
}
