//! Support for `.ini` files.
//!
//! `[section]` headers become entities keyed `[section]`; `key = value`
//! lines become entities keyed `section.key` (or `key` before the first
//! header). Lines starting with `;` or `#` are comments.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    formats::{
        Dialect,
        context::{Context, EntitySpans},
    },
    traits::Parser,
    types::Entry,
};

lazy_static! {
    static ref SECTION_REGEX: Regex = Regex::new(r"^\[(?P<name>[^\]\n]*)\]").unwrap();
    static ref KEY_REGEX: Regex =
        Regex::new(r"^(?P<key>[^=\n]*?[^=\s])[ \t]*=[ \t]*(?P<val>[^\n]*)").unwrap();
}

fn is_ini_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_comment_start(line: &str) -> bool {
    line.starts_with(';') || line.starts_with('#')
}

/// Parser for `.ini` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct IniParser;

impl Parser for IniParser {
    fn dialect(&self) -> Dialect {
        Dialect::Ini
    }

    fn tokenize(&self, text: &str) -> Vec<Entry> {
        let mut ctx = Context::new(text);
        let mut section: Option<String> = None;
        let mut offset = 0;
        while offset < ctx.len() {
            offset = next_entry(&mut ctx, offset, &mut section);
        }
        ctx.finish()
    }
}

fn next_entry(ctx: &mut Context, offset: usize, section: &mut Option<String>) -> usize {
    let space = ctx.space_run(offset, is_ini_space);
    if space > 0 {
        ctx.whitespace(offset..offset + space);
        return offset + space;
    }

    let rest = ctx.rest(offset);
    if is_comment_start(rest) {
        let mut end = ctx.line_end(offset);
        let mut lines = vec![ctx.text[offset + 1..end].trim().to_string()];
        while let Some(next) = ctx.next_line(end) {
            if !is_comment_start(ctx.rest(next)) {
                break;
            }
            end = ctx.line_end(next);
            lines.push(ctx.text[next + 1..end].trim().to_string());
        }
        ctx.comment(offset..end, lines.join("\n"));
        return end;
    }

    if let Some(caps) = SECTION_REGEX.captures(rest) {
        if let (Some(name), Some(all)) = (caps.name("name"), caps.get(0)) {
            *section = Some(name.as_str().to_string());
            let spans = EntitySpans {
                all: offset..offset + all.end(),
                key: offset..offset + all.end(),
                val: offset + name.start()..offset + name.end(),
            };
            return ctx.entity(
                all.as_str().to_string(),
                spans,
                name.as_str().to_string(),
                Vec::new(),
            );
        }
    }

    let line_end = ctx.line_end(offset);
    let line = &ctx.text[offset..line_end];
    if let Some(caps) = KEY_REGEX.captures(line) {
        if let (Some(key), Some(val)) = (caps.name("key"), caps.name("val")) {
            let raw = val.as_str().trim_end();
            let val_span = offset + val.start()..offset + val.start() + raw.len();
            let qualified = match section {
                Some(section) => format!("{}.{}", section, key.as_str()),
                None => key.as_str().to_string(),
            };
            let spans = EntitySpans {
                all: offset..val_span.end,
                key: offset + key.start()..offset + key.end(),
                val: val_span,
            };
            return ctx.entity(qualified, spans, raw.to_string(), Vec::new());
        }
    }

    ctx.junk(offset, line_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use indoc::indoc;

    fn tokenize(text: &str) -> Vec<Entry> {
        IniParser.tokenize(text)
    }

    #[test]
    fn test_parse_sections_and_keys() {
        let text = indoc! {"
            ; This file is in the UTF-8 encoding
            [Strings]
            TitleText=Firefox Update
            Info = Installing your update…

            [Extra]
            TitleText=Other
        "};
        let resource = IniParser.tokenize(text);
        let keys: Vec<_> = resource
            .iter()
            .filter_map(Entry::as_entity)
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(
            keys,
            vec!["[Strings]", "Strings.TitleText", "Strings.Info", "[Extra]", "Extra.TitleText"]
        );
        let info = resource
            .iter()
            .filter_map(Entry::as_entity)
            .find(|e| e.key == "Strings.Info")
            .unwrap();
        assert_eq!(info.val, "Installing your update…");
        assert_eq!(info.raw_val, "Installing your update…");
        assert_eq!(&text[info.key_span.clone()], "Info");
        assert_eq!(info.start, Position { line: 4, column: 1 });
        assert_eq!(info.value_start, Position { line: 4, column: 8 });
        match &resource[0] {
            Entry::Comment(c) => assert_eq!(c.val, "This file is in the UTF-8 encoding"),
            other => panic!("expected comment, got {}", other),
        }
    }

    #[test]
    fn test_keys_before_any_section_are_unqualified() {
        let entries = tokenize("top=1\n[S]\ntop=2\n");
        let keys: Vec<_> = entries
            .iter()
            .filter_map(Entry::as_entity)
            .map(|e| e.key.clone())
            .collect();
        assert_eq!(keys, vec!["top", "[S]", "S.top"]);
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let entries = tokenize("[S]\nKey=1\nkey=2\n");
        let count = entries.iter().filter_map(Entry::as_entity).count();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_malformed_lines_are_junk() {
        let text = "[Strings]\nno equals here\n=novalue\nok=1";
        let entries = tokenize(text);
        let junk: Vec<_> = entries
            .iter()
            .filter(|e| matches!(e, Entry::Junk(_)))
            .map(Entry::all)
            .collect();
        assert_eq!(junk, vec!["no equals here", "=novalue"]);
        assert_eq!(entries.iter().map(Entry::all).collect::<String>(), text);
    }

    #[test]
    fn test_text_after_section_header() {
        let entries = tokenize("[S] trailing\n");
        let kinds: Vec<_> = entries.iter().map(Entry::kind).collect();
        assert_eq!(kinds, vec!["entity", "whitespace", "junk", "whitespace"]);
    }
}
