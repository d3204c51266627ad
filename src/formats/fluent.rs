//! Support for Project Fluent (`.ftl`) files.
//!
//! Messages start with an identifier at column 0, terms with `-` followed by
//! an identifier. Values continue on indented lines, attributes are indented
//! `.name = value` lines, and `#`, `##`, `###` lines are comments.
//! Placeables are tracked only far enough to find where an entry ends; their
//! content is kept as written.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    formats::{
        Dialect,
        context::{Context, EntitySpans},
    },
    traits::Parser,
    types::{Attribute, Entry},
};

lazy_static! {
    static ref ENTRY_START_REGEX: Regex =
        Regex::new(r"^(?P<id>-?[a-zA-Z][a-zA-Z0-9_-]*)[ ]*=[ ]*").unwrap();
    static ref ATTRIBUTE_REGEX: Regex =
        Regex::new(r"^[ ]+\.(?P<name>[a-zA-Z][a-zA-Z0-9_-]*)[ ]*=[ ]*").unwrap();
}

fn is_fluent_space(c: char) -> bool {
    matches!(c, ' ' | '\r' | '\n')
}

fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c == ' ' || c == '\r')
}

fn comment_level(line: &str) -> Option<usize> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 3 {
        return None;
    }
    let after = &line[level..];
    (after.is_empty() || after.starts_with(' ')).then_some(level)
}

/// Brace depth of placeables, skipping string literals inside them.
#[derive(Debug, Default)]
struct Placeables {
    depth: usize,
    broken: bool,
}

impl Placeables {
    fn feed(&mut self, line: &str) {
        let mut chars = line.chars();
        let mut in_string = false;
        while let Some(c) = chars.next() {
            if in_string {
                match c {
                    '\\' => {
                        chars.next();
                    }
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '{' => self.depth += 1,
                '}' if self.depth == 0 => self.broken = true,
                '}' => self.depth -= 1,
                '"' if self.depth > 0 => in_string = true,
                _ => {}
            }
        }
        // string literals cannot span lines
        if in_string {
            self.broken = true;
        }
    }

    fn balanced(&self) -> bool {
        self.depth == 0 && !self.broken
    }
}

/// Parser for `.ftl` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FluentParser;

impl Parser for FluentParser {
    fn dialect(&self) -> Dialect {
        Dialect::Fluent
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
    let run = ctx.space_run(offset, is_fluent_space);
    if run > 0 {
        // Indentation before content on the next line is not whitespace.
        let length = if offset + run == ctx.len() {
            run
        } else {
            ctx.text[offset..offset + run]
                .rfind('\n')
                .map_or(0, |i| i + 1)
        };
        if length > 0 {
            ctx.whitespace(offset..offset + length);
            return offset + length;
        }
    }

    let line_end = ctx.line_end(offset);
    let line = &ctx.text[offset..line_end];

    if let Some(level) = comment_level(line) {
        let mut end = line_end;
        let mut lines = vec![comment_text(line, level)];
        while let Some(next) = ctx.next_line(end) {
            let next_end = ctx.line_end(next);
            let next_line = &ctx.text[next..next_end];
            if comment_level(next_line) != Some(level) {
                break;
            }
            lines.push(comment_text(next_line, level));
            end = next_end;
        }
        ctx.comment(offset..end, lines.join("\n"));
        return end;
    }

    if let Some(end) = parse_entry(ctx, offset) {
        return end;
    }

    ctx.junk(offset, recovery_point(ctx, offset))
}

fn comment_text(line: &str, level: usize) -> String {
    let body = &line[level..];
    body.strip_prefix(' ').unwrap_or(body).to_string()
}

/// Start of the next line that can begin an entry, or the end of the text.
fn recovery_point(ctx: &Context, offset: usize) -> usize {
    let mut probe = ctx.next_line(offset);
    while let Some(line_start) = probe {
        if ctx
            .rest(line_start)
            .starts_with(|c: char| c.is_ascii_alphabetic() || c == '-' || c == '#')
        {
            return line_start;
        }
        probe = ctx.next_line(line_start);
    }
    ctx.len()
}

struct AttributeStart {
    name: String,
    line_start: usize,
    value_start: usize,
}

/// Records a message or term starting at `offset`; `None` if the text there
/// is not a well-formed entry.
fn parse_entry(ctx: &mut Context, offset: usize) -> Option<usize> {
    let first_end = ctx.line_end(offset);
    let caps = ENTRY_START_REGEX.captures(&ctx.text[offset..first_end])?;
    let id = caps.name("id")?;
    let head_end = offset + caps.get(0)?.end();

    let mut placeables = Placeables::default();
    placeables.feed(&ctx.text[head_end..first_end]);

    let mut end = first_end;
    let mut attributes: Vec<AttributeStart> = Vec::new();
    while let Some((line_start, line_end)) = next_content_line(ctx, end) {
        let line = &ctx.text[line_start..line_end];
        if !line.starts_with(' ') {
            if placeables.depth == 0 {
                break;
            }
            // An open placeable never swallows the next entry.
            if ENTRY_START_REGEX.is_match(line) || comment_level(line).is_some() {
                return None;
            }
        }
        if placeables.depth == 0 {
            let content = line.trim_start_matches(' ');
            if content.starts_with('.') {
                let attr = ATTRIBUTE_REGEX.captures(line)?;
                let head = attr.get(0)?.end();
                attributes.push(AttributeStart {
                    name: attr.name("name")?.as_str().to_string(),
                    line_start,
                    value_start: line_start + head,
                });
                placeables.feed(&line[head..]);
                end = line_end;
                continue;
            }
            if content.starts_with('[') || content.starts_with('*') {
                return None;
            }
        }
        placeables.feed(line);
        end = line_end;
    }
    if !placeables.balanced() {
        return None;
    }

    let value_end = attributes.first().map_or(end, |attr| attr.line_start);
    let value = trimmed_region(ctx.text, head_end..value_end);

    let mut parsed_attributes = Vec::with_capacity(attributes.len());
    for (i, attr) in attributes.iter().enumerate() {
        let attr_end = attributes.get(i + 1).map_or(end, |next| next.line_start);
        let raw = trimmed_region(ctx.text, attr.value_start..attr_end);
        if raw.is_empty() {
            return None;
        }
        parsed_attributes.push(Attribute {
            name: attr.name.clone(),
            raw_val: ctx.text[raw].to_string(),
        });
    }

    let is_term = id.as_str().starts_with('-');
    if value.is_empty() && (is_term || parsed_attributes.is_empty()) {
        return None;
    }

    let val = ctx.text[value.clone()].to_string();
    let spans = EntitySpans {
        all: offset..end,
        key: offset + id.start()..offset + id.end(),
        val: value,
    };
    Some(ctx.entity(id.as_str().to_string(), spans, val, parsed_attributes))
}

/// The next non-blank line after the line ending at `end`.
fn next_content_line(ctx: &Context, end: usize) -> Option<(usize, usize)> {
    let mut probe = ctx.next_line(end)?;
    loop {
        let line_end = ctx.line_end(probe);
        if !is_blank(&ctx.text[probe..line_end]) {
            return Some((probe, line_end));
        }
        probe = ctx.next_line(line_end)?;
    }
}

/// `range` without leading blanks and line breaks and without trailing
/// whitespace; empty ranges stay at `range.start`.
fn trimmed_region(text: &str, range: Range<usize>) -> Range<usize> {
    let region = &text[range.clone()];
    let start = range.start + (region.len() - region.trim_start_matches(is_fluent_space).len());
    let end = range.start + region.trim_end().len();
    if end <= start {
        range.start..range.start
    } else {
        start..end
    }
}
