//! Core entry model for l10nmerge.
//! Parsers decode into these; the merge engine and serializer consume them.

use std::{fmt::Display, ops::Range};

use encoding_rs::Encoding;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{error::Error, formats::Dialect};

lazy_static! {
    static ref WORD_REGEX: Regex = Regex::new(r"\w+").unwrap();
    // `{ name }`, `{ -term }`, `{ name.attr }`, `{ -term(case: "x") }`; a trailing `(`
    // after a plain identifier is a function call, not a reference.
    static ref REFERENCE_REGEX: Regex =
        Regex::new(r"\{\s*(-?[a-zA-Z][a-zA-Z0-9_-]*)(?:\.[a-zA-Z][a-zA-Z0-9_-]*)?\s*(\()?").unwrap();
}

/// A parsed localization file.
///
/// Concatenating the `all` text of every entry reproduces the decoded source
/// exactly; the byte order mark and the encoding are kept alongside so the
/// serializer can reproduce the original bytes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Resource {
    /// Syntax the entries were parsed with.
    pub dialect: Dialect,

    /// Encoding the source bytes were decoded with.
    pub encoding: &'static Encoding,

    /// Whether the source started with a byte order mark.
    #[serde(default)]
    pub bom: bool,

    /// Ordered entries; their `all` texts tile the source.
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Resource {
    /// Builds a resource and (re)computes the trivia links of its entities.
    pub fn new(
        dialect: Dialect,
        encoding: &'static Encoding,
        bom: bool,
        entries: Vec<Entry>,
    ) -> Self {
        let mut resource = Resource {
            dialect,
            encoding,
            bom,
            entries,
        };
        resource.link_trivia();
        resource
    }

    /// All entities in source order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entries.iter().filter_map(Entry::as_entity)
    }

    /// All junk entries in source order.
    pub fn junk(&self) -> impl Iterator<Item = &Junk> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Junk(junk) => Some(junk),
            _ => None,
        })
    }

    /// Entity keys in source order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entities().map(|entity| entity.key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Entity> {
        self.entities().find(|entity| entity.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The decoded text of the resource, without byte order mark.
    pub fn to_text(&self) -> String {
        self.entries.iter().map(Entry::all).collect()
    }

    /// Serializes the resource model (not the file content) as JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(Error::Json)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(Error::Json)
    }

    /// Fills `pre`, `post` and `pre_comment` of every entity from its neighbours.
    fn link_trivia(&mut self) {
        let mut links = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            if !matches!(entry, Entry::Entity(_)) {
                continue;
            }
            let before = index.checked_sub(1).and_then(|i| self.entries.get(i));
            let after = self.entries.get(index + 1);

            let pre = before.and_then(Entry::as_whitespace).map(|ws| ws.all.clone());
            let post = after.and_then(Entry::as_whitespace).map(|ws| ws.all.clone());

            let pre_comment = match before {
                Some(Entry::Comment(comment)) => Some(comment.val.clone()),
                Some(Entry::Whitespace(ws)) if ws.all.matches('\n').count() <= 1 => index
                    .checked_sub(2)
                    .and_then(|i| self.entries.get(i))
                    .and_then(|entry| match entry {
                        Entry::Comment(comment) => Some(comment.val.clone()),
                        _ => None,
                    }),
                _ => None,
            };
            links.push((index, pre, post, pre_comment));
        }

        for (index, pre, post, pre_comment) in links {
            if let Entry::Entity(entity) = &mut self.entries[index] {
                entity.pre = pre;
                entity.post = post;
                entity.pre_comment = pre_comment;
            }
        }
    }
}

/// One element of a parsed resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entry {
    Entity(Entity),
    Comment(Comment),
    Whitespace(Whitespace),
    Junk(Junk),
}

impl Entry {
    /// Source text owned by this entry.
    pub fn all(&self) -> &str {
        match self {
            Entry::Entity(entity) => &entity.all,
            Entry::Comment(comment) => &comment.all,
            Entry::Whitespace(ws) => &ws.all,
            Entry::Junk(junk) => &junk.all,
        }
    }

    /// Half-open byte range of this entry in the decoded source.
    pub fn span(&self) -> Range<usize> {
        match self {
            Entry::Entity(entity) => entity.span.clone(),
            Entry::Comment(comment) => comment.span.clone(),
            Entry::Whitespace(ws) => ws.span.clone(),
            Entry::Junk(junk) => junk.span.clone(),
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Entry::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_whitespace(&self) -> Option<&Whitespace> {
        match self {
            Entry::Whitespace(ws) => Some(ws),
            _ => None,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self, Entry::Whitespace(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Entry::Entity(_) => "entity",
            Entry::Comment(_) => "comment",
            Entry::Whitespace(_) => "whitespace",
            Entry::Junk(_) => "junk",
        }
    }
}

impl Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entry::Entity(entity) => write!(f, "{}", entity),
            other => write!(f, "{} {:?}", other.kind(), other.all()),
        }
    }
}

/// A 1-based line and column; columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position { line: 1, column: 1 };

    /// The position reached after walking over `text` from `self`.
    pub fn advance(self, text: &str) -> Position {
        text.chars().fold(self, |pos, c| {
            if c == '\n' {
                Position {
                    line: pos.line + 1,
                    column: 1,
                }
            } else {
                Position {
                    line: pos.line,
                    column: pos.column + 1,
                }
            }
        })
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// An offset into an entity's text, for [`Entity::position`] and
/// [`Entity::value_position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// Byte offset from the start of the text.
    Byte(usize),
    /// 1-based line and column relative to the start of the text.
    LineColumn(usize, usize),
    /// The end of the text.
    End,
}

impl From<usize> for Offset {
    fn from(value: usize) -> Self {
        Offset::Byte(value)
    }
}

impl From<(usize, usize)> for Offset {
    fn from((line, column): (usize, usize)) -> Self {
        Offset::LineColumn(line, column)
    }
}

fn resolve_offset(start: Position, text: &str, offset: Offset) -> Position {
    match offset {
        Offset::Byte(offset) => {
            let mut end = offset.min(text.len());
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            start.advance(&text[..end])
        }
        Offset::End => start.advance(text),
        Offset::LineColumn(line, column) if line <= 1 => Position {
            line: start.line,
            column: start.column + column.saturating_sub(1),
        },
        Offset::LineColumn(line, column) => Position {
            line: start.line + line - 1,
            column,
        },
    }
}

/// A name/value binding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Entity {
    /// Source text of the whole entity.
    pub all: String,
    pub span: Range<usize>,

    /// Unique key within the resource.
    pub key: String,
    pub key_span: Range<usize>,

    /// Value as written in the source.
    pub raw_val: String,
    /// Value with the dialect's escapes resolved.
    pub val: String,
    pub val_span: Range<usize>,

    /// Fluent attributes, or XML attributes of an Android element, in source order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attributes: Vec<Attribute>,

    /// Sticky entities always follow the newest channel when merging.
    #[serde(default)]
    pub sticky: bool,

    /// Where the entity starts.
    pub start: Position,
    /// Where `raw_val` starts.
    pub value_start: Position,

    /// Text of the comment right before this entity, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pre_comment: Option<String>,
    /// Whitespace entry before this entity, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pre: Option<String>,
    /// Whitespace entry after this entity, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post: Option<String>,
}

impl Entity {
    /// Line and column of a point inside the entity's source text.
    pub fn position(&self, offset: impl Into<Offset>) -> Position {
        resolve_offset(self.start, &self.all, offset.into())
    }

    /// Line and column of a point inside the entity's raw value.
    pub fn value_position(&self, offset: impl Into<Offset>) -> Position {
        resolve_offset(self.value_start, &self.raw_val, offset.into())
    }

    /// Number of words in the unescaped value.
    pub fn count_words(&self) -> usize {
        WORD_REGEX.find_iter(&self.val).count()
    }

    /// Message and term identifiers referenced from placeables in the value
    /// and attributes, in order of first appearance.
    pub fn references(&self) -> Vec<&str> {
        let texts = std::iter::once(self.raw_val.as_str())
            .chain(self.attributes.iter().map(|attr| attr.raw_val.as_str()));
        let mut found: Vec<&str> = Vec::new();
        for text in texts {
            for caps in REFERENCE_REGEX.captures_iter(text) {
                let Some(name) = caps.get(1).map(|m| m.as_str()) else {
                    continue;
                };
                let is_call = caps.get(2).is_some();
                if is_call && !name.starts_with('-') {
                    continue;
                }
                if !found.contains(&name) {
                    found.push(name);
                }
            }
        }
        found
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity {{ key: {}, val: {:?} }}", self.key, self.val)
    }
}

/// A named sub-value of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Attribute {
    pub name: String,
    pub raw_val: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Comment {
    /// Source text including the delimiters.
    pub all: String,
    pub span: Range<usize>,
    /// Text with the delimiters stripped.
    pub val: String,
    pub start: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Whitespace {
    pub all: String,
    pub span: Range<usize>,
}

/// Text the parser could not classify, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Junk {
    pub all: String,
    pub span: Range<usize>,
    pub start: Position,
}
