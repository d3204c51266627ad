//! Shared state of a single tokenizer pass.
//!
//! Each dialect walks its text with an explicit offset and asks the
//! [`Context`] to turn byte ranges into entries. The context owns the line
//! index used for positions and the set of keys already claimed, so
//! tokenizers stay free of mutable parser state.

use std::{collections::HashSet, ops::Range};

use log::warn;

use crate::types::{Attribute, Comment, Entity, Entry, Junk, Position, Whitespace};

pub(crate) struct Context<'a> {
    pub text: &'a str,
    line_starts: Vec<usize>,
    keys: HashSet<String>,
    pub entries: Vec<Entry>,
}

/// Byte ranges of an entity, all absolute in the decoded text.
pub(crate) struct EntitySpans {
    pub all: Range<usize>,
    pub key: Range<usize>,
    pub val: Range<usize>,
}

impl<'a> Context<'a> {
    pub fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Context {
            text,
            line_starts,
            keys: HashSet::new(),
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn rest(&self, offset: usize) -> &'a str {
        &self.text[offset..]
    }

    pub fn position(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        Position {
            line: line + 1,
            column: self.text[line_start..offset].chars().count() + 1,
        }
    }

    /// End of the line containing `offset`, before any `\r\n` or `\n`.
    pub fn line_end(&self, offset: usize) -> usize {
        let end = self.text[offset..]
            .find('\n')
            .map_or(self.text.len(), |i| offset + i);
        if end > offset && self.text.as_bytes()[end - 1] == b'\r' {
            end - 1
        } else {
            end
        }
    }

    /// Start of the line after the one containing `offset`, if any.
    pub fn next_line(&self, offset: usize) -> Option<usize> {
        self.text[offset..].find('\n').map(|i| offset + i + 1)
    }

    /// Length of the run at `offset` of characters accepted by `is_space`.
    pub fn space_run(&self, offset: usize, is_space: impl Fn(char) -> bool) -> usize {
        let rest = self.rest(offset);
        rest.len() - rest.trim_start_matches(is_space).len()
    }

    pub fn whitespace(&mut self, span: Range<usize>) {
        self.entries.push(Entry::Whitespace(Whitespace {
            all: self.text[span.clone()].to_string(),
            span,
        }));
    }

    pub fn comment(&mut self, span: Range<usize>, val: String) {
        self.entries.push(Entry::Comment(Comment {
            all: self.text[span.clone()].to_string(),
            start: self.position(span.start),
            span,
            val,
        }));
    }

    /// Junk from `start` to `end`, with trailing whitespace left for the next
    /// entry. Returns where tokenizing resumes.
    pub fn junk(&mut self, start: usize, end: usize) -> usize {
        let trimmed = self.text[start..end].trim_end();
        let end = if trimmed.is_empty() {
            end
        } else {
            start + trimmed.len()
        };
        self.entries.push(Entry::Junk(Junk {
            all: self.text[start..end].to_string(),
            start: self.position(start),
            span: start..end,
        }));
        end
    }

    /// Records an entity unless its key was already taken, in which case the
    /// whole span becomes junk. Returns where tokenizing resumes.
    pub fn entity(
        &mut self,
        key: String,
        spans: EntitySpans,
        val: String,
        attributes: Vec<Attribute>,
    ) -> usize {
        let end = spans.all.end;
        if !self.keys.insert(key.clone()) {
            warn!(
                "duplicate key `{}` at {}, keeping the first definition",
                key,
                self.position(spans.all.start)
            );
            self.entries.push(Entry::Junk(Junk {
                all: self.text[spans.all.clone()].to_string(),
                start: self.position(spans.all.start),
                span: spans.all,
            }));
            return end;
        }
        self.entries.push(Entry::Entity(Entity {
            all: self.text[spans.all.clone()].to_string(),
            start: self.position(spans.all.start),
            span: spans.all,
            key,
            key_span: spans.key,
            raw_val: self.text[spans.val.clone()].to_string(),
            value_start: self.position(spans.val.start),
            val,
            val_span: spans.val,
            attributes,
            sticky: false,
            pre_comment: None,
            pre: None,
            post: None,
        }));
        end
    }

    pub fn finish(self) -> Vec<Entry> {
        self.entries
    }
}
