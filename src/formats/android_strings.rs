//! Support for Android `strings.xml` resources.
//!
//! The document frame is kept as two sticky entities: the prolog up to and
//! including `<resources>` (key `<?xml?><resources>`) and everything from
//! `</resources>` to the end (key `</resources>`). Between them,
//! `<string>`, `<string-array>` and `<plurals>` elements become entities
//! keyed by their `name` attribute.

use std::{borrow::Cow, ops::Range};

use lazy_static::lazy_static;
use log::debug;
use quick_xml::{
    Reader,
    escape::unescape,
    events::{BytesStart, Event},
};
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
    static ref NAME_ATTRIBUTE_REGEX: Regex =
        Regex::new(r#"\sname\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#).unwrap();
    static ref RECOVERY_REGEX: Regex = Regex::new(r"<string|<plurals|<!--|</resources").unwrap();
    // An element never runs past the start of the next resource element.
    static ref ELEMENT_BOUNDARY_REGEX: Regex =
        Regex::new(r"<(?:string|string-array|plurals)[\s/>]|</resources").unwrap();
    static ref COMMENT_END_REGEX: Regex = Regex::new(r"-->|<!--").unwrap();
}

pub const PROLOG_KEY: &str = "<?xml?><resources>";
pub const EPILOG_KEY: &str = "</resources>";

const RESOURCE_ELEMENTS: [&[u8]; 3] = [b"string", b"string-array", b"plurals"];

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Parser for Android `strings.xml` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AndroidStringsParser;

impl Parser for AndroidStringsParser {
    fn dialect(&self) -> Dialect {
        Dialect::AndroidStrings
    }

    fn tokenize(&self, text: &str) -> Vec<Entry> {
        let mut ctx = Context::new(text);
        if text.trim().is_empty() {
            if !text.is_empty() {
                ctx.whitespace(0..text.len());
            }
            return ctx.finish();
        }

        let Some(prolog) = read_prolog(text) else {
            debug!("no <resources> root element, keeping the document as junk");
            let end = ctx.junk(0, text.len());
            if end < text.len() {
                ctx.whitespace(end..text.len());
            }
            return ctx.finish();
        };

        let prolog_end = if prolog.closed { text.len() } else { prolog.end };
        frame_entity(&mut ctx, PROLOG_KEY, 0..prolog_end, prolog.tag);

        let mut offset = prolog_end;
        while offset < ctx.len() {
            offset = next_entry(&mut ctx, offset);
        }
        ctx.finish()
    }
}

struct Prolog {
    /// Span of the `<resources>` start tag.
    tag: Range<usize>,
    end: usize,
    /// `<resources/>` without content.
    closed: bool,
}

/// Finds the `<resources>` start tag after the XML declaration, comments,
/// processing instructions and a doctype.
fn read_prolog(text: &str) -> Option<Prolog> {
    let mut reader = Reader::from_str(text);
    loop {
        let before = reader.buffer_position() as usize;
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                debug!("malformed prolog: {}", err);
                return None;
            }
        };
        let after = reader.buffer_position() as usize;
        match &event {
            Event::Start(tag) | Event::Empty(tag) if tag.name().as_ref() == b"resources" => {
                let tag_start = text[..after].rfind("<resources")?;
                return Some(Prolog {
                    tag: tag_start..after,
                    end: after,
                    closed: matches!(event, Event::Empty(_)),
                });
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Text(content) if content.iter().all(u8::is_ascii_whitespace) => {}
            _ => {
                debug!("unexpected content at byte {} before <resources>", before);
                return None;
            }
        }
    }
}

/// Records one of the sticky entities framing the document.
fn frame_entity(ctx: &mut Context, key: &str, all: Range<usize>, key_span: Range<usize>) -> usize {
    let end = all.end;
    let spans = EntitySpans {
        all,
        key: key_span,
        val: end..end,
    };
    let resume = ctx.entity(key.to_string(), spans, String::new(), Vec::new());
    if let Some(Entry::Entity(entity)) = ctx.entries.last_mut() {
        if entity.key == key {
            entity.sticky = true;
        }
    }
    resume
}

fn next_entry(ctx: &mut Context, offset: usize) -> usize {
    let space = ctx.space_run(offset, is_xml_space);
    if space > 0 {
        ctx.whitespace(offset..offset + space);
        return offset + space;
    }

    let rest = ctx.rest(offset);
    if rest.starts_with("</resources") {
        let tag_end = rest.find('>').map_or(ctx.len(), |i| offset + i + 1);
        return frame_entity(ctx, EPILOG_KEY, offset..ctx.len(), offset..tag_end);
    }

    if let Some(body) = rest.strip_prefix("<!--") {
        if let Some(close) = COMMENT_END_REGEX.find(body).filter(|m| m.as_str() == "-->") {
            let end = offset + "<!--".len() + close.end();
            ctx.comment(offset..end, body[..close.start()].to_string());
            return end;
        }
        return ctx.junk(offset, recovery_point(ctx.text, offset));
    }

    if !rest.starts_with('<') {
        let end = rest.find('<').map_or(ctx.len(), |i| offset + i);
        return ctx.junk(offset, end);
    }

    let Some(element) = read_element(rest) else {
        return ctx.junk(offset, recovery_point(ctx.text, offset));
    };
    let is_resource = RESOURCE_ELEMENTS.contains(&element.tag.name().as_ref());
    let parsed = if is_resource {
        parse_attributes(&element.tag)
    } else {
        None
    };
    let Some((name, attributes)) = parsed else {
        debug!(
            "skipping <{}> at {}",
            String::from_utf8_lossy(element.tag.name().as_ref()),
            ctx.position(offset)
        );
        return ctx.junk(offset, offset + element.end);
    };

    let head = &rest[..element.head_end];
    let key_span = NAME_ATTRIBUTE_REGEX
        .captures(head)
        .and_then(|caps| caps.name("dq").or_else(|| caps.name("sq")))
        .map_or(offset..offset, |m| offset + m.start()..offset + m.end());
    let inner = element.inner.unwrap_or(element.head_end..element.head_end);
    let raw = &rest[inner.clone()];
    let val = unescape(raw).map_or_else(|_| raw.to_string(), Cow::into_owned);
    let spans = EntitySpans {
        all: offset..offset + element.end,
        key: key_span,
        val: offset + inner.start..offset + inner.end,
    };
    ctx.entity(name, spans, val, attributes)
}

struct Element<'a> {
    tag: BytesStart<'a>,
    /// End of the start tag.
    head_end: usize,
    /// Content between the start and end tags; `None` for empty elements.
    inner: Option<Range<usize>>,
    end: usize,
}

/// Reads the element starting at the beginning of `fragment`. Offsets are
/// relative to `fragment`.
fn read_element(fragment: &str) -> Option<Element<'_>> {
    let mut reader = Reader::from_str(fragment);
    let event = reader
        .read_event()
        .map_err(|err| debug!("malformed element: {}", err))
        .ok()?;
    let head_end = reader.buffer_position() as usize;
    match event {
        Event::Empty(tag) => Some(Element {
            tag,
            head_end,
            inner: None,
            end: head_end,
        }),
        Event::Start(tag) => {
            let bound = ELEMENT_BOUNDARY_REGEX
                .find(&fragment[head_end..])
                .map_or(fragment.len(), |m| head_end + m.start());
            let mut body = Reader::from_str(&fragment[..bound]);
            body.read_event()
                .map_err(|err| debug!("malformed element: {}", err))
                .ok()?;
            let span = body
                .read_to_end(tag.name())
                .map_err(|err| debug!("unclosed element: {}", err))
                .ok()?;
            Some(Element {
                head_end,
                inner: Some(span.start as usize..span.end as usize),
                end: body.buffer_position() as usize,
                tag,
            })
        }
        _ => None,
    }
}

/// The unescaped, non-empty `name` attribute and all attributes in source
/// order.
fn parse_attributes(tag: &BytesStart) -> Option<(String, Vec<Attribute>)> {
    let mut name = None;
    let mut attributes = Vec::new();
    for attr in tag.attributes() {
        let attr = attr.map_err(|err| debug!("malformed attribute: {}", err)).ok()?;
        let attr_name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw_val = String::from_utf8_lossy(&attr.value).into_owned();
        if attr_name == "name" {
            name = Some(unescape(&raw_val).map_or_else(|_| raw_val.clone(), Cow::into_owned));
        }
        attributes.push(Attribute {
            name: attr_name,
            raw_val,
        });
    }
    // Frame keys are reserved for the document wrapper.
    let name = name.filter(|name| !name.is_empty() && name != PROLOG_KEY && name != EPILOG_KEY)?;
    Some((name, attributes))
}

/// Where tokenizing resumes after malformed markup at `offset`.
fn recovery_point(text: &str, offset: usize) -> usize {
    let rest = &text[offset..];
    let first = rest.chars().next().map_or(1, char::len_utf8);
    RECOVERY_REGEX
        .find(&rest[first..])
        .map_or(text.len(), |m| offset + first + m.start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use indoc::indoc;

    fn tokenize(text: &str) -> Vec<Entry> {
        AndroidStringsParser.tokenize(text)
    }

    fn kinds(entries: &[Entry]) -> Vec<&'static str> {
        entries.iter().map(Entry::kind).collect()
    }

    #[test]
    fn test_parse_strings_xml() {
        let text = indoc! {r#"
            <?xml version="1.0" encoding="utf-8"?>
            <resources>
                <!-- Greeting shown on start -->
                <string name="hello" translatable="false">Hello &amp; welcome</string>
                <plurals name="files">
                    <item quantity="one">%d file</item>
                    <item quantity="other">%d files</item>
                </plurals>
                <string name="empty"/>
            </resources>
        "#};
        let entries = tokenize(text);
        assert_eq!(
            kinds(&entries),
            vec![
                "entity", "whitespace", "comment", "whitespace", "entity", "whitespace", "entity",
                "whitespace", "entity", "whitespace", "entity"
            ]
        );

        let prolog = entries[0].as_entity().unwrap();
        assert_eq!(prolog.key, PROLOG_KEY);
        assert!(prolog.sticky);
        assert!(prolog.all.starts_with("<?xml"));
        assert!(prolog.all.ends_with("<resources>"));
        assert_eq!(&text[prolog.key_span.clone()], "<resources>");

        match &entries[2] {
            Entry::Comment(c) => assert_eq!(c.val, " Greeting shown on start "),
            other => panic!("expected comment, got {}", other),
        }

        let hello = entries[4].as_entity().unwrap();
        assert_eq!(hello.key, "hello");
        assert_eq!(hello.raw_val, "Hello &amp; welcome");
        assert_eq!(hello.val, "Hello & welcome");
        assert_eq!(&text[hello.key_span.clone()], "hello");
        assert_eq!(hello.start, Position { line: 4, column: 5 });
        assert_eq!(hello.value_start, Position { line: 4, column: 47 });
        let names: Vec<_> = hello.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["name", "translatable"]);
        assert!(!hello.sticky);

        let files = entries[6].as_entity().unwrap();
        assert_eq!(files.key, "files");
        assert!(files.raw_val.contains("<item quantity=\"one\">%d file</item>"));

        let empty = entries[8].as_entity().unwrap();
        assert_eq!(empty.key, "empty");
        assert_eq!(empty.val, "");

        let epilog = entries[10].as_entity().unwrap();
        assert_eq!(epilog.key, EPILOG_KEY);
        assert_eq!(epilog.all, "</resources>\n");
        assert!(epilog.sticky);
    }

    #[test]
    fn test_missing_root_is_junk() {
        let entries = tokenize("<foo/>\n");
        assert_eq!(kinds(&entries), vec!["junk", "whitespace"]);
        let entries = tokenize("just text");
        assert_eq!(kinds(&entries), vec!["junk"]);
        let entries = tokenize("\n\n");
        assert_eq!(kinds(&entries), vec!["whitespace"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_unclosed_element_recovers_at_next_resource() {
        let text = "<resources>\n<string name=\"a\">x\n<string name=\"b\">y</string>\n</resources>";
        let entries = tokenize(text);
        let significant: Vec<_> = entries.iter().filter(|e| !e.is_whitespace()).collect();
        assert!(matches!(significant[1], Entry::Junk(j) if j.all == "<string name=\"a\">x"));
        assert_eq!(significant[2].as_entity().unwrap().key, "b");
        assert_eq!(significant[3].as_entity().unwrap().key, EPILOG_KEY);
        assert_eq!(entries.iter().map(Entry::all).collect::<String>(), text);
    }

    #[test]
    fn test_frame_keys_cannot_be_claimed_by_elements() {
        let text = "<resources>\n<string name=\"&lt;/resources&gt;\">x</string>\n</resources>\n";
        let entries = tokenize(text);
        let significant: Vec<_> = entries.iter().filter(|e| !e.is_whitespace()).collect();
        assert!(matches!(significant[1], Entry::Junk(_)));
        let epilog = significant[2].as_entity().unwrap();
        assert_eq!(epilog.key, EPILOG_KEY);
        assert!(epilog.sticky);
    }

    #[test]
    fn test_many_unclosed_elements_scan_linearly() {
        let body: String = (0..5000)
            .map(|i| format!("<string name=\"s{}\">x\n<!-- open\n", i))
            .collect();
        let text = format!("<resources>\n{}</resources>\n", body);
        let started = std::time::Instant::now();
        let entries = tokenize(&text);
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
        assert_eq!(entries.iter().filter(|e| matches!(e, Entry::Junk(_))).count(), 10000);
        assert_eq!(entries.last().unwrap().as_entity().unwrap().key, EPILOG_KEY);
        assert_eq!(entries.iter().map(Entry::all).collect::<String>(), text);
    }

    #[test]
    fn test_stray_text_and_unknown_elements_are_junk() {
        let text = indoc! {r#"
            <resources>
              stray text
              <integer name="max">3</integer>
              <string>no name</string>
              <string name="a">1</string>
            </resources>
        "#};
        let entries = tokenize(text);
        let junk: Vec<_> = entries
            .iter()
            .filter(|e| matches!(e, Entry::Junk(_)))
            .map(Entry::all)
            .collect();
        assert_eq!(
            junk,
            vec!["stray text", "<integer name=\"max\">3</integer>", "<string>no name</string>"]
        );
        assert_eq!(
            entries.iter().filter_map(Entry::as_entity).map(|e| e.key.as_str()).collect::<Vec<_>>(),
            vec![PROLOG_KEY, "a", EPILOG_KEY]
        );
    }

    #[test]
    fn test_empty_resources_element() {
        let text = "<?xml version=\"1.0\"?>\n<resources/>\n";
        let entries = tokenize(text);
        assert_eq!(kinds(&entries), vec!["entity"]);
        assert_eq!(entries[0].all(), text);
    }

    #[test]
    fn test_single_quoted_name_and_markup_value() {
        let text = "<resources><string name='b'><b>Bold</b> &lt;3</string></resources>";
        let entries = tokenize(text);
        let b = entries[1].as_entity().unwrap();
        assert_eq!(b.key, "b");
        assert_eq!(&text[b.key_span.clone()], "b");
        assert_eq!(b.val, "<b>Bold</b> <3");
        assert_eq!(entries[2].as_entity().unwrap().key, EPILOG_KEY);
    }
}
