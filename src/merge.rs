//! Reconciles one resource across several channels.
//!
//! Resources are folded newest to oldest with a two-way merge. Entries are
//! matched by a merge key: entities by their key, comments and junk by their
//! text and how often that text occurred before in the same file, and
//! whitespace never matches anything. The structure of the newer side wins;
//! entries only the older side has are spliced in after their closest shared
//! predecessor.

use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
    ops::Range,
};

use log::{debug, trace};

use crate::types::{Entry, Position, Resource};

/// How an item of [`ordered_union`] relates to its two inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    /// Present on both sides.
    Equal,
    /// Only on the left side.
    Delete,
    /// Only on the right side.
    Add,
}

/// Merges two sequences of unique items into one, keeping the order of
/// `left` and placing each item only `right` has right after the last item
/// before it that both sides share.
///
/// # Example
/// ```rust
/// use l10nmerge::merge::{DiffOp, ordered_union};
/// let union = ordered_union(&["a", "c"], &["a", "b", "c", "d"]);
/// assert_eq!(
///     union,
///     vec![
///         (DiffOp::Equal, &"a"),
///         (DiffOp::Add, &"b"),
///         (DiffOp::Equal, &"c"),
///         (DiffOp::Add, &"d"),
///     ]
/// );
/// ```
pub fn ordered_union<'a, K: Eq + Hash>(left: &'a [K], right: &'a [K]) -> Vec<(DiffOp, &'a K)> {
    let left_index: HashMap<&K, isize> = left
        .iter()
        .enumerate()
        .map(|(i, item)| (item, i as isize))
        .collect();
    let right_items: HashSet<&K> = right.iter().collect();

    let mut order: Vec<((isize, isize), DiffOp, &K)> = left
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let op = if right_items.contains(item) {
                DiffOp::Equal
            } else {
                DiffOp::Delete
            };
            ((i as isize, -1), op, item)
        })
        .collect();

    let mut left_offset = -1;
    for (j, item) in right.iter().enumerate() {
        match left_index.get(item) {
            Some(&i) => left_offset = i,
            None => order.push(((left_offset, j as isize), DiffOp::Add, item)),
        }
    }

    order.sort_by_key(|(slot, _, _)| *slot);
    order.into_iter().map(|(_, op, item)| (op, item)).collect()
}

/// Identity of an entry across channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MergeKey {
    Entity(String),
    Comment(String, usize),
    Junk(String, usize),
    Whitespace(usize),
}

/// Merges `resources`, newest first, into one resource.
///
/// The output takes its dialect, encoding and byte order mark from the
/// newest resource. With `keep_newest`, entity values come from the newest
/// channel that has them, otherwise from the oldest one; sticky entities
/// always come from the newest channel. Returns `None` for an empty slice.
///
/// # Example
/// ```rust
/// use l10nmerge::{formats::Dialect, merge::merge_resources};
/// let parser = Dialect::Dtd.parser();
/// let newer = parser.parse(b"<!ENTITY a \"NEW\">", &Default::default())?;
/// let older = parser.parse(b"<!ENTITY a \"OLD\"><!ENTITY b \"KEEP\">", &Default::default())?;
/// let merged = merge_resources(&[newer, older], true).unwrap();
/// assert_eq!(merged.to_text(), "<!ENTITY a \"NEW\"><!ENTITY b \"KEEP\">");
/// # Ok::<(), l10nmerge::Error>(())
/// ```
pub fn merge_resources(resources: &[Resource], keep_newest: bool) -> Option<Resource> {
    let newest = resources.first()?;

    // Stickiness is a property of the key, whichever channel declares it.
    let sticky: HashSet<&str> = resources
        .iter()
        .flat_map(Resource::entities)
        .filter(|entity| entity.sticky)
        .map(|entity| entity.key.as_str())
        .collect();

    let mut serial = 0;
    let mut channels = resources
        .iter()
        .map(|resource| keyed_entries(resource, &sticky, &mut serial));
    let first = channels.next()?;
    let merged = channels.fold(first, |newer, older| merge_two(newer, older, keep_newest));

    let mut entries: Vec<Entry> = merged.into_iter().map(|(_, entry)| entry).collect();
    relocate(&mut entries);
    debug!(
        "merged {} {} resources into {} entries (keep_newest: {})",
        resources.len(),
        newest.dialect,
        entries.len(),
        keep_newest
    );
    Some(Resource::new(
        newest.dialect,
        newest.encoding,
        newest.bom,
        entries,
    ))
}

fn keyed_entries(
    resource: &Resource,
    sticky: &HashSet<&str>,
    serial: &mut usize,
) -> Vec<(MergeKey, Entry)> {
    let mut comments: HashMap<&str, usize> = HashMap::new();
    let mut junk: HashMap<&str, usize> = HashMap::new();
    let mut entities: HashSet<&str> = HashSet::new();

    let mut keyed = Vec::with_capacity(resource.entries.len());
    for entry in &resource.entries {
        let key = match entry {
            Entry::Entity(entity) if entities.insert(entity.key.as_str()) => {
                MergeKey::Entity(entity.key.clone())
            }
            // A repeated key in a hand-built resource is merged like junk.
            Entry::Entity(entity) => nth_key(&mut junk, &entity.all, MergeKey::Junk),
            Entry::Comment(comment) => nth_key(&mut comments, &comment.all, MergeKey::Comment),
            Entry::Junk(j) => nth_key(&mut junk, &j.all, MergeKey::Junk),
            Entry::Whitespace(_) => {
                *serial += 1;
                MergeKey::Whitespace(*serial)
            }
        };
        let mut entry = entry.clone();
        if let Entry::Entity(entity) = &mut entry {
            entity.sticky |= sticky.contains(entity.key.as_str());
        }
        keyed.push((key, entry));
    }
    keyed
}

fn nth_key<'a>(
    seen: &mut HashMap<&'a str, usize>,
    text: &'a str,
    make: fn(String, usize) -> MergeKey,
) -> MergeKey {
    let nth = seen.entry(text).or_insert(0);
    let key = make(text.to_string(), *nth);
    *nth += 1;
    key
}

fn merge_two(
    newer: Vec<(MergeKey, Entry)>,
    older: Vec<(MergeKey, Entry)>,
    keep_newer: bool,
) -> Vec<(MergeKey, Entry)> {
    let newer_keys: Vec<MergeKey> = newer.iter().map(|(key, _)| key.clone()).collect();
    let older_keys: Vec<MergeKey> = older.iter().map(|(key, _)| key.clone()).collect();
    let mut newer: HashMap<MergeKey, Entry> = newer.into_iter().collect();
    let mut older: HashMap<MergeKey, Entry> = older.into_iter().collect();

    let union = ordered_union(&newer_keys, &older_keys);
    let mut counts = [0usize; 3];
    let mut merged: Vec<(MergeKey, Entry)> = Vec::with_capacity(union.len());
    for (op, key) in union {
        let entry = match op {
            DiffOp::Equal => {
                counts[0] += 1;
                match (newer.remove(key), older.remove(key)) {
                    (Some(n), Some(o)) => Some(pick(n, o, keep_newer)),
                    (n, o) => n.or(o),
                }
            }
            DiffOp::Delete => {
                counts[1] += 1;
                newer.remove(key)
            }
            DiffOp::Add => {
                counts[2] += 1;
                older.remove(key)
            }
        };
        let Some(entry) = entry else {
            continue;
        };

        if let (Entry::Whitespace(current), Some((_, Entry::Whitespace(previous)))) =
            (&entry, merged.last())
        {
            let longer = current.all.chars().count() > previous.all.chars().count();
            trace!(
                "folding whitespace {:?} and {:?}",
                previous.all, current.all
            );
            if !longer {
                continue;
            }
            merged.pop();
        }
        merged.push((key.clone(), entry));
    }
    debug!(
        "two-way merge: {} shared, {} newer only, {} older only",
        counts[0], counts[1], counts[2]
    );
    merged
}

fn pick(newer: Entry, older: Entry, keep_newer: bool) -> Entry {
    if keep_newer {
        return newer;
    }
    match (newer, older) {
        (Entry::Entity(mut newer), Entry::Entity(older)) if newer.sticky || older.sticky => {
            trace!("sticky `{}` follows the newer channel", newer.key);
            newer.sticky = true;
            Entry::Entity(newer)
        }
        (_, older) => older,
    }
}

/// Moves every span and position to where the entry sits in the merged text.
fn relocate(entries: &mut [Entry]) {
    let mut offset = 0;
    let mut position = Position::START;
    for entry in entries.iter_mut() {
        let from = entry.span().start;
        match entry {
            Entry::Entity(entity) => {
                let value_offset = entity.val_span.start.saturating_sub(from);
                entity.span = rebase(&entity.span, from, offset);
                entity.key_span = rebase(&entity.key_span, from, offset);
                entity.val_span = rebase(&entity.val_span, from, offset);
                entity.start = position;
                entity.value_start = entity
                    .all
                    .get(..value_offset)
                    .map_or(position, |head| position.advance(head));
            }
            Entry::Comment(comment) => {
                comment.span = rebase(&comment.span, from, offset);
                comment.start = position;
            }
            Entry::Junk(junk) => {
                junk.span = rebase(&junk.span, from, offset);
                junk.start = position;
            }
            Entry::Whitespace(ws) => ws.span = rebase(&ws.span, from, offset),
        }
        position = position.advance(entry.all());
        offset += entry.all().len();
    }
}

fn rebase(range: &Range<usize>, from: usize, to: usize) -> Range<usize> {
    range.start.saturating_sub(from) + to..range.end.saturating_sub(from) + to
}
