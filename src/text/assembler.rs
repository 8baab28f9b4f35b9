//! Text assembly and offset index
//!
//! Flattens a [`CanonicalDocument`] into the single searchable text blob
//! stored in the index, recording which character range each word owns.
//! Index time and query time both go through [`assemble`], so offsets
//! computed from a stored blob always line up with a re-derived index.
//!
//! Offsets count Unicode scalar values of the final (possibly escaped)
//! string, half-open `[start, end)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::escape::maybe_escape;
use crate::ocr::{CanonicalDocument, Word};

/// Separator between consecutive words
pub const WORD_SEPARATOR: char = ' ';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OffsetIndexError {
    #[error("Empty range [{start}, {end}) at entry {index}")]
    EmptyRange { index: usize, start: usize, end: usize },

    #[error("Entry {index} starting at {start} overlaps or precedes previous end {previous_end}")]
    NotIncreasing {
        index: usize,
        start: usize,
        previous_end: usize,
    },
}

/// One word's span in the assembled text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetEntry {
    pub start: usize,
    pub end: usize,
    /// Owning page
    pub page_id: String,
    pub word: Word,
}

impl OffsetEntry {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Immutable offset → word mapping
///
/// Entries are non-empty, non-overlapping and strictly increasing.
/// Deserialization re-checks this, so a persisted index can be trusted
/// the same way as a freshly assembled one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<OffsetEntry>", into = "Vec<OffsetEntry>")]
pub struct OffsetIndex {
    entries: Vec<OffsetEntry>,
}

impl OffsetIndex {
    /// Build from entries, validating ordering
    pub fn from_entries(entries: Vec<OffsetEntry>) -> Result<Self, OffsetIndexError> {
        let mut previous_end = 0;
        for (index, entry) in entries.iter().enumerate() {
            if entry.start >= entry.end {
                return Err(OffsetIndexError::EmptyRange {
                    index,
                    start: entry.start,
                    end: entry.end,
                });
            }
            if index > 0 && entry.start < previous_end {
                return Err(OffsetIndexError::NotIncreasing {
                    index,
                    start: entry.start,
                    previous_end,
                });
            }
            previous_end = entry.end;
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[OffsetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length in characters of the text this index was built from
    pub fn text_len(&self) -> usize {
        self.entries.last().map(|e| e.end).unwrap_or(0)
    }

    /// Entry owning the character at `offset`, if any (separators map to none)
    pub fn lookup(&self, offset: usize) -> Option<&OffsetEntry> {
        let idx = self.entries.partition_point(|e| e.start <= offset);
        let entry = self.entries.get(idx.checked_sub(1)?)?;
        (offset < entry.end).then_some(entry)
    }

    /// Entries intersecting `[start, end)` in reading order
    pub fn covering(&self, start: usize, end: usize) -> &[OffsetEntry] {
        let first = self.entries.partition_point(|e| e.end <= start);
        let last = self.entries.partition_point(|e| e.start < end);
        if first >= last {
            return &[];
        }
        &self.entries[first..last]
    }
}

impl TryFrom<Vec<OffsetEntry>> for OffsetIndex {
    type Error = OffsetIndexError;

    fn try_from(entries: Vec<OffsetEntry>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<OffsetIndex> for Vec<OffsetEntry> {
    fn from(index: OffsetIndex) -> Self {
        index.entries
    }
}

/// Flatten `doc` into text plus its offset index
///
/// Words are joined by a single space in `pages → blocks → lines → words`
/// order, with no trailing separator. Words with empty text are skipped.
pub fn assemble(doc: &CanonicalDocument, escape_non_ascii: bool) -> (String, OffsetIndex) {
    let mut text = String::new();
    let mut entries = Vec::with_capacity(doc.word_count());
    let mut offset = 0usize;

    for (page, word) in doc.words() {
        if word.text.is_empty() {
            continue;
        }
        let rendered = maybe_escape(&word.text, escape_non_ascii);
        if rendered.is_empty() {
            continue;
        }

        if !entries.is_empty() {
            text.push(WORD_SEPARATOR);
            offset += 1;
        }

        let start = offset;
        offset += rendered.chars().count();
        text.push_str(&rendered);

        entries.push(OffsetEntry {
            start,
            end: offset,
            page_id: page.id.clone(),
            word: word.clone(),
        });
    }

    (text, OffsetIndex { entries })
}
