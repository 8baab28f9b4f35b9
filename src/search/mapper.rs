//! Search response mapping
//!
//! Locates a query term in a hit's stored text and projects every
//! occurrence back onto the word boxes that own those characters.
//!
//! Matching is case-insensitive containment. Case folding is done per
//! character (first char of the lowercase mapping) so folded and original
//! text keep identical offsets. Overlapping occurrences are each reported,
//! and an occurrence spanning a separator yields one annotation per word.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::store::StoreResponse;
use crate::text::{decode_escape, push_escaped, OffsetEntry, OffsetIndex};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    /// A store hit has no offset index to map it with
    #[error("No offset index available for document {0}")]
    UnresolvedDocument(String),
}

/// A matched span located on a page image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub document_id: String,
    pub page_id: String,
    /// Text of the word this box belongs to
    pub text: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Matched occurrence `[start, end)` in the assembled text
    pub match_start: usize,
    pub match_end: usize,
}

impl Annotation {
    fn from_entry(document_id: &str, entry: &OffsetEntry, span: (usize, usize)) -> Self {
        Self {
            document_id: document_id.to_string(),
            page_id: entry.page_id.clone(),
            text: entry.word.text.clone(),
            x: entry.word.x,
            y: entry.word.y,
            width: entry.word.width,
            height: entry.word.height,
            match_start: span.0,
            match_end: span.1,
        }
    }

    pub fn xywh(&self) -> String {
        format!("{},{},{},{}", self.x, self.y, self.width, self.height)
    }

    /// `pageId#xywh=x,y,w,h` target fragment
    pub fn on(&self) -> String {
        format!("{}#xywh={}", self.page_id, self.xywh())
    }
}

pub fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Case-fold preserving char positions
///
/// `\uXXXX` / `\UXXXXXXXX` sequences written by the non-ASCII escaper are
/// decoded, folded and re-escaped, so escaped text folds the same way its
/// unescaped form would. A sequence whose folded form would change length
/// (e.g. folding to plain ASCII) is folded as literal characters.
pub fn fold_case(text: &str) -> Vec<char> {
    let chars: Vec<char> = text.chars().collect();
    let mut folded = Vec::with_capacity(chars.len());
    let mut escaped = String::new();
    let mut i = 0;

    while i < chars.len() {
        if let Some((c, len)) = decode_escape(&chars[i..]) {
            escaped.clear();
            push_escaped(&mut escaped, fold_char(c));
            if escaped.chars().count() == len {
                folded.extend(escaped.chars());
            } else {
                folded.extend(chars[i..i + len].iter().copied().map(fold_char));
            }
            i += len;
            continue;
        }
        folded.push(fold_char(chars[i]));
        i += 1;
    }

    folded
}

/// Lazily map occurrences of `query_term` in `matched_text`
///
/// The returned iterator owns no shared state; clone it (or call again)
/// to enumerate the same annotations again.
pub fn map_hits<'a>(
    document_id: &'a str,
    matched_text: &str,
    query_term: &str,
    index: &'a OffsetIndex,
) -> Hits<'a> {
    Hits {
        document_id,
        index,
        haystack: fold_case(matched_text),
        needle: fold_case(query_term),
        cursor: 0,
        pending: &[],
        span: (0, 0),
    }
}

#[derive(Debug, Clone)]
pub struct Hits<'a> {
    document_id: &'a str,
    index: &'a OffsetIndex,
    haystack: Vec<char>,
    needle: Vec<char>,
    /// Next position to try a match at
    cursor: usize,
    /// Remaining words of the current occurrence
    pending: &'a [OffsetEntry],
    span: (usize, usize),
}

impl Hits<'_> {
    fn next_occurrence(&mut self) -> Option<(usize, usize)> {
        let n = self.needle.len();
        if n == 0 || n > self.haystack.len() {
            return None;
        }

        while self.cursor + n <= self.haystack.len() {
            let start = self.cursor;
            self.cursor += 1;
            if self.haystack[start..start + n] == self.needle[..] {
                return Some((start, start + n));
            }
        }
        None
    }
}

impl Iterator for Hits<'_> {
    type Item = Annotation;

    fn next(&mut self) -> Option<Annotation> {
        loop {
            if let Some((entry, rest)) = self.pending.split_first() {
                self.pending = rest;
                return Some(Annotation::from_entry(self.document_id, entry, self.span));
            }

            let span = self.next_occurrence()?;
            self.span = span;
            self.pending = self.index.covering(span.0, span.1);
        }
    }
}

/// Map every document of a store response
///
/// Documents without an id or stored text cannot be located and are
/// skipped. A document whose id `lookup` cannot resolve fails the call.
pub fn resolve_hits<F>(
    response: &StoreResponse,
    query_term: &str,
    mut lookup: F,
) -> Result<Vec<Annotation>, SearchError>
where
    F: FnMut(&str) -> Option<Arc<OffsetIndex>>,
{
    let mut annotations = Vec::new();

    for doc in &response.docs {
        let (Some(id), Some(text)) = (doc.id.as_deref(), doc.ocr_text.as_deref()) else {
            tracing::warn!(id = ?doc.id, "Store hit without id or ocr_text, skipping");
            continue;
        };

        let index = lookup(id).ok_or_else(|| SearchError::UnresolvedDocument(id.to_string()))?;
        annotations.extend(map_hits(id, text, query_term, &index));
    }

    Ok(annotations)
}

/// Convenience lookup over a prepared map
pub fn lookup_in(map: &HashMap<String, Arc<OffsetIndex>>) -> impl FnMut(&str) -> Option<Arc<OffsetIndex>> + '_ {
    move |id: &str| map.get(id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{Block, CanonicalDocument, Line, Page, Word};
    use crate::store::StoreDoc;
    use crate::text::{assemble, maybe_escape};

    fn doc(words: Vec<Word>) -> CanonicalDocument {
        CanonicalDocument {
            id: "doc".to_string(),
            pages: vec![Page {
                id: "canvas-1".to_string(),
                width: 1000,
                height: 1000,
                blocks: vec![Block {
                    lines: vec![Line { words }],
                }],
            }],
        }
    }

    #[test]
    fn test_single_word_hit() {
        let (text, index) = assemble(&doc(vec![Word::new("LIBRARY", 10, 20, 80, 15)]), false);
        let hits: Vec<Annotation> = map_hits("doc", &text, "brary", &index).collect();

        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].x, hits[0].y, hits[0].width, hits[0].height), (10, 20, 80, 15));
        assert_eq!(hits[0].on(), "canvas-1#xywh=10,20,80,15");
        assert_eq!((hits[0].match_start, hits[0].match_end), (2, 7));
    }

    #[test]
    fn test_hit_spanning_separator() {
        let (text, index) = assemble(
            &doc(vec![Word::new("OPEN", 0, 0, 40, 10), Word::new("ACCESS", 50, 0, 60, 10)]),
            false,
        );
        let hits: Vec<Annotation> = map_hits("doc", &text, "N AC", &index).collect();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "OPEN");
        assert_eq!(hits[0].xywh(), "0,0,40,10");
        assert_eq!(hits[1].text, "ACCESS");
        assert_eq!(hits[1].xywh(), "50,0,60,10");
    }

    #[test]
    fn test_no_occurrence_is_empty() {
        let (text, index) = assemble(&doc(vec![Word::new("OPEN", 0, 0, 40, 10)]), false);
        assert_eq!(map_hits("doc", &text, "closed", &index).count(), 0);
        assert_eq!(map_hits("doc", &text, "", &index).count(), 0);
    }

    #[test]
    fn test_overlapping_occurrences_reported() {
        let (text, index) = assemble(
            &doc(vec![Word::new("aaa", 0, 0, 30, 10), Word::new("b", 40, 0, 10, 10)]),
            false,
        );
        let hits: Vec<Annotation> = map_hits("doc", &text, "aa", &index).collect();

        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].match_start, hits[0].match_end), (0, 2));
        assert_eq!((hits[1].match_start, hits[1].match_end), (1, 3));
    }

    #[test]
    fn test_case_insensitive() {
        let (text, index) = assemble(&doc(vec![Word::new("Straße", 5, 5, 60, 12)]), false);
        assert_eq!(map_hits("doc", &text, "STRASSE", &index).count(), 0);
        assert_eq!(map_hits("doc", &text, "STRAẞE", &index).count(), 1);
        assert_eq!(map_hits("doc", &text, "straße", &index).count(), 1);
    }

    #[test]
    fn test_case_insensitive_on_escaped_text() {
        let (text, index) = assemble(
            &doc(vec![Word::new("CAFÉ", 10, 20, 80, 15), Word::new("Ωmega", 100, 20, 90, 15)]),
            true,
        );
        assert_eq!(text, "CAF\\u00c9 \\u03a9mega");

        let term = maybe_escape("café", true);
        let hits: Vec<Annotation> = map_hits("doc", &text, &term, &index).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "CAFÉ");
        assert_eq!((hits[0].match_start, hits[0].match_end), (0, 9));

        let term = maybe_escape("ωMEGA", true);
        assert_eq!(map_hits("doc", &text, &term, &index).count(), 1);
    }

    #[test]
    fn test_fold_case_keeps_length() {
        for text in ["CAF\\u00c9", "\\u212a", "\\U0001D504x", "\\u00", "plain"] {
            assert_eq!(fold_case(text).len(), text.chars().count(), "{}", text);
        }
        let folded: String = fold_case("\\u00C9\\u00c9").into_iter().collect();
        assert_eq!(folded, "\\u00e9\\u00e9");
    }

    #[test]
    fn test_separator_only_match_has_no_words() {
        let (text, index) = assemble(
            &doc(vec![Word::new("a", 0, 0, 1, 1), Word::new("b", 2, 0, 1, 1)]),
            false,
        );
        assert_eq!(map_hits("doc", &text, " ", &index).count(), 0);
    }

    #[test]
    fn test_hits_are_restartable() {
        let (text, index) = assemble(
            &doc(vec![Word::new("open", 0, 0, 1, 1), Word::new("OPEN", 2, 0, 1, 1)]),
            false,
        );
        let hits = map_hits("doc", &text, "open", &index);
        let first: Vec<Annotation> = hits.clone().collect();
        let second: Vec<Annotation> = hits.collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_hits() {
        let (text, index) = assemble(&doc(vec![Word::new("LIBRARY", 10, 20, 80, 15)]), false);
        let mut map = HashMap::new();
        map.insert("page-1".to_string(), Arc::new(index));

        let response = StoreResponse {
            num_found: 2,
            start: 0,
            docs: vec![
                StoreDoc {
                    id: Some("page-1".to_string()),
                    manifest_url: vec!["m".to_string()],
                    ocr_text: Some(text),
                },
                StoreDoc {
                    id: None,
                    manifest_url: vec!["m".to_string()],
                    ocr_text: Some("LIBRARY".to_string()),
                },
            ],
        };

        let annotations = resolve_hits(&response, "library", lookup_in(&map)).unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].document_id, "page-1");
    }

    #[test]
    fn test_unresolved_document() {
        let response = StoreResponse {
            num_found: 1,
            start: 0,
            docs: vec![StoreDoc {
                id: Some("gone".to_string()),
                manifest_url: Vec::new(),
                ocr_text: Some("text".to_string()),
            }],
        };

        let result = resolve_hits(&response, "text", |_| None);
        assert_eq!(result, Err(SearchError::UnresolvedDocument("gone".to_string())));
    }
}
