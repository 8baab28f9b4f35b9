//! Offset index cache
//!
//! Query-time lookup of offset indexes by document id. Indexes built during
//! ingestion are inserted directly; on a miss the index is re-derived from
//! the OCR source file with the same parser and assembler settings used to
//! build the stored text.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::ocr::{OcrFormat, ParserRegistry};
use crate::text::{assemble, OffsetIndex};

const DEFAULT_CAPACITY: usize = 256;

/// Where to re-read OCR files from on a cache miss
#[derive(Debug, Clone)]
pub struct OcrSource {
    pub dir: PathBuf,
    pub format: OcrFormat,
    pub escape_non_ascii: bool,
}

pub struct OffsetCache {
    entries: Mutex<LruCache<String, Arc<OffsetIndex>>>,
    source: Option<OcrSource>,
    registry: Arc<ParserRegistry>,
}

impl OffsetCache {
    pub fn new(capacity: usize, source: Option<OcrSource>, registry: Arc<ParserRegistry>) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            source,
            registry,
        }
    }

    pub fn insert(&self, id: impl Into<String>, index: Arc<OffsetIndex>) {
        self.entries.lock().put(id.into(), index);
    }

    pub fn evict(&self, id: &str) {
        self.entries.lock().pop(id);
    }

    pub fn get(&self, id: &str) -> Option<Arc<OffsetIndex>> {
        self.entries.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached index, or one re-derived from the OCR source
    pub async fn get_or_derive(&self, id: &str) -> Option<Arc<OffsetIndex>> {
        if let Some(index) = self.get(id) {
            return Some(index);
        }

        let index = Arc::new(self.derive(id).await?);
        self.insert(id, Arc::clone(&index));
        Some(index)
    }

    /// Resolve several ids; unresolvable ids are absent from the map
    pub async fn resolve_all<'a, I>(&self, ids: I) -> HashMap<String, Arc<OffsetIndex>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut resolved = HashMap::new();
        for id in ids {
            if resolved.contains_key(id) {
                continue;
            }
            if let Some(index) = self.get_or_derive(id).await {
                resolved.insert(id.to_string(), index);
            }
        }
        resolved
    }

    async fn derive(&self, id: &str) -> Option<OffsetIndex> {
        let source = self.source.as_ref()?;
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            tracing::warn!(document_id = %id, "Refusing to derive offsets for unsafe id");
            return None;
        }

        let path = source.dir.join(format!("{}.xml", id));
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No OCR source for document");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read OCR source");
                return None;
            }
        };

        let registry = Arc::clone(&self.registry);
        let format = source.format;
        let escape = source.escape_non_ascii;
        let derived = tokio::task::spawn_blocking(move || {
            registry
                .parse(&bytes, format)
                .map(|parsed| assemble(&parsed.document, escape).1)
        })
        .await;

        match derived {
            Ok(Ok(index)) => {
                tracing::debug!(document_id = %id, words = index.len(), "Re-derived offset index");
                Some(index)
            }
            Ok(Err(e)) => {
                tracing::warn!(document_id = %id, error = %e, "Failed to re-derive offset index");
                None
            }
            Err(e) => {
                tracing::warn!(document_id = %id, error = %e, "Offset derivation task failed");
                None
            }
        }
    }
}
