//! Application state management

use std::sync::Arc;

use crate::config::{Config, StoreConfig};
use crate::ocr::ParserRegistry;
use crate::search::{OcrSource, OffsetCache};
use crate::store::{IndexStore, MemoryStore, SolrStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: Arc<dyn IndexStore>,
    registry: Arc<ParserRegistry>,
    offsets: OffsetCache,
}

impl AppState {
    /// Create state with the store selected by the configuration
    pub fn new(config: Config) -> Self {
        let store: Arc<dyn IndexStore> = match &config.store {
            StoreConfig::Solr {
                url,
                core,
                update_format,
            } => Arc::new(SolrStore::new(url, core).with_update_format(*update_format)),
            StoreConfig::Memory => Arc::new(MemoryStore::new()),
        };
        Self::with_store(config, store)
    }

    /// Create state around an existing store
    pub fn with_store(config: Config, store: Arc<dyn IndexStore>) -> Self {
        let registry = Arc::new(ParserRegistry::default());
        let source = OcrSource {
            dir: config.ocr.xml_dir.clone(),
            format: config.ocr.format,
            escape_non_ascii: config.ocr.escape_non_ascii,
        };
        let offsets = OffsetCache::new(
            config.ocr.offset_cache_size,
            Some(source),
            Arc::clone(&registry),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                registry,
                offsets,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the search store
    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.inner.store
    }

    /// Get the OCR parser registry
    pub fn registry(&self) -> &Arc<ParserRegistry> {
        &self.inner.registry
    }

    /// Get the offset index cache
    pub fn offsets(&self) -> &OffsetCache {
        &self.inner.offsets
    }
}
