//! Search store access
//!
//! The store is an external full-text engine keyed by document id.
//! Creates are upserts; deletes select exactly one id.

mod memory;
mod solr;
mod types;

use async_trait::async_trait;

use crate::index::{CreatePayload, DeletePayload};

pub use memory::MemoryStore;
pub use solr::SolrStore;
pub use types::{SearchRequest, StoreDoc, StoreError, StoreResponse, UpdateFormat};

/// External indexed-text store
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Create or overwrite the document with `payload.id`
    async fn upsert(&self, payload: &CreatePayload) -> Result<(), StoreError>;

    /// Upsert several documents
    async fn upsert_batch(&self, payloads: &[CreatePayload]) -> Result<(), StoreError> {
        for payload in payloads {
            self.upsert(payload).await?;
        }
        Ok(())
    }

    /// Delete the document selected by `payload`
    async fn delete(&self, payload: &DeletePayload) -> Result<(), StoreError>;

    /// Full-text query over stored OCR text
    async fn search(&self, request: &SearchRequest) -> Result<StoreResponse, StoreError>;
}
