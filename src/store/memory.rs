//! In-process store
//!
//! Same upsert/delete-by-id semantics as the Solr core, with
//! case-insensitive substring matching. Used for tests and local runs
//! without a search server.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::types::{SearchRequest, StoreDoc, StoreError, StoreResponse};
use super::IndexStore;
use crate::index::{CreatePayload, DeletePayload};
use crate::search::fold_case;

#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, CreatePayload>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<CreatePayload> {
        self.docs.read().get(id).cloned()
    }
}

fn contains_folded(haystack: &[char], needle: &[char]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

#[async_trait]
impl IndexStore for MemoryStore {
    async fn upsert(&self, payload: &CreatePayload) -> Result<(), StoreError> {
        self.docs.write().insert(payload.id.clone(), payload.clone());
        Ok(())
    }

    async fn delete(&self, payload: &DeletePayload) -> Result<(), StoreError> {
        self.docs.write().remove(payload.id());
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<StoreResponse, StoreError> {
        let needle = fold_case(&request.term);
        let docs = self.docs.read();

        let matches: Vec<&CreatePayload> = docs
            .values()
            .filter(|doc| {
                request
                    .manifest_url
                    .as_deref()
                    .map_or(true, |url| doc.manifest_url == url)
            })
            .filter(|doc| contains_folded(&fold_case(&doc.ocr_text), &needle))
            .collect();

        Ok(StoreResponse {
            num_found: matches.len(),
            start: 0,
            docs: matches
                .into_iter()
                .take(request.rows)
                .map(|doc| StoreDoc {
                    id: Some(doc.id.clone()),
                    manifest_url: vec![doc.manifest_url.clone()],
                    ocr_text: Some(doc.ocr_text.clone()),
                })
                .collect(),
        })
    }
}
