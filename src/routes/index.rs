//! Indexing routes
//!
//! - `POST /index` ingests every OCR file in the configured directory
//! - `DELETE /index/:id` removes one document from the store

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::Result;
use crate::index::{build_delete, ingest_batch, load_directory, CreatePayload};
use crate::state::AppState;

/// Create the indexing router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(reindex))
        .route("/:id", delete(remove_document))
}

#[derive(Debug, Serialize)]
pub struct FailedDocument {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct IndexSummary {
    pub total: usize,
    pub indexed: usize,
    pub empty: usize,
    pub skipped_words: usize,
    pub failed: Vec<FailedDocument>,
}

/// POST /index
async fn reindex(State(state): State<AppState>) -> Result<Json<IndexSummary>> {
    let config = state.config();
    let loaded = load_directory(
        &config.ocr.xml_dir,
        config.ocr.format,
        &config.iiif.manifest_base_url,
    )
    .await?;
    let total = loaded.jobs.len() + loaded.unreadable.len();

    let mut outcomes = ingest_batch(
        Arc::clone(state.registry()),
        loaded.jobs,
        config.ocr.escape_non_ascii,
        config.ocr.ingest_concurrency,
    )
    .await;
    outcomes.extend(loaded.unreadable);

    let mut payloads: Vec<CreatePayload> = Vec::with_capacity(outcomes.len());
    let mut summary = IndexSummary {
        total,
        indexed: 0,
        empty: 0,
        skipped_words: 0,
        failed: Vec::new(),
    };

    for outcome in outcomes {
        match outcome.result {
            Ok(doc) => {
                summary.skipped_words += doc.skipped_words;
                if doc.empty {
                    summary.empty += 1;
                }
                state.offsets().insert(outcome.id, doc.offsets);
                payloads.push(doc.payload);
            }
            Err(e) => summary.failed.push(FailedDocument {
                id: outcome.id,
                error: e.to_string(),
            }),
        }
    }

    // Stable submission order regardless of completion order
    payloads.sort_by(|a, b| a.id.cmp(&b.id));
    state.store().upsert_batch(&payloads).await?;
    summary.indexed = payloads.len();

    tracing::info!(
        total = summary.total,
        indexed = summary.indexed,
        failed = summary.failed.len(),
        "Reindex complete"
    );

    Ok(Json(summary))
}

/// DELETE /index/:id
async fn remove_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store().delete(&build_delete(&id)).await?;
    state.offsets().evict(&id);
    tracing::info!(document_id = %id, "Deleted document");
    Ok(StatusCode::NO_CONTENT)
}
