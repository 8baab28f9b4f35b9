//! IIIF content search routes
//!
//! `GET /search/:item?q=term` returns an annotation list with one
//! annotation per matched word box on the item's pages.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::index::manifest_url;
use crate::search::{lookup_in, resolve_hits, AnnotationList};
use crate::state::AppState;
use crate::store::SearchRequest;
use crate::text::maybe_escape;

/// Create the search router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_all))
        .route("/:item", get(search_item))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// GET /search?q=term
async fn search_all(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<AnnotationList>> {
    let list_id = list_id(&state, None, &query)?;
    run_search(&state, list_id, None, query).await
}

/// GET /search/:item?q=term
async fn search_item(
    State(state): State<AppState>,
    Path(item): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<AnnotationList>> {
    let list_id = list_id(&state, Some(&item), &query)?;
    let manifest = manifest_url(&state.config().iiif.manifest_base_url, &item);
    run_search(&state, list_id, Some(manifest), query).await
}

fn query_term(query: &SearchQuery) -> Result<&str> {
    match query.q.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => Ok(term),
        _ => Err(AppError::BadRequest("Missing query parameter q".to_string())),
    }
}

fn list_id(state: &AppState, item: Option<&str>, query: &SearchQuery) -> Result<String> {
    let term = query_term(query)?;
    let base = state.config().server.public_url.trim_end_matches('/');
    Ok(match item {
        Some(item) => format!(
            "{}/search/{}?q={}",
            base,
            urlencoding::encode(item),
            urlencoding::encode(term)
        ),
        None => format!("{}/search?q={}", base, urlencoding::encode(term)),
    })
}

async fn run_search(
    state: &AppState,
    list_id: String,
    manifest: Option<String>,
    query: SearchQuery,
) -> Result<Json<AnnotationList>> {
    let raw = query_term(&query)?;
    // Stored text may be escaped, so the term must be too
    let term = maybe_escape(raw, state.config().ocr.escape_non_ascii).into_owned();

    let mut request = SearchRequest::new(term.clone());
    if let Some(manifest) = manifest {
        request = request.within(manifest);
    }

    let response = state.store().search(&request).await?;
    let ids: Vec<String> = response.docs.iter().filter_map(|doc| doc.id.clone()).collect();
    let indexes = state.offsets().resolve_all(ids.iter().map(String::as_str)).await;
    let annotations = resolve_hits(&response, &term, lookup_in(&indexes))?;

    tracing::debug!(
        term = %raw,
        docs = response.docs.len(),
        annotations = annotations.len(),
        "Search complete"
    );

    Ok(Json(AnnotationList::from_annotations(
        &list_id,
        annotations,
        state.config().iiif.canvas_base_url.as_deref(),
    )))
}
