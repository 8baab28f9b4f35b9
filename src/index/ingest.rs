//! Ingestion pipeline
//!
//! Each OCR file goes parse → assemble → payload sequentially. Files are
//! independent, so a batch fans out over the blocking thread pool with a
//! bounded number of documents in flight. A failing file only fails its
//! own outcome.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use thiserror::Error;

use super::payload::{build_create_with_offsets, CreatePayload};
use crate::ocr::{OcrError, OcrFormat, ParserRegistry};
use crate::text::OffsetIndex;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("Failed to read OCR file: {0}")]
    Read(std::io::Error),

    #[error("Ingest worker failed: {0}")]
    Worker(String),
}

/// One OCR file handed to the pipeline
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub id: String,
    pub manifest_url: String,
    pub format: OcrFormat,
    pub bytes: Vec<u8>,
}

/// Pipeline output for one document
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub payload: CreatePayload,
    pub offsets: Arc<OffsetIndex>,
    /// Words dropped as malformed
    pub skipped_words: usize,
    /// No words survived parsing; payload text is empty
    pub empty: bool,
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub id: String,
    pub result: Result<IngestedDocument, IngestError>,
}

/// OCR files found in a directory
#[derive(Debug, Default)]
pub struct LoadedDirectory {
    pub jobs: Vec<IngestJob>,
    /// Files that matched but could not be read, as failed outcomes
    pub unreadable: Vec<IngestOutcome>,
}

/// Run the per-document pipeline
pub fn process_document(
    registry: &ParserRegistry,
    job: &IngestJob,
    escape_non_ascii: bool,
) -> Result<IngestedDocument, OcrError> {
    let parsed = registry.parse(&job.bytes, job.format)?;
    let skipped_words = parsed.skipped_words();
    let empty = parsed.is_empty();

    let (payload, offsets) =
        build_create_with_offsets(&parsed.document, &job.id, &job.manifest_url, escape_non_ascii);

    tracing::debug!(
        document_id = %job.id,
        format = %job.format,
        words = offsets.len(),
        skipped = skipped_words,
        "Processed OCR document"
    );

    Ok(IngestedDocument {
        payload,
        offsets: Arc::new(offsets),
        skipped_words,
        empty,
    })
}

/// Process `jobs` in parallel, at most `concurrency` at a time
///
/// Outcomes arrive in completion order.
pub async fn ingest_batch(
    registry: Arc<ParserRegistry>,
    jobs: Vec<IngestJob>,
    escape_non_ascii: bool,
    concurrency: usize,
) -> Vec<IngestOutcome> {
    let total = jobs.len();

    let outcomes: Vec<IngestOutcome> = stream::iter(jobs.into_iter().map(|job| {
        let registry = Arc::clone(&registry);
        async move {
            let id = job.id.clone();
            let result = tokio::task::spawn_blocking(move || {
                process_document(&registry, &job, escape_non_ascii)
            })
            .await
            .map_err(|e| IngestError::Worker(e.to_string()))
            .and_then(|r| r.map_err(IngestError::from));

            if let Err(ref e) = result {
                tracing::warn!(document_id = %id, error = %e, "Failed to ingest OCR document");
            }
            IngestOutcome { id, result }
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    tracing::info!(total, failed, "Ingest batch complete");

    outcomes
}

/// Manifest url for an item under `base`
pub fn manifest_url(base: &str, id: &str) -> String {
    format!("{}/{}/manifest", base.trim_end_matches('/'), id)
}

/// Read every `*.xml` file in `dir` as a job, ordered by file name
///
/// Only a failure to list `dir` is an error. A file that cannot be read
/// becomes a failed outcome and the remaining files still load.
pub async fn load_directory(
    dir: &Path,
    format: OcrFormat,
    manifest_base: &str,
) -> std::io::Result<LoadedDirectory> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_xml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("xml"))
            .unwrap_or(false);
        let file_type = entry.file_type().await?;
        if is_xml && (file_type.is_file() || file_type.is_symlink()) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut loaded = LoadedDirectory {
        jobs: Vec::with_capacity(paths.len()),
        unreadable: Vec::new(),
    };
    for path in paths {
        let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            tracing::warn!(path = %path.display(), "Skipping OCR file with non UTF-8 name");
            continue;
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => loaded.jobs.push(IngestJob {
                manifest_url: manifest_url(manifest_base, &id),
                id,
                format,
                bytes,
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read OCR file");
                loaded.unreadable.push(IngestOutcome {
                    id,
                    result: Err(IngestError::Read(e)),
                });
            }
        }
    }

    tracing::info!(
        dir = %dir.display(),
        files = loaded.jobs.len(),
        unreadable = loaded.unreadable.len(),
        "Loaded OCR directory"
    );
    Ok(loaded)
}
