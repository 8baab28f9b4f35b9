//! Index documents
//!
//! Builds the create/delete payloads sent to the search store and runs
//! the parallel ingestion pipeline that produces them.

mod ingest;
mod payload;

pub use ingest::{
    ingest_batch, load_directory, manifest_url, process_document, IngestError, IngestJob,
    IngestOutcome, IngestedDocument, LoadedDirectory,
};
pub use payload::{
    build_create, build_create_with_offsets, build_delete, quote_term, solr_add_xml,
    CreatePayload, DeletePayload, PayloadError,
};
