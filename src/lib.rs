//! OCR Search Server Library
//!
//! Normalizes OCR XML into a canonical page/word model, flattens it into
//! indexable text with a character offset index, and maps full-text hits
//! back to word boxes as IIIF annotation lists.
//!
//! # Modules
//!
//! - `ocr`: ALTO and MiniOCR parsers and the canonical document model
//! - `text`: Text assembly, offset index and non-ASCII escaping
//! - `index`: Store payloads and the parallel ingestion pipeline
//! - `store`: Search store clients (Solr, in-memory)
//! - `search`: Hit mapping, offset cache and annotation lists
//! - `routes`: HTTP surface

pub mod config;
pub mod error;
pub mod index;
pub mod ocr;
pub mod routes;
pub mod search;
pub mod state;
pub mod store;
pub mod text;
