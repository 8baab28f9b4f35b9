//! Query-time search mapping
//!
//! Turns store hits (document id + stored text) into word-level
//! annotations on page images.
//!
//! ```text
//! term ──► IndexStore::search ──► StoreResponse
//!                                      │  per doc id
//!                                      ▼
//!                 OffsetCache ──► resolve_hits ──► AnnotationList
//! ```

mod annotation;
mod cache;
mod mapper;

pub use annotation::{AnnotationList, Layer, ResourceAnnotation, TextResource, PRESENTATION_CONTEXT};
pub use cache::{OcrSource, OffsetCache};
pub use mapper::{fold_case, fold_char, lookup_in, map_hits, resolve_hits, Annotation, Hits, SearchError};
