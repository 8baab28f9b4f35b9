//! OCR Module
//!
//! Parses OCR XML dialects into one canonical document model.
//!
//! Supported dialects:
//! - ALTO (page layout, explicit word boxes)
//! - MiniOCR (compact line/word format)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ocr_search_server::ocr::{OcrFormat, ParserRegistry};
//!
//! let registry = ParserRegistry::default();
//! let parsed = registry.parse(&bytes, OcrFormat::Alto)?;
//! if parsed.skipped_words() > 0 {
//!     // some words were malformed and dropped
//! }
//! let doc = parsed.document;
//! ```

mod alto;
mod error;
mod miniocr;
mod parser;
mod types;

pub use alto::AltoParser;
pub use error::OcrError;
pub use miniocr::MiniOcrParser;
pub use parser::{parse, OcrParser, ParsedOcr, ParserRegistry};
pub use types::{Block, CanonicalDocument, Line, OcrFormat, Page, Word};
