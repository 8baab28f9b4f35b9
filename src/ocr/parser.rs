//! OCR parser abstraction
//!
//! One parser per dialect, selected by an explicit format tag. New dialects
//! plug in by implementing [`OcrParser`] and registering with a
//! [`ParserRegistry`].

use std::collections::HashMap;
use std::sync::Arc;

use quick_xml::events::BytesStart;

use super::alto::AltoParser;
use super::error::OcrError;
use super::miniocr::MiniOcrParser;
use super::types::{CanonicalDocument, OcrFormat};

/// Decodes one OCR dialect into the canonical model
pub trait OcrParser: Send + Sync {
    /// Dialect handled by this parser
    fn format(&self) -> OcrFormat;

    /// Parse raw bytes
    ///
    /// Fatal structural problems return `Err`. Per-word defects are
    /// collected in [`ParsedOcr::warnings`] and the word is skipped.
    fn parse(&self, bytes: &[u8]) -> Result<ParsedOcr, OcrError>;
}

/// Parser output with non-fatal diagnostics
#[derive(Debug)]
pub struct ParsedOcr {
    pub document: CanonicalDocument,
    /// Skipped words (`MalformedInput`) and `EmptyDocument`
    pub warnings: Vec<OcrError>,
}

impl ParsedOcr {
    pub(crate) fn new(document: CanonicalDocument, mut warnings: Vec<OcrError>) -> Self {
        if document.is_empty() {
            tracing::warn!(document_id = %document.id, "OCR document contains no words");
            warnings.push(OcrError::EmptyDocument(document.id.clone()));
        }
        Self { document, warnings }
    }

    /// Number of word elements dropped as malformed
    pub fn skipped_words(&self) -> usize {
        self.warnings.iter().filter(|w| w.is_malformed()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, OcrError::EmptyDocument(_)))
    }
}

/// Format tag → parser lookup
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: HashMap<OcrFormat, Arc<dyn OcrParser>>,
}

impl ParserRegistry {
    /// Registry without any parsers
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    pub fn register(&mut self, parser: Arc<dyn OcrParser>) -> &mut Self {
        self.parsers.insert(parser.format(), parser);
        self
    }

    pub fn get(&self, format: OcrFormat) -> Option<&Arc<dyn OcrParser>> {
        self.parsers.get(&format)
    }

    pub fn parse(&self, bytes: &[u8], format: OcrFormat) -> Result<ParsedOcr, OcrError> {
        let parser = self
            .get(format)
            .ok_or_else(|| OcrError::UnsupportedFormat(format.to_string()))?;
        parser.parse(bytes)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(Arc::new(AltoParser))
            .register(Arc::new(MiniOcrParser));
        registry
    }
}

/// Parse with the built-in parsers, resolving the declared tag first
pub fn parse(bytes: &[u8], declared_format: &str) -> Result<ParsedOcr, OcrError> {
    let format: OcrFormat = declared_format.parse()?;
    ParserRegistry::default().parse(bytes, format)
}

// Shared XML helpers

/// Attribute value by local name, ignoring namespace declarations
pub(crate) fn attr_value(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, OcrError> {
    for attr in element.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parse a pixel value as a non-negative integer
pub(crate) fn parse_px(
    format: &'static str,
    name: &str,
    value: Option<&str>,
) -> Result<u32, OcrError> {
    let value = value.ok_or_else(|| OcrError::malformed(format, format!("missing {} attribute", name)))?;
    value.trim().parse::<u32>().map_err(|_| {
        OcrError::malformed(
            format,
            format!("{}={:?} is not a non-negative integer", name, value),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let result = parse(b"<hocr/>", "hocr");
        assert!(matches!(result, Err(OcrError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_unregistered_format_is_unsupported() {
        let mut registry = ParserRegistry::empty();
        registry.register(Arc::new(AltoParser));

        let result = registry.parse(b"<ocr/>", OcrFormat::MiniOcr);
        assert!(matches!(result, Err(OcrError::UnsupportedFormat(f)) if f == "miniocr"));
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("alto", "HPOS", Some(" 42 ")).unwrap(), 42);
        assert!(parse_px("alto", "HPOS", None).unwrap_err().is_malformed());
        assert!(parse_px("alto", "HPOS", Some("-3")).unwrap_err().is_malformed());
        assert!(parse_px("alto", "HPOS", Some("12.5")).unwrap_err().is_malformed());
    }

    #[test]
    fn test_empty_document_reported() {
        let parsed = parse(br#"<ocr><p xml:id="p1"/></ocr>"#, "miniocr").unwrap();
        assert!(parsed.is_empty());
        assert_eq!(parsed.skipped_words(), 0);
        assert_eq!(parsed.document.pages.len(), 1);
    }
}
