//! OCR parsing error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    /// Structurally invalid or numerically unparsable OCR element
    #[error("Malformed {format} input: {message}")]
    MalformedInput {
        format: &'static str,
        message: String,
    },

    /// Declared dialect has no registered parser
    #[error("Unsupported OCR format: {0}")]
    UnsupportedFormat(String),

    /// Document parsed but contains no words
    #[error("Document {0} contains no words")]
    EmptyDocument(String),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl OcrError {
    pub fn malformed(format: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            format,
            message: message.into(),
        }
    }

    /// Whether the error is a recoverable per-element defect
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedInput { .. })
    }
}

impl From<quick_xml::events::attributes::AttrError> for OcrError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        OcrError::Xml(err.into())
    }
}
