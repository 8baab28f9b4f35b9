//! Canonical OCR document model
//!
//! Format-agnostic representation every dialect parser converges to.
//! Geometry is always in the pixel space of the owning page.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::OcrError;

/// OCR dialect tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrFormat {
    /// ALTO page-layout XML (discrete HPOS/VPOS/WIDTH/HEIGHT attributes)
    Alto,
    /// MiniOCR compact XML (single `x` coordinate attribute)
    MiniOcr,
}

impl OcrFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alto => "alto",
            Self::MiniOcr => "miniocr",
        }
    }
}

impl fmt::Display for OcrFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrFormat {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alto" => Ok(Self::Alto),
            "miniocr" | "mini-ocr" => Ok(Self::MiniOcr),
            other => Err(OcrError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// One page or multi-page item worth of OCR content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalDocument {
    /// Stable identifier of the source image/page
    pub id: String,
    /// Pages in physical order
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Blocks in reading order
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub words: Vec<Word>,
}

/// Single recognized word with its pixel box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Word {
    pub fn new(text: impl Into<String>, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
        }
    }

    /// `x,y,width,height` as used in `#xywh=` media fragments
    pub fn xywh(&self) -> String {
        format!("{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl CanonicalDocument {
    /// Iterate words in canonical reading order together with their page
    pub fn words(&self) -> impl Iterator<Item = (&Page, &Word)> + '_ {
        self.pages.iter().flat_map(|page| {
            page.blocks
                .iter()
                .flat_map(|block| block.lines.iter())
                .flat_map(|line| line.words.iter())
                .map(move |word| (page, word))
        })
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }

    pub fn is_empty(&self) -> bool {
        self.words().next().is_none()
    }
}
