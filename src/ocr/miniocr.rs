//! MiniOCR parser
//!
//! ```text
//! <ocr>
//!   <p xml:id="page_1" wh="2000 3000">
//!     <b><l><w x="10 20 40 15">OPEN</w> <w x="60 20 70 15">ACCESS</w></l></b>
//!   </p>
//! </ocr>
//! ```
//!
//! The `x` attribute packs `x y width height`. Integer values are absolute
//! pixels; values written with a decimal point are fractions of the page
//! `wh` and get scaled into pixel space here, so the canonical model never
//! sees relative coordinates.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::OcrError;
use super::parser::{attr_value, OcrParser, ParsedOcr};
use super::types::{Block, CanonicalDocument, Line, OcrFormat, Page, Word};

const FORMAT: &str = "miniocr";

pub struct MiniOcrParser;

impl OcrParser for MiniOcrParser {
    fn format(&self) -> OcrFormat {
        OcrFormat::MiniOcr
    }

    fn parse(&self, bytes: &[u8]) -> Result<ParsedOcr, OcrError> {
        let mut reader = Reader::from_reader(bytes);
        // Word text is trimmed per word; inter-word whitespace is irrelevant
        reader.trim_text(true);

        let mut state = MiniOcrState::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => state.open(&e, false)?,
                Event::Empty(e) => state.open(&e, true)?,
                Event::End(e) => state.close(e.local_name().as_ref(), reader.buffer_position()),
                Event::Text(t) => {
                    if let Some((_, text)) = state.word.as_mut() {
                        text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some((_, text)) = state.word.as_mut() {
                        text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        state.finish()
    }
}

#[derive(Default)]
struct MiniOcrState {
    saw_root: bool,
    pages: Vec<Page>,
    page: Option<Page>,
    block: Option<Block>,
    line: Option<Line>,
    /// Open `<w>`: raw coordinate attribute and accumulated text
    word: Option<(Option<String>, String)>,
    warnings: Vec<OcrError>,
}

impl MiniOcrState {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<(), OcrError> {
        let name = e.local_name();
        let name = name.as_ref();

        if !self.saw_root {
            if name != b"ocr" {
                return Err(OcrError::malformed(
                    FORMAT,
                    format!("root element is <{}>, expected <ocr>", String::from_utf8_lossy(name)),
                ));
            }
            self.saw_root = true;
            return Ok(());
        }

        match name {
            b"p" => {
                self.start_page(e)?;
                if empty {
                    self.close(b"p", 0);
                }
            }
            b"b" if self.page.is_some() => {
                self.block = Some(Block::default());
                if empty {
                    self.close(b"b", 0);
                }
            }
            b"l" if self.page.is_some() => {
                self.line = Some(Line::default());
                if empty {
                    self.close(b"l", 0);
                }
            }
            b"w" if self.page.is_some() => {
                // Empty `<w/>` is a blank token and contributes nothing
                if !empty {
                    self.word = Some((attr_value(e, b"x")?, String::new()));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8], position: usize) {
        match name {
            b"w" => self.end_word(position),
            b"l" => self.end_line(),
            b"b" => {
                self.end_line();
                self.end_block();
            }
            b"p" => {
                self.end_line();
                self.end_block();
                if let Some(page) = self.page.take() {
                    self.pages.push(page);
                }
            }
            _ => {}
        }
    }

    fn start_page(&mut self, e: &BytesStart<'_>) -> Result<(), OcrError> {
        let id = attr_value(e, b"id")?
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("page_{}", self.pages.len() + 1));

        let (width, height) = match attr_value(e, b"wh")? {
            Some(wh) => decode_dimensions(&wh)?,
            None => (0, 0),
        };

        self.page = Some(Page {
            id,
            width,
            height,
            blocks: Vec::new(),
        });
        Ok(())
    }

    fn end_word(&mut self, position: usize) {
        let Some((coords, text)) = self.word.take() else {
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let (page_width, page_height) = self
            .page
            .as_ref()
            .map(|p| (p.width, p.height))
            .unwrap_or_default();

        let decoded = coords
            .ok_or_else(|| OcrError::malformed(FORMAT, format!("word {:?} has no x attribute", text)))
            .and_then(|coords| decode_box(&coords, page_width, page_height));

        match decoded {
            Ok((x, y, width, height)) => self
                .line
                .get_or_insert_with(Line::default)
                .words
                .push(Word::new(text, x, y, width, height)),
            Err(err) => {
                tracing::warn!(format = FORMAT, position, error = %err, "Skipping malformed word");
                self.warnings.push(err);
            }
        }
    }

    fn end_line(&mut self) {
        if let Some(line) = self.line.take() {
            if !line.words.is_empty() {
                // Lines directly under <p> form an implicit block
                self.block.get_or_insert_with(Block::default).lines.push(line);
            }
        }
    }

    fn end_block(&mut self) {
        if let Some(block) = self.block.take() {
            if let Some(page) = self.page.as_mut() {
                if !block.lines.is_empty() {
                    page.blocks.push(block);
                }
            }
        }
    }

    fn finish(self) -> Result<ParsedOcr, OcrError> {
        if !self.saw_root {
            return Err(OcrError::malformed(FORMAT, "missing <ocr> root element"));
        }
        if self.pages.is_empty() {
            return Err(OcrError::malformed(FORMAT, "no <p> element"));
        }

        let id = self.pages[0].id.clone();
        Ok(ParsedOcr::new(
            CanonicalDocument {
                id,
                pages: self.pages,
            },
            self.warnings,
        ))
    }
}

/// Decode the page `wh="W H"` attribute
fn decode_dimensions(value: &str) -> Result<(u32, u32), OcrError> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [w, h] => match (w.parse::<u32>(), h.parse::<u32>()) {
            (Ok(w), Ok(h)) => Ok((w, h)),
            _ => Err(OcrError::malformed(FORMAT, format!("invalid page wh={:?}", value))),
        },
        _ => Err(OcrError::malformed(FORMAT, format!("invalid page wh={:?}", value))),
    }
}

/// Decode the compact `x="x y w h"` attribute into page pixels
pub(crate) fn decode_box(
    value: &str,
    page_width: u32,
    page_height: u32,
) -> Result<(u32, u32, u32, u32), OcrError> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let [x, y, w, h] = parts.as_slice() else {
        return Err(OcrError::malformed(
            FORMAT,
            format!("coordinates {:?} must have four values", value),
        ));
    };

    // Any fractional value makes the whole box relative; every value must then be in [0, 1]
    if parts.iter().any(|p| p.contains('.')) {
        if page_width == 0 || page_height == 0 {
            return Err(OcrError::malformed(
                FORMAT,
                format!("relative coordinates {:?} on a page without wh", value),
            ));
        }
        let scale = |raw: &str, extent: u32| -> Result<u32, OcrError> {
            let fraction: f64 = raw.parse().map_err(|_| {
                OcrError::malformed(FORMAT, format!("invalid coordinate {:?} in {:?}", raw, value))
            })?;
            if !(0.0..=1.0).contains(&fraction) {
                return Err(OcrError::malformed(
                    FORMAT,
                    format!("invalid coordinate {:?} in {:?}", raw, value),
                ));
            }
            Ok((fraction * f64::from(extent)).round() as u32)
        };
        return Ok((
            scale(*x, page_width)?,
            scale(*y, page_height)?,
            scale(*w, page_width)?,
            scale(*h, page_height)?,
        ));
    }

    let px = |raw: &str| -> Result<u32, OcrError> {
        raw.parse::<u32>().map_err(|_| {
            OcrError::malformed(FORMAT, format!("invalid coordinate {:?} in {:?}", raw, value))
        })
    };
    Ok((px(*x)?, px(*y)?, px(*w)?, px(*h)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::alto::AltoParser;

    #[test]
    fn test_parse_miniocr() {
        let xml = r#"<ocr>
            <p xml:id="page_7" wh="2000 3000">
              <b>
                <l><w x="10 20 40 15">OPEN</w> <w x="60 20 70 15">ACCESS</w></l>
                <l><w x="10 40 30 15">again</w></l>
              </b>
            </p>
        </ocr>"#;

        let parsed = MiniOcrParser.parse(xml.as_bytes()).unwrap();
        let doc = &parsed.document;
        assert_eq!(doc.id, "page_7");
        assert_eq!((doc.pages[0].width, doc.pages[0].height), (2000, 3000));
        assert_eq!(doc.pages[0].blocks[0].lines.len(), 2);
        assert_eq!(doc.pages[0].blocks[0].lines[0].words[1], Word::new("ACCESS", 60, 20, 70, 15));
    }

    #[test]
    fn test_relative_coordinates_are_scaled() {
        assert_eq!(decode_box("0.5 .25 0.1 0.05", 1000, 2000).unwrap(), (500, 500, 100, 100));
        assert!(decode_box("0.5 0.25 0.1 0.05", 0, 0).is_err());
        assert_eq!(decode_box("0 0.5 0.1 0.1", 1000, 2000).unwrap(), (0, 1000, 100, 200));
    }

    #[test]
    fn test_mixed_absolute_and_relative_box_is_malformed() {
        assert!(decode_box("10 20 0.5 0.1", 1000, 2000).is_err());
        assert!(decode_box("0.5 0.5 1.5 0.1", 1000, 2000).is_err());
        assert!(decode_box("0.1 0.1 0.1 NaN.", 1000, 2000).is_err());
    }

    #[test]
    fn test_decode_box_rejects_bad_input() {
        assert_eq!(decode_box(" 1  2 3 4 ", 0, 0).unwrap(), (1, 2, 3, 4));
        assert!(decode_box("1 2 3", 0, 0).is_err());
        assert!(decode_box("1 2 3 x", 0, 0).is_err());
        assert!(decode_box("1 2 -3 4", 0, 0).is_err());
    }

    #[test]
    fn test_malformed_word_is_skipped() {
        let xml = r#"<ocr><p xml:id="p1"><b><l>
            <w x="1 2 3 4">keep</w><w x="1 2">drop</w><w>none</w><w x="9 2 3 4">also</w>
        </l></b></p></ocr>"#;

        let parsed = MiniOcrParser.parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.skipped_words(), 2);
        let words: Vec<&str> = parsed.document.words().map(|(_, w)| w.text.as_str()).collect();
        assert_eq!(words, vec!["keep", "also"]);
    }

    #[test]
    fn test_blank_words_are_dropped() {
        let xml = r#"<ocr><p xml:id="p1"><b><l><w x="1 2 3 4">  </w><w x="1 2 3 4"/><w x="5 2 3 4">x</w></l></b></p></ocr>"#;

        let parsed = MiniOcrParser.parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.skipped_words(), 0);
        assert_eq!(parsed.document.word_count(), 1);
    }

    #[test]
    fn test_lines_without_block() {
        let xml = r#"<ocr><p xml:id="p1"><l><w x="1 2 3 4">a</w></l><l><w x="1 9 3 4">b</w></l></p></ocr>"#;

        let parsed = MiniOcrParser.parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.document.pages[0].blocks.len(), 1);
        assert_eq!(parsed.document.pages[0].blocks[0].lines.len(), 2);
    }

    #[test]
    fn test_invalid_page_dimensions_is_malformed() {
        let result = MiniOcrParser.parse(br#"<ocr><p xml:id="p1" wh="wide"/></ocr>"#);
        assert!(matches!(result, Err(ref e) if e.is_malformed()));
    }

    #[test]
    fn test_wrong_root_is_malformed() {
        let result = MiniOcrParser.parse(br#"<alto/>"#);
        assert!(matches!(result, Err(ref e) if e.is_malformed()));
    }

    #[test]
    fn test_namespaced_miniocr() {
        let xml = r#"<ocr xmlns="urn:example:miniocr"><p xml:id="p1" wh="10 10"><b xmlns="urn:example:miniocr"><l><w x="1 2 3 4">ns</w></l></b></p></ocr>"#;

        let parsed = MiniOcrParser.parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.document.word_count(), 1);
    }

    #[test]
    fn test_dialect_equivalence() {
        let alto = r#"<alto xmlns="http://www.loc.gov/standards/alto/ns-v3#"><Layout>
            <Page ID="page_1" WIDTH="800" HEIGHT="600"><PrintSpace>
              <TextBlock><TextLine>
                <String CONTENT="OPEN" HPOS="10" VPOS="20" WIDTH="40" HEIGHT="15"/>
                <SP/>
                <String CONTENT="ACCESS" HPOS="60" VPOS="20" WIDTH="70" HEIGHT="15"/>
              </TextLine></TextBlock>
              <ComposedBlock><TextBlock><TextLine>
                <String CONTENT="LIBRARY" HPOS="10" VPOS="50" WIDTH="80" HEIGHT="15"/>
              </TextLine></TextBlock></ComposedBlock>
            </PrintSpace></Page>
        </Layout></alto>"#;

        let mini = r#"<ocr>
            <p xml:id="page_1" wh="800 600">
              <b><l><w x="10 20 40 15">OPEN</w> <w x="60 20 70 15">ACCESS</w></l></b>
              <b><l><w x="10 50 80 15">LIBRARY</w></l></b>
            </p>
        </ocr>"#;

        let from_alto = AltoParser.parse(alto.as_bytes()).unwrap().document;
        let from_mini = MiniOcrParser.parse(mini.as_bytes()).unwrap().document;
        assert_eq!(from_alto, from_mini);
    }
}
