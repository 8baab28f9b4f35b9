//! ALTO parser
//!
//! Reads `alto/Layout/Page/PrintSpace/{TextBlock | ComposedBlock/TextBlock}/TextLine/String`.
//! `ComposedBlock` is transparent: its text blocks join the page's block
//! sequence in document order. Blocks outside `PrintSpace` (margins) are
//! not indexed.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::OcrError;
use super::parser::{attr_value, parse_px, OcrParser, ParsedOcr};
use super::types::{Block, CanonicalDocument, Line, OcrFormat, Page, Word};

const FORMAT: &str = "alto";

pub struct AltoParser;

impl OcrParser for AltoParser {
    fn format(&self) -> OcrFormat {
        OcrFormat::Alto
    }

    fn parse(&self, bytes: &[u8]) -> Result<ParsedOcr, OcrError> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut state = AltoState::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => state.open(&e, false, reader.buffer_position())?,
                Event::Empty(e) => state.open(&e, true, reader.buffer_position())?,
                Event::End(e) => state.close(e.local_name().as_ref()),
                Event::Text(t) if state.in_file_name => {
                    state.file_name.push_str(&t.unescape()?);
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
struct AltoState {
    saw_root: bool,
    print_space_depth: usize,
    in_file_name: bool,
    file_name: String,
    pages: Vec<Page>,
    page: Option<Page>,
    block: Option<Block>,
    line: Option<Line>,
    warnings: Vec<OcrError>,
}

impl AltoState {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool, position: usize) -> Result<(), OcrError> {
        let name = e.local_name();
        let name = name.as_ref();

        if !self.saw_root {
            if name != b"alto" {
                return Err(OcrError::malformed(
                    FORMAT,
                    format!("root element is <{}>, expected <alto>", String::from_utf8_lossy(name)),
                ));
            }
            self.saw_root = true;
            return Ok(());
        }

        match name {
            b"fileName" if !empty => self.in_file_name = true,
            b"Page" => {
                self.start_page(e)?;
                if empty {
                    self.close(b"Page");
                }
            }
            b"PrintSpace" if self.page.is_some() && !empty => self.print_space_depth += 1,
            b"TextBlock" if self.print_space_depth > 0 => {
                self.block = Some(Block::default());
                if empty {
                    self.close(b"TextBlock");
                }
            }
            b"TextLine" if self.print_space_depth > 0 => {
                self.line = Some(Line::default());
                if empty {
                    self.close(b"TextLine");
                }
            }
            b"String" if self.print_space_depth > 0 => match read_word(e) {
                Ok(Some(word)) => self.line.get_or_insert_with(Line::default).words.push(word),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(format = FORMAT, position, error = %err, "Skipping malformed word");
                    self.warnings.push(err);
                }
            },
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"fileName" => self.in_file_name = false,
            b"PrintSpace" => self.print_space_depth = self.print_space_depth.saturating_sub(1),
            b"TextLine" => self.end_line(),
            b"TextBlock" => {
                self.end_line();
                self.end_block();
            }
            b"Page" => {
                self.end_line();
                self.end_block();
                self.print_space_depth = 0;
                if let Some(page) = self.page.take() {
                    self.pages.push(page);
                }
            }
            _ => {}
        }
    }

    fn start_page(&mut self, e: &BytesStart<'_>) -> Result<(), OcrError> {
        let width = parse_px(FORMAT, "Page WIDTH", attr_value(e, b"WIDTH")?.as_deref())?;
        let height = parse_px(FORMAT, "Page HEIGHT", attr_value(e, b"HEIGHT")?.as_deref())?;
        let id = attr_value(e, b"ID")?
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("page_{}", self.pages.len() + 1));

        self.page = Some(Page {
            id,
            width,
            height,
            blocks: Vec::new(),
        });
        Ok(())
    }

    fn end_line(&mut self) {
        if let Some(line) = self.line.take() {
            if !line.words.is_empty() {
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
            return Err(OcrError::malformed(FORMAT, "missing <alto> root element"));
        }
        if self.pages.is_empty() {
            return Err(OcrError::malformed(FORMAT, "no <Page> element"));
        }

        let file_name = self.file_name.trim();
        let id = if file_name.is_empty() {
            self.pages[0].id.clone()
        } else {
            file_name.to_string()
        };

        Ok(ParsedOcr::new(
            CanonicalDocument {
                id,
                pages: self.pages,
            },
            self.warnings,
        ))
    }
}

/// Decode a `String` element. `Ok(None)` for blank content.
fn read_word(e: &BytesStart<'_>) -> Result<Option<Word>, OcrError> {
    let content = attr_value(e, b"CONTENT")?
        .ok_or_else(|| OcrError::malformed(FORMAT, "String without CONTENT attribute"))?;

    let x = parse_px(FORMAT, "HPOS", attr_value(e, b"HPOS")?.as_deref())?;
    let y = parse_px(FORMAT, "VPOS", attr_value(e, b"VPOS")?.as_deref())?;
    let width = parse_px(FORMAT, "WIDTH", attr_value(e, b"WIDTH")?.as_deref())?;
    let height = parse_px(FORMAT, "HEIGHT", attr_value(e, b"HEIGHT")?.as_deref())?;

    let text = content.trim();
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(Word::new(text, x, y, width, height)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<alto xmlns="http://www.loc.gov/standards/alto/ns-v3#" xmlns:xlink="http://www.w3.org/1999/xlink">
  <Description>
    <MeasurementUnit>pixel</MeasurementUnit>
    <sourceImageInformation><fileName>scan_0001.tif</fileName></sourceImageInformation>
  </Description>
  <Layout>
    <Page ID="P1" PHYSICAL_IMG_NR="1" WIDTH="2000" HEIGHT="3000">
      <TopMargin>
        <TextBlock><TextLine><String CONTENT="Header" HPOS="1" VPOS="1" WIDTH="1" HEIGHT="1"/></TextLine></TextBlock>
      </TopMargin>
      <PrintSpace>
        <TextBlock ID="B1">
          <TextLine>
            <String CONTENT="OPEN" HPOS="10" VPOS="20" WIDTH="40" HEIGHT="15"/>
            <SP/>
            <String CONTENT="ACCESS" HPOS="60" VPOS="20" WIDTH="70" HEIGHT="15"/>
          </TextLine>
        </TextBlock>
        <ComposedBlock>
          <TextBlock>
            <TextLine>
              <String CONTENT="inner" HPOS="5" VPOS="50" WIDTH="30" HEIGHT="12"/>
            </TextLine>
          </TextBlock>
        </ComposedBlock>
        <TextBlock>
          <TextLine>
            <String CONTENT="last" HPOS="5" VPOS="90" WIDTH="25" HEIGHT="12"/>
          </TextLine>
        </TextBlock>
      </PrintSpace>
    </Page>
  </Layout>
</alto>"#;

    #[test]
    fn test_parse_alto_structure() {
        let parsed = AltoParser.parse(SAMPLE.as_bytes()).unwrap();
        let doc = &parsed.document;

        assert_eq!(doc.id, "scan_0001.tif");
        assert_eq!(doc.pages.len(), 1);
        let page = &doc.pages[0];
        assert_eq!(page.id, "P1");
        assert_eq!((page.width, page.height), (2000, 3000));

        // ComposedBlock content is flattened between the top-level blocks
        assert_eq!(page.blocks.len(), 3);
        let words: Vec<&str> = doc.words().map(|(_, w)| w.text.as_str()).collect();
        assert_eq!(words, vec!["OPEN", "ACCESS", "inner", "last"]);

        assert_eq!(page.blocks[0].lines[0].words[1], Word::new("ACCESS", 60, 20, 70, 15));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_margin_blocks_are_ignored() {
        let parsed = AltoParser.parse(SAMPLE.as_bytes()).unwrap();
        assert!(parsed.document.words().all(|(_, w)| w.text != "Header"));
    }

    #[test]
    fn test_malformed_word_is_skipped() {
        let xml = r#"<alto><Layout><Page ID="p" WIDTH="100" HEIGHT="100"><PrintSpace>
            <TextBlock><TextLine>
              <String CONTENT="one" HPOS="1" VPOS="2" WIDTH="3" HEIGHT="4"/>
              <String CONTENT="bad" HPOS="1" VPOS="2" WIDTH="3" HEIGHT="tall"/>
              <String CONTENT="three" HPOS="9" VPOS="2" WIDTH="3" HEIGHT="4"/>
            </TextLine></TextBlock>
        </PrintSpace></Page></Layout></alto>"#;

        let parsed = AltoParser.parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.skipped_words(), 1);
        let words: Vec<&str> = parsed.document.words().map(|(_, w)| w.text.as_str()).collect();
        assert_eq!(words, vec!["one", "three"]);
    }

    #[test]
    fn test_missing_content_is_skipped() {
        let xml = r#"<alto><Layout><Page WIDTH="10" HEIGHT="10"><PrintSpace><TextBlock><TextLine>
            <String HPOS="1" VPOS="2" WIDTH="3" HEIGHT="4"/>
        </TextLine></TextBlock></PrintSpace></Page></Layout></alto>"#;

        let parsed = AltoParser.parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.skipped_words(), 1);
        assert!(parsed.is_empty());
        // Missing page ID falls back to physical position
        assert_eq!(parsed.document.pages[0].id, "page_1");
        assert_eq!(parsed.document.id, "page_1");
    }

    #[test]
    fn test_wrong_root_is_malformed() {
        let result = AltoParser.parse(br#"<ocr><p/></ocr>"#);
        assert!(matches!(result, Err(ref e) if e.is_malformed()));
    }

    #[test]
    fn test_missing_page_is_malformed() {
        let result = AltoParser.parse(br#"<alto><Layout/></alto>"#);
        assert!(matches!(result, Err(ref e) if e.is_malformed()));
    }

    #[test]
    fn test_missing_page_dimensions_is_malformed() {
        let result = AltoParser.parse(br#"<alto><Layout><Page ID="p" WIDTH="10"/></Layout></alto>"#);
        assert!(matches!(result, Err(ref e) if e.is_malformed()));
    }

    #[test]
    fn test_prefixed_namespace_elements() {
        let xml = r#"<a:alto xmlns:a="http://www.loc.gov/standards/alto/ns-v2#"><a:Layout>
            <a:Page ID="p1" WIDTH="100" HEIGHT="200"><a:PrintSpace><a:TextBlock><a:TextLine>
              <a:String CONTENT="word" HPOS="1" VPOS="2" WIDTH="3" HEIGHT="4"/>
            </a:TextLine></a:TextBlock></a:PrintSpace></a:Page>
        </a:Layout></a:alto>"#;

        let parsed = AltoParser.parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.document.word_count(), 1);
        assert_eq!(parsed.document.pages[0].blocks[0].lines[0].words[0], Word::new("word", 1, 2, 3, 4));
    }

    #[test]
    fn test_escaped_content() {
        let xml = r#"<alto><Layout><Page ID="p" WIDTH="10" HEIGHT="10"><PrintSpace><TextBlock><TextLine>
            <String CONTENT="&amp;c" HPOS="1" VPOS="2" WIDTH="3" HEIGHT="4"/>
        </TextLine></TextBlock></PrintSpace></Page></Layout></alto>"#;

        let parsed = AltoParser.parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.document.pages[0].blocks[0].lines[0].words[0].text, "&c");
    }
}
