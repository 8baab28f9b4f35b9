//! Index document payloads
//!
//! Create payloads are upserts keyed by `id`: re-sending one for an
//! existing id overwrites the stored document. Delete payloads select
//! exactly one id, so repeating a delete is a no-op.

use quick_xml::{
    events::{BytesCData, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

use crate::ocr::CanonicalDocument;
use crate::text::{assemble, OffsetIndex};

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("XML serialization error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Store document for one OCR item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePayload {
    pub id: String,
    /// Opaque pointer to the item's presentation manifest
    pub manifest_url: String,
    /// Assembled OCR text
    pub ocr_text: String,
}

/// Delete request selecting a single id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletePayload {
    delete: DeleteQuery,
    #[serde(skip)]
    id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct DeleteQuery {
    query: String,
}

/// Build the create payload for `doc`
pub fn build_create(
    doc: &CanonicalDocument,
    id: &str,
    manifest_url: &str,
    escape_non_ascii: bool,
) -> CreatePayload {
    build_create_with_offsets(doc, id, manifest_url, escape_non_ascii).0
}

/// Build the create payload for `doc` along with the offset index of its text
pub fn build_create_with_offsets(
    doc: &CanonicalDocument,
    id: &str,
    manifest_url: &str,
    escape_non_ascii: bool,
) -> (CreatePayload, OffsetIndex) {
    let (ocr_text, offsets) = assemble(doc, escape_non_ascii);
    (CreatePayload::new(id, manifest_url, ocr_text), offsets)
}

/// Render `payloads` as one Solr XML `<add>` update
pub fn solr_add_xml(payloads: &[CreatePayload]) -> Result<String, PayloadError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Start(BytesStart::new("add")))?;
    for payload in payloads {
        payload.write_doc(&mut writer)?;
    }
    writer.write_event(Event::End(BytesEnd::new("add")))?;

    let result = writer.into_inner().into_inner();
    Ok(String::from_utf8(result)?)
}

/// Build the delete payload for `id`
pub fn build_delete(id: &str) -> DeletePayload {
    DeletePayload {
        delete: DeleteQuery {
            query: format!("id:{}", quote_term(id)),
        },
        id: id.to_string(),
    }
}

/// Quote a value as a Solr phrase term
pub fn quote_term(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

impl CreatePayload {
    pub fn new(id: impl Into<String>, manifest_url: impl Into<String>, ocr_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            manifest_url: manifest_url.into(),
            ocr_text: ocr_text.into(),
        }
    }

    /// Render as a Solr XML `<add><doc>` update
    pub fn to_solr_xml(&self) -> Result<String, PayloadError> {
        solr_add_xml(std::slice::from_ref(self))
    }

    fn write_doc<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), PayloadError> {
        writer.write_event(Event::Start(BytesStart::new("doc")))?;
        write_field(writer, "id", &self.id)?;
        write_field(writer, "manifest_url", &self.manifest_url)?;
        write_field(writer, "ocr_text", &self.ocr_text)?;
        writer.write_event(Event::End(BytesEnd::new("doc")))?;
        Ok(())
    }
}

impl DeletePayload {
    /// The id this payload deletes
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Store query expression
    pub fn query(&self) -> &str {
        &self.delete.query
    }
}

fn write_field<W: std::io::Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<(), PayloadError> {
    let mut elem = BytesStart::new("field");
    elem.push_attribute(("name", name));
    writer.write_event(Event::Start(elem))?;

    // CDATA cannot contain its own terminator
    if value.contains("]]>") {
        writer.write_event(Event::Text(BytesText::new(value)))?;
    } else {
        writer.write_event(Event::CData(BytesCData::new(value)))?;
    }

    writer.write_event(Event::End(BytesEnd::new("field")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{Block, Line, Page, Word};

    fn sample_doc() -> CanonicalDocument {
        CanonicalDocument {
            id: "img_1".to_string(),
            pages: vec![Page {
                id: "img_1".to_string(),
                width: 100,
                height: 100,
                blocks: vec![Block {
                    lines: vec![Line {
                        words: vec![Word::new("OPEN", 0, 0, 1, 1), Word::new("ÆCCESS", 2, 0, 1, 1)],
                    }],
                }],
            }],
        }
    }

    #[test]
    fn test_build_create() {
        let payload = build_create(&sample_doc(), "item-1", "http://x/iiif/item-1/manifest", false);
        assert_eq!(payload.id, "item-1");
        assert_eq!(payload.manifest_url, "http://x/iiif/item-1/manifest");
        assert_eq!(payload.ocr_text, "OPEN ÆCCESS");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "item-1",
                "manifest_url": "http://x/iiif/item-1/manifest",
                "ocr_text": "OPEN ÆCCESS"
            })
        );
    }

    #[test]
    fn test_build_create_escaped() {
        let payload = build_create(&sample_doc(), "item-1", "m", true);
        assert_eq!(payload.ocr_text, "OPEN \\u00c6CCESS");
    }

    #[test]
    fn test_offsets_follow_payload_text() {
        let doc = sample_doc();
        let (payload, offsets) = build_create_with_offsets(&doc, "item-1", "m", true);
        assert_eq!(payload, build_create(&doc, "item-1", "m", true));

        let chars: Vec<char> = payload.ocr_text.chars().collect();
        let last = &offsets.entries()[1];
        let word: String = chars[last.start..last.end].iter().collect();
        assert_eq!(word, "\\u00c6CCESS");
    }

    #[test]
    fn test_create_is_deterministic() {
        let doc = sample_doc();
        let first = serde_json::to_vec(&build_create(&doc, "item-1", "m", false)).unwrap();
        let second = serde_json::to_vec(&build_create(&doc, "item-1", "m", false)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_document_builds_empty_text() {
        let payload = build_create(&CanonicalDocument::default(), "empty", "m", false);
        assert_eq!(payload.ocr_text, "");
    }

    #[test]
    fn test_build_delete() {
        let payload = build_delete("item-1");
        assert_eq!(payload.id(), "item-1");
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"delete": {"query": "id:\"item-1\""}})
        );
    }

    #[test]
    fn test_delete_escapes_id() {
        let payload = build_delete(r#"we"ird\id"#);
        assert_eq!(payload.query(), r#"id:"we\"ird\\id""#);
    }

    #[test]
    fn test_solr_xml() {
        let payload = CreatePayload::new("item-1", "http://x/m?a=1&b=2", "a <b> c");
        let xml = payload.to_solr_xml().unwrap();
        assert_eq!(
            xml,
            "<add><doc>\
             <field name=\"id\"><![CDATA[item-1]]></field>\
             <field name=\"manifest_url\"><![CDATA[http://x/m?a=1&b=2]]></field>\
             <field name=\"ocr_text\"><![CDATA[a <b> c]]></field>\
             </doc></add>"
        );
    }

    #[test]
    fn test_solr_add_xml_batch() {
        let payloads = vec![
            CreatePayload::new("a", "m", "one"),
            CreatePayload::new("b", "m", "two"),
        ];
        let xml = solr_add_xml(&payloads).unwrap();
        assert!(xml.starts_with("<add><doc><field name=\"id\"><![CDATA[a]]></field>"));
        assert_eq!(xml.matches("<doc>").count(), 2);
        assert!(xml.ends_with("<![CDATA[two]]></field></doc></add>"));
        assert_eq!(solr_add_xml(&[]).unwrap(), "<add></add>");
    }

    #[test]
    fn test_solr_xml_cdata_terminator() {
        let payload = CreatePayload::new("id", "m", "x ]]> y");
        let xml = payload.to_solr_xml().unwrap();
        assert!(xml.contains("<field name=\"ocr_text\">x ]]&gt; y</field>"));
    }
}
