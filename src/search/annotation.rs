//! IIIF search response
//!
//! `sc:AnnotationList` with one painting annotation per matched word box,
//! as consumed by IIIF Content Search clients.

use serde::{Deserialize, Serialize};

use super::mapper::Annotation;

pub const PRESENTATION_CONTEXT: &str = "http://iiif.io/api/presentation/2/context.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationList {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub list_type: String,
    pub within: Layer,
    pub resources: Vec<ResourceAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    #[serde(rename = "@type")]
    pub layer_type: String,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAnnotation {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub annotation_type: String,
    pub motivation: String,
    pub resource: TextResource,
    pub on: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResource {
    #[serde(rename = "@type")]
    pub resource_type: String,
    pub chars: String,
}

impl AnnotationList {
    /// Build the list served at `list_id`
    ///
    /// `canvas_base` is prepended to each page id when the presentation
    /// layer addresses canvases by URL rather than by bare page id.
    pub fn from_annotations<I>(list_id: &str, annotations: I, canvas_base: Option<&str>) -> Self
    where
        I: IntoIterator<Item = Annotation>,
    {
        let resources: Vec<ResourceAnnotation> = annotations
            .into_iter()
            .enumerate()
            .map(|(n, annotation)| ResourceAnnotation {
                id: format!("{}/annotation/{}", list_id, n),
                annotation_type: "oa:Annotation".to_string(),
                motivation: "sc:painting".to_string(),
                on: match canvas_base {
                    Some(base) => format!("{}/{}", base.trim_end_matches('/'), annotation.on()),
                    None => annotation.on(),
                },
                resource: TextResource {
                    resource_type: "cnt:ContentAsText".to_string(),
                    chars: annotation.text,
                },
            })
            .collect();

        Self {
            context: PRESENTATION_CONTEXT.to_string(),
            id: list_id.to_string(),
            list_type: "sc:AnnotationList".to_string(),
            within: Layer {
                layer_type: "sc:Layer".to_string(),
                total: resources.len(),
            },
            resources,
        }
    }
}
