//! Search store request/response types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::index::PayloadError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to encode update: {0}")]
    Payload(#[from] PayloadError),
}

/// Body format for create updates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateFormat {
    #[default]
    Json,
    /// `<add><doc>` documents
    Xml,
}

impl FromStr for UpdateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(UpdateFormat::Json),
            "xml" => Ok(UpdateFormat::Xml),
            other => Err(format!("unknown update format {:?}, expected json or xml", other)),
        }
    }
}

impl fmt::Display for UpdateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateFormat::Json => write!(f, "json"),
            UpdateFormat::Xml => write!(f, "xml"),
        }
    }
}

/// Full-text query against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Term to find in `ocr_text`
    pub term: String,
    /// Restrict to documents of one manifest
    pub manifest_url: Option<String>,
    /// Maximum documents returned
    pub rows: usize,
}

impl SearchRequest {
    pub const DEFAULT_ROWS: usize = 1000;

    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            manifest_url: None,
            rows: Self::DEFAULT_ROWS,
        }
    }

    pub fn within(mut self, manifest_url: impl Into<String>) -> Self {
        self.manifest_url = Some(manifest_url.into());
        self
    }
}

/// Store query result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub num_found: usize,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub docs: Vec<StoreDoc>,
}

/// One matching document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDoc {
    #[serde(default)]
    pub id: Option<String>,
    /// Multi-valued in Solr, a plain string elsewhere
    #[serde(default, deserialize_with = "one_or_many")]
    pub manifest_url: Vec<String>,
    #[serde(default)]
    pub ocr_text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
        None => Vec::new(),
    })
}
