//! Solr store client
//!
//! Talks to a single Solr core over its update and select handlers.
//! Creates are sent as JSON or as XML `<add>` documents; deletes and
//! selects always use JSON.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::RequestBuilder;
use serde::Deserialize;

use super::types::{SearchRequest, StoreError, StoreResponse, UpdateFormat};
use super::IndexStore;
use crate::index::{quote_term, solr_add_xml, CreatePayload, DeletePayload};

/// Solr core client
#[derive(Clone)]
pub struct SolrStore {
    client: reqwest::Client,
    /// `{solr_url}/{core}`
    core_url: String,
    update_format: UpdateFormat,
}

#[derive(Deserialize)]
struct SelectResponse {
    response: StoreResponse,
}

impl SolrStore {
    pub fn new(solr_url: &str, core: &str) -> Self {
        Self::with_client(reqwest::Client::new(), solr_url, core)
    }

    pub fn with_client(client: reqwest::Client, solr_url: &str, core: &str) -> Self {
        Self {
            client,
            core_url: format!("{}/{}", solr_url.trim_end_matches('/'), core.trim_matches('/')),
            update_format: UpdateFormat::default(),
        }
    }

    pub fn with_update_format(mut self, update_format: UpdateFormat) -> Self {
        self.update_format = update_format;
        self
    }

    pub fn update_url(&self) -> String {
        format!("{}/update?commit=true", self.core_url)
    }

    pub fn select_url(&self) -> String {
        format!("{}/select", self.core_url)
    }

    /// Query parameters for a select request
    pub fn select_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", format!("ocr_text:{}", quote_term(&request.term))),
            ("fl", "id,manifest_url,ocr_text".to_string()),
            ("wt", "json".to_string()),
            ("rows", request.rows.to_string()),
        ];
        if let Some(ref url) = request.manifest_url {
            params.push(("fq", format!("manifest_url:{}", quote_term(url))));
        }
        params
    }

    /// Update request adding `payloads` in the configured format
    fn create_request(&self, payloads: &[CreatePayload]) -> Result<RequestBuilder, StoreError> {
        let request = self.client.post(self.update_url());
        Ok(match self.update_format {
            UpdateFormat::Json => request.json(payloads),
            UpdateFormat::Xml => request
                .header(CONTENT_TYPE, "text/xml")
                .body(solr_add_xml(payloads)?),
        })
    }

    async fn send_update(&self, request: RequestBuilder) -> Result<(), StoreError> {
        check_status(request.send().await?).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(status = status.as_u16(), body = %body, "Solr request rejected");
    Err(StoreError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl IndexStore for SolrStore {
    async fn upsert(&self, payload: &CreatePayload) -> Result<(), StoreError> {
        self.send_update(self.create_request(std::slice::from_ref(payload))?)
            .await
    }

    async fn upsert_batch(&self, payloads: &[CreatePayload]) -> Result<(), StoreError> {
        if payloads.is_empty() {
            return Ok(());
        }
        self.send_update(self.create_request(payloads)?).await
    }

    async fn delete(&self, payload: &DeletePayload) -> Result<(), StoreError> {
        self.send_update(self.client.post(self.update_url()).json(payload))
            .await
    }

    async fn search(&self, request: &SearchRequest) -> Result<StoreResponse, StoreError> {
        let response = self
            .client
            .get(self.select_url())
            .query(&Self::select_params(request))
            .send()
            .await?;
        let response = check_status(response).await?;
        let select: SelectResponse = response.json().await?;

        tracing::debug!(
            term = %request.term,
            num_found = select.response.num_found,
            "Solr select"
        );
        Ok(select.response)
    }
}
