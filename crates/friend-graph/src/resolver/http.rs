//! Profile documents over HTTP (reqwest).

use async_trait::async_trait;
use reqwest::header::ACCEPT;

use super::profile::{DocumentSource, ProfileDocument};
use crate::error::ResolveError;

#[derive(Debug, Clone, Default)]
pub struct HttpDocumentSource {
    client: reqwest::Client,
}

impl HttpDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch(&self, document_url: &str) -> Result<ProfileDocument, ResolveError> {
        let response = self
            .client
            .get(document_url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ResolveError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ResolveError::Transport(format!(
                "HTTP {} for {}",
                response.status(),
                document_url
            )));
        }

        response
            .json::<ProfileDocument>()
            .await
            .map_err(|e| ResolveError::Parse(e.to_string()))
    }
}
