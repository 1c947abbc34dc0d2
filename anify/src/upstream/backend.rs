//! Anify backend client (`search-advanced`)

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::provider::FallbackBackend;
use super::{check_status, join_path};
use crate::search::types::{AdvancedSearchRequest, SearchItem};
use crate::Result;

/// Backend API client
pub struct AnifyBackend {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    bearer_token: Option<String>,
}

impl AnifyBackend {
    pub fn new(
        url: &str,
        api_key: Option<&str>,
        bearer_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(url.trim_end_matches('/'))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.map(str::to_string),
            bearer_token: bearer_token.map(str::to_string),
        })
    }

    /// `{url}/search-advanced?apikey=...`
    pub fn search_url(&self) -> Result<Url> {
        let mut url = join_path(&self.base_url, &["search-advanced"])?;
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("apikey", key);
        }
        Ok(url)
    }
}

#[async_trait]
impl FallbackBackend for AnifyBackend {
    async fn search_advanced(&self, request: &AdvancedSearchRequest) -> Result<Vec<SearchItem>> {
        let url = self.search_url()?;
        tracing::debug!(
            search_type = ?request.search_type,
            page = request.page,
            per_page = request.per_page,
            "Querying backend advanced search"
        );

        let mut builder = self.client.post(url).json(request);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = check_status(self.service_name(), builder.send().await?).await?;
        let items: Vec<SearchItem> = response.json().await?;
        Ok(items)
    }

    fn service_name(&self) -> &'static str {
        "backend"
    }
}
