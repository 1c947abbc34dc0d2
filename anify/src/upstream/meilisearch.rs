//! Meilisearch primary index client

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::provider::PrimaryIndex;
use super::{check_status, join_path};
use crate::search::types::{IndexPage, IndexQuery};
use crate::Result;

/// Meilisearch index client
pub struct MeilisearchIndex {
    client: Client,
    base_url: Url,
    key: Option<String>,
}

impl MeilisearchIndex {
    pub fn new(url: &str, key: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(url.trim_end_matches('/'))?;

        Ok(Self {
            client,
            base_url,
            key: key.map(str::to_string),
        })
    }

    /// `{url}/indexes/{index}/search`, with `index` encoded as one segment
    pub fn search_url(&self, index: &str) -> Result<Url> {
        join_path(&self.base_url, &["indexes", index, "search"])
    }
}

#[async_trait]
impl PrimaryIndex for MeilisearchIndex {
    async fn search(&self, index: &str, query: &IndexQuery) -> Result<IndexPage> {
        let url = self.search_url(index)?;
        tracing::debug!(%url, filter = %query.filter, "Querying Meilisearch");

        let mut request = self.client.post(url).json(query);
        if let Some(key) = &self.key {
            request = request.bearer_auth(key);
        }

        let response = check_status(self.service_name(), request.send().await?).await?;
        let page: IndexPage = response.json().await?;
        Ok(page)
    }

    fn service_name(&self) -> &'static str {
        "meilisearch"
    }
}
