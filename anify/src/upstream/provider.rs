//! Upstream search traits

use async_trait::async_trait;

use crate::search::types::{AdvancedSearchRequest, IndexPage, IndexQuery, SearchItem};
use crate::Result;

/// Full-text index queried first when enabled
#[async_trait]
pub trait PrimaryIndex: Send + Sync {
    /// Run a paginated query against `index` (the request's media type)
    async fn search(&self, index: &str, query: &IndexQuery) -> Result<IndexPage>;

    /// Name used in logs and metrics
    fn service_name(&self) -> &'static str;
}

/// Backend API answering when the index cannot
#[async_trait]
pub trait FallbackBackend: Send + Sync {
    /// Run the backend's advanced search and return its flat result list
    async fn search_advanced(&self, request: &AdvancedSearchRequest) -> Result<Vec<SearchItem>>;

    fn service_name(&self) -> &'static str;
}
