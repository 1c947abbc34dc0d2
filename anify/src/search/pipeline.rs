//! Two-stage search: primary index first, backend as fallback
//!
//! The primary stage never fails the request. Its outcome is classified as
//! [`PrimaryOutcome`] and the pipeline decides from that whether the backend
//! is consulted. Backend failures are returned to the caller.

use std::sync::Arc;
use std::time::Instant;

use super::filter::SearchFilter;
use super::types::{
    AdvancedSearchRequest, IndexPage, IndexQuery, SearchEnvelope, SearchPage, SearchParams,
};
use crate::config::Config;
use crate::upstream::{AnifyBackend, FallbackBackend, MeilisearchIndex, PrimaryIndex};
use crate::{Error, Result};

/// Result of querying the primary index
#[derive(Debug)]
pub enum PrimaryOutcome {
    /// At least one hit
    Hit(IndexPage),
    /// The index answered with no hits
    Empty(IndexPage),
    /// Transport failure, non-2xx status or undecodable body
    Error(Error),
    /// The primary index is not configured
    Disabled,
}

impl PrimaryOutcome {
    fn label(&self) -> &'static str {
        match self {
            PrimaryOutcome::Hit(_) => "hit",
            PrimaryOutcome::Empty(_) => "empty",
            PrimaryOutcome::Error(_) => "error",
            PrimaryOutcome::Disabled => "disabled",
        }
    }
}

/// Which upstream produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    Primary,
    Fallback,
}

impl SearchSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchSource::Primary => "primary",
            SearchSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug)]
pub struct SearchResponse {
    pub page: SearchPage,
    pub source: SearchSource,
}

pub struct SearchPipeline {
    primary: Option<Arc<dyn PrimaryIndex>>,
    fallback: Arc<dyn FallbackBackend>,
    fallback_on_empty: bool,
}

impl SearchPipeline {
    pub fn new(
        primary: Option<Arc<dyn PrimaryIndex>>,
        fallback: Arc<dyn FallbackBackend>,
    ) -> Self {
        Self {
            primary,
            fallback,
            fallback_on_empty: true,
        }
    }

    /// Return an empty primary page instead of asking the backend
    pub fn with_fallback_on_empty(mut self, fallback_on_empty: bool) -> Self {
        self.fallback_on_empty = fallback_on_empty;
        self
    }

    /// Build the Meilisearch and backend clients described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let primary: Option<Arc<dyn PrimaryIndex>> = if config.meilisearch.enabled {
            Some(Arc::new(MeilisearchIndex::new(
                &config.meilisearch.url,
                config.meilisearch.key.as_deref(),
                config.meilisearch.timeout(),
            )?))
        } else {
            None
        };

        let fallback = Arc::new(AnifyBackend::new(
            &config.backend.url,
            config.backend.api_key.as_deref(),
            config.backend_bearer(),
            config.backend.timeout(),
        )?);

        Ok(Self::new(primary, fallback)
            .with_fallback_on_empty(config.meilisearch.fallback_on_empty))
    }

    pub fn primary_enabled(&self) -> bool {
        self.primary.is_some()
    }

    /// Query the primary index and classify the result
    pub async fn query_primary(&self, params: &SearchParams) -> PrimaryOutcome {
        let Some(primary) = &self.primary else {
            return PrimaryOutcome::Disabled;
        };

        let query = IndexQuery {
            q: params.query.clone(),
            limit: params.limit(),
            offset: params.offset(),
            filter: SearchFilter::from_params(params).to_string(),
        };

        match primary.search(&params.media_type, &query).await {
            Ok(page) if page.hit_count() == 0 => PrimaryOutcome::Empty(page),
            Ok(page) => PrimaryOutcome::Hit(page),
            Err(e) => PrimaryOutcome::Error(e),
        }
    }

    /// Query the backend and wrap its result list in an envelope
    pub async fn query_fallback(&self, params: &SearchParams) -> Result<SearchEnvelope> {
        let request = AdvancedSearchRequest::from(params);
        let hits = self.fallback.search_advanced(&request).await?;
        Ok(SearchEnvelope::from_fallback(params, hits))
    }

    pub async fn execute(&self, params: &SearchParams) -> Result<SearchResponse> {
        let start = Instant::now();
        let outcome = self.query_primary(params).await;

        let primary_page = match outcome {
            PrimaryOutcome::Hit(page) => Some(page),
            PrimaryOutcome::Empty(page) if !self.fallback_on_empty => Some(page),
            other => {
                self.note_fallback(params, &other);
                None
            }
        };

        let response = match primary_page {
            Some(page) => SearchResponse {
                page: SearchPage::Index(page),
                source: SearchSource::Primary,
            },
            None => match self.query_fallback(params).await {
                Ok(envelope) => SearchResponse {
                    page: SearchPage::Fallback(envelope),
                    source: SearchSource::Fallback,
                },
                Err(e) => {
                    tracing::error!(
                        service = self.fallback.service_name(),
                        error = %e,
                        "Fallback search failed"
                    );
                    metrics::counter!(
                        "anify_search_failures_total",
                        "service" => self.fallback.service_name()
                    )
                    .increment(1);
                    return Err(e);
                }
            },
        };

        let source = response.source.as_str();
        metrics::counter!("anify_search_requests_total", "source" => source).increment(1);
        metrics::histogram!("anify_search_duration_seconds", "source" => source)
            .record(start.elapsed().as_secs_f64());
        tracing::debug!(
            source,
            hits = response.page.hit_count(),
            took_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(response)
    }

    fn note_fallback(&self, params: &SearchParams, outcome: &PrimaryOutcome) {
        match outcome {
            PrimaryOutcome::Error(e) => {
                tracing::warn!(
                    index = %params.media_type,
                    error = %e,
                    "Primary index failed, falling back to backend"
                );
            }
            PrimaryOutcome::Empty(_) => {
                tracing::debug!(index = %params.media_type, "Primary index returned no hits");
            }
            _ => {}
        }
        if self.primary.is_some() {
            metrics::counter!("anify_primary_fallbacks_total", "reason" => outcome.label())
                .increment(1);
        }
    }
}
