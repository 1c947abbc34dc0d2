//! Wire types for the search endpoint and its upstreams

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single media record (titles, description, ids, imagery, taxonomy,
/// ratings, provider mappings). Passed through without inspection.
pub type SearchItem = Value;

pub const DEFAULT_PER_PAGE: u32 = 10;

/// Inbound request body of `POST /api/search`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub genres_excluded: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub tags_excluded: Option<Vec<String>>,
    #[serde(default)]
    pub formats: Option<Vec<String>>,
}

/// Required field absent from a [`SearchRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Query,
    Type,
}

impl MissingField {
    pub fn message(self) -> &'static str {
        match self {
            Self::Query => "Missing query.",
            Self::Type => "Missing type (anime/manga).",
        }
    }
}

/// Validated search parameters with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub media_type: String,
    pub per_page: u32,
    pub page: u32,
    pub genres: Vec<String>,
    pub genres_excluded: Vec<String>,
    pub tags: Vec<String>,
    pub tags_excluded: Vec<String>,
    pub formats: Vec<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl SearchRequest {
    /// Apply defaults and reject requests without `query` or `type`.
    /// Empty strings count as missing.
    pub fn validate(self) -> Result<SearchParams, MissingField> {
        let query = present(self.query).ok_or(MissingField::Query)?;
        let media_type = present(self.media_type).ok_or(MissingField::Type)?;

        Ok(SearchParams {
            query,
            media_type,
            per_page: self.per_page.unwrap_or(DEFAULT_PER_PAGE),
            page: self.page.unwrap_or(0),
            genres: self.genres.unwrap_or_default(),
            genres_excluded: self.genres_excluded.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            tags_excluded: self.tags_excluded.unwrap_or_default(),
            formats: self.formats.unwrap_or_default(),
        })
    }
}

impl SearchParams {
    pub fn limit(&self) -> u32 {
        self.per_page
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.per_page)
    }
}

/// Page returned by the primary index.
///
/// Kept as the raw JSON object so a hit is passed through exactly as the
/// index sent it. Only `hits` is inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexPage(Map<String, Value>);

impl IndexPage {
    pub fn hit_count(&self) -> usize {
        self.0
            .get("hits")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}

impl From<Map<String, Value>> for IndexPage {
    fn from(map: Map<String, Value>) -> Self {
        IndexPage(map)
    }
}

/// Envelope built around the backend's flat result list, shaped like a
/// Meilisearch search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEnvelope {
    pub hits: Vec<SearchItem>,
    pub query: String,
    pub processing_time_ms: u64,
    pub limit: u64,
    pub offset: u64,
    pub estimated_total_hits: u64,
}

impl SearchEnvelope {
    /// Wrap a flat backend result list into a page
    pub fn from_fallback(params: &SearchParams, hits: Vec<SearchItem>) -> Self {
        let estimated_total_hits = hits.len() as u64;
        Self {
            hits,
            query: params.query.clone(),
            processing_time_ms: 0,
            limit: u64::from(params.limit()),
            offset: params.offset(),
            estimated_total_hits,
        }
    }
}

/// Body of a successful `POST /api/search`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchPage {
    Index(IndexPage),
    Fallback(SearchEnvelope),
}

impl SearchPage {
    pub fn hit_count(&self) -> usize {
        match self {
            SearchPage::Index(page) => page.hit_count(),
            SearchPage::Fallback(envelope) => envelope.hits.len(),
        }
    }
}

/// Media type understood by the backend's advanced search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvancedSearchType {
    Anime,
    Manga,
    Novel,
}

impl AdvancedSearchType {
    /// `manga` requests that include the `NOVEL` format search light novels;
    /// anything that is not `manga` searches anime.
    pub fn resolve(media_type: &str, formats: &[String]) -> Self {
        if media_type == "manga" {
            if formats.iter().any(|f| f == "NOVEL") {
                Self::Novel
            } else {
                Self::Manga
            }
        } else {
            Self::Anime
        }
    }
}

/// Body of the backend's `search-advanced` operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedSearchRequest {
    #[serde(rename = "type")]
    pub search_type: AdvancedSearchType,
    pub query: String,
    pub format: Vec<String>,
    pub page: u32,
    pub per_page: u32,
    pub genres: Vec<String>,
    pub genres_excluded: Vec<String>,
    pub tags: Vec<String>,
    pub tags_excluded: Vec<String>,
    pub year: u32,
}

impl From<&SearchParams> for AdvancedSearchRequest {
    fn from(params: &SearchParams) -> Self {
        Self {
            search_type: AdvancedSearchType::resolve(&params.media_type, &params.formats),
            query: params.query.clone(),
            format: params.formats.clone(),
            page: params.page,
            per_page: params.per_page,
            genres: params.genres.clone(),
            genres_excluded: params.genres_excluded.clone(),
            tags: params.tags.clone(),
            tags_excluded: params.tags_excluded.clone(),
            year: 0,
        }
    }
}

/// Body of a Meilisearch `POST /indexes/{index}/search`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexQuery {
    pub q: String,
    pub limit: u32,
    pub offset: u64,
    pub filter: String,
}
