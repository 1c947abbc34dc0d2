//! Search request handling: validation, filters and the primary/fallback pipeline

pub mod filter;
pub mod pipeline;
pub mod types;

pub use filter::{FilterExpr, FilterField, SearchFilter};
pub use pipeline::{PrimaryOutcome, SearchPipeline, SearchResponse, SearchSource};
pub use types::{
    AdvancedSearchRequest, AdvancedSearchType, IndexPage, IndexQuery, MissingField,
    SearchEnvelope, SearchItem, SearchPage, SearchParams, SearchRequest,
};
