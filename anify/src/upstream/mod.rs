//! HTTP clients for the primary index and the fallback backend

pub mod backend;
pub mod meilisearch;
pub mod provider;

pub use backend::AnifyBackend;
pub use meilisearch::MeilisearchIndex;
pub use provider::{FallbackBackend, PrimaryIndex};

use url::Url;

use crate::{Error, Result};

/// Append path segments to `base`, percent-encoding each one
pub(crate) fn join_path(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::Config(format!("URL cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turn a non-2xx response into [`Error::Upstream`]
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Upstream {
        service,
        status: status.as_u16(),
        body,
    })
}
